//! Discrete-time queue pricing MDP.
//!
//! State `n` is the number of customers in system (`0..=N`), action `a`
//! picks a price level, and arrivals follow the price-dependent rate from
//! [`arrival_rate`]. Over one step of length `dt` the queue moves up with
//! probability `lambda(a)·dt`, down with `mu·dt`, and stays otherwise.
//! Raw probabilities are clamped at zero and each row renormalized, so the
//! tensor is a valid stochastic kernel for any positive `dt`.

use tracing::{debug, info};

use super::rate::arrival_rate;
use crate::config::ModelConfig;
use crate::types::{QueuePricingError, RewardMatrix, TransitionTensor};

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Immutable MDP: validated parameters plus the prebuilt transition tensor
/// and reward matrix.
#[derive(Debug, Clone)]
pub struct QueuePricingMdp {
    config: ModelConfig,
    rates: Vec<f64>,
    transitions: TransitionTensor,
    rewards: RewardMatrix,
}

impl QueuePricingMdp {
    /// Validate the configuration and build `P` and `R`.
    ///
    /// Fails before anything is allocated if a parameter is out of range or
    /// the tensor would exceed `max_tensor_entries`.
    pub fn build(config: &ModelConfig) -> Result<Self, QueuePricingError> {
        let num_states = validate(config)?;
        let num_actions = config.prices.len();

        let rates: Vec<f64> = config
            .prices
            .iter()
            .map(|&price| arrival_rate(config.lambda0, config.beta, price))
            .collect();

        for (action, (price, rate)) in config.prices.iter().zip(&rates).enumerate() {
            debug!(action, price, rate, "Arrival rate");
        }

        let transitions = TransitionTensor::from_rows(
            num_actions,
            num_states,
            rates.iter().flat_map(|&rate| {
                (0..num_states).map(move |state| {
                    normalize_row(
                        raw_transition_row(config.capacity, state, rate, config.mu, config.dt),
                        state,
                    )
                })
            }),
        );

        let rewards = RewardMatrix::from_rows(
            num_states,
            num_actions,
            (0..num_states).map(|state| {
                config
                    .prices
                    .iter()
                    .zip(&rates)
                    .map(|(&price, &rate)| {
                        one_step_reward(price, rate, state, config.cw, config.dt)
                    })
                    .collect()
            }),
        );

        info!(
            states = num_states,
            actions = num_actions,
            tensor_entries = transitions.len(),
            tensor_bytes = transitions.memory_bytes(),
            "MDP built"
        );

        Ok(Self {
            config: config.clone(),
            rates,
            transitions,
            rewards,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn num_states(&self) -> usize {
        self.transitions.num_states()
    }

    pub fn num_actions(&self) -> usize {
        self.transitions.num_actions()
    }

    pub fn gamma(&self) -> f64 {
        self.config.gamma
    }

    pub fn prices(&self) -> &[f64] {
        &self.config.prices
    }

    pub fn price(&self, action: usize) -> f64 {
        self.config.prices[action]
    }

    /// Arrival rate `lambda(a)` for an action.
    pub fn arrival_rate(&self, action: usize) -> f64 {
        self.rates[action]
    }

    pub fn transitions(&self) -> &TransitionTensor {
        &self.transitions
    }

    pub fn rewards(&self) -> &RewardMatrix {
        &self.rewards
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check every parameter and return the state count `S = N + 1`.
fn validate(config: &ModelConfig) -> Result<usize, QueuePricingError> {
    require_positive("lambda0", config.lambda0)?;
    require_positive("mu", config.mu)?;
    require_positive("dt", config.dt)?;
    require_non_negative("beta", config.beta)?;
    require_non_negative("cw", config.cw)?;

    if !(0.0..1.0).contains(&config.gamma) {
        return Err(QueuePricingError::DiscountOutOfRange(config.gamma));
    }

    if config.prices.is_empty() {
        return Err(QueuePricingError::EmptyPrices);
    }
    if let Some((index, &value)) = config
        .prices
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite())
    {
        return Err(QueuePricingError::NonFinitePrice { index, value });
    }

    require_finite_step("mu_dt", config.mu * config.dt)?;
    let max_holding_cost = config.cw * config.capacity as f64 * config.dt;
    require_finite_step("holding_cost_dt", max_holding_cost)?;
    for &price in &config.prices {
        let step_rate = arrival_rate(config.lambda0, config.beta, price) * config.dt;
        require_finite_step("lambda_dt", step_rate)?;
        // Rewards at every state lie between these two.
        require_finite_step("revenue_dt", price * step_rate)?;
        require_finite_step("revenue_dt", price * step_rate - max_holding_cost)?;
    }

    let num_states = config
        .capacity
        .checked_add(1)
        .ok_or(QueuePricingError::CapacityOverflow(config.capacity))?;

    let entries = config
        .prices
        .len()
        .checked_mul(num_states)
        .and_then(|n| n.checked_mul(num_states))
        .unwrap_or(usize::MAX);
    if entries > config.max_tensor_entries {
        return Err(QueuePricingError::TensorTooLarge {
            entries,
            limit: config.max_tensor_entries,
        });
    }

    Ok(num_states)
}

fn require_positive(name: &'static str, value: f64) -> Result<(), QueuePricingError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(QueuePricingError::InvalidParameter {
            name,
            value,
            reason: "must be positive and finite",
        })
    }
}

fn require_non_negative(name: &'static str, value: f64) -> Result<(), QueuePricingError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(QueuePricingError::InvalidParameter {
            name,
            value,
            reason: "must be non-negative and finite",
        })
    }
}

/// Derived per-step quantities must stay finite or rows turn into `inf/inf`.
fn require_finite_step(name: &'static str, value: f64) -> Result<(), QueuePricingError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(QueuePricingError::InvalidParameter {
            name,
            value,
            reason: "overflows over one time step",
        })
    }
}

// ---------------------------------------------------------------------------
// Row construction
// ---------------------------------------------------------------------------

/// Unnormalized birth-death row for `state`, negative entries already
/// clamped to zero. Only `state - 1`, `state`, `state + 1` can be non-zero.
fn raw_transition_row(capacity: usize, state: usize, rate: f64, mu: f64, dt: f64) -> Vec<f64> {
    let p_up = if state < capacity { rate * dt } else { 0.0 };
    let p_down = if state > 0 { mu * dt } else { 0.0 };
    let p_same = 1.0 - (p_up + p_down);

    let mut row = vec![0.0; capacity + 1];
    row[state] = p_same.max(0.0);
    if state < capacity {
        row[state + 1] = p_up.max(0.0);
    }
    if state > 0 {
        row[state - 1] = p_down.max(0.0);
    }
    row
}

/// Scale a row to sum to one; a row with no mass, or an unbounded one,
/// becomes a self-loop.
fn normalize_row(row: Vec<f64>, state: usize) -> Vec<f64> {
    let total: f64 = row.iter().sum();
    if total.is_finite() && total > 0.0 {
        row.into_iter().map(|p| p / total).collect()
    } else {
        debug!(state, "Degenerate transition row, falling back to self-loop");
        let mut fallback = vec![0.0; row.len()];
        fallback[state] = 1.0;
        fallback
    }
}

/// `price · lambda · dt − cw · n · dt`.
fn one_step_reward(price: f64, rate: f64, state: usize, cw: f64, dt: f64) -> f64 {
    price * rate * dt - cw * state as f64 * dt
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
