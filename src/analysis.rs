//! Post-hoc checks on a solved policy.
//!
//! Verifies that the returned policy is greedy under the returned value
//! function, measures how far the values are from satisfying the policy's
//! Bellman equation, and summarises which prices the policy actually uses.

use serde::{Deserialize, Serialize};

use crate::model::QueuePricingMdp;
use crate::solver::evaluation::policy_backup;
use crate::solver::improvement::action_values;
use crate::types::PolicyIterationOutcome;

/// Default slack when deciding whether a state's action is a Q-maximiser.
pub const DEFAULT_OPTIMALITY_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Quality summary for a solved policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyReport {
    /// `max_s |V(s) − (R + γ P V)(s)|` under the returned policy.
    pub bellman_residual: f64,
    /// `max_s (max_a Q(s,a) − Q(s,π(s)))`. Zero for a greedy policy.
    pub optimality_gap: f64,
    /// States whose chosen action trails the best Q by more than the tolerance.
    pub suboptimal_states: Vec<usize>,
    /// Chosen price per state.
    pub chosen_prices: Vec<f64>,
    /// Distinct chosen prices, ascending.
    pub prices_used: Vec<f64>,
}

impl PolicyReport {
    /// Whether every state picks a Q-maximising action.
    pub fn is_greedy(&self) -> bool {
        self.suboptimal_states.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Check `outcome` against `mdp`.
pub fn analyze(
    mdp: &QueuePricingMdp,
    outcome: &PolicyIterationOutcome,
    tolerance: f64,
) -> PolicyReport {
    let policy = &outcome.policy;
    let values = &outcome.values;

    let bellman_residual = policy_backup(mdp, policy, values).max_abs_diff(values);

    let mut optimality_gap: f64 = 0.0;
    let mut suboptimal_states = Vec::new();
    for state in 0..mdp.num_states() {
        let q = action_values(mdp, values, state);
        let best = q.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut gap = best - q[policy.action(state)];
        if gap.is_nan() {
            gap = f64::INFINITY;
        }
        optimality_gap = optimality_gap.max(gap);
        if gap > tolerance {
            suboptimal_states.push(state);
        }
    }

    let chosen_prices: Vec<f64> = policy.actions().iter().map(|&a| mdp.price(a)).collect();
    let prices_used = distinct_sorted(&chosen_prices);

    PolicyReport {
        bellman_residual,
        optimality_gap,
        suboptimal_states,
        chosen_prices,
        prices_used,
    }
}

fn distinct_sorted(prices: &[f64]) -> Vec<f64> {
    let mut unique = prices.to_vec();
    unique.sort_by(|a, b| a.total_cmp(b));
    unique.dedup();
    unique
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
