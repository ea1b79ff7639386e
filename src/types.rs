//! Shared types for the queue pricing solver.
//!
//! These types form the data model passed between the model builder,
//! the solver, and the reporting side. The dense tensor and matrix are
//! built once and never mutated; policies and value functions are
//! produced fresh on every solver iteration.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Transition tensor
// ---------------------------------------------------------------------------

/// Dense transition tensor `P[a][s][s']`, stored row-major by `(a, s)`.
///
/// Every row is a probability distribution over next states.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTensor {
    num_actions: usize,
    num_states: usize,
    data: Vec<f64>,
}

impl TransitionTensor {
    /// Assemble a tensor from fully built rows, ordered by action then state.
    ///
    /// Each row must have exactly `num_states` entries.
    pub(crate) fn from_rows<I>(num_actions: usize, num_states: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<f64>>,
    {
        let mut data = Vec::with_capacity(num_actions * num_states * num_states);
        for row in rows {
            debug_assert_eq!(row.len(), num_states);
            data.extend(row);
        }
        debug_assert_eq!(data.len(), num_actions * num_states * num_states);
        Self {
            num_actions,
            num_states,
            data,
        }
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Outgoing distribution from state `s` under action `a`.
    pub fn row(&self, action: usize, state: usize) -> &[f64] {
        let start = (action * self.num_states + state) * self.num_states;
        &self.data[start..start + self.num_states]
    }

    /// Single entry `P[a][s][s']`.
    pub fn get(&self, action: usize, state: usize, next_state: usize) -> f64 {
        self.row(action, state)[next_state]
    }

    /// Expected next-step value `Σ_s' P[a][s][s'] · V(s')`.
    pub fn expected_value(&self, action: usize, state: usize, values: &ValueFunction) -> f64 {
        self.row(action, state)
            .iter()
            .zip(values.as_slice())
            .map(|(p, v)| p * v)
            .sum()
    }

    /// Number of stored probabilities (`A·S·S`).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Heap footprint of the stored probabilities.
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * std::mem::size_of::<f64>()
    }
}

// ---------------------------------------------------------------------------
// Reward matrix
// ---------------------------------------------------------------------------

/// Dense one-step reward matrix `R[s][a]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RewardMatrix {
    num_states: usize,
    num_actions: usize,
    data: Vec<f64>,
}

impl RewardMatrix {
    /// Assemble from per-state rows, each holding one reward per action.
    pub(crate) fn from_rows<I>(num_states: usize, num_actions: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = Vec<f64>>,
    {
        let mut data = Vec::with_capacity(num_states * num_actions);
        for row in rows {
            debug_assert_eq!(row.len(), num_actions);
            data.extend(row);
        }
        debug_assert_eq!(data.len(), num_states * num_actions);
        Self {
            num_states,
            num_actions,
            data,
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Rewards for every action at state `s`.
    pub fn row(&self, state: usize) -> &[f64] {
        let start = state * self.num_actions;
        &self.data[start..start + self.num_actions]
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.row(state)[action]
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Total mapping from state to action index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy(Vec<usize>);

impl Policy {
    pub fn new(actions: Vec<usize>) -> Self {
        Self(actions)
    }

    /// Same action in every state.
    pub fn uniform(num_states: usize, action: usize) -> Self {
        Self(vec![action; num_states])
    }

    pub fn action(&self, state: usize) -> usize {
        self.0[state]
    }

    pub fn actions(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of states whose action differs from `other`.
    pub fn changed_states(&self, other: &Policy) -> usize {
        debug_assert_eq!(self.len(), other.len());
        self.0
            .iter()
            .zip(&other.0)
            .filter(|(a, b)| a != b)
            .count()
    }
}

// ---------------------------------------------------------------------------
// Value function
// ---------------------------------------------------------------------------

/// Expected discounted reward per state under some fixed policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFunction(Vec<f64>);

impl ValueFunction {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn zeros(num_states: usize) -> Self {
        Self(vec![0.0; num_states])
    }

    pub fn get(&self, state: usize) -> f64 {
        self.0[state]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sup-norm distance `max_s |self(s) - other(s)|`.
    ///
    /// Any NaN or infinite entry makes the distance infinite, so a blown-up
    /// vector never looks converged.
    pub fn max_abs_diff(&self, other: &ValueFunction) -> f64 {
        debug_assert_eq!(self.len(), other.len());
        self.0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| {
                let diff = (a - b).abs();
                if diff.is_nan() { f64::INFINITY } else { diff }
            })
            .fold(0.0, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Solver diagnostics
// ---------------------------------------------------------------------------

/// Result of evaluating a single policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub values: ValueFunction,
    /// Number of synchronous sweeps performed.
    pub sweeps: usize,
    /// Whether the max change dropped below the tolerance.
    pub converged: bool,
    /// Max absolute change observed on the last sweep.
    pub final_delta: f64,
}

/// One outer policy-iteration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based outer iteration index.
    pub iteration: usize,
    /// States whose chosen action changed during improvement.
    pub changed_states: usize,
    pub evaluation_sweeps: usize,
    pub evaluation_converged: bool,
}

/// How the outer loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceStatus {
    /// Improvement changed no state.
    Stable,
    /// `max_outer` reached while the policy was still changing.
    OuterBudgetExhausted,
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceStatus::Stable => write!(f, "stable"),
            ConvergenceStatus::OuterBudgetExhausted => write!(f, "outer budget exhausted"),
        }
    }
}

/// Final output of policy iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyIterationOutcome {
    pub policy: Policy,
    pub values: ValueFunction,
    pub history: Vec<IterationRecord>,
    pub status: ConvergenceStatus,
}

impl PolicyIterationOutcome {
    pub fn is_stable(&self) -> bool {
        self.status == ConvergenceStatus::Stable
    }

    pub fn iterations(&self) -> usize {
        self.history.len()
    }

    /// Whether every policy evaluation along the way met its tolerance.
    pub fn evaluations_converged(&self) -> bool {
        self.history.iter().all(|r| r.evaluation_converged)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Invalid configuration rejected before any model is built.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueuePricingError {
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Price sequence is empty")]
    EmptyPrices,

    #[error("Price level {index} is not finite: {value}")]
    NonFinitePrice { index: usize, value: f64 },

    #[error("Discount factor must lie in [0, 1), got {0}")]
    DiscountOutOfRange(f64),

    #[error("Capacity {0} overflows the state space")]
    CapacityOverflow(usize),

    #[error("Transition tensor needs {entries} entries, limit is {limit}")]
    TensorTooLarge { entries: usize, limit: usize },

    #[error("Invalid solver setting: {0}")]
    InvalidSolver(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
