//! Greedy policy improvement.

use crate::model::QueuePricingMdp;
use crate::types::{Policy, ValueFunction};

/// `Q(s, a) = R(s, a) + γ Σ_s' P(a, s, s') V(s')` for every action at `state`.
pub fn action_values(mdp: &QueuePricingMdp, values: &ValueFunction, state: usize) -> Vec<f64> {
    let gamma = mdp.gamma();
    let transitions = mdp.transitions();
    mdp.rewards()
        .row(state)
        .iter()
        .enumerate()
        .map(|(action, reward)| reward + gamma * transitions.expected_value(action, state, values))
        .collect()
}

/// Index of the largest Q-value. Ties go to the lowest index.
pub fn greedy_action(q_values: &[f64]) -> usize {
    let mut best = 0;
    for (action, &q) in q_values.iter().enumerate().skip(1) {
        if q > q_values[best] {
            best = action;
        }
    }
    best
}

/// Greedy policy with respect to `values`.
pub fn improve_policy(mdp: &QueuePricingMdp, values: &ValueFunction) -> Policy {
    Policy::new(
        (0..mdp.num_states())
            .map(|state| greedy_action(&action_values(mdp, values, state)))
            .collect(),
    )
}
