//! Iterative policy evaluation.
//!
//! Solves `V(s) = R(s, π(s)) + γ Σ_s' P(π(s), s, s') V(s')` by synchronous
//! fixed-point sweeps from `V = 0`. Every sweep reads only the previous
//! sweep's full vector, so the result does not depend on state ordering.

use tracing::{debug, warn};

use crate::model::QueuePricingMdp;
use crate::types::{Evaluation, Policy, ValueFunction};

/// One synchronous Bellman backup of `values` under a fixed policy.
///
/// # Panics
///
/// If `policy` or `values` does not cover exactly the model's states, or a
/// policy action is not a valid price index.
pub fn policy_backup(
    mdp: &QueuePricingMdp,
    policy: &Policy,
    values: &ValueFunction,
) -> ValueFunction {
    assert_policy_fits(mdp, policy);
    assert_eq!(
        values.len(),
        mdp.num_states(),
        "value function length does not match state count"
    );
    backup(mdp, policy, values)
}

/// Evaluate `policy` until the max change drops below `tol` or `max_iter`
/// sweeps are spent.
///
/// An exhausted budget still returns the last vector; `converged` on the
/// returned [`Evaluation`] reports which case occurred.
///
/// # Panics
///
/// If `policy` does not have one action per state, or an action is not a
/// valid price index.
pub fn evaluate_policy(
    mdp: &QueuePricingMdp,
    policy: &Policy,
    tol: f64,
    max_iter: usize,
) -> Evaluation {
    assert_policy_fits(mdp, policy);

    let mut values = ValueFunction::zeros(mdp.num_states());
    let mut delta = f64::INFINITY;

    for sweep in 1..=max_iter {
        let next = backup(mdp, policy, &values);
        delta = next.max_abs_diff(&values);

        if delta < tol {
            debug!(sweeps = sweep, delta, "Policy evaluation converged");
            return Evaluation {
                values: next,
                sweeps: sweep,
                converged: true,
                final_delta: delta,
            };
        }
        values = next;
    }

    warn!(
        max_iter,
        delta,
        tol,
        "Policy evaluation hit sweep budget, returning best effort"
    );
    Evaluation {
        values,
        sweeps: max_iter,
        converged: false,
        final_delta: delta,
    }
}

fn backup(mdp: &QueuePricingMdp, policy: &Policy, values: &ValueFunction) -> ValueFunction {
    let gamma = mdp.gamma();
    let transitions = mdp.transitions();
    let rewards = mdp.rewards();

    ValueFunction::new(
        (0..mdp.num_states())
            .map(|state| {
                let action = policy.action(state);
                rewards.get(state, action)
                    + gamma * transitions.expected_value(action, state, values)
            })
            .collect(),
    )
}

fn assert_policy_fits(mdp: &QueuePricingMdp, policy: &Policy) {
    assert_eq!(
        policy.len(),
        mdp.num_states(),
        "policy length does not match state count"
    );
    if let Some((state, &action)) = policy
        .actions()
        .iter()
        .enumerate()
        .find(|&(_, &a)| a >= mdp.num_actions())
    {
        panic!(
            "policy picks action {action} in state {state}, only {} prices exist",
            mdp.num_actions()
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
