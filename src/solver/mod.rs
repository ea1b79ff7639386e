//! Policy iteration — evaluation, greedy improvement, and the outer loop
//! alternating them until the policy stops changing.

pub mod evaluation;
pub mod improvement;

use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::model::QueuePricingMdp;
use crate::types::{
    ConvergenceStatus, IterationRecord, Policy, PolicyIterationOutcome, QueuePricingError,
    ValueFunction,
};
use evaluation::evaluate_policy;
use improvement::improve_policy;

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Alternates policy evaluation and greedy improvement.
///
/// Starts from the lowest-indexed action in every state. Each outer
/// iteration appends an [`IterationRecord`]; the loop ends as soon as an
/// improvement changes no state, or when `max_outer` is reached.
#[derive(Debug, Clone)]
pub struct PolicyIteration {
    config: SolverConfig,
}

impl PolicyIteration {
    /// Validate solver tuning up front.
    pub fn new(config: SolverConfig) -> Result<Self, QueuePricingError> {
        if !(config.tol.is_finite() && config.tol > 0.0) {
            return Err(QueuePricingError::InvalidSolver(format!(
                "tol must be positive and finite, got {}",
                config.tol
            )));
        }
        if config.max_iter == 0 {
            return Err(QueuePricingError::InvalidSolver(
                "max_iter must be at least 1".into(),
            ));
        }
        if config.max_outer == 0 {
            return Err(QueuePricingError::InvalidSolver(
                "max_outer must be at least 1".into(),
            ));
        }
        Ok(Self { config })
    }

    /// Access the solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Run policy iteration to stability or budget exhaustion.
    ///
    /// Never fails: an exhausted outer budget returns the last improved
    /// policy, the value function of the policy evaluated before it, and the
    /// full history, with status [`ConvergenceStatus::OuterBudgetExhausted`].
    pub fn solve(&self, mdp: &QueuePricingMdp) -> PolicyIterationOutcome {
        let num_states = mdp.num_states();
        let mut policy = Policy::uniform(num_states, 0);
        let mut values = ValueFunction::zeros(num_states);
        let mut history = Vec::new();

        info!(
            states = num_states,
            actions = mdp.num_actions(),
            gamma = mdp.gamma(),
            tol = self.config.tol,
            max_outer = self.config.max_outer,
            "Starting policy iteration"
        );

        for iteration in 1..=self.config.max_outer {
            let evaluation = evaluate_policy(mdp, &policy, self.config.tol, self.config.max_iter);
            let improved = improve_policy(mdp, &evaluation.values);
            let changed_states = improved.changed_states(&policy);

            history.push(IterationRecord {
                iteration,
                changed_states,
                evaluation_sweeps: evaluation.sweeps,
                evaluation_converged: evaluation.converged,
            });
            info!(
                iteration,
                changed_states,
                sweeps = evaluation.sweeps,
                "Policy iteration step"
            );
            values = evaluation.values;

            if changed_states == 0 {
                info!(iterations = iteration, "Policy stable");
                return PolicyIterationOutcome {
                    policy,
                    values,
                    history,
                    status: ConvergenceStatus::Stable,
                };
            }

            debug!(iteration, policy = ?improved.actions(), "Policy improved");
            policy = improved;
        }

        warn!(
            max_outer = self.config.max_outer,
            "Policy iteration hit outer budget, returning last policy"
        );
        PolicyIterationOutcome {
            policy,
            values,
            history,
            status: ConvergenceStatus::OuterBudgetExhausted,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
