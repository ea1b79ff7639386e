//! Queue pricing solver.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! builds the queue MDP, runs policy iteration, saves the result tables
//! and prints a console summary.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use queue_pricing::analysis::{self, PolicyReport, DEFAULT_OPTIMALITY_TOLERANCE};
use queue_pricing::config::AppConfig;
use queue_pricing::model::QueuePricingMdp;
use queue_pricing::solver::PolicyIteration;
use queue_pricing::storage::{self, RunSummary, SUMMARY_FILE};
use queue_pricing::types::PolicyIterationOutcome;

fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = AppConfig::resolve_path();
    let cfg = AppConfig::load(&config_path)?;

    init_logging();

    info!(
        config = %config_path,
        capacity = cfg.model.capacity,
        actions = cfg.model.prices.len(),
        gamma = cfg.model.gamma,
        "Queue pricing solver starting"
    );

    let mdp = QueuePricingMdp::build(&cfg.model).context("Invalid model configuration")?;
    let solver = PolicyIteration::new(cfg.solver.clone()).context("Invalid solver configuration")?;

    let outcome = solver.solve(&mdp);
    let report = analysis::analyze(&mdp, &outcome, DEFAULT_OPTIMALITY_TOLERANCE);
    if !report.is_greedy() {
        warn!(
            gap = report.optimality_gap,
            states = ?report.suboptimal_states,
            "Returned policy is not greedy under its value function"
        );
    }

    // -- Persist ---------------------------------------------------------

    let out_dir = Path::new(&cfg.output.dir);
    storage::save_results(out_dir, &mdp, &outcome)?;
    let summary = RunSummary::new(&mdp, solver.config(), &outcome, report.clone());
    storage::save_summary(&summary, &out_dir.join(SUMMARY_FILE))?;

    print_summary(&outcome, &report, cfg.output.preview_states);

    info!(
        run_id = %summary.run_id,
        iterations = outcome.iterations(),
        status = %outcome.status,
        residual = report.bellman_residual,
        "Queue pricing solver finished"
    );

    Ok(())
}

/// Human-readable console summary.
fn print_summary(outcome: &PolicyIterationOutcome, report: &PolicyReport, preview_states: usize) {
    println!("Policy Iteration finished.");
    println!("Iterations: {}", outcome.iterations());
    println!("Status: {}", outcome.status);
    if !outcome.evaluations_converged() {
        println!("Warning: at least one policy evaluation hit its sweep budget.");
    }

    let shown = preview_states.min(report.chosen_prices.len());
    println!("First {shown} states policy (n -> price):");
    println!("{:>8} {:>13}", "state_n", "action_price");
    for (state, price) in report.chosen_prices.iter().take(shown).enumerate() {
        println!("{state:>8} {price:>13}");
    }

    println!();
    println!("Unique prices used: {:?}", report.prices_used);
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("queue_pricing=info"));

    let json_logging = std::env::var("QUEUE_PRICING_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
