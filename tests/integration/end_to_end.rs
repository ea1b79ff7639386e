//! Full pipeline: config → model → policy iteration → analysis → storage.

use std::fs;
use std::path::PathBuf;

use queue_pricing::analysis::{analyze, DEFAULT_OPTIMALITY_TOLERANCE};
use queue_pricing::config::{AppConfig, ModelConfig, SolverConfig};
use queue_pricing::model::QueuePricingMdp;
use queue_pricing::solver::evaluation::evaluate_policy;
use queue_pricing::solver::improvement::improve_policy;
use queue_pricing::solver::PolicyIteration;
use queue_pricing::storage::{self, RunSummary, SUMMARY_FILE};
use queue_pricing::types::{ConvergenceStatus, PolicyIterationOutcome};

fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("queue_pricing_it_{}", uuid::Uuid::new_v4()))
}

fn solve(model: &ModelConfig) -> (QueuePricingMdp, PolicyIterationOutcome) {
    let mdp = QueuePricingMdp::build(model).unwrap();
    let outcome = PolicyIteration::new(SolverConfig::default()).unwrap().solve(&mdp);
    (mdp, outcome)
}

#[test]
fn test_default_experiment_reaches_stable_greedy_policy() {
    let (mdp, outcome) = solve(&ModelConfig::default());

    assert_eq!(outcome.status, ConvergenceStatus::Stable);
    assert_eq!(outcome.history.last().unwrap().changed_states, 0);
    assert!(outcome.evaluations_converged());
    assert_eq!(outcome.policy.len(), 31);
    assert!(outcome.values.as_slice().iter().all(|v| v.is_finite()));

    let report = analyze(&mdp, &outcome, DEFAULT_OPTIMALITY_TOLERANCE);
    assert!(report.is_greedy(), "suboptimal states: {:?}", report.suboptimal_states);
    assert!(report.bellman_residual < 1e-7);
    assert!(report
        .prices_used
        .iter()
        .all(|p| mdp.prices().contains(p)));
}

#[test]
fn test_improvement_is_idempotent_at_solution() {
    let (mdp, outcome) = solve(&ModelConfig::default());
    let again = improve_policy(&mdp, &outcome.values);
    assert_eq!(again, outcome.policy);

    let reevaluated = evaluate_policy(&mdp, &outcome.policy, 1e-10, 100_000);
    assert_eq!(improve_policy(&mdp, &reevaluated.values), outcome.policy);
}

#[test]
fn test_solve_is_deterministic() {
    let (_, a) = solve(&ModelConfig::default());
    let (_, b) = solve(&ModelConfig::default());
    assert_eq!(a, b);
}

#[test]
fn test_history_counts_are_consistent() {
    let (_, outcome) = solve(&ModelConfig::default());
    for (i, record) in outcome.history.iter().enumerate() {
        assert_eq!(record.iteration, i + 1);
        assert!(record.changed_states <= 31);
    }
    // Only the final record may report zero changes.
    let n = outcome.history.len();
    assert!(outcome.history[..n - 1].iter().all(|r| r.changed_states > 0));
}

#[test]
fn test_oversized_dt_still_solves() {
    let model = ModelConfig {
        capacity: 8,
        dt: 1.5,
        ..ModelConfig::default()
    };
    let (mdp, outcome) = solve(&model);
    for a in 0..mdp.num_actions() {
        for s in 0..mdp.num_states() {
            let row = mdp.transitions().row(a, s);
            assert!(row.iter().all(|&p| p >= 0.0));
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
    assert!(outcome.is_stable());
}

#[test]
fn test_heavy_holding_cost_never_raises_value() {
    let cheap = ModelConfig {
        capacity: 10,
        cw: 0.0,
        ..ModelConfig::default()
    };
    let costly = ModelConfig {
        cw: 5.0,
        ..cheap.clone()
    };
    let (_, low_cost) = solve(&cheap);
    let (_, high_cost) = solve(&costly);
    for s in 0..11 {
        assert!(high_cost.values.get(s) <= low_cost.values.get(s) + 1e-6);
    }
}

#[test]
fn test_config_to_files_pipeline() {
    let dir = temp_dir();
    let text = format!(
        r#"
        [model]
        capacity = 5
        prices = [1.0, 2.0, 3.0]
        lambda0 = 4.0
        beta = 0.3
        mu = 3.0
        cw = 0.5
        dt = 0.05
        gamma = 0.95

        [output]
        dir = "{}"
        "#,
        dir.display()
    );
    let cfg = AppConfig::from_toml_str(&text).unwrap();
    let mdp = QueuePricingMdp::build(&cfg.model).unwrap();
    let solver = PolicyIteration::new(cfg.solver.clone()).unwrap();
    let outcome = solver.solve(&mdp);
    let report = analyze(&mdp, &outcome, DEFAULT_OPTIMALITY_TOLERANCE);

    let out_dir = PathBuf::from(&cfg.output.dir);
    let paths = storage::save_results(&out_dir, &mdp, &outcome).unwrap();
    let summary = RunSummary::new(&mdp, solver.config(), &outcome, report);
    storage::save_summary(&summary, &out_dir.join(SUMMARY_FILE)).unwrap();

    assert_eq!(fs::read_to_string(&paths.policy_table).unwrap().lines().count(), 7);
    assert_eq!(fs::read_to_string(&paths.value_table).unwrap().lines().count(), 7);
    assert_eq!(
        fs::read_to_string(&paths.history).unwrap().lines().count(),
        outcome.iterations() + 1
    );

    let loaded = storage::load_summary(&out_dir.join(SUMMARY_FILE)).unwrap().unwrap();
    assert_eq!(loaded.run_id, summary.run_id);
    assert_eq!(loaded.iterations, outcome.iterations());
    assert!(loaded.report.is_greedy());

    fs::remove_dir_all(&dir).unwrap();
}
