//! Property-based tests for model construction and the solver.

use proptest::prelude::*;

use queue_pricing::analysis::{analyze, DEFAULT_OPTIMALITY_TOLERANCE};
use queue_pricing::config::{ModelConfig, SolverConfig};
use queue_pricing::model::{arrival_rate, QueuePricingMdp};
use queue_pricing::solver::PolicyIteration;

/// Strategy: a valid model configuration with a small state space.
fn model_strategy() -> impl Strategy<Value = ModelConfig> {
    (
        0usize..12,
        prop::collection::vec(0.0f64..10.0, 1..5),
        0.1f64..10.0,
        0.0f64..2.0,
        0.1f64..10.0,
        0.0f64..2.0,
        0.001f64..3.0,
        0.0f64..0.95,
    )
        .prop_map(|(capacity, prices, lambda0, beta, mu, cw, dt, gamma)| ModelConfig {
            capacity,
            prices,
            lambda0,
            beta,
            mu,
            cw,
            dt,
            gamma,
            ..ModelConfig::default()
        })
}

proptest! {
    // 1. Every row is a probability distribution
    #[test]
    fn rows_are_distributions(model in model_strategy()) {
        let mdp = QueuePricingMdp::build(&model).unwrap();
        let p = mdp.transitions();
        for a in 0..mdp.num_actions() {
            for s in 0..mdp.num_states() {
                let row = p.row(a, s);
                prop_assert_eq!(row.len(), model.capacity + 1);
                prop_assert!(row.iter().all(|&x| x >= 0.0), "negative entry in {row:?}");
                let sum: f64 = row.iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-9, "row sum {sum}");
            }
        }
    }

    // 2. Mass only moves to neighbouring states
    #[test]
    fn birth_death_structure(model in model_strategy()) {
        let mdp = QueuePricingMdp::build(&model).unwrap();
        let p = mdp.transitions();
        for a in 0..mdp.num_actions() {
            for s in 0..mdp.num_states() {
                for (next, &prob) in p.row(a, s).iter().enumerate() {
                    if next + 1 < s || next > s + 1 {
                        prop_assert_eq!(prob, 0.0);
                    }
                }
            }
        }
    }

    // 3. Higher price never raises arrivals, strictly lowers them when beta > 0
    #[test]
    fn rate_monotone_in_price(
        lambda0 in 0.1f64..10.0,
        beta in 0.01f64..2.0,
        low in 0.0f64..5.0,
        step in 0.01f64..5.0,
    ) {
        prop_assert!(arrival_rate(lambda0, beta, low + step) < arrival_rate(lambda0, beta, low));
        prop_assert_eq!(arrival_rate(lambda0, 0.0, low + step), arrival_rate(lambda0, 0.0, low));
    }

    // 4. Rewards follow price·lambda·dt − cw·n·dt
    #[test]
    fn rewards_match_formula(model in model_strategy()) {
        let mdp = QueuePricingMdp::build(&model).unwrap();
        for s in 0..mdp.num_states() {
            for a in 0..mdp.num_actions() {
                let expected = model.prices[a] * mdp.arrival_rate(a) * model.dt
                    - model.cw * s as f64 * model.dt;
                prop_assert!((mdp.rewards().get(s, a) - expected).abs() < 1e-12);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // 5. A stable outcome ends with zero changes and is greedy
    #[test]
    fn stable_outcome_is_greedy(model in model_strategy()) {
        let mdp = QueuePricingMdp::build(&model).unwrap();
        let outcome = PolicyIteration::new(SolverConfig::default()).unwrap().solve(&mdp);
        prop_assert!(!outcome.history.is_empty());
        if outcome.is_stable() {
            prop_assert_eq!(outcome.history.last().unwrap().changed_states, 0);
            let report = analyze(&mdp, &outcome, DEFAULT_OPTIMALITY_TOLERANCE);
            prop_assert!(report.is_greedy(), "suboptimal: {:?}", report.suboptimal_states);
        }
    }
}
