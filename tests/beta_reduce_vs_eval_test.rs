// SPDX-License-Identifier: Apache-2.0

//! Checks every reduction mode against the reference evaluator on random
//! DAGs: reduction must not change the value of the root.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use test_case::test_case;
use xlsynth_beta::beta::{BetaReducer, ReductionMode, contains_redex};
use xlsynth_beta::eval::{Evaluator, UfModel};
use xlsynth_beta::node_manager::{NodeManager, NodeManagerOptions};
use xlsynth_beta::test_utils::{random_dag, random_inputs};

const SAMPLES_PER_DAG: usize = 8;

fn check_mode_preserves_values(seed: u64, fold: bool, mode: ReductionMode) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let options = if fold {
        NodeManagerOptions::opt()
    } else {
        NodeManagerOptions::no_opt()
    };
    let mut mgr = NodeManager::new(options);
    let dag = random_dag(&mut mgr, &mut rng, 24, 2);

    let mut reducer = BetaReducer::new();
    let reduced = reducer.reduce(&mut mgr, dag.root, mode).unwrap();
    assert!(reducer.assignments().is_empty());
    if matches!(mode, ReductionMode::Full | ReductionMode::Chains) {
        assert!(!contains_redex(&mgr, reduced), "seed {} mode {}", seed, mode);
    }

    let ufs = UfModel::new(seed);
    for _ in 0..SAMPLES_PER_DAG {
        let inputs = random_inputs(&dag, &mut rng);
        let want = Evaluator::new(&mgr, &inputs, &ufs).eval(dag.root).unwrap();
        let got = Evaluator::new(&mgr, &inputs, &ufs).eval(reduced).unwrap();
        assert_eq!(
            got, want,
            "seed {} mode {} inputs {:?}",
            seed, mode, inputs
        );
    }
}

#[test_case(ReductionMode::Full; "full")]
#[test_case(ReductionMode::Chains; "chains")]
#[test_case(ReductionMode::Cutoff; "cutoff")]
#[test_case(ReductionMode::Bounded(1); "bounded 1")]
#[test_case(ReductionMode::Bounded(2); "bounded 2")]
#[test_case(ReductionMode::Bounded(3); "bounded 3")]
fn test_reduction_preserves_values(mode: ReductionMode) {
    for seed in 0..40 {
        check_mode_preserves_values(seed, true, mode);
        check_mode_preserves_values(seed, false, mode);
    }
}

#[test_case(true; "fold")]
#[test_case(false; "no fold")]
fn test_modes_agree_on_normal_form(fold: bool) {
    for seed in 100..140 {
        let mut rng = Pcg64Mcg::seed_from_u64(seed);
        let options = if fold {
            NodeManagerOptions::opt()
        } else {
            NodeManagerOptions::no_opt()
        };
        let mut mgr = NodeManager::new(options);
        let dag = random_dag(&mut mgr, &mut rng, 24, 3);

        let mut reducer = BetaReducer::new();
        let full = reducer.full_reduce(&mut mgr, dag.root).unwrap();
        let again = reducer.full_reduce(&mut mgr, full).unwrap();
        assert_eq!(again, full, "seed {}: full reduction is not idempotent", seed);

        let chains = reducer.chain_reduce(&mut mgr, dag.root).unwrap();
        assert_eq!(chains, full, "seed {}: chains differs from full", seed);

        let unbounded = reducer.bounded_reduce(&mut mgr, dag.root, 64).unwrap();
        assert_eq!(unbounded, full, "seed {}: generous bound differs from full", seed);

        let floor = reducer.bounded_reduce(&mut mgr, dag.root, 0).unwrap();
        assert_eq!(floor, dag.root);

        let cutoff = reducer.cutoff_reduce(&mut mgr, dag.root).unwrap();
        if cutoff.is_normal_form {
            assert_eq!(cutoff.node, full, "seed {}: normal cutoff differs", seed);
        }
    }
}
