use proptest::prelude::*;

use vortex_core::{
    Decision, EquationParams, EquationSpec, FieldSolver, GridConfig, Refutator, SimMetrics,
};

fn grid_strategy() -> impl Strategy<Value = GridConfig> {
    (3usize..12, 3usize..12, 0.2f64..3.0, 0.2f64..3.0, 1e-5f64..1e-2, 1usize..40)
        .prop_map(|(nx, ny, lx, ly, dt, n_steps)| {
            GridConfig::new(nx, ny, lx, ly, dt, n_steps).unwrap()
        })
}

fn params_strategy() -> impl Strategy<Value = EquationParams> {
    (-1.0f64..5.0, -1000.0f64..1000.0, -10.0f64..10.0, -5.0f64..5.0)
        .prop_map(|(d, omega, s, g)| EquationParams::new(d, omega, s, g))
}

fn metrics_strategy() -> impl Strategy<Value = SimMetrics> {
    (any::<bool>(), 0.0f64..1.0, 0.0f64..1.0, 0.0f64..0.1, 0.0f64..1.0).prop_map(
        |(stable, mass_drift, energy_drift, mass_variance, cfl_number)| SimMetrics {
            stable,
            mass_drift,
            energy_drift,
            mass_variance,
            max_value: 1.0,
            cfl_number,
            n_steps_completed: 1,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, .. ProptestConfig::default()
    })]

    #[test]
    fn solver_never_exceeds_step_budget(grid in grid_strategy(), params in params_strategy()) {
        let out = FieldSolver::new(grid, params).unwrap().run();
        let m = out.metrics;
        prop_assert!(m.n_steps_completed >= 1);
        prop_assert!(m.n_steps_completed <= grid.n_steps);
        if m.stable {
            prop_assert_eq!(m.n_steps_completed, grid.n_steps);
        }
        prop_assert!(m.max_value.is_finite() && m.max_value >= 0.0);
    }

    #[test]
    fn zero_coefficients_are_exactly_invariant(grid in grid_strategy()) {
        let solver = FieldSolver::new(grid, EquationParams::new(0.0, 0.0, 0.0, 0.0)).unwrap();
        let initial = solver.field().clone();
        let out = solver.run();
        prop_assert_eq!(&out.field, &initial);
        prop_assert_eq!(out.metrics.mass_drift, 0.0);
        prop_assert_eq!(out.metrics.energy_drift, 0.0);
    }

    #[test]
    fn score_is_bounded_and_instability_rejects(
        params in params_strategy(),
        metrics in metrics_strategy()
    ) {
        let e = Refutator::default().evaluate(&EquationSpec::initial(params), &metrics);
        prop_assert!((0.0..=1.0).contains(&e.score));
        if !metrics.stable {
            prop_assert_eq!(e.decision, Decision::Reject);
        }
        if e.decision == Decision::Revise {
            prop_assert!(!e.suggestions.is_empty());
        }
    }

    #[test]
    fn extra_violation_never_raises_score(
        params in params_strategy(),
        metrics in metrics_strategy(),
        rule in 0usize..7
    ) {
        let refutator = Refutator::default();
        let base = refutator.evaluate(&EquationSpec::initial(params), &metrics);

        let mut worse_params = params;
        let mut worse = metrics;
        match rule {
            0 => worse.stable = false,
            1 => worse.mass_drift = 10.0,
            2 => worse.energy_drift = 10.0,
            3 => worse.mass_variance = 10.0,
            4 => worse.cfl_number = 10.0,
            5 => worse_params.diffusion = -1.0,
            _ => worse_params.omega = 1e6,
        }
        let after = refutator.evaluate(&EquationSpec::initial(worse_params), &worse);
        prop_assert!(after.score <= base.score);
        prop_assert!(after.critiques.len() >= base.critiques.len());
    }
}
