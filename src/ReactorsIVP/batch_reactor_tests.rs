#[cfg(test)]
mod tests {
    use crate::Kinetics::network::ReactionNetwork;
    use crate::Kinetics::reaction::ReactionRecord;
    use crate::Kinetics::species::{Phase, Species, SpeciesRegistry};
    use crate::ReactorsIVP::BatchReactorIVP::{
        BatchReactorTask, NetworkOde, SimulationConfig, simulate,
    };
    use crate::ReactorsIVP::ode_solver::{OdeSystem, SolverOptions, SolverType};
    use crate::Utils::results_output::ConversionReport;
    use crate::errors::KineticsError;
    use approx::assert_relative_eq;
    use nalgebra::DVector;
    use std::collections::BTreeMap;

    fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(s, v)| (s.to_string(), *v)).collect()
    }

    fn lignin_species() -> Vec<Species> {
        vec![
            Species::new("LIGH", 436.45, Phase::Solid, 1.0),
            Species::new("RLIGM2A", 377.362, Phase::Solid, 0.0),
            Species::new("OH", 17.007, Phase::Gas, 0.0),
            Species::new("C3H6", 42.081, Phase::Gas, 0.0),
        ]
    }

    fn ligh_decomposition() -> ReactionRecord {
        ReactionRecord::new(
            "R1",
            map(&[("LIGH", -1.0), ("RLIGM2A", 1.0), ("OH", 1.0), ("C3H6", 1.0)]),
            map(&[("LIGH", 1.0)]),
            Phase::Solid,
            1e13,
            163254.0,
            false,
        )
    }

    /// X -> Y with k = A (Ea = 0)
    fn first_order_network(k: f64) -> ReactionNetwork {
        let registry = SpeciesRegistry::new(vec![
            Species::new("X", 120.0, Phase::Solid, 1.0),
            Species::new("Y", 120.0, Phase::Gas, 0.0),
        ])
        .unwrap();
        let r = ReactionRecord::new(
            "X_to_Y",
            map(&[("X", -1.0), ("Y", 1.0)]),
            map(&[("X", 1.0)]),
            Phase::Solid,
            k,
            0.0,
            false,
        );
        ReactionNetwork::new(registry, &[r]).unwrap()
    }

    /// Robertson problem written as a reaction network:
    /// A -> B (0.04), B + B -> C + B (3e7), B + C -> A + C (1e4)
    fn robertson_network() -> ReactionNetwork {
        let registry = SpeciesRegistry::new(vec![
            Species::new("A", 1.0, Phase::Gas, 1.0),
            Species::new("B", 1.0, Phase::Gas, 0.0),
            Species::new("C", 1.0, Phase::Gas, 0.0),
        ])
        .unwrap();
        let reactions = [
            ReactionRecord::new(
                "R1",
                map(&[("A", -1.0), ("B", 1.0)]),
                map(&[("A", 1.0)]),
                Phase::Gas,
                0.04,
                0.0,
                false,
            ),
            ReactionRecord::new(
                "R2",
                map(&[("B", -1.0), ("C", 1.0)]),
                map(&[("B", 2.0)]),
                Phase::Gas,
                3e7,
                0.0,
                false,
            ),
            ReactionRecord::new(
                "R3",
                map(&[("B", -1.0), ("A", 1.0)]),
                map(&[("B", 1.0), ("C", 1.0)]),
                Phase::Gas,
                1e4,
                0.0,
                false,
            ),
        ];
        ReactionNetwork::new(registry, &reactions).unwrap()
    }

    #[test]
    fn test_first_order_matches_analytic_solution() {
        let k = 0.5;
        let network = first_order_network(k);
        let c0 = network.registry().initial_state();
        let t_eval: Vec<f64> = (0..=50).map(|i| i as f64 * 0.2).collect();
        let opts = SolverOptions {
            method: SolverType::BDF,
            rtol: 1e-8,
            atol: 1e-12,
            ..SolverOptions::default()
        };
        let (traj, stats) = simulate(&network, &c0, (0.0, 10.0), &t_eval, 300.0, &opts).unwrap();
        assert_eq!(traj.len(), t_eval.len());
        assert_eq!(stats.solver_runs, 50);
        for (i, t) in t_eval.iter().enumerate() {
            let x = (-k * t).exp();
            assert_eq!(traj.time[i], *t);
            assert_relative_eq!(traj.states[(i, 0)], x, max_relative = 1e-5);
            assert_relative_eq!(traj.states[(i, 1)], 1.0 - x, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_lignin_scenario() {
        let config = SimulationConfig::new(473.15, 1e6);
        let mut task = BatchReactorTask::new(lignin_species(), vec![ligh_decomposition()], config);
        task.set_problem_name("LIGH decomposition at 200 C");
        let result = task.solve().unwrap().clone();
        assert!(result.complete);
        assert_eq!(result.len(), 1000);
        assert_eq!(result.time()[0], 0.0);
        assert_eq!(result.time()[999], 1e6);

        let ligh = result.concentration_of("LIGH").unwrap();
        let rligm2a = result.concentration_of("RLIGM2A").unwrap();
        let c3h6 = result.concentration_of("C3H6").unwrap();
        let oh = result.concentration_of("OH").unwrap();
        for i in 1..result.len() {
            assert!(ligh[i] <= ligh[i - 1] + 1e-10, "LIGH must not grow");
            assert!(c3h6[i] >= c3h6[i - 1] - 1e-10, "C3H6 must not fall");
            assert_relative_eq!(ligh[i] + rligm2a[i], 1.0, epsilon = 1e-8);
            assert_relative_eq!(oh[i], c3h6[i], epsilon = 1e-8);
        }
        assert!(c3h6[999] > 0.999);
        assert!(result.mass_balance_drift() < 1e-7);

        // k = A exp(-Ea/RT)
        let k = task.network().unwrap().rate_constants(473.15).unwrap()[0];
        for i in (0..result.len()).step_by(50) {
            let exact = (-k * result.time()[i]).exp();
            assert_relative_eq!(ligh[i], exact, max_relative = 1e-3);
        }

        let report = ConversionReport::from_result(&result, "LIGH", 0.5).unwrap();
        assert_relative_eq!(
            report.time_to_threshold.unwrap(),
            std::f64::consts::LN_2 / k,
            max_relative = 1e-3
        );
        assert_eq!(report.yields.len(), 3);
    }

    #[test]
    fn test_mass_conservation_chain() {
        let registry = SpeciesRegistry::new(vec![
            Species::new("A", 100.0, Phase::Solid, 1.0),
            Species::new("B", 50.0, Phase::Liquid, 0.0),
            Species::new("C", 100.0, Phase::Gas, 0.0),
        ])
        .unwrap();
        let reactions = [
            ReactionRecord::new(
                "A_to_B",
                map(&[("A", -1.0), ("B", 2.0)]),
                map(&[("A", 1.0)]),
                Phase::Solid,
                5e8,
                9e4,
                false,
            ),
            ReactionRecord::new(
                "B_to_C",
                map(&[("B", -2.0), ("C", 1.0)]),
                map(&[("B", 2.0)]),
                Phase::Liquid,
                1e6,
                6e4,
                false,
            ),
        ];
        let network = ReactionNetwork::new(registry, &reactions).unwrap();
        let c0 = network.registry().initial_state();
        let m0 = network.total_mass(&c0);
        let (traj, _) = simulate(
            &network,
            &c0,
            (0.0, 10.0),
            &[],
            650.0,
            &SolverOptions::default(),
        )
        .unwrap();
        assert!(traj.len() > 2);
        for i in 0..traj.len() {
            let m = network.total_mass(&traj.state_at(i));
            assert_relative_eq!(m, m0, max_relative = 1e-7);
        }
    }

    #[test]
    fn test_empty_network_constant_trajectory() {
        let mut task = BatchReactorTask::new(
            lignin_species(),
            Vec::new(),
            SimulationConfig::new(500.0, 100.0),
        );
        let result = task.solve().unwrap();
        let c0 = DVector::from_vec(vec![1.0, 0.0, 0.0, 0.0]);
        for i in 0..result.len() {
            assert_eq!(result.trajectory.state_at(i), c0);
        }
    }

    #[test]
    fn test_unknown_species_fails_before_integration() {
        let mut record = ligh_decomposition();
        record.orders.insert("LIGC".to_string(), 1.0);
        let mut task = BatchReactorTask::new(
            lignin_species(),
            vec![record],
            SimulationConfig::new(473.15, 1e6),
        );
        match task.solve() {
            Err(KineticsError::UnknownSpecies { species, .. }) => assert_eq!(species, "LIGC"),
            other => panic!("expected UnknownSpecies, got {:?}", other),
        }
        assert!(task.result().is_none());
        assert!(task.network().is_none());
    }

    #[test]
    fn test_bad_temperature() {
        let mut task = BatchReactorTask::new(
            lignin_species(),
            vec![ligh_decomposition()],
            SimulationConfig::new(-5.0, 1e6),
        );
        assert!(matches!(task.solve(), Err(KineticsError::Domain(_))));
    }

    #[test]
    fn test_network_ode_equations_match_rhs() {
        let network = robertson_network();
        let system = NetworkOde::new(&network, 300.0).unwrap();
        assert_eq!(system.rate_constants(), &[0.04, 3e7, 1e4]);
        assert_eq!(system.ndim(), 3);
        assert_eq!(system.unknowns(), vec!["C0", "C1", "C2"]);
        let unknowns = system.unknowns();
        let y = [0.9, 3e-5, 0.1];
        let mut dydt = [0.0; 3];
        system.rhs(0.0, &y, &mut dydt);
        for (i, eq) in system.equations().iter().enumerate() {
            let f = eq.clone().lambdify_owned(unknowns.iter().map(|s| s.as_str()).collect());
            assert_relative_eq!(f(y.to_vec()), dydt[i], max_relative = 1e-12);
        }
        // dA/dt = -0.04 A + 1e4 B C
        assert_relative_eq!(dydt[0], -0.04 * 0.9 + 1e4 * 3e-5 * 0.1, max_relative = 1e-14);
    }

    #[test]
    fn test_robertson_stiff() {
        let network = robertson_network();
        let c0 = network.registry().initial_state();
        let t_eval = [0.0, 0.4, 4.0, 40.0];
        let (traj, stats) = simulate(
            &network,
            &c0,
            (0.0, 40.0),
            &t_eval,
            300.0,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_eq!(traj.len(), 4);
        let last = traj.state_at(3);
        assert_relative_eq!(last[0], 0.7158271, max_relative = 1e-3);
        assert_relative_eq!(last[2], 0.2841637, max_relative = 1e-2);
        for i in 0..traj.len() {
            assert_relative_eq!(traj.state_at(i).sum(), 1.0, epsilon = 1e-7);
        }
        assert!(stats.accepted_steps < 50_000, "{:?}", stats);
    }

    #[test]
    fn test_report_when_output_starts_after_t_start() {
        let species = vec![
            Species::new("X", 120.0, Phase::Solid, 1.0),
            Species::new("Y", 120.0, Phase::Gas, 0.0),
        ];
        let reaction = ReactionRecord::new(
            "X_to_Y",
            map(&[("X", -1.0), ("Y", 1.0)]),
            map(&[("X", 1.0)]),
            Phase::Solid,
            1.0,
            0.0,
            false,
        );
        let mut config = SimulationConfig::new(500.0, 3.0);
        config.solver.rtol = 1e-8;
        config.solver.atol = 1e-12;
        let mut task = BatchReactorTask::new(species, vec![reaction], config);
        task.set_time_points(vec![1.0, 2.0, 3.0]);
        let result = task.solve().unwrap().clone();
        assert_eq!(result.time().as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(result.initial_state, DVector::from_vec(vec![1.0, 0.0]));
        assert!(result.mass_balance_drift() < 1e-7);

        let report = ConversionReport::from_result(&result, "X", 0.5).unwrap();
        assert_eq!(report.initial_concentration, 1.0);
        assert_relative_eq!(report.final_conversion, 0.9502, epsilon = 1e-4);
        assert_relative_eq!(report.time_to_threshold.unwrap(), 0.693, epsilon = 1e-3);
        assert_eq!(report.yields.len(), 1);
        assert_eq!(report.yields[0].0, "Y");
        assert_relative_eq!(report.yields[0].1, 0.95, epsilon = 1e-3);
    }

    #[test]
    fn test_failed_solve_clears_previous_result() {
        let mut task = BatchReactorTask::new(
            lignin_species(),
            vec![ligh_decomposition()],
            SimulationConfig::new(473.15, 1e6),
        );
        assert!(task.solve().is_ok());
        assert!(task.result().is_some());
        assert!(task.stats().is_some());
        task.config.temperature = -5.0;
        assert!(matches!(task.solve(), Err(KineticsError::Domain(_))));
        assert!(task.result().is_none());
        assert!(task.stats().is_none());
    }

    #[test]
    fn test_step_budget_keeps_partial_result() {
        let mut config = SimulationConfig::new(473.15, 1e6);
        config.solver.max_steps = 5;
        let mut task = BatchReactorTask::new(lignin_species(), vec![ligh_decomposition()], config);
        let err = task.solve().unwrap_err();
        assert!(matches!(err, KineticsError::Integration(_)));
        let partial = task.result().expect("partial result");
        assert!(!partial.complete);
        assert!(!partial.is_empty());
        assert!(partial.len() < 1000);
        assert_eq!(partial.time()[0], 0.0);
        assert_eq!(partial.species.len(), 4);
    }

    #[test]
    fn test_time_grid() {
        let mut config = SimulationConfig::new(500.0, 10.0);
        config.n_points = 11;
        let grid = config.time_grid();
        assert_eq!(grid.len(), 11);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[10], 10.0);
        config.n_points = 0;
        assert!(config.time_grid().is_empty());
        config.time_points = Some(vec![2.0, 1.0]);
        assert!(matches!(config.validate(), Err(KineticsError::Domain(_))));
    }
}
