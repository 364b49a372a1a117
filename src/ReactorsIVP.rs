/// Adapter to the RustedSciThe ODE solvers (BDF, Radau, backward Euler, RK45). Any system
/// implementing `OdeSystem` can be integrated; output is produced exactly at the requested
/// time points.
///
///  # Examples
/// ```
/// use LigPyro::ReactorsIVP::ode_solver::{integrate, OdeSystem, SolverOptions};
/// use RustedSciThe::symbolic::symbolic_engine::Expr;
/// use nalgebra::DVector;
/// struct Decay;
/// impl OdeSystem for Decay {
///     fn ndim(&self) -> usize { 1 }
///     fn unknowns(&self) -> Vec<String> { vec!["y".to_string()] }
///     fn equations(&self) -> Vec<Expr> { vec![Expr::Const(-1.0) * Expr::Var("y".to_string())] }
///     fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) { dydt[0] = -y[0]; }
/// }
/// let (traj, _stats) = integrate(
///     &Decay,
///     &DVector::from_vec(vec![1.0]),
///     (0.0, 1.0),
///     &[0.0, 0.5, 1.0],
///     &SolverOptions::default(),
/// )
/// .unwrap();
/// assert!((traj.states[(2, 0)] - (-1.0_f64).exp()).abs() < 1e-4);
/// ```
pub mod ode_solver;
/// Isothermal batch reactor: binds a reaction network to the solver, holds the settings of a run
/// and the whole workflow from species and reactions to the concentration trajectory
pub mod BatchReactorIVP;
/// JSON task file for the batch reactor
pub mod task_parser_batch_IVP;
mod batch_reactor_tests;
