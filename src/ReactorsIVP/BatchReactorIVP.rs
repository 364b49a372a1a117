//! # Isothermal batch reactor
//!
//! Closed vessel, constant temperature, no transport: the state is the vector of species
//! concentrations and its evolution is dC/dt = Σ_j ν_ij * rate_j(C, T).
//!
//! ## Main Structures
//! - **`NetworkOde`**: binds a `ReactionNetwork` at fixed temperature to the `OdeSystem` trait.
//!   Rate constants are computed once per run and enter the symbolic right-hand sides as numbers
//! - **`SimulationConfig`**: time span, output grid, temperature and solver options
//! - **`BatchReactorTask`**: the whole workflow: species and reactions -> network -> solution
//!
//! ## Example
//! ```rust, ignore
//! let mut task = BatchReactorTask::new(species, reactions, SimulationConfig::new(473.15, 1e6));
//! task.solve()?;
//! task.result().unwrap().pretty_print(100);
//! ```
use crate::Kinetics::arrhenius::{GasConstant, check_temperature};
use crate::Kinetics::network::ReactionNetwork;
use crate::Kinetics::reaction::ReactionRecord;
use crate::Kinetics::species::{Species, SpeciesRegistry};
use crate::ReactorsIVP::ode_solver::{OdeSystem, SolverOptions, SolverStats, Trajectory, integrate};
use crate::Utils::results_output::SimulationResult;
use crate::errors::KineticsError;
use log::{info, warn};
use RustedSciThe::symbolic::symbolic_engine::Expr;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Reaction network frozen at one temperature
pub struct NetworkOde<'a> {
    network: &'a ReactionNetwork,
    /// k_j(T) in reaction order
    k: Vec<f64>,
    T: f64,
}

impl<'a> NetworkOde<'a> {
    pub fn new(network: &'a ReactionNetwork, T: f64) -> Result<Self, KineticsError> {
        let k = network.rate_constants(T)?;
        Ok(Self { network, k, T })
    }

    pub fn rate_constants(&self) -> &[f64] {
        &self.k
    }

    pub fn temperature(&self) -> f64 {
        self.T
    }
}

impl OdeSystem for NetworkOde<'_> {
    fn ndim(&self) -> usize {
        self.network.n_species()
    }

    fn unknowns(&self) -> Vec<String> {
        self.network.unknowns()
    }

    fn equations(&self) -> Vec<Expr> {
        self.network.symbolic_derivatives(&self.k)
    }

    fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
        self.network.derivatives_into(&self.k, y, dydt);
    }
}

/// Integrates the network from `c0` over `t_span` at constant temperature `T`.
///
/// # Arguments
/// * `t_eval` - output times; empty slice means every accepted step
///
/// # Returns
/// * `Err(KineticsError::Domain)` - bad temperature, span, time points or options
/// * `Err(KineticsError::Integration)` - the solver gave up; the partial trajectory is inside
pub fn simulate(
    network: &ReactionNetwork,
    c0: &DVector<f64>,
    t_span: (f64, f64),
    t_eval: &[f64],
    T: f64,
    opts: &SolverOptions,
) -> Result<(Trajectory, SolverStats), KineticsError> {
    let system = NetworkOde::new(network, T)?;
    let (trajectory, stats) = integrate(&system, c0, t_span, t_eval, opts)?;
    info!(
        "{:?}: {} steps in {} solver runs",
        opts.method, stats.accepted_steps, stats.solver_runs
    );
    Ok((trajectory, stats))
}

/// Time span, output grid, temperature and solver settings of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub t_start: f64,
    pub t_end: f64,
    /// uniform grid size used when `time_points` is None; 0 means every solver step
    pub n_points: usize,
    /// explicit output times
    pub time_points: Option<Vec<f64>>,
    /// [K]
    pub temperature: f64,
    pub solver: SolverOptions,
}

impl SimulationConfig {
    pub fn new(temperature: f64, t_end: f64) -> Self {
        Self {
            t_start: 0.0,
            t_end,
            n_points: 1000,
            time_points: None,
            temperature,
            solver: SolverOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<(), KineticsError> {
        check_temperature(self.temperature)?;
        if !self.t_start.is_finite() || !self.t_end.is_finite() || self.t_end < self.t_start {
            return Err(KineticsError::Domain(format!(
                "time span must be finite with t_end >= t_start, got ({}, {})",
                self.t_start, self.t_end
            )));
        }
        if let Some(points) = &self.time_points {
            for (i, t) in points.iter().enumerate() {
                if !t.is_finite() || *t < self.t_start || *t > self.t_end {
                    return Err(KineticsError::Domain(format!(
                        "time point #{} = {} is outside of [{}, {}]",
                        i, t, self.t_start, self.t_end
                    )));
                }
                if i > 0 && *t < points[i - 1] {
                    return Err(KineticsError::Domain(
                        "time points must be non-decreasing".into(),
                    ));
                }
            }
        }
        self.solver.validate()
    }

    /// Output times: explicit points if given, otherwise a uniform grid of `n_points`
    /// from t_start to t_end (both included). Empty for `n_points == 0`.
    pub fn time_grid(&self) -> Vec<f64> {
        if let Some(points) = &self.time_points {
            return points.clone();
        }
        match self.n_points {
            0 => Vec::new(),
            1 => vec![self.t_end],
            n => {
                let dt = (self.t_end - self.t_start) / (n - 1) as f64;
                let mut grid: Vec<f64> = (0..n).map(|i| self.t_start + i as f64 * dt).collect();
                grid[n - 1] = self.t_end;
                grid
            }
        }
    }
}

/// Batch reactor problem: species and reactions as loaded, settings of the run, the network
/// built from them and the result.
#[derive(Debug, Clone)]
pub struct BatchReactorTask {
    pub problem_name: Option<String>,
    pub problem_description: Option<String>,
    species: Vec<Species>,
    reactions: Vec<ReactionRecord>,
    pub config: SimulationConfig,
    gas_constant: GasConstant,
    /// built by `setup()`
    network: Option<ReactionNetwork>,
    result: Option<SimulationResult>,
    stats: Option<SolverStats>,
}

impl BatchReactorTask {
    pub fn new(
        species: Vec<Species>,
        reactions: Vec<ReactionRecord>,
        config: SimulationConfig,
    ) -> Self {
        Self {
            problem_name: None,
            problem_description: None,
            species,
            reactions,
            config,
            gas_constant: GasConstant::default(),
            network: None,
            result: None,
            stats: None,
        }
    }

    pub fn set_problem_name(&mut self, name: &str) {
        self.problem_name = Some(name.to_string());
    }

    pub fn set_gas_constant(&mut self, r: f64) -> Result<(), KineticsError> {
        self.gas_constant = GasConstant::new(r)?;
        self.network = None;
        Ok(())
    }

    pub fn set_solver_options(&mut self, opts: SolverOptions) {
        self.config.solver = opts;
    }

    pub fn set_time_points(&mut self, points: Vec<f64>) {
        self.config.time_points = Some(points);
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn reactions(&self) -> &[ReactionRecord] {
        &self.reactions
    }

    pub fn network(&self) -> Option<&ReactionNetwork> {
        self.network.as_ref()
    }

    /// last result; after a solver failure this is the partial result with `complete == false`
    pub fn result(&self) -> Option<&SimulationResult> {
        self.result.as_ref()
    }

    pub fn stats(&self) -> Option<&SolverStats> {
        self.stats.as_ref()
    }

    /// validates the settings of the run
    pub fn check_task(&self) -> Result<(), KineticsError> {
        if self.species.is_empty() {
            warn!("no species given, the trajectory will be empty");
        }
        if self.reactions.is_empty() {
            warn!("no reactions given, concentrations will stay constant");
        }
        self.config.validate()
    }

    /// builds the species registry and resolves all reactions against it
    pub fn setup(&mut self) -> Result<(), KineticsError> {
        self.check_task()?;
        let registry = SpeciesRegistry::new(self.species.clone())?;
        let network = ReactionNetwork::new(registry, &self.reactions)?
            .with_gas_constant(self.gas_constant);
        info!(
            "task {}: network ready, T = {} K, t in [{}, {}]",
            self.problem_name.as_deref().unwrap_or("<unnamed>"),
            self.config.temperature,
            self.config.t_start,
            self.config.t_end
        );
        self.network = Some(network);
        Ok(())
    }

    /// Runs the simulation, calling `setup()` first if needed.
    ///
    /// On a solver failure the partial trajectory is kept in `result()` and the error is returned.
    /// Any other error leaves `result()` empty.
    pub fn solve(&mut self) -> Result<&SimulationResult, KineticsError> {
        self.result = None;
        self.stats = None;
        if self.network.is_none() {
            self.setup()?;
        } else {
            self.check_task()?;
        }
        let network = self
            .network
            .as_ref()
            .ok_or_else(|| KineticsError::Domain("network is not built".into()))?;
        let ids = network.registry().ids();
        let weights = network.registry().molecular_weights();
        let c0 = network.registry().initial_state();
        let t_eval = self.config.time_grid();
        let T = self.config.temperature;
        info!("solving batch reactor with {:?}", self.config.solver.method);
        match simulate(
            network,
            &c0,
            (self.config.t_start, self.config.t_end),
            &t_eval,
            T,
            &self.config.solver,
        ) {
            Ok((trajectory, stats)) => {
                let result =
                    SimulationResult::new(ids, weights, self.config.t_start, c0, trajectory, T);
                let drift = result.mass_balance_drift();
                if drift > 1e-6 {
                    warn!("total mass drifted by {:.3e} (relative)", drift);
                }
                info!("solution complete, {} time points", result.len());
                self.stats = Some(stats);
                Ok(&*self.result.insert(result))
            }
            Err(err) => {
                if let Some(failure) = err.integration_failure() {
                    self.stats = Some(failure.stats);
                    self.result = Some(SimulationResult::partial(
                        ids,
                        weights,
                        self.config.t_start,
                        c0,
                        failure.partial.clone(),
                        T,
                    ));
                }
                Err(err)
            }
        }
    }
}
