//! # ODE integration of kinetic networks
//!
//! Numerical stepping is done by `UniversalODESolver` of RustedSciThe. The system hands over its
//! right-hand sides as symbolic expressions, the solver builds the jacobian itself. Available
//! methods ([`SolverType`]):
//!
//! - `BDF` - variable order backward differentiation formulas, default for pyrolysis networks:
//!   activation energies of 100-250 kJ/mol give rate constants spread over many decades
//! - `Radau3`, `Radau7` - implicit Radau IIA of order 3 and 7
//! - `BackwardEuler` - fixed step implicit Euler
//! - `RK45` - explicit Runge-Kutta for non-stiff networks
//!
//! ## Output
//! The span is cut at every requested time and each piece is integrated separately, so the
//! trajectory holds the states exactly at the requested times, no interpolation is involved.
//! With an empty list of times the whole span is one piece and every solver step is returned.
//!
//! ## Failures
//! Exceeding the step budget, a solver that stops before the end of a piece and non-finite
//! derivatives or states produce an [`IntegrationFailure`] which keeps the part of the trajectory
//! computed so far.

use crate::errors::KineticsError;
use RustedSciThe::numerical::ODE_api2::{
    SolverParam, SolverType as UniversalSolverType, UniversalODESolver,
};
use RustedSciThe::numerical::Radau::Radau_main::RadauOrder;
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// ODE system dy/dt = f(t, y) in the two forms the driver needs
pub trait OdeSystem {
    /// number of state variables
    fn ndim(&self) -> usize;

    /// names of the unknowns, the variables of `equations()`
    fn unknowns(&self) -> Vec<String>;

    /// symbolic right-hand sides, one per unknown, in the order of `unknowns()`
    fn equations(&self) -> Vec<Expr>;

    /// numeric f(t, y) into `dydt`; both slices have length `ndim()`
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// available integration methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SolverType {
    #[default]
    #[serde(alias = "bdf", alias = "stiff")]
    BDF,
    #[serde(alias = "radau3")]
    Radau3,
    #[serde(alias = "radau", alias = "radau7", alias = "Radau")]
    Radau7,
    #[serde(alias = "backward_euler", alias = "be")]
    BackwardEuler,
    /// explicit, non-stiff only
    #[serde(alias = "rk45")]
    RK45,
}

impl SolverType {
    fn universal(self) -> UniversalSolverType {
        match self {
            SolverType::BDF => UniversalSolverType::BDF,
            SolverType::Radau3 => UniversalSolverType::Radau(RadauOrder::Order3),
            SolverType::Radau7 => UniversalSolverType::Radau(RadauOrder::Order7),
            SolverType::BackwardEuler => UniversalSolverType::BackwardEuler,
            SolverType::RK45 => UniversalSolverType::NonStiff("RK45".to_owned()),
        }
    }
}

impl FromStr for SolverType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bdf" | "stiff" => Ok(SolverType::BDF),
            "radau3" => Ok(SolverType::Radau3),
            "radau" | "radau7" => Ok(SolverType::Radau7),
            "be" | "backward_euler" | "backwardeuler" => Ok(SolverType::BackwardEuler),
            "rk45" => Ok(SolverType::RK45),
            other => Err(format!("unknown solver type '{}'", other)),
        }
    }
}

/// solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    pub method: SolverType,
    /// relative tolerance
    pub rtol: f64,
    /// absolute tolerance
    pub atol: f64,
    /// first step of every piece; chosen by the solver when None. Step of the fixed step methods,
    /// 1/100 of the piece when None
    pub first_step: Option<f64>,
    /// largest step; the length of the piece when None
    pub h_max: Option<f64>,
    /// budget of solver steps over the whole span
    pub max_steps: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            method: SolverType::BDF,
            rtol: 1e-6,
            atol: 1e-10,
            first_step: None,
            h_max: None,
            max_steps: 500_000,
        }
    }
}

impl SolverOptions {
    pub fn validate(&self) -> Result<(), KineticsError> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            return Err(KineticsError::Domain("rtol must be finite and > 0".into()));
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(KineticsError::Domain("atol must be finite and > 0".into()));
        }
        if let Some(h) = self.first_step {
            if !h.is_finite() || h <= 0.0 {
                return Err(KineticsError::Domain("first_step must be > 0".into()));
            }
        }
        if let Some(h) = self.h_max {
            if h.is_nan() || h <= 0.0 {
                return Err(KineticsError::Domain("h_max must be > 0".into()));
            }
        }
        if self.max_steps == 0 {
            return Err(KineticsError::Domain("max_steps must be > 0".into()));
        }
        Ok(())
    }

    /// parameter map of `UniversalODESolver` for a piece of length `span`
    fn solver_params(&self, span: f64, budget: usize) -> HashMap<String, SolverParam> {
        let max_step = self.h_max.map_or(span, |h| h.min(span));
        let first_step = self.first_step.map(|h| h.min(span));
        HashMap::from([
            (
                "step_size".to_owned(),
                SolverParam::Float(first_step.unwrap_or(span / 100.0)),
            ),
            ("tolerance".to_owned(), SolverParam::Float(self.rtol)),
            (
                "max_iterations".to_owned(),
                SolverParam::Int(budget.try_into().unwrap_or(100_000)),
            ),
            ("rtol".to_owned(), SolverParam::Float(self.rtol)),
            ("atol".to_owned(), SolverParam::Float(self.atol)),
            ("max_step".to_owned(), SolverParam::Float(max_step)),
            ("first_step".to_owned(), SolverParam::OptionalFloat(first_step)),
            ("vectorized".to_owned(), SolverParam::Bool(false)),
            ("jac_sparsity".to_owned(), SolverParam::OptionalMatrix(None)),
            ("parallel".to_owned(), SolverParam::Bool(false)),
        ])
    }
}

/// Solution of an IVP: row i of `states` is the state at `time[i]`
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub time: DVector<f64>,
    /// n_times x n_states
    pub states: DMatrix<f64>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn n_states(&self) -> usize {
        self.states.ncols()
    }

    /// state at the i-th time point
    pub fn state_at(&self, i: usize) -> DVector<f64> {
        self.states.row(i).transpose()
    }

    pub fn last_state(&self) -> Option<DVector<f64>> {
        if self.is_empty() {
            None
        } else {
            Some(self.state_at(self.len() - 1))
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// solver steps over all pieces
    pub accepted_steps: usize,
    /// pieces handed to the solver
    pub solver_runs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FailureReason {
    #[error("maximum number of steps ({0}) exceeded")]
    MaxStepsExceeded(usize),
    #[error("solver stopped at t = {0:e} before the end of the span")]
    SolverStalled(f64),
    #[error("non-finite derivative encountered")]
    NonFiniteDerivative,
}

/// solver failure together with everything computed before it
#[derive(Debug, Clone, Error)]
#[error("integration failed at t = {t_last:e}: {reason}")]
pub struct IntegrationFailure {
    pub reason: FailureReason,
    /// last time reached
    pub t_last: f64,
    /// state at `t_last`
    pub state_last: DVector<f64>,
    /// requested points (or solver steps) recorded before the failure
    pub partial: Trajectory,
    pub stats: SolverStats,
}

/// Integrates `sys` from `t_span.0` to `t_span.1`.
///
/// # Arguments
/// * `y0` - initial state, length `sys.ndim()`
/// * `t_eval` - requested output times: finite, non-decreasing, inside `t_span`. Empty means
///   "every solver step"
///
/// # Returns
/// * `Err(KineticsError::Domain)` for inconsistent input
/// * `Err(KineticsError::Integration)` when the solver gives up
pub fn integrate<S: OdeSystem>(
    sys: &S,
    y0: &DVector<f64>,
    t_span: (f64, f64),
    t_eval: &[f64],
    opts: &SolverOptions,
) -> Result<(Trajectory, SolverStats), KineticsError> {
    opts.validate()?;
    let n = sys.ndim();
    if y0.len() != n {
        return Err(KineticsError::Domain(format!(
            "initial state has {} entries, system has {}",
            y0.len(),
            n
        )));
    }
    if y0.iter().any(|v| !v.is_finite()) {
        return Err(KineticsError::Domain("initial state is not finite".into()));
    }
    let (t0, t1) = t_span;
    if !t0.is_finite() || !t1.is_finite() || t1 < t0 {
        return Err(KineticsError::Domain(format!(
            "time span must be finite with t_end >= t_start, got ({}, {})",
            t0, t1
        )));
    }
    check_time_points(t_eval, t_span)?;
    let equations = sys.equations();
    let unknowns = sys.unknowns();
    if equations.len() != n || unknowns.len() != n {
        return Err(KineticsError::Domain(format!(
            "system of {} unknowns has {} equations and {} names",
            n,
            equations.len(),
            unknowns.len()
        )));
    }
    debug!(
        "integrating {} equations with {:?} on [{}, {}], {} output points",
        n,
        opts.method,
        t0,
        t1,
        t_eval.len()
    );
    // nothing to integrate: every right-hand side is identically zero
    let frozen = equations.iter().all(|eq| *eq == Expr::Const(0.0));
    let driver = Driver {
        equations,
        unknowns,
        opts,
        frozen,
    };
    driver.run(sys, y0, t_span, t_eval)
}

fn check_time_points(t_eval: &[f64], (t0, t1): (f64, f64)) -> Result<(), KineticsError> {
    for (i, t) in t_eval.iter().enumerate() {
        if !t.is_finite() || *t < t0 || *t > t1 {
            return Err(KineticsError::Domain(format!(
                "time point #{} = {} is outside of [{}, {}]",
                i, t, t0, t1
            )));
        }
        if i > 0 && *t < t_eval[i - 1] {
            return Err(KineticsError::Domain(
                "time points must be non-decreasing".into(),
            ));
        }
    }
    Ok(())
}

/// output rows collected so far
struct Recorder {
    n: usize,
    time: Vec<f64>,
    rows: Vec<f64>,
}

impl Recorder {
    fn new(n: usize) -> Self {
        Self {
            n,
            time: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, t: f64, y: &DVector<f64>) {
        self.time.push(t);
        self.rows.extend(y.iter());
    }

    fn snapshot(&self) -> Trajectory {
        Trajectory {
            time: DVector::from_vec(self.time.clone()),
            states: DMatrix::from_row_slice(self.time.len(), self.n, &self.rows),
        }
    }

    fn into_trajectory(self) -> Trajectory {
        let n_rows = self.time.len();
        Trajectory {
            time: DVector::from_vec(self.time),
            states: DMatrix::from_row_slice(n_rows, self.n, &self.rows),
        }
    }
}

/// steps of one solver run, row i of `states` at `time[i]`
struct Piece {
    time: DVector<f64>,
    states: DMatrix<f64>,
}

struct Driver<'a> {
    equations: Vec<Expr>,
    unknowns: Vec<String>,
    opts: &'a SolverOptions,
    frozen: bool,
}

impl Driver<'_> {
    fn run<S: OdeSystem>(
        &self,
        sys: &S,
        y0: &DVector<f64>,
        (t0, t1): (f64, f64),
        t_eval: &[f64],
    ) -> Result<(Trajectory, SolverStats), KineticsError> {
        let n = y0.len();
        let mut recorder = Recorder::new(n);
        let mut stats = SolverStats::default();
        let mut t = t0;
        let mut y = y0.clone();

        let fail = |reason: FailureReason,
                    t: f64,
                    y: &DVector<f64>,
                    recorder: &Recorder,
                    stats: SolverStats| {
            warn!("integration stopped at t = {:e}: {}", t, reason);
            KineticsError::from(IntegrationFailure {
                reason,
                t_last: t,
                state_last: y.clone(),
                partial: recorder.snapshot(),
                stats,
            })
        };

        let mut f0 = vec![0.0; n];
        sys.rhs(t0, y.as_slice(), &mut f0);
        if f0.iter().any(|v| !v.is_finite()) {
            return Err(fail(
                FailureReason::NonFiniteDerivative,
                t,
                &y,
                &recorder,
                stats,
            ));
        }

        let every_step = t_eval.is_empty();
        let targets: Vec<f64> = if every_step { vec![t1] } else { t_eval.to_vec() };
        if every_step {
            recorder.push(t0, &y);
        }

        for &target in &targets {
            if target > t && self.frozen {
                t = target;
                if every_step {
                    recorder.push(t, &y);
                }
            } else if target > t {
                let start = t;
                let budget = self.opts.max_steps - stats.accepted_steps;
                let Some(piece) = self.solve_piece(start, &y, target, budget) else {
                    return Err(fail(
                        FailureReason::SolverStalled(t),
                        t,
                        &y,
                        &recorder,
                        stats,
                    ));
                };
                stats.solver_runs += 1;
                let tol = 1e-9 * (target - start) + 4.0 * f64::EPSILON * target.abs();
                for i in 0..piece.time.len() {
                    let t_i = piece.time[i];
                    if t_i <= t {
                        continue;
                    }
                    let y_i = piece.states.row(i).transpose();
                    if !t_i.is_finite() || y_i.iter().any(|v| !v.is_finite()) {
                        return Err(fail(
                            FailureReason::NonFiniteDerivative,
                            t,
                            &y,
                            &recorder,
                            stats,
                        ));
                    }
                    if stats.accepted_steps == self.opts.max_steps {
                        return Err(fail(
                            FailureReason::MaxStepsExceeded(self.opts.max_steps),
                            t,
                            &y,
                            &recorder,
                            stats,
                        ));
                    }
                    stats.accepted_steps += 1;
                    t = if (t_i - target).abs() <= tol { target } else { t_i };
                    y = y_i;
                    if every_step {
                        recorder.push(t, &y);
                    }
                }
                if t < target {
                    let reason = if stats.accepted_steps == self.opts.max_steps {
                        FailureReason::MaxStepsExceeded(self.opts.max_steps)
                    } else {
                        FailureReason::SolverStalled(t)
                    };
                    return Err(fail(
                        reason,
                        t,
                        &y,
                        &recorder,
                        stats,
                    ));
                }
            }
            if !every_step {
                recorder.push(target, &y);
            }
        }
        Ok((recorder.into_trajectory(), stats))
    }

    /// one `UniversalODESolver` run from `start` to `end`; None if the solver returned nothing
    fn solve_piece(
        &self,
        start: f64,
        y_start: &DVector<f64>,
        end: f64,
        budget: usize,
    ) -> Option<Piece> {
        let mut ode = UniversalODESolver::new(
            self.equations.clone(),
            self.unknowns.clone(),
            "t".to_owned(),
            self.opts.method.universal(),
            start,
            y_start.clone(),
            end,
        );
        ode.set_parameters(self.opts.solver_params(end - start, budget));
        ode.initialize();
        ode.solve();
        let (time, states) = ode.get_result();
        let (time, states) = (time?, states?);
        // rows are time points; accept the transposed layout as well
        let states = if states.nrows() == time.len() {
            states
        } else if states.ncols() == time.len() {
            states.transpose()
        } else {
            return None;
        };
        if states.ncols() != y_start.len() {
            return None;
        }
        Some(Piece { time, states })
    }
}
