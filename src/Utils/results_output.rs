//! # Results of a batch reactor run
//!
//! - **`SimulationResult`**: trajectory together with species names and molar masses, so that every
//!   column of the solution can be addressed by species id
//! - **`ConversionReport`**: conversion of one reactant, time to reach a given conversion, product
//!   yields and final composition
//!
//! Both structures print themselves as tables (prettytable), the trajectory can be saved to CSV
//! with the header `time,<species...>` and plotted in the terminal.
use crate::ReactorsIVP::ode_solver::Trajectory;
use crate::errors::KineticsError;
use RustedSciThe::Utils::plots::plots_terminal;
use log::{info, warn};
use nalgebra::{DVector, DVectorView};
use prettytable::{Cell, Row, Table};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    /// species ids in column order
    pub species: Vec<String>,
    pub molecular_weights: DVector<f64>,
    /// start of the simulated span; the first output time may be later
    pub t_start: f64,
    /// concentrations at t_start
    pub initial_state: DVector<f64>,
    pub trajectory: Trajectory,
    /// temperature of the run [K]
    pub temperature: f64,
    /// false if the solver stopped before the end of the time span
    pub complete: bool,
}

impl SimulationResult {
    pub fn new(
        species: Vec<String>,
        molecular_weights: DVector<f64>,
        t_start: f64,
        initial_state: DVector<f64>,
        trajectory: Trajectory,
        temperature: f64,
    ) -> Self {
        Self {
            species,
            molecular_weights,
            t_start,
            initial_state,
            trajectory,
            temperature,
            complete: true,
        }
    }

    /// result assembled from the part of the trajectory computed before a solver failure
    pub fn partial(
        species: Vec<String>,
        molecular_weights: DVector<f64>,
        t_start: f64,
        initial_state: DVector<f64>,
        trajectory: Trajectory,
        temperature: f64,
    ) -> Self {
        Self {
            complete: false,
            ..Self::new(
                species,
                molecular_weights,
                t_start,
                initial_state,
                trajectory,
                temperature,
            )
        }
    }

    pub fn time(&self) -> &DVector<f64> {
        &self.trajectory.time
    }

    pub fn len(&self) -> usize {
        self.trajectory.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectory.is_empty()
    }

    pub fn species_index(&self, id: &str) -> Option<usize> {
        self.species.iter().position(|s| s == id)
    }

    /// time series of one species
    pub fn concentration_of(&self, id: &str) -> Option<DVectorView<'_, f64>> {
        self.species_index(id)
            .map(|i| self.trajectory.states.column(i))
    }

    /// species id -> time series
    pub fn species_series(&self) -> HashMap<String, DVector<f64>> {
        self.species
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), self.trajectory.states.column(i).into_owned()))
            .collect()
    }

    pub fn final_state(&self) -> Option<DVector<f64>> {
        self.trajectory.last_state()
    }

    /// Σ C_i * M_i at every time point
    pub fn total_mass_series(&self) -> DVector<f64> {
        &self.trajectory.states * &self.molecular_weights
    }

    /// max |m(t) - m(t0)| / |m(t0)| over the trajectory, m(t0) from the initial state
    pub fn mass_balance_drift(&self) -> f64 {
        let mass = self.total_mass_series();
        let m0 = self.initial_state.dot(&self.molecular_weights);
        let scale = if m0.abs() > 0.0 { m0.abs() } else { 1.0 };
        mass.iter()
            .map(|m| (m - m0).abs() / scale)
            .fold(0.0, f64::max)
    }

    /// table of time vs species, every `every_nth` row plus the last one
    pub fn to_table(&self, every_nth: usize) -> Table {
        let step = every_nth.max(1);
        let mut table = Table::new();
        let mut header = vec![Cell::new("t, s")];
        header.extend(self.species.iter().map(|s| Cell::new(s)));
        table.add_row(Row::new(header));
        let n = self.len();
        for i in 0..n {
            if i % step != 0 && i != n - 1 {
                continue;
            }
            let mut row = vec![Cell::new(&format!("{:.4e}", self.trajectory.time[i]))];
            row.extend(
                self.trajectory
                    .states
                    .row(i)
                    .iter()
                    .map(|c| Cell::new(&format!("{:.6e}", c))),
            );
            table.add_row(Row::new(row));
        }
        table
    }

    pub fn pretty_print(&self, every_nth: usize) {
        if !self.complete {
            println!("partial result: the solver stopped before the end of the time span");
        }
        println!("T = {} K, {} time points", self.temperature, self.len());
        self.to_table(every_nth).printstd();
    }

    /// All species against time in the terminal
    pub fn plot_in_terminal(&self) {
        if self.is_empty() {
            warn!("nothing to plot: the trajectory is empty");
            return;
        }
        plots_terminal(
            "t".to_string(),
            self.species.clone(),
            self.trajectory.time.clone(),
            self.trajectory.states.clone(),
        )
    }

    /// writes `time,<species...>` and one row per time point
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), KineticsError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let mut header = vec!["time".to_string()];
        header.extend(self.species.iter().cloned());
        wtr.write_record(&header)?;
        for i in 0..self.len() {
            let mut record = vec![self.trajectory.time[i].to_string()];
            record.extend(self.trajectory.states.row(i).iter().map(|c| c.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), KineticsError> {
        let file = File::create(path.as_ref())?;
        self.write_csv(file)?;
        info!("trajectory saved to {}", path.as_ref().display());
        Ok(())
    }
}

/// Conversion of a reactant and yields of the products
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionReport {
    pub reactant: String,
    /// conversion searched for, fraction in (0, 1]
    pub threshold: f64,
    pub initial_concentration: f64,
    /// (C0 - C(t_end)) / C0
    pub final_conversion: f64,
    /// first time the conversion reaches `threshold`; ln(1 - X) is interpolated linearly between
    /// samples, the initial state counts as a sample at t_start
    pub time_to_threshold: Option<f64>,
    /// C(t_end) / C0(reactant) for every species absent at t_start
    pub yields: Vec<(String, f64)>,
    pub final_composition: Vec<(String, f64)>,
}

impl ConversionReport {
    pub fn from_result(
        result: &SimulationResult,
        reactant: &str,
        threshold: f64,
    ) -> Result<Self, KineticsError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(KineticsError::Domain(format!(
                "conversion threshold must be in (0, 1], got {}",
                threshold
            )));
        }
        let index = result
            .species_index(reactant)
            .ok_or_else(|| KineticsError::UnknownSpecies {
                reaction: "conversion report".to_string(),
                species: reactant.to_string(),
            })?;
        let final_state = result.final_state().ok_or_else(|| {
            KineticsError::Domain("cannot build a report from an empty trajectory".into())
        })?;
        let c0 = result.initial_state[index];
        if !(c0 > 0.0) {
            return Err(KineticsError::Domain(format!(
                "initial concentration of '{}' must be positive for a conversion report",
                reactant
            )));
        }
        let t_start = result.t_start;
        // the initial state leads the samples unless the first output time is t_start
        let mut samples: Vec<(f64, f64)> = Vec::with_capacity(result.len() + 1);
        if result.time()[0] > t_start {
            samples.push((t_start, 0.0));
        }
        samples.extend(
            result
                .time()
                .iter()
                .zip(result.trajectory.states.column(index).iter())
                .map(|(t, ci)| (*t, (c0 - ci) / c0)),
        );
        let mut time_to_threshold = None;
        for i in 0..samples.len() {
            let (t1, x1) = samples[i];
            if x1 >= threshold {
                time_to_threshold = Some(if i == 0 {
                    t1
                } else {
                    let (t0, x0) = samples[i - 1];
                    crossing_time((t0, x0), (t1, x1), threshold)
                });
                break;
            }
        }
        let yields = result
            .species
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index && result.initial_state[*i] == 0.0)
            .map(|(i, id)| (id.clone(), final_state[i] / c0))
            .collect();
        let final_composition = result
            .species
            .iter()
            .cloned()
            .zip(final_state.iter().copied())
            .collect();
        Ok(Self {
            reactant: reactant.to_string(),
            threshold,
            initial_concentration: c0,
            final_conversion: (c0 - final_state[index]) / c0,
            time_to_threshold,
            yields,
            final_composition,
        })
    }

    pub fn pretty_print(&self) {
        let mut table = Table::new();
        table.add_row(Row::new(vec![Cell::new("Quantity"), Cell::new("Value")]));
        table.add_row(Row::new(vec![
            Cell::new(&format!("final conversion of {}", self.reactant)),
            Cell::new(&format!("{:.6}", self.final_conversion)),
        ]));
        let t = match self.time_to_threshold {
            Some(t) => format!("{:.6e} s", t),
            None => "not reached".to_string(),
        };
        table.add_row(Row::new(vec![
            Cell::new(&format!("time to {:.1}% conversion", self.threshold * 100.0)),
            Cell::new(&t),
        ]));
        for (id, y) in &self.yields {
            table.add_row(Row::new(vec![
                Cell::new(&format!("yield of {}", id)),
                Cell::new(&format!("{:.6}", y)),
            ]));
        }
        for (id, c) in &self.final_composition {
            table.add_row(Row::new(vec![
                Cell::new(&format!("final C of {}", id)),
                Cell::new(&format!("{:.6e}", c)),
            ]));
        }
        table.printstd();
    }
}

/// Time at which the conversion crosses `threshold` between two samples. Exact for first order
/// decay, where ln(1 - X) is linear in t; linear in X once the reactant is used up.
fn crossing_time((t0, x0): (f64, f64), (t1, x1): (f64, f64), threshold: f64) -> f64 {
    let (r0, r1, r) = (1.0 - x0, 1.0 - x1, 1.0 - threshold);
    if r0 > 0.0 && r1 > 0.0 && r > 0.0 && r0 != r1 {
        t0 + (r / r0).ln() / (r1 / r0).ln() * (t1 - t0)
    } else {
        t0 + (threshold - x0) / (x1 - x0) * (t1 - t0)
    }
}
