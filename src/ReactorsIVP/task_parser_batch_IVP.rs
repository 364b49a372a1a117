//! Task file of a batch reactor run (JSON).
//!
//! ```json
//! {
//!   "problem_name": "lignin at 200 C",
//!   "species_file": "species.csv",
//!   "reactions_file": "reactions.csv",
//!   "temperature": 473.15,
//!   "t_start": 0.0,
//!   "t_end": 1000000.0,
//!   "n_points": 1000,
//!   "solver": { "method": "BDF", "rtol": 1e-6, "atol": 1e-10 },
//!   "output_csv": "results.csv",
//!   "report": { "reactant": "LIGH", "threshold": 0.5 }
//! }
//! ```
//! Only `species_file`, `reactions_file`, `temperature` and `t_end` are required.
//! Relative paths are resolved against the directory of the task file.
use crate::Kinetics::arrhenius::R_G;
use crate::ReactorsIVP::BatchReactorIVP::{BatchReactorTask, SimulationConfig};
use crate::ReactorsIVP::ode_solver::SolverOptions;
use crate::Utils::load_from_file::{load_reaction_data, load_species_data};
use crate::errors::KineticsError;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_n_points() -> usize {
    1000
}

fn default_gas_constant() -> f64 {
    R_G
}

fn default_threshold() -> f64 {
    0.5
}

/// conversion report requested by the task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub reactant: String,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTaskFile {
    #[serde(default)]
    pub problem_name: Option<String>,
    pub species_file: PathBuf,
    pub reactions_file: PathBuf,
    /// [K]
    pub temperature: f64,
    #[serde(default)]
    pub t_start: f64,
    pub t_end: f64,
    #[serde(default = "default_n_points")]
    pub n_points: usize,
    #[serde(default)]
    pub time_points: Option<Vec<f64>>,
    #[serde(default)]
    pub solver: SolverOptions,
    #[serde(default = "default_gas_constant")]
    pub gas_constant: f64,
    #[serde(default)]
    pub output_csv: Option<PathBuf>,
    #[serde(default)]
    pub report: Option<ReportRequest>,
}

impl BatchTaskFile {
    /// parses the task and resolves relative paths against `base_dir`
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self, KineticsError> {
        let mut task: BatchTaskFile = serde_json::from_str(content)?;
        task.species_file = resolve(base_dir, &task.species_file);
        task.reactions_file = resolve(base_dir, &task.reactions_file);
        task.output_csv = task.output_csv.map(|p| resolve(base_dir, &p));
        Ok(task)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, KineticsError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let task = Self::parse(&content, base_dir)?;
        info!("task file {} parsed", path.display());
        Ok(task)
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            t_start: self.t_start,
            t_end: self.t_end,
            n_points: self.n_points,
            time_points: self.time_points.clone(),
            temperature: self.temperature,
            solver: self.solver.clone(),
        }
    }

    /// loads both tables and assembles the task
    pub fn into_task(&self) -> Result<BatchReactorTask, KineticsError> {
        let species = load_species_data(&self.species_file.to_string_lossy())?;
        let reactions = load_reaction_data(&self.reactions_file.to_string_lossy())?;
        let mut task = BatchReactorTask::new(species, reactions, self.simulation_config());
        if let Some(name) = &self.problem_name {
            task.set_problem_name(name);
        }
        task.set_gas_constant(self.gas_constant)?;
        task.check_task()?;
        Ok(task)
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReactorsIVP::ode_solver::SolverType;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_minimal_task_defaults() {
        let json = r#"{
            "species_file": "species.csv",
            "reactions_file": "/abs/reactions.csv",
            "temperature": 473.15,
            "t_end": 1000.0
        }"#;
        let task = BatchTaskFile::parse(json, Path::new("/data/run1")).unwrap();
        assert_eq!(task.species_file, PathBuf::from("/data/run1/species.csv"));
        assert_eq!(task.reactions_file, PathBuf::from("/abs/reactions.csv"));
        assert_eq!(task.t_start, 0.0);
        assert_eq!(task.n_points, 1000);
        assert_eq!(task.gas_constant, 8.314);
        assert_eq!(task.solver, SolverOptions::default());
        assert!(task.output_csv.is_none());
        assert!(task.report.is_none());
        let config = task.simulation_config();
        assert_eq!(config.time_grid().len(), 1000);
        assert_eq!(config.time_grid()[999], 1000.0);
    }

    #[test]
    fn test_full_task() {
        let json = r#"{
            "problem_name": "test",
            "species_file": "s.csv",
            "reactions_file": "r.csv",
            "temperature": 600.0,
            "t_start": 1.0,
            "t_end": 2.0,
            "time_points": [1.0, 1.5, 2.0],
            "solver": {"method": "RK45", "rtol": 1e-8, "atol": 1e-12, "max_steps": 1000},
            "gas_constant": 1.987,
            "output_csv": "out/res.csv",
            "report": {"reactant": "X"}
        }"#;
        let task = BatchTaskFile::parse(json, Path::new("base")).unwrap();
        assert_eq!(task.solver.method, SolverType::RK45);
        assert_eq!(task.solver.max_steps, 1000);
        assert_eq!(task.output_csv, Some(PathBuf::from("base/out/res.csv")));
        let report = task.report.clone().unwrap();
        assert_eq!(report.reactant, "X");
        assert_eq!(report.threshold, 0.5);
        assert_eq!(task.simulation_config().time_grid(), vec![1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_missing_required_field() {
        let json = r#"{"species_file": "s.csv", "reactions_file": "r.csv", "t_end": 1.0}"#;
        assert!(matches!(
            BatchTaskFile::parse(json, Path::new(".")),
            Err(KineticsError::Json(_))
        ));
    }

    #[test]
    fn test_task_from_files() {
        let dir = tempdir().unwrap();
        let mut species = fs::File::create(dir.path().join("species.csv")).unwrap();
        writeln!(species, "SpeciesID,MolecularWeight,Phase,InitialConcentration").unwrap();
        writeln!(species, "X,100,solid,1.0").unwrap();
        writeln!(species, "Y,100,gas,0.0").unwrap();
        let mut reactions = fs::File::create(dir.path().join("reactions.csv")).unwrap();
        writeln!(reactions, "ReactionID,Stoichiometry,Orders,Phase,A,Ea,Reversible").unwrap();
        writeln!(
            reactions,
            "R1,\"{{\"\"X\"\": -1, \"\"Y\"\": 1}}\",\"{{\"\"X\"\": 1}}\",solid,1.0,0,false"
        )
        .unwrap();
        let task_path = dir.path().join("task.json");
        fs::write(
            &task_path,
            r#"{"species_file": "species.csv", "reactions_file": "reactions.csv",
                "temperature": 500.0, "t_end": 1.0, "n_points": 3}"#,
        )
        .unwrap();

        let task_file = BatchTaskFile::from_file(&task_path).unwrap();
        let mut task = task_file.into_task().unwrap();
        assert_eq!(task.species().len(), 2);
        assert_eq!(task.reactions().len(), 1);
        let result = task.solve().unwrap();
        assert_eq!(result.len(), 3);
        let x = result.concentration_of("X").unwrap();
        approx::assert_relative_eq!(x[2], (-1.0_f64).exp(), max_relative = 1e-4);
    }
}
