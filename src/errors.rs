use crate::ReactorsIVP::ode_solver::IntegrationFailure;
use thiserror::Error;

/// error types for building and integrating a reaction network
#[derive(Debug, Error)]
pub enum KineticsError {
    /// invalid physical input: non-positive temperature, pre-exponential factor, molar mass etc.
    #[error("Domain error: {0}")]
    Domain(String),
    #[error("Reaction '{reaction}' references unknown species '{species}'")]
    UnknownSpecies { reaction: String, species: String },
    #[error("Species '{0}' is defined more than once")]
    DuplicateSpecies(String),
    #[error("Reaction '{0}' is defined more than once")]
    DuplicateReaction(String),
    /// the solver gave up; the partial trajectory is kept inside
    #[error("{0}")]
    Integration(Box<IntegrationFailure>),
    #[error("Parse error in '{file}' at record {record}: {message}")]
    Parse {
        file: String,
        record: usize,
        message: String,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<IntegrationFailure> for KineticsError {
    fn from(failure: IntegrationFailure) -> Self {
        KineticsError::Integration(Box::new(failure))
    }
}

impl KineticsError {
    /// partial trajectory of a failed integration, if this is one
    pub fn integration_failure(&self) -> Option<&IntegrationFailure> {
        match self {
            KineticsError::Integration(failure) => Some(failure),
            _ => None,
        }
    }
}
