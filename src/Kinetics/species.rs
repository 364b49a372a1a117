use crate::errors::KineticsError;
use log::warn;
use nalgebra::DVector;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Phase enum: solid, liquid, gas. Informational only, the rate law does not depend on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Solid,
    Liquid,
    Gas,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Solid => "solid",
            Phase::Liquid => "liquid",
            Phase::Gas => "gas",
        }
    }
}

impl FromStr for Phase {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "solid" | "s" => Ok(Phase::Solid),
            "liquid" | "l" => Ok(Phase::Liquid),
            "gas" | "g" => Ok(Phase::Gas),
            other => Err(format!("unknown phase '{}'", other)),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// chemical species taking part in the network
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    /// unique identifier, e.g. "LIGH" or "C3H6"
    pub id: String,
    /// molecular weight [g/mol]
    pub molecular_weight: f64,
    pub phase: Phase,
    /// initial concentration [mol/L]
    pub initial_concentration: f64,
}

impl Species {
    pub fn new(id: &str, molecular_weight: f64, phase: Phase, initial_concentration: f64) -> Self {
        Self {
            id: id.to_string(),
            molecular_weight,
            phase,
            initial_concentration,
        }
    }
}

/// Registry of species. The position of a species in the registry is its index in every
/// concentration vector of the simulation
#[derive(Debug, Clone, Default)]
pub struct SpeciesRegistry {
    species: Vec<Species>,
    index_map: HashMap<String, usize>,
}

impl SpeciesRegistry {
    /// Builds the registry and assigns indices in input order.
    ///
    /// # Returns
    /// * `Err(KineticsError::DuplicateSpecies)` if an identifier repeats
    /// * `Err(KineticsError::Domain)` if a molecular weight is not positive or a number is not finite
    pub fn new(species: Vec<Species>) -> Result<Self, KineticsError> {
        let mut index_map = HashMap::with_capacity(species.len());
        for (i, s) in species.iter().enumerate() {
            if s.id.trim().is_empty() {
                return Err(KineticsError::Domain(format!(
                    "species #{} has an empty identifier",
                    i
                )));
            }
            if !s.molecular_weight.is_finite() || s.molecular_weight <= 0.0 {
                return Err(KineticsError::Domain(format!(
                    "molecular weight of '{}' must be positive, got {}",
                    s.id, s.molecular_weight
                )));
            }
            if !s.initial_concentration.is_finite() {
                return Err(KineticsError::Domain(format!(
                    "initial concentration of '{}' is not finite",
                    s.id
                )));
            }
            if s.initial_concentration < 0.0 {
                warn!(
                    "initial concentration of '{}' is negative: {}",
                    s.id, s.initial_concentration
                );
            }
            if index_map.insert(s.id.clone(), i).is_some() {
                return Err(KineticsError::DuplicateSpecies(s.id.clone()));
            }
        }
        Ok(Self { species, index_map })
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_map.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Species> {
        self.index_of(id).map(|i| &self.species[i])
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// identifiers in index order
    pub fn ids(&self) -> Vec<String> {
        self.species.iter().map(|s| s.id.clone()).collect()
    }

    /// species name -> index in the concentration vector
    pub fn index_map(&self) -> &HashMap<String, usize> {
        &self.index_map
    }

    /// vector of initial concentrations in index order
    pub fn initial_state(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.species.len(),
            self.species.iter().map(|s| s.initial_concentration),
        )
    }

    pub fn molecular_weights(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.species.len(),
            self.species.iter().map(|s| s.molecular_weight),
        )
    }
}
