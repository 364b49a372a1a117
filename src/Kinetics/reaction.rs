use crate::Kinetics::arrhenius::{GasConstant, arrhenius_rate_constant};
use crate::Kinetics::species::{Phase, SpeciesRegistry};
use crate::errors::KineticsError;
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::warn;
use nalgebra::DVector;
use std::collections::{BTreeMap, HashMap};

/// Reaction as it is stored in the input table
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionRecord {
    pub id: String,
    /// species -> signed coefficient: negative for consumed, positive for produced
    pub stoichiometry: BTreeMap<String, f64>,
    /// species -> exponent in the rate law
    pub orders: BTreeMap<String, f64>,
    pub phase: Phase,
    /// pre-exponential factor
    pub A: f64,
    /// activation energy [J/mol]
    pub Ea: f64,
    /// recorded but not used by the rate law
    pub reversible: bool,
}

impl ReactionRecord {
    pub fn new(
        id: &str,
        stoichiometry: BTreeMap<String, f64>,
        orders: BTreeMap<String, f64>,
        phase: Phase,
        A: f64,
        Ea: f64,
        reversible: bool,
    ) -> Self {
        Self {
            id: id.to_string(),
            stoichiometry,
            orders,
            phase,
            A,
            Ea,
            reversible,
        }
    }

    pub fn rate_constant(&self, T: f64, R: GasConstant) -> Result<f64, KineticsError> {
        arrhenius_rate_constant(self.A, self.Ea, T, R)
    }

    /// rate = k(T) * Π C[species]^order, species are looked up in `index_map`
    pub fn rate(
        &self,
        concentrations: &DVector<f64>,
        index_map: &HashMap<String, usize>,
        T: f64,
        R: GasConstant,
    ) -> Result<f64, KineticsError> {
        let mut rate = self.rate_constant(T, R)?;
        for (species, order) in &self.orders {
            let index = self.lookup(species, index_map)?;
            let c = concentrations.get(index).copied().ok_or_else(|| {
                KineticsError::Domain(format!(
                    "concentration vector has {} entries, species '{}' has index {}",
                    concentrations.len(),
                    species,
                    index
                ))
            })?;
            rate *= c.powf(*order);
        }
        Ok(rate)
    }

    fn lookup(
        &self,
        species: &str,
        index_map: &HashMap<String, usize>,
    ) -> Result<usize, KineticsError> {
        index_map
            .get(species)
            .copied()
            .ok_or_else(|| KineticsError::UnknownSpecies {
                reaction: self.id.clone(),
                species: species.to_string(),
            })
    }

    /// Validates the record and replaces species names with registry indices.
    ///
    /// # Returns
    /// * `Err(KineticsError::UnknownSpecies)` - a species of stoichiometry or orders is not registered
    /// * `Err(KineticsError::Domain)` - A <= 0, non-finite Ea, coefficient or order, empty stoichiometry
    pub fn resolve(&self, registry: &SpeciesRegistry) -> Result<Reaction, KineticsError> {
        if !self.A.is_finite() || self.A <= 0.0 {
            return Err(KineticsError::Domain(format!(
                "pre-exponential factor of reaction '{}' must be positive, got {}",
                self.id, self.A
            )));
        }
        if !self.Ea.is_finite() {
            return Err(KineticsError::Domain(format!(
                "activation energy of reaction '{}' is not finite",
                self.id
            )));
        }
        if self.stoichiometry.is_empty() {
            return Err(KineticsError::Domain(format!(
                "reaction '{}' has empty stoichiometry",
                self.id
            )));
        }
        let index_map = registry.index_map();
        let mut stoichiometry = Vec::with_capacity(self.stoichiometry.len());
        for (species, coeff) in &self.stoichiometry {
            let index = self.lookup(species, index_map)?;
            if !coeff.is_finite() {
                return Err(KineticsError::Domain(format!(
                    "stoichiometric coefficient of '{}' in reaction '{}' is not finite",
                    species, self.id
                )));
            }
            stoichiometry.push((index, *coeff));
        }
        let mut orders = Vec::with_capacity(self.orders.len());
        for (species, order) in &self.orders {
            let index = self.lookup(species, index_map)?;
            if !order.is_finite() {
                return Err(KineticsError::Domain(format!(
                    "order of '{}' in reaction '{}' is not finite",
                    species, self.id
                )));
            }
            orders.push(OrderTerm::new(index, *order));
        }
        stoichiometry.sort_by_key(|(index, _)| *index);
        orders.sort_by_key(|term| term.index);
        if self.reversible {
            warn!(
                "reaction '{}' is marked reversible; only the forward rate is modelled",
                self.id
            );
        }
        Ok(Reaction {
            id: self.id.clone(),
            phase: self.phase,
            A: self.A,
            Ea: self.Ea,
            reversible: self.reversible,
            stoichiometry,
            orders,
        })
    }
}

/// one factor C_index^order of the rate law
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTerm {
    pub index: usize,
    pub order: f64,
    /// Some(n) when the order is an integer, then powi is used
    integer_order: Option<i32>,
}

impl OrderTerm {
    pub fn new(index: usize, order: f64) -> Self {
        let integer_order = if order.fract() == 0.0 && order.abs() <= i32::MAX as f64 {
            Some(order as i32)
        } else {
            None
        };
        Self {
            index,
            order,
            integer_order,
        }
    }

    /// C^order
    #[inline]
    pub fn power(&self, c: f64) -> f64 {
        match self.integer_order {
            Some(n) => c.powi(n),
            None => c.powf(self.order),
        }
    }

    /// d(C^order)/dC
    #[inline]
    pub fn power_derivative(&self, c: f64) -> f64 {
        match self.integer_order {
            Some(0) => 0.0,
            Some(n) => n as f64 * c.powi(n - 1),
            None => self.order * c.powf(self.order - 1.0),
        }
    }
}

/// Reaction resolved against a species registry
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub id: String,
    pub phase: Phase,
    pub A: f64,
    pub Ea: f64,
    pub reversible: bool,
    /// (species index, coefficient), sorted by index
    pub stoichiometry: Vec<(usize, f64)>,
    /// rate law factors, sorted by index
    pub orders: Vec<OrderTerm>,
}

impl Reaction {
    pub fn rate_constant(&self, T: f64, R: GasConstant) -> Result<f64, KineticsError> {
        arrhenius_rate_constant(self.A, self.Ea, T, R)
    }

    /// Instantaneous rate at temperature T.
    ///
    /// C^n is evaluated as is: a fractional order of a negative concentration gives NaN.
    pub fn rate(&self, concentrations: &[f64], T: f64, R: GasConstant) -> Result<f64, KineticsError> {
        let k = self.rate_constant(T, R)?;
        Ok(self.rate_with_constant(k, concentrations))
    }

    /// rate for an already computed rate constant
    #[inline]
    pub fn rate_with_constant(&self, k: f64, concentrations: &[f64]) -> f64 {
        self.orders
            .iter()
            .fold(k, |rate, term| rate * term.power(concentrations[term.index]))
    }

    /// d rate / d C_j for an already computed rate constant
    pub fn rate_derivative_with_constant(&self, k: f64, concentrations: &[f64], j: usize) -> f64 {
        let mut derivative = k;
        let mut depends_on_j = false;
        for term in &self.orders {
            let c = concentrations[term.index];
            if term.index == j {
                depends_on_j = true;
                derivative *= term.power_derivative(c);
            } else {
                derivative *= term.power(c);
            }
        }
        if depends_on_j { derivative } else { 0.0 }
    }

    /// k * Π C^n as an expression of the species variables `C` (indexed like the registry)
    pub fn symbolic_rate(&self, k: f64, C: &[Expr]) -> Expr {
        self.orders.iter().fold(Expr::Const(k), |rate, term| {
            let c = C[term.index].clone();
            match term.integer_order {
                Some(0) => rate,
                Some(1) => rate * c,
                _ => rate * c.pow(Expr::Const(term.order)),
            }
        })
    }

    /// Σ ν_i * M_i: zero for a reaction that conserves mass
    pub fn mass_imbalance(&self, molecular_weights: &DVector<f64>) -> f64 {
        self.stoichiometry
            .iter()
            .map(|(index, coeff)| coeff * molecular_weights[*index])
            .sum()
    }
}
