use crate::Kinetics::arrhenius::{GasConstant, check_temperature};
use crate::Kinetics::reaction::{Reaction, ReactionRecord};
use crate::Kinetics::species::SpeciesRegistry;
use crate::errors::KineticsError;
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::{debug, info, warn};
use nalgebra::{DMatrix, DVector};
use std::collections::HashSet;

/// Right-hand side of the batch reactor mass balance: dC_i/dt = Σ_j ν_ij * rate_j.
///
/// `t` is accepted for the solver signature only, temperature is constant for the whole run.
/// Indices cached in `reactions` must fit into `concentrations`.
pub fn derivatives(
    _t: f64,
    concentrations: &DVector<f64>,
    reactions: &[Reaction],
    T: f64,
    R: GasConstant,
) -> Result<DVector<f64>, KineticsError> {
    let mut dCdt = DVector::zeros(concentrations.len());
    for reaction in reactions {
        let rate = reaction.rate(concentrations.as_slice(), T, R)?;
        for (index, coeff) in &reaction.stoichiometry {
            dCdt[*index] += coeff * rate;
        }
    }
    Ok(dCdt)
}

/// Species registry plus all reactions resolved against it
#[derive(Debug, Clone)]
pub struct ReactionNetwork {
    registry: SpeciesRegistry,
    reactions: Vec<Reaction>,
    gas_constant: GasConstant,
}

impl ReactionNetwork {
    /// Resolves every record against the registry. All species names are checked here, so nothing
    /// can fail on a missing species once integration has started.
    pub fn new(
        registry: SpeciesRegistry,
        records: &[ReactionRecord],
    ) -> Result<Self, KineticsError> {
        let mut seen = HashSet::with_capacity(records.len());
        let mut reactions = Vec::with_capacity(records.len());
        for record in records {
            if !seen.insert(record.id.as_str()) {
                return Err(KineticsError::DuplicateReaction(record.id.clone()));
            }
            let reaction = record.resolve(&registry)?;
            debug!("reaction {} resolved: {:?}", reaction.id, reaction.stoichiometry);
            reactions.push(reaction);
        }
        let network = Self {
            registry,
            reactions,
            gas_constant: GasConstant::default(),
        };
        for (id, imbalance) in network.mass_imbalance() {
            warn!(
                "reaction '{}' does not conserve mass: Σν·M = {:.6e}",
                id, imbalance
            );
        }
        info!(
            "reaction network built: {} species, {} reactions",
            network.registry.len(),
            network.reactions.len()
        );
        Ok(network)
    }

    pub fn with_gas_constant(mut self, gas_constant: GasConstant) -> Self {
        self.gas_constant = gas_constant;
        self
    }

    pub fn registry(&self) -> &SpeciesRegistry {
        &self.registry
    }

    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    pub fn gas_constant(&self) -> GasConstant {
        self.gas_constant
    }

    pub fn n_species(&self) -> usize {
        self.registry.len()
    }

    /// k_j(T) for every reaction, in reaction order
    pub fn rate_constants(&self, T: f64) -> Result<Vec<f64>, KineticsError> {
        check_temperature(T)?;
        self.reactions
            .iter()
            .map(|r| r.rate_constant(T, self.gas_constant))
            .collect()
    }

    /// instantaneous rate of every reaction
    pub fn reaction_rates(
        &self,
        concentrations: &DVector<f64>,
        T: f64,
    ) -> Result<DVector<f64>, KineticsError> {
        self.check_dimension(concentrations)?;
        let k = self.rate_constants(T)?;
        Ok(DVector::from_iterator(
            self.reactions.len(),
            self.reactions
                .iter()
                .zip(k.iter())
                .map(|(r, k)| r.rate_with_constant(*k, concentrations.as_slice())),
        ))
    }

    /// dC/dt at the given state
    pub fn derivatives(
        &self,
        _t: f64,
        concentrations: &DVector<f64>,
        T: f64,
    ) -> Result<DVector<f64>, KineticsError> {
        self.check_dimension(concentrations)?;
        let k = self.rate_constants(T)?;
        let mut dCdt = DVector::zeros(self.n_species());
        self.derivatives_into(&k, concentrations.as_slice(), dCdt.as_mut_slice());
        Ok(dCdt)
    }

    /// Non-allocating form used inside the solver loop: `k` are precomputed rate constants,
    /// `out` is overwritten.
    pub fn derivatives_into(&self, k: &[f64], concentrations: &[f64], out: &mut [f64]) {
        out.iter_mut().for_each(|x| *x = 0.0);
        for (reaction, k_j) in self.reactions.iter().zip(k.iter()) {
            let rate = reaction.rate_with_constant(*k_j, concentrations);
            for (index, coeff) in &reaction.stoichiometry {
                out[*index] += coeff * rate;
            }
        }
    }

    /// analytic jacobian J_ij = ∂(dC_i/dt)/∂C_j
    pub fn jacobian(
        &self,
        _t: f64,
        concentrations: &DVector<f64>,
        T: f64,
    ) -> Result<DMatrix<f64>, KineticsError> {
        self.check_dimension(concentrations)?;
        let k = self.rate_constants(T)?;
        let n = self.n_species();
        let mut jac = DMatrix::zeros(n, n);
        self.jacobian_into(&k, concentrations.as_slice(), &mut jac);
        Ok(jac)
    }

    pub fn jacobian_into(&self, k: &[f64], concentrations: &[f64], jac: &mut DMatrix<f64>) {
        jac.fill(0.0);
        for (reaction, k_j) in self.reactions.iter().zip(k.iter()) {
            // only species present in the rate law give non-zero columns
            for term in &reaction.orders {
                let j = term.index;
                let d_rate = reaction.rate_derivative_with_constant(*k_j, concentrations, j);
                if d_rate == 0.0 {
                    continue;
                }
                for (i, coeff) in &reaction.stoichiometry {
                    jac[(*i, j)] += coeff * d_rate;
                }
            }
        }
    }

    /// Variable names of the concentrations in the symbolic form: C0, C1, ... in registry order
    pub fn unknowns(&self) -> Vec<String> {
        (0..self.n_species()).map(|i| format!("C{}", i)).collect()
    }

    /// dC_i/dt = Σ_j ν_ij * k_j * Π C^n as expressions of `unknowns()`, for precomputed `k`.
    /// A species touched by no reaction gets `Expr::Const(0.0)`.
    pub fn symbolic_derivatives(&self, k: &[f64]) -> Vec<Expr> {
        let C: Vec<Expr> = self.unknowns().into_iter().map(Expr::Var).collect();
        let mut dCdt: Vec<Option<Expr>> = vec![None; self.n_species()];
        for (reaction, k_j) in self.reactions.iter().zip(k.iter()) {
            let rate = reaction.symbolic_rate(*k_j, &C);
            for (index, coeff) in &reaction.stoichiometry {
                let term = Expr::Const(*coeff) * rate.clone();
                dCdt[*index] = Some(match dCdt[*index].take() {
                    Some(sum) => sum + term,
                    None => term,
                });
            }
        }
        dCdt.into_iter()
            .map(|eq| eq.unwrap_or(Expr::Const(0.0)))
            .collect()
    }

    /// Σ C_i * M_i
    pub fn total_mass(&self, concentrations: &DVector<f64>) -> f64 {
        concentrations.dot(&self.registry.molecular_weights())
    }

    /// reactions whose mass-weighted stoichiometry does not sum to zero (relative tolerance 1e-6)
    pub fn mass_imbalance(&self) -> Vec<(String, f64)> {
        let weights = self.registry.molecular_weights();
        self.reactions
            .iter()
            .filter_map(|r| {
                let imbalance = r.mass_imbalance(&weights);
                let scale: f64 = r
                    .stoichiometry
                    .iter()
                    .map(|(i, c)| (c * weights[*i]).abs())
                    .sum();
                if imbalance.abs() > 1e-6 * scale.max(f64::MIN_POSITIVE) {
                    Some((r.id.clone(), imbalance))
                } else {
                    None
                }
            })
            .collect()
    }

    fn check_dimension(&self, concentrations: &DVector<f64>) -> Result<(), KineticsError> {
        if concentrations.len() != self.n_species() {
            return Err(KineticsError::Domain(format!(
                "concentration vector has {} entries, network has {} species",
                concentrations.len(),
                self.n_species()
            )));
        }
        Ok(())
    }
}
