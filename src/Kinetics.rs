/// Arrhenius rate constant with an injected gas constant.
///
///  # Examples
/// ```
/// use LigPyro::Kinetics::arrhenius::{arrhenius_rate_constant, GasConstant};
/// let k = arrhenius_rate_constant(1e13, 163254.0, 473.15, GasConstant::default()).unwrap();
/// assert!(k > 0.0);
/// ```
pub mod arrhenius;
/// Species data (molar mass, phase, initial concentration) and the registry that assigns
/// every species a stable index in the concentration vector.
pub mod species;
/// Reactions in two forms:
/// 1) `ReactionRecord` - reaction as it comes from the input table: stoichiometry and orders are maps
/// keyed by species names, so it can be inspected and evaluated against any index map
/// 2) `Reaction` - the same reaction resolved against a `SpeciesRegistry`: names are replaced with
/// indices once, so the rate law evaluated inside the solver loop never looks up a name
///
/// rate = k(T) * Π C_i^order_i, where only species listed in the orders map take part in the product
pub mod reaction;
/// Assembly of the ODE system dC/dt = Σ_j ν_ij * rate_j for a whole network, its analytic jacobian
/// and mass balance helpers
///
///  # Examples
/// ```
/// use LigPyro::Kinetics::species::{Phase, Species, SpeciesRegistry};
/// use LigPyro::Kinetics::reaction::ReactionRecord;
/// use LigPyro::Kinetics::network::ReactionNetwork;
/// use std::collections::BTreeMap;
/// let registry = SpeciesRegistry::new(vec![
///     Species::new("X", 100.0, Phase::Solid, 1.0),
///     Species::new("Y", 100.0, Phase::Gas, 0.0),
/// ])
/// .unwrap();
/// let reaction = ReactionRecord::new(
///     "R1",
///     BTreeMap::from([("X".to_string(), -1.0), ("Y".to_string(), 1.0)]),
///     BTreeMap::from([("X".to_string(), 1.0)]),
///     Phase::Solid,
///     1e13,
///     163254.0,
///     false,
/// );
/// let network = ReactionNetwork::new(registry, &[reaction]).unwrap();
/// let c0 = network.registry().initial_state();
/// let dcdt = network.derivatives(0.0, &c0, 473.15).unwrap();
/// assert!(dcdt[0] < 0.0 && dcdt[1] > 0.0);
/// ```
pub mod network;
