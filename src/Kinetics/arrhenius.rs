use crate::errors::KineticsError;

/// Universal gas constant in J/(mol·K)
pub const R_G: f64 = 8.314;

/// Gas constant used by the Arrhenius relation.
///
/// Kept as a value carried by the network instead of a global so that runs with other unit
/// systems (e.g. cal/(mol·K)) can live side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasConstant(f64);

impl GasConstant {
    pub fn new(r: f64) -> Result<Self, KineticsError> {
        if !r.is_finite() || r <= 0.0 {
            return Err(KineticsError::Domain(format!(
                "gas constant must be positive and finite, got {}",
                r
            )));
        }
        Ok(Self(r))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for GasConstant {
    fn default() -> Self {
        Self(R_G)
    }
}

/// temperature must be a finite positive number of Kelvins
pub fn check_temperature(T: f64) -> Result<(), KineticsError> {
    if !T.is_finite() || T <= 0.0 {
        return Err(KineticsError::Domain(format!(
            "temperature must be positive and finite, got {} K",
            T
        )));
    }
    Ok(())
}

/// k = A * exp(-Ea/(R*T))
///
/// # Arguments
/// * `A` - pre-exponential factor (units depend on reaction order)
/// * `Ea` - activation energy [J/mol]
/// * `T` - temperature [K]
/// * `R` - gas constant
///
/// # Returns
/// * `Err(KineticsError::Domain)` if T <= 0
pub fn arrhenius_rate_constant(
    A: f64,
    Ea: f64,
    T: f64,
    R: GasConstant,
) -> Result<f64, KineticsError> {
    check_temperature(T)?;
    Ok(A * f64::exp(-Ea / (R.value() * T)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rate_constant_value() {
        let k = arrhenius_rate_constant(1e13, 163254.0, 473.15, GasConstant::default()).unwrap();
        let k_expected = 1e13 * f64::exp(-163254.0 / (8.314 * 473.15));
        assert_relative_eq!(k, k_expected, max_relative = 1e-14);
        // roughly 1e-5 1/s at 200 C
        assert!(k > 1e-6 && k < 1e-4);
    }

    #[test]
    fn test_zero_activation_energy_gives_A() {
        let k = arrhenius_rate_constant(42.0, 0.0, 300.0, GasConstant::default()).unwrap();
        assert_eq!(k, 42.0);
    }

    #[test]
    fn test_positive_and_monotone() {
        let R = GasConstant::default();
        let temperatures = [300.0, 400.0, 500.0, 800.0, 1200.0];
        let energies = [1e3, 5e4, 1e5, 2e5];
        for &Ea in &energies {
            let mut previous = 0.0;
            for &T in &temperatures {
                let k = arrhenius_rate_constant(1e10, Ea, T, R).unwrap();
                assert!(k > 0.0);
                assert!(k > previous, "k must grow with T");
                previous = k;
            }
        }
        for &T in &temperatures {
            let mut previous = f64::INFINITY;
            for &Ea in &energies {
                let k = arrhenius_rate_constant(1e10, Ea, T, R).unwrap();
                assert!(k < previous, "k must fall with Ea");
                previous = k;
            }
        }
    }

    #[test]
    fn test_non_positive_temperature() {
        let R = GasConstant::default();
        for T in [0.0, -10.0, f64::NAN] {
            let res = arrhenius_rate_constant(1e13, 1e5, T, R);
            assert!(matches!(res, Err(KineticsError::Domain(_))));
        }
    }

    #[test]
    fn test_custom_gas_constant() {
        // cal/(mol K) with Ea in cal/mol gives the same k as SI units
        let R_cal = GasConstant::new(1.987204).unwrap();
        let R_si = GasConstant::new(8.314462618).unwrap();
        let k_cal = arrhenius_rate_constant(1e8, 20000.0, 600.0, R_cal).unwrap();
        let k_si = arrhenius_rate_constant(1e8, 20000.0 * 4.184, 600.0, R_si).unwrap();
        assert_relative_eq!(k_cal, k_si, max_relative = 1e-5);
        assert!(GasConstant::new(0.0).is_err());
        assert!(GasConstant::new(-8.314).is_err());
    }
}
