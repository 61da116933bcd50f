//! Left-tail quantile and expected-shortfall multipliers.
//!
//! Both multipliers are expressed per unit of volatility for a unit-variance
//! shock, so `VaR = mu + var * sigma` and `CVaR = mu + cvar * sigma`. Student-t
//! quantiles are rescaled by `sqrt((nu - 2) / nu)` to make them comparable with
//! a volatility forecast.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal, StudentsT};

use vg_types::{invalid_parameter, DistributionFamily, DistributionSpec, VgResult};

/// Per-unit-volatility tail multipliers for one distribution spec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailMultipliers {
    /// Left-tail quantile `z` (negative for confidence levels above 0.5).
    pub var: f64,
    /// Expected-shortfall multiplier, always `<= var` as a signed value. The
    /// magnitude ordering `|cvar| >= |var|` only holds for confidence levels
    /// above 0.5.
    pub cvar: f64,
}

impl TailMultipliers {
    pub fn for_spec(spec: &DistributionSpec) -> VgResult<Self> {
        Ok(Self {
            var: quantile(spec)?,
            cvar: expected_shortfall_multiplier(spec)?,
        })
    }
}

/// Left-tail quantile at probability `1 - confidence_level` of the
/// unit-variance distribution described by `spec`.
pub fn quantile(spec: &DistributionSpec) -> VgResult<f64> {
    spec.validate()?;
    let q = spec.tail_probability();
    match spec.family {
        DistributionFamily::Gaussian => Ok(standard_normal()?.inverse_cdf(q)),
        DistributionFamily::StudentT { degrees_of_freedom } => {
            let t = students_t(degrees_of_freedom)?;
            Ok(t.inverse_cdf(q) * variance_scale(degrees_of_freedom))
        }
    }
}

/// Expected value of a unit-variance shock conditional on it falling below
/// the `1 - confidence_level` quantile.
pub fn expected_shortfall_multiplier(spec: &DistributionSpec) -> VgResult<f64> {
    spec.validate()?;
    let q = spec.tail_probability();
    match spec.family {
        DistributionFamily::Gaussian => {
            let normal = standard_normal()?;
            let z = normal.inverse_cdf(q);
            Ok(-normal.pdf(z) / q)
        }
        DistributionFamily::StudentT { degrees_of_freedom } => {
            let nu = degrees_of_freedom;
            let t = students_t(nu)?;
            let t_q = t.inverse_cdf(q);
            let es_raw = t.pdf(t_q) * (nu + t_q * t_q) / ((nu - 1.0) * q);
            Ok(-es_raw * variance_scale(nu))
        }
    }
}

/// Factor that turns a standard Student-t draw into a unit-variance one.
fn variance_scale(degrees_of_freedom: f64) -> f64 {
    ((degrees_of_freedom - 2.0) / degrees_of_freedom).sqrt()
}

fn standard_normal() -> VgResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| invalid_parameter!("normal", "{e}"))
}

fn students_t(degrees_of_freedom: f64) -> VgResult<StudentsT> {
    StudentsT::new(0.0, 1.0, degrees_of_freedom)
        .map_err(|e| invalid_parameter!("degrees_of_freedom", "{e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use vg_types::VgError;

    #[test]
    fn gaussian_quantile_is_zero_at_median() {
        let z = quantile(&DistributionSpec::gaussian(0.5)).unwrap();
        assert!(z.abs() < 1e-12);
    }

    #[test]
    fn gaussian_99_matches_reference() {
        let spec = DistributionSpec::gaussian(0.99);
        assert_relative_eq!(quantile(&spec).unwrap(), -2.326348, epsilon = 1e-5);
        assert_relative_eq!(
            expected_shortfall_multiplier(&spec).unwrap(),
            -2.665214,
            epsilon = 1e-4
        );
    }

    #[test]
    fn student_t_is_variance_normalized() {
        // t_8 0.01 quantile is -2.896459; scaled by sqrt(6/8).
        let spec = DistributionSpec::student_t(8.0, 0.99);
        let z = quantile(&spec).unwrap();
        assert_relative_eq!(z, -2.896459 * (6.0f64 / 8.0).sqrt(), epsilon = 1e-3);

        let es = expected_shortfall_multiplier(&spec).unwrap();
        assert_relative_eq!(es, -3.1105, epsilon = 1e-2);
    }

    #[test]
    fn student_t_approaches_gaussian_for_large_dof() {
        let t = quantile(&DistributionSpec::student_t(1_000.0, 0.99)).unwrap();
        let n = quantile(&DistributionSpec::gaussian(0.99)).unwrap();
        assert!((t - n).abs() < 0.01);
    }

    #[test]
    fn fat_tails_are_more_extreme_at_high_confidence() {
        let t = TailMultipliers::for_spec(&DistributionSpec::student_t(5.0, 0.999)).unwrap();
        let n = TailMultipliers::for_spec(&DistributionSpec::gaussian(0.999)).unwrap();
        assert!(t.var < n.var);
        assert!(t.cvar < n.cvar);
    }

    #[test]
    fn shortfall_dominates_quantile() {
        let specs = [
            DistributionSpec::gaussian(0.9),
            DistributionSpec::gaussian(0.95),
            DistributionSpec::gaussian(0.99),
            DistributionSpec::gaussian(0.999),
            DistributionSpec::student_t(3.0, 0.95),
            DistributionSpec::student_t(5.0, 0.99),
            DistributionSpec::student_t(8.0, 0.99),
            DistributionSpec::student_t(30.0, 0.975),
        ];
        for spec in specs {
            let m = TailMultipliers::for_spec(&spec).unwrap();
            assert!(m.var < 0.0, "{}", spec.label());
            assert!(m.cvar <= m.var, "{}: cvar {} > var {}", spec.label(), m.cvar, m.var);
        }
    }

    #[test]
    fn ordering_is_signed_below_median_confidence() {
        // At c = 0.3 the cutoff sits right of zero while the tail mean stays left of it.
        for spec in [
            DistributionSpec::gaussian(0.3),
            DistributionSpec::student_t(6.0, 0.3),
        ] {
            let m = TailMultipliers::for_spec(&spec).unwrap();
            assert!(m.var > 0.0, "{}", spec.label());
            assert!(m.cvar < 0.0, "{}", spec.label());
            assert!(m.cvar <= m.var);
        }
        let g = TailMultipliers::for_spec(&DistributionSpec::gaussian(0.3)).unwrap();
        assert_relative_eq!(g.var, 0.524401, epsilon = 1e-5);
        assert_relative_eq!(g.cvar, -0.496709, epsilon = 1e-4);
        assert!(g.cvar.abs() < g.var.abs());
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let bad = [
            DistributionSpec::gaussian(1.0),
            DistributionSpec::gaussian(0.0),
            DistributionSpec::student_t(2.0, 0.99),
            DistributionSpec::student_t(-3.0, 0.99),
        ];
        for spec in bad {
            assert!(matches!(
                quantile(&spec),
                Err(VgError::InvalidParameter { .. })
            ));
            assert!(expected_shortfall_multiplier(&spec).is_err());
        }
    }
}
