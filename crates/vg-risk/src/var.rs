//! Parametric VaR / CVaR from a volatility forecast.

use tracing::debug;

use vg_types::{
    config_error, ensure_aligned, ConditionalMean, DistributionSpec, MeanForecast, Observation,
    VarEstimate, VgError, VgResult, VolatilityForecast,
};

use crate::distribution::TailMultipliers;

/// Turns a volatility forecast into per-day VaR and CVaR thresholds.
///
/// Multipliers are resolved once at construction; `compute` is a pure
/// elementwise map over the forecast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarCalculator {
    spec: DistributionSpec,
    mean: ConditionalMean,
    multipliers: TailMultipliers,
}

impl VarCalculator {
    pub fn new(spec: DistributionSpec, mean: ConditionalMean) -> VgResult<Self> {
        let multipliers = TailMultipliers::for_spec(&spec)?;
        debug!(
            distribution = %spec.label(),
            z = multipliers.var,
            es = multipliers.cvar,
            "resolved tail multipliers"
        );
        Ok(Self {
            spec,
            mean,
            multipliers,
        })
    }

    pub fn spec(&self) -> &DistributionSpec {
        &self.spec
    }

    pub fn multipliers(&self) -> TailMultipliers {
        self.multipliers
    }

    /// VaR/CVaR for every forecast date with a constant conditional mean.
    ///
    /// Fails on the first non-positive (or non-finite) volatility; values are
    /// never clamped.
    pub fn compute(&self, forecast: &VolatilityForecast) -> VgResult<Vec<VarEstimate>> {
        let mu = self.mean.constant().ok_or_else(|| {
            config_error!("conditional_mean is per_date but no mean series was supplied")
        })?;
        self.estimate(forecast.points().iter().map(|obs| (obs, mu)))
    }

    /// VaR/CVaR with a per-date conditional mean.
    ///
    /// Requires [`ConditionalMean::PerDate`] and a mean series covering
    /// exactly the forecast dates.
    pub fn compute_with_mean(
        &self,
        forecast: &VolatilityForecast,
        mean: &MeanForecast,
    ) -> VgResult<Vec<VarEstimate>> {
        if self.mean != ConditionalMean::PerDate {
            return Err(config_error!(
                "a mean series was supplied but conditional_mean is {:?}",
                self.mean
            ));
        }
        ensure_aligned("forecast", forecast.dates(), "conditional_mean", mean.dates())?;
        self.estimate(
            forecast
                .points()
                .iter()
                .zip(mean.points())
                .map(|(obs, mu)| (obs, mu.value)),
        )
    }

    fn estimate<'a, I>(&self, days: I) -> VgResult<Vec<VarEstimate>>
    where
        I: Iterator<Item = (&'a Observation, f64)>,
    {
        days.map(|(obs, mu)| {
            let sigma = obs.value;
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(VgError::InvalidVolatility {
                    date: obs.date,
                    value: sigma,
                });
            }
            Ok(VarEstimate {
                date: obs.date,
                var: mu + self.multipliers.var * sigma,
                cvar: mu + self.multipliers.cvar * sigma,
            })
        })
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 6, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn forecast(values: &[f64]) -> VolatilityForecast {
        VolatilityForecast::from_pairs(values.iter().enumerate().map(|(i, &v)| (day(i as i64), v)))
            .unwrap()
    }

    #[test]
    fn gaussian_var_scales_with_volatility() {
        let calc =
            VarCalculator::new(DistributionSpec::gaussian(0.99), ConditionalMean::Zero).unwrap();
        let out = calc.compute(&forecast(&[0.01, 0.02])).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[1].date, day(1));
        assert_relative_eq!(out[0].var, -0.02326348, epsilon = 1e-6);
        assert_relative_eq!(out[1].var, 2.0 * out[0].var, epsilon = 1e-12);
        assert_relative_eq!(out[0].cvar, -0.02665214, epsilon = 1e-5);
    }

    #[test]
    fn conditional_mean_shifts_both_thresholds() {
        let spec = DistributionSpec::student_t(8.0, 0.99);
        let zero = VarCalculator::new(spec, ConditionalMean::Zero).unwrap();
        let drift = VarCalculator::new(spec, ConditionalMean::Constant { mean: 0.001 }).unwrap();
        let f = forecast(&[0.015]);

        let a = zero.compute(&f).unwrap()[0];
        let b = drift.compute(&f).unwrap()[0];
        assert_relative_eq!(b.var - a.var, 0.001, epsilon = 1e-12);
        assert_relative_eq!(b.cvar - a.cvar, 0.001, epsilon = 1e-12);
    }

    #[test]
    fn cvar_is_never_less_extreme_than_var() {
        let vols: Vec<f64> = (1..=50).map(|i| 0.002 * i as f64).collect();
        for spec in [
            DistributionSpec::gaussian(0.95),
            DistributionSpec::gaussian(0.99),
            DistributionSpec::student_t(4.0, 0.99),
            DistributionSpec::student_t(8.0, 0.975),
        ] {
            let calc = VarCalculator::new(spec, ConditionalMean::Zero).unwrap();
            for est in calc.compute(&forecast(&vols)).unwrap() {
                assert!(est.cvar.abs() >= est.var.abs(), "{} on {}", spec.label(), est.date);
            }
        }
    }

    #[test]
    fn per_date_mean_is_applied_day_by_day() {
        let calc =
            VarCalculator::new(DistributionSpec::gaussian(0.99), ConditionalMean::PerDate).unwrap();
        let f = forecast(&[0.01, 0.01, 0.01]);
        let mean =
            MeanForecast::from_pairs(vec![(day(0), 0.0), (day(1), 0.002), (day(2), -0.001)])
                .unwrap();

        let out = calc.compute_with_mean(&f, &mean).unwrap();
        let z = calc.multipliers().var;
        for (est, mu) in out.iter().zip([0.0, 0.002, -0.001]) {
            assert_relative_eq!(est.var, mu + z * 0.01, epsilon = 1e-12);
        }
    }

    #[test]
    fn per_date_mean_must_match_config_and_dates() {
        let f = forecast(&[0.01, 0.01]);
        let mean = MeanForecast::from_pairs(vec![(day(0), 0.0), (day(1), 0.0)]).unwrap();

        let per_date =
            VarCalculator::new(DistributionSpec::gaussian(0.99), ConditionalMean::PerDate).unwrap();
        assert!(matches!(per_date.compute(&f), Err(VgError::Config(_))));

        let short = MeanForecast::from_pairs(vec![(day(0), 0.0)]).unwrap();
        assert!(matches!(
            per_date.compute_with_mean(&f, &short),
            Err(VgError::MisalignedSeries { .. })
        ));

        let zero =
            VarCalculator::new(DistributionSpec::gaussian(0.99), ConditionalMean::Zero).unwrap();
        assert!(matches!(
            zero.compute_with_mean(&f, &mean),
            Err(VgError::Config(_))
        ));
    }

    #[test]
    fn non_positive_volatility_is_rejected() {
        let calc =
            VarCalculator::new(DistributionSpec::gaussian(0.99), ConditionalMean::Zero).unwrap();

        for bad in [0.0, -0.01, f64::NAN] {
            let err = calc.compute(&forecast(&[0.01, bad, 0.01])).unwrap_err();
            match err {
                VgError::InvalidVolatility { date, .. } => assert_eq!(date, day(1)),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn invalid_spec_fails_construction() {
        let err = VarCalculator::new(DistributionSpec::student_t(1.0, 0.99), ConditionalMean::Zero);
        assert!(matches!(err, Err(VgError::InvalidParameter { .. })));
    }
}
