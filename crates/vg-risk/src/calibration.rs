//! Variance-matching calibration of volatility forecasts.
//!
//! Rescales a forecast so that, on average, it matches the dispersion of the
//! realized returns: `sigma'_t = sigma_t * sd(r) / mean(sigma)`. Both moments
//! are taken over observations strictly before `t`, so calibration does not
//! leak the future into the forecast it corrects.

use tracing::debug;

use vg_types::{
    ensure_aligned, invalid_parameter, Observation, ReturnSeries, VgError, VgResult,
    VolatilityForecast,
};

/// Expanding-window variance matching, starting at index `warmup`.
///
/// `returns` and `forecast` must be aligned. The output is aligned with
/// `forecast.points()[warmup..]`.
pub fn calibrate_variance_matched(
    returns: &ReturnSeries,
    forecast: &VolatilityForecast,
    warmup: usize,
) -> VgResult<VolatilityForecast> {
    ensure_aligned("returns", returns.dates(), "volatility_forecast", forecast.dates())?;
    if warmup < 2 {
        return Err(invalid_parameter!(
            "warmup",
            "sample standard deviation needs at least 2 prior returns, got {warmup}"
        ));
    }
    if forecast.len() <= warmup {
        return Err(VgError::insufficient_sample(
            "variance-matched calibration",
            warmup + 1,
            forecast.len(),
        ));
    }

    let mut moments = RunningMoments::default();
    let mut sigma_sum = 0.0;
    let mut out = Vec::with_capacity(forecast.len() - warmup);

    for (t, (ret, sig)) in returns.points().iter().zip(forecast.points()).enumerate() {
        if t >= warmup {
            let mean_sigma = sigma_sum / t as f64;
            if !(mean_sigma.is_finite() && mean_sigma > 0.0) {
                return Err(VgError::InvalidVolatility {
                    date: sig.date,
                    value: mean_sigma,
                });
            }
            let scale = moments.sample_std_dev() / mean_sigma;
            out.push(Observation::new(sig.date, sig.value * scale));
        }
        moments.push(ret.value);
        sigma_sum += sig.value;
    }

    debug!(
        calibrated = out.len(),
        last_scale = moments.sample_std_dev() / (sigma_sum / forecast.len() as f64),
        "variance-matched calibration complete"
    );
    VolatilityForecast::new(out)
}

/// Welford accumulator.
#[derive(Debug, Default, Clone, Copy)]
struct RunningMoments {
    count: usize,
    mean: f64,
    m2: f64,
}

impl RunningMoments {
    fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn sample_std_dev(&self) -> f64 {
        if self.count < 2 {
            return 0.0;
        }
        (self.m2 / (self.count - 1) as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap() + chrono::Duration::days(offset)
    }

    fn pair(returns: &[f64], sigmas: &[f64]) -> (ReturnSeries, VolatilityForecast) {
        let r = ReturnSeries::from_pairs(
            returns.iter().enumerate().map(|(i, &v)| (day(i as i64), v)),
        )
        .unwrap();
        let f = VolatilityForecast::from_pairs(
            sigmas.iter().enumerate().map(|(i, &v)| (day(i as i64), v)),
        )
        .unwrap();
        (r, f)
    }

    #[test]
    fn running_moments_match_two_pass() {
        let xs = [0.01, -0.02, 0.015, 0.0, -0.005];
        let mut m = RunningMoments::default();
        xs.iter().for_each(|&x| m.push(x));

        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (xs.len() - 1) as f64;
        assert_relative_eq!(m.sample_std_dev(), var.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn scale_uses_only_prior_observations() {
        let (r, f) = pair(&[0.02, -0.02, 0.5, 0.0], &[0.01, 0.01, 0.01, 0.01]);
        let cal = calibrate_variance_matched(&r, &f, 2).unwrap();

        assert_eq!(cal.len(), 2);
        assert_eq!(cal.points()[0].date, day(2));
        // sd(0.02, -0.02) = 0.028284..., mean sigma = 0.01 ⇒ scale 2.8284
        assert_relative_eq!(cal.points()[0].value, 0.02f64 * 2.0f64.sqrt(), epsilon = 1e-12);
        // The 0.5 shock only enters from the next date on.
        assert!(cal.points()[1].value > cal.points()[0].value);
    }

    #[test]
    fn over_conservative_forecast_is_scaled_down() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 2_000;
        let rets: Vec<f64> = (0..n).map(|_| rng.gen_range(-0.017..0.017)).collect();
        // Uniform(-a, a) has sd a / sqrt(3) ≈ 0.0098; forecast is 3x too wide.
        let sigmas = vec![0.03; n];
        let (r, f) = pair(&rets, &sigmas);

        let cal = calibrate_variance_matched(&r, &f, 250).unwrap();
        let last = cal.points().last().unwrap().value;
        assert!((last - 0.0098).abs() < 0.001, "calibrated sigma {last}");
    }

    #[test]
    fn rejects_bad_inputs() {
        let (r, f) = pair(&[0.01, 0.02, 0.03], &[0.01, 0.01, 0.01]);
        assert!(matches!(
            calibrate_variance_matched(&r, &f, 1),
            Err(VgError::InvalidParameter { .. })
        ));
        assert!(matches!(
            calibrate_variance_matched(&r, &f, 3),
            Err(VgError::InsufficientSample { .. })
        ));

        let (r2, _) = pair(&[0.01, 0.02], &[0.01, 0.01]);
        assert!(matches!(
            calibrate_variance_matched(&r2, &f, 2),
            Err(VgError::MisalignedSeries { .. })
        ));

        let (r3, zeros) = pair(&[0.01, 0.02, 0.03], &[0.0, 0.0, 0.0]);
        assert!(matches!(
            calibrate_variance_matched(&r3, &zeros, 2),
            Err(VgError::InvalidVolatility { .. })
        ));
    }
}
