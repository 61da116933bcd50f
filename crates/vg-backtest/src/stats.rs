//! Likelihood helpers shared by the coverage tests.

use statrs::distribution::{ChiSquared, ContinuousCDF};

use vg_types::{invalid_parameter, VgResult};

/// `x * ln(y)` with the limiting convention `0 * ln(0) = 0`.
///
/// Only the count decides: a zero count contributes nothing regardless of
/// `y`, so empty transition types and the `n = 0` / `n = N` Kupiec cases
/// stay finite.
pub fn xlogy(x: f64, y: f64) -> f64 {
    if x == 0.0 {
        0.0
    } else {
        x * y.ln()
    }
}

/// Log-likelihood of `zeros` non-breach and `ones` breach observations under
/// a Bernoulli(`p`) model.
pub fn bernoulli_log_likelihood(zeros: usize, ones: usize, p: f64) -> f64 {
    xlogy(zeros as f64, 1.0 - p) + xlogy(ones as f64, p)
}

/// `count / total`, or 0 when `total` is 0.
pub fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Upper-tail probability `1 - F(statistic)` of a chi-square distribution.
pub fn chi_square_p_value(statistic: f64, degrees_of_freedom: u32) -> VgResult<f64> {
    let chi = ChiSquared::new(f64::from(degrees_of_freedom))
        .map_err(|e| invalid_parameter!("degrees_of_freedom", "{e}"))?;
    Ok((1.0 - chi.cdf(statistic.max(0.0))).clamp(0.0, 1.0))
}
