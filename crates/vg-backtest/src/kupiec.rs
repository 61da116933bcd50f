//! Kupiec (1995) proportion-of-failures test.
//!
//! `LR_POF = -2 [ ln L(p) - ln L(n/N) ]` for `n` breaches in `N` observations,
//! asymptotically chi-square with one degree of freedom under the null that
//! the breach probability equals `p = 1 - confidence_level`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vg_types::{
    invalid_parameter, BacktestConfig, BacktestKind, BacktestResult, BreachRecord, VgError,
    VgResult,
};

use crate::stats::{bernoulli_log_likelihood, chi_square_p_value, ratio};

/// Kupiec statistic plus the counts it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KupiecOutcome {
    pub observations: usize,
    pub breaches: usize,
    pub expected_breaches: f64,
    pub breach_rate: f64,
    pub result: BacktestResult,
}

/// Run the POF test over a breach series.
///
/// Fails with `InsufficientSample` below `config.min_sample_size`.
pub fn kupiec_pof(breaches: &[BreachRecord], config: &BacktestConfig) -> VgResult<KupiecOutcome> {
    config.validate()?;
    if breaches.len() < config.min_sample_size {
        return Err(VgError::insufficient_sample(
            "Kupiec POF test",
            config.min_sample_size,
            breaches.len(),
        ));
    }
    let hits = breaches.iter().filter(|b| b.breach).count();
    kupiec_from_counts(
        breaches.len(),
        hits,
        config.distribution.tail_probability(),
        config.significance_level,
    )
}

/// POF test from raw counts. Does not enforce a minimum sample.
///
/// Zero breaches give `-2 N ln(1 - p)`, which rejects when `N p` is large
/// enough (e.g. N = 250, p = 0.01 gives p-value 0.025).
pub fn kupiec_from_counts(
    observations: usize,
    breaches: usize,
    nominal_rate: f64,
    significance_level: f64,
) -> VgResult<KupiecOutcome> {
    if observations == 0 {
        return Err(VgError::insufficient_sample("Kupiec POF test", 1, 0));
    }
    if !(nominal_rate > 0.0 && nominal_rate < 1.0) {
        return Err(invalid_parameter!(
            "nominal_rate",
            "must lie in (0, 1), got {nominal_rate}"
        ));
    }
    if breaches > observations {
        return Err(invalid_parameter!(
            "breaches",
            "{breaches} breaches exceed {observations} observations"
        ));
    }

    let non_breaches = observations - breaches;
    let empirical = ratio(breaches, observations);

    let ln_null = bernoulli_log_likelihood(non_breaches, breaches, nominal_rate);
    // With n = 0 or n = N every surviving term has ln(1) = 0.
    let ln_alt = bernoulli_log_likelihood(non_breaches, breaches, empirical);
    let statistic = (-2.0 * (ln_null - ln_alt)).max(0.0);
    let p_value = chi_square_p_value(statistic, 1)?;

    debug!(
        observations,
        breaches,
        statistic,
        p_value,
        "Kupiec POF computed"
    );

    Ok(KupiecOutcome {
        observations,
        breaches,
        expected_breaches: observations as f64 * nominal_rate,
        breach_rate: empirical,
        result: BacktestResult::new(
            BacktestKind::KupiecPof,
            statistic,
            1,
            p_value,
            significance_level,
        ),
    })
}
