//! VaR breach detection.

use serde::{Deserialize, Serialize};

use vg_types::{ensure_aligned, BreachRecord, ReturnSeries, VarEstimate, VgResult};

/// Flag every day on which the realized return fell below that day's VaR.
///
/// Returns and estimates must cover exactly the same dates in the same order;
/// anything else is [`vg_types::VgError::MisalignedSeries`].
pub fn detect(returns: &ReturnSeries, estimates: &[VarEstimate]) -> VgResult<Vec<BreachRecord>> {
    ensure_aligned(
        "returns",
        returns.dates(),
        "var_estimates",
        estimates.iter().map(|e| e.date),
    )?;

    Ok(returns
        .points()
        .iter()
        .zip(estimates)
        .map(|(obs, est)| BreachRecord {
            date: obs.date,
            breach: obs.value < est.var,
        })
        .collect())
}

/// Breach counts against the nominal exceedance rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreachSummary {
    pub observations: usize,
    pub breaches: usize,
    /// Observed breach frequency (0 for an empty series).
    pub breach_rate: f64,
    /// `1 - confidence_level`.
    pub nominal_rate: f64,
    /// `observations * nominal_rate`.
    pub expected_breaches: f64,
}

impl BreachSummary {
    pub fn from_records(records: &[BreachRecord], nominal_rate: f64) -> Self {
        let observations = records.len();
        let breaches = records.iter().filter(|r| r.breach).count();
        let breach_rate = if observations == 0 {
            0.0
        } else {
            breaches as f64 / observations as f64
        };
        Self {
            observations,
            breaches,
            breach_rate,
            nominal_rate,
            expected_breaches: observations as f64 * nominal_rate,
        }
    }
}
