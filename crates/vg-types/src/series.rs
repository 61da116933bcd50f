//! Dated time-series inputs and the per-day records derived from them.
//!
//! Input series ([`ReturnSeries`], [`VolatilityForecast`], [`MeanForecast`])
//! validate their date ordering on construction and are immutable afterwards.
//! Out-of-order dates are reported as [`VgError::MisalignedSeries`]. Derived records
//! ([`VarEstimate`], [`BreachRecord`]) are plain values recomputed by the
//! pipeline whenever inputs or parameters change.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::{VgError, VgResult};
use crate::forecast::VolatilityForecaster;
use crate::invalid_parameter;

/// A single dated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Realized log-returns, strictly time-ordered with no duplicate dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Observation>", into = "Vec<Observation>")]
pub struct ReturnSeries {
    points: Vec<Observation>,
}

impl ReturnSeries {
    pub fn new(points: Vec<Observation>) -> VgResult<Self> {
        check_ordered("returns", &points)?;
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(invalid_parameter!(
                "returns",
                "non-finite return {} on {}",
                bad.value,
                bad.date
            ));
        }
        Ok(Self { points })
    }

    pub fn from_pairs<I>(pairs: I) -> VgResult<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| Observation::new(date, value))
                .collect(),
        )
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl ExactSizeIterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Select the returns observed on exactly the given dates.
    ///
    /// Used to line realized returns up with a forecast that starts later
    /// than the return history (e.g. after a warm-up period).
    pub fn restrict_to<I>(&self, dates: I) -> VgResult<ReturnSeries>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut selected = Vec::new();
        for date in dates {
            match self.points.binary_search_by_key(&date, |p| p.date) {
                Ok(idx) => selected.push(self.points[idx]),
                Err(_) => {
                    return Err(VgError::misaligned(format!(
                        "no realized return for forecast date {date}"
                    )))
                }
            }
        }
        ReturnSeries::new(selected)
    }
}

impl TryFrom<Vec<Observation>> for ReturnSeries {
    type Error = VgError;

    fn try_from(points: Vec<Observation>) -> VgResult<Self> {
        Self::new(points)
    }
}

impl From<ReturnSeries> for Vec<Observation> {
    fn from(series: ReturnSeries) -> Self {
        series.points
    }
}

/// One-step-ahead volatility forecasts: the value dated `t` must have been
/// produced from information up to `t - 1`.
///
/// [`VolatilityForecast::new`] trusts the caller on that point (e.g. output
/// of an external GARCH fit). [`VolatilityForecast::walk_forward`] enforces it
/// by only ever handing the forecaster returns strictly before `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Observation>", into = "Vec<Observation>")]
pub struct VolatilityForecast {
    points: Vec<Observation>,
}

impl VolatilityForecast {
    pub fn new(points: Vec<Observation>) -> VgResult<Self> {
        check_ordered("volatility_forecast", &points)?;
        Ok(Self { points })
    }

    pub fn from_pairs<I>(pairs: I) -> VgResult<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| Observation::new(date, value))
                .collect(),
        )
    }

    /// Build forecasts for every return date from index `warmup` onwards.
    ///
    /// The forecaster sees `returns[..t]` when producing the value for date
    /// `t`, so the realized return it is later compared against is never in
    /// its input.
    pub fn walk_forward<F>(
        returns: &ReturnSeries,
        warmup: usize,
        forecaster: &mut F,
    ) -> VgResult<Self>
    where
        F: VolatilityForecaster + ?Sized,
    {
        if warmup == 0 {
            return Err(invalid_parameter!(
                "warmup",
                "walk-forward needs at least one prior return"
            ));
        }
        if returns.len() <= warmup {
            return Err(VgError::insufficient_sample(
                format!("walk-forward forecast ({})", forecaster.name()),
                warmup + 1,
                returns.len(),
            ));
        }

        let values = returns.values();
        let mut points = Vec::with_capacity(values.len() - warmup);
        for (t, obs) in returns.points().iter().enumerate().skip(warmup) {
            let sigma = forecaster.forecast_next(&values[..t])?;
            points.push(Observation::new(obs.date, sigma));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl ExactSizeIterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

impl TryFrom<Vec<Observation>> for VolatilityForecast {
    type Error = VgError;

    fn try_from(points: Vec<Observation>) -> VgResult<Self> {
        Self::new(points)
    }
}

impl From<VolatilityForecast> for Vec<Observation> {
    fn from(series: VolatilityForecast) -> Self {
        series.points
    }
}

/// Per-date conditional mean `mu_t`, e.g. from an ARMA mean model.
///
/// Used with [`crate::ConditionalMean::PerDate`]; must cover the same dates as
/// the volatility forecast it accompanies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Observation>", into = "Vec<Observation>")]
pub struct MeanForecast {
    points: Vec<Observation>,
}

impl MeanForecast {
    pub fn new(points: Vec<Observation>) -> VgResult<Self> {
        check_ordered("conditional_mean", &points)?;
        if let Some(bad) = points.iter().find(|p| !p.value.is_finite()) {
            return Err(invalid_parameter!(
                "conditional_mean",
                "non-finite mean {} on {}",
                bad.value,
                bad.date
            ));
        }
        Ok(Self { points })
    }

    pub fn from_pairs<I>(pairs: I) -> VgResult<Self>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| Observation::new(date, value))
                .collect(),
        )
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl ExactSizeIterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }
}

impl TryFrom<Vec<Observation>> for MeanForecast {
    type Error = VgError;

    fn try_from(points: Vec<Observation>) -> VgResult<Self> {
        Self::new(points)
    }
}

impl From<MeanForecast> for Vec<Observation> {
    fn from(series: MeanForecast) -> Self {
        series.points
    }
}

/// Per-day risk thresholds, expressed as signed returns (losses are negative).
///
/// `cvar <= var` always holds as signed values. For confidence levels above
/// 0.5 both are losses and `|cvar| >= |var|`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VarEstimate {
    pub date: NaiveDate,
    pub var: f64,
    pub cvar: f64,
}

/// Whether the realized return on `date` fell below that day's VaR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachRecord {
    pub date: NaiveDate,
    pub breach: bool,
}

impl BreachRecord {
    /// 0/1 indicator form used by the statistical tests.
    pub fn indicator(&self) -> u8 {
        u8::from(self.breach)
    }
}

/// Fail with [`VgError::MisalignedSeries`] unless both date sequences are
/// identical, element by element.
pub fn ensure_aligned<L, R>(left_name: &str, left: L, right_name: &str, right: R) -> VgResult<()>
where
    L: ExactSizeIterator<Item = NaiveDate>,
    R: ExactSizeIterator<Item = NaiveDate>,
{
    if left.len() != right.len() {
        return Err(VgError::misaligned(format!(
            "{left_name} has {} observations but {right_name} has {}",
            left.len(),
            right.len()
        )));
    }
    for (idx, (l, r)) in left.zip(right).enumerate() {
        if l != r {
            return Err(VgError::misaligned(format!(
                "{left_name} date {l} != {right_name} date {r} at index {idx}"
            )));
        }
    }
    Ok(())
}

fn check_ordered(series: &str, points: &[Observation]) -> VgResult<()> {
    match points.windows(2).position(|w| w[1].date <= w[0].date) {
        Some(pos) => Err(VgError::misaligned(format!(
            "{series} date {} at index {} does not follow {}",
            points[pos + 1].date,
            pos + 1,
            points[pos].date
        ))),
        None => Ok(()),
    }
}
