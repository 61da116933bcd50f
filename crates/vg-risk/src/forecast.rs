//! Baseline volatility estimators.

use vg_types::{
    invalid_parameter, Observation, ReturnSeries, VgError, VgResult, VolatilityForecaster,
};

/// Forecasts next-day volatility as the root mean square of the last
/// `window` returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingRmsForecaster {
    window: usize,
}

impl RollingRmsForecaster {
    pub fn new(window: usize) -> VgResult<Self> {
        if window == 0 {
            return Err(invalid_parameter!("window", "must be positive"));
        }
        Ok(Self { window })
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl VolatilityForecaster for RollingRmsForecaster {
    fn name(&self) -> &str {
        "rolling_rms"
    }

    fn forecast_next(&mut self, history: &[f64]) -> VgResult<f64> {
        if history.len() < self.window {
            return Err(VgError::insufficient_sample(
                "rolling_rms forecast",
                self.window,
                history.len(),
            ));
        }
        let tail = &history[history.len() - self.window..];
        let mean_square = tail.iter().map(|r| r * r).sum::<f64>() / self.window as f64;
        Ok(mean_square.sqrt())
    }
}

/// Rolling realized volatility `sqrt(sum of r^2)` over `window` returns,
/// dated at the last return in each window.
///
/// This includes the return on its own date, so it is a benchmark for
/// forecasts rather than a forecast.
pub fn realized_volatility(returns: &ReturnSeries, window: usize) -> VgResult<Vec<Observation>> {
    if window == 0 {
        return Err(invalid_parameter!("window", "must be positive"));
    }
    if returns.len() < window {
        return Err(VgError::insufficient_sample(
            "realized volatility",
            window,
            returns.len(),
        ));
    }

    let points = returns.points();
    Ok(points
        .windows(window)
        .map(|w| {
            let sum_sq: f64 = w.iter().map(|p| p.value * p.value).sum();
            Observation::new(w[window - 1].date, sum_sq.sqrt())
        })
        .collect())
}
