use crate::errors::VgResult;

/// A source of one-step-ahead volatility forecasts.
///
/// Implementations receive only the returns observed strictly before the
/// date being forecast; see [`crate::VolatilityForecast::walk_forward`].
pub trait VolatilityForecaster {
    /// Short name used in logs and sweep labels.
    fn name(&self) -> &str;

    /// Forecast the next period's volatility from the return history so far.
    fn forecast_next(&mut self, history: &[f64]) -> VgResult<f64>;
}
