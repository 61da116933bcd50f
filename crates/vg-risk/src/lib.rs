//! Tail-risk estimation for VolGuard.
//!
//! Provides:
//! - Left-tail quantile and expected-shortfall multipliers (Gaussian, standardized Student-t)
//! - Per-day parametric VaR / CVaR from a volatility forecast
//! - Breach detection against realized returns
//! - Baseline volatility estimators and causal variance-matching calibration

pub mod breach;
pub mod calibration;
pub mod distribution;
pub mod forecast;
pub mod var;

pub use breach::{detect, BreachSummary};
pub use calibration::calibrate_variance_matched;
pub use distribution::{expected_shortfall_multiplier, quantile, TailMultipliers};
pub use forecast::{realized_volatility, RollingRmsForecaster};
pub use var::VarCalculator;
