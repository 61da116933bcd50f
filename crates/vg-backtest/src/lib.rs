//! Regulatory VaR backtesting for VolGuard.
//!
//! Provides:
//! - Kupiec proportion-of-failures test
//! - Christoffersen independence and conditional-coverage tests
//! - Rolling Basel traffic-light classification
//! - An end-to-end pipeline and a parallel parameter sweep

pub mod christoffersen;
pub mod kupiec;
pub mod pipeline;
pub mod stats;
pub mod sweep;
pub mod traffic_light;

pub use christoffersen::{
    christoffersen, conditional_coverage, independence_test, ChristoffersenOutcome,
    IndependenceOutcome, TransitionCounts,
};
pub use kupiec::{kupiec_from_counts, kupiec_pof, KupiecOutcome};
pub use pipeline::{BacktestPipeline, BacktestReport};
pub use sweep::{run_sweep, NamedForecast, SweepGrid, SweepOutcome};
pub use traffic_light::{rolling_traffic_light, TrafficLightOutcome, ZoneBoundaries};
