//! Run-wide analysis parameters.
//!
//! Everything that would otherwise be "global configuration" (distribution,
//! confidence level, significance level, window sizes) lives in an explicit
//! [`BacktestConfig`] that is passed into each stage, so independent parameter
//! combinations can run side by side.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::errors::{VgError, VgResult};
use crate::invalid_parameter;

/// Minimum number of observations the coverage tests accept.
pub const DEFAULT_MIN_SAMPLE_SIZE: usize = 250;

/// Basel backtesting window in trading days.
pub const BASEL_WINDOW: usize = 250;

/// Cumulative binomial probability at which the Yellow zone starts.
pub const BASEL_GREEN_CUTOFF: f64 = 0.95;

/// Cumulative binomial probability at which the Red zone starts.
pub const BASEL_YELLOW_CUTOFF: f64 = 0.9999;

/// Significance level used for test decisions unless overridden.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Return-distribution family used to turn volatility into a tail quantile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum DistributionFamily {
    Gaussian,
    /// Student-t standardized to unit variance; requires `degrees_of_freedom > 2`.
    StudentT { degrees_of_freedom: f64 },
}

impl fmt::Display for DistributionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => write!(f, "gaussian"),
            Self::StudentT { degrees_of_freedom } => write!(f, "student_t({degrees_of_freedom})"),
        }
    }
}

/// Distribution family plus the VaR confidence level (e.g. 0.99).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSpec {
    #[serde(flatten)]
    pub family: DistributionFamily,
    pub confidence_level: f64,
}

impl DistributionSpec {
    pub fn gaussian(confidence_level: f64) -> Self {
        Self {
            family: DistributionFamily::Gaussian,
            confidence_level,
        }
    }

    pub fn student_t(degrees_of_freedom: f64, confidence_level: f64) -> Self {
        Self {
            family: DistributionFamily::StudentT { degrees_of_freedom },
            confidence_level,
        }
    }

    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    /// Nominal exceedance probability `1 - confidence_level`.
    pub fn tail_probability(&self) -> f64 {
        1.0 - self.confidence_level
    }

    pub fn validate(&self) -> VgResult<()> {
        let c = self.confidence_level;
        if !(c > 0.0 && c < 1.0) {
            return Err(invalid_parameter!(
                "confidence_level",
                "must lie in (0, 1), got {c}"
            ));
        }
        if let DistributionFamily::StudentT { degrees_of_freedom } = self.family {
            if !degrees_of_freedom.is_finite() || degrees_of_freedom <= 2.0 {
                return Err(invalid_parameter!(
                    "degrees_of_freedom",
                    "Student-t variance is undefined for dof <= 2, got {degrees_of_freedom}"
                ));
            }
        }
        Ok(())
    }

    /// Stable label such as `student_t(8)@0.99`.
    pub fn label(&self) -> String {
        format!("{}@{}", self.family, self.confidence_level)
    }
}

impl Default for DistributionSpec {
    fn default() -> Self {
        Self::gaussian(0.99)
    }
}

/// Conditional mean `mu_t` added to the scaled quantile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionalMean {
    Zero,
    Constant { mean: f64 },
    /// Supplied per date as a [`crate::MeanForecast`] alongside the forecast.
    PerDate,
}

impl ConditionalMean {
    /// The mean shared by every date, or `None` for [`ConditionalMean::PerDate`].
    pub fn constant(&self) -> Option<f64> {
        match self {
            Self::Zero => Some(0.0),
            Self::Constant { mean } => Some(*mean),
            Self::PerDate => None,
        }
    }
}

impl Default for ConditionalMean {
    fn default() -> Self {
        Self::Zero
    }
}

/// Rolling Basel traffic-light parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightConfig {
    /// Window length in observations.
    pub window: usize,
    /// Binomial CDF level at which Green ends.
    pub green_cutoff: f64,
    /// Binomial CDF level at which Yellow ends.
    pub yellow_cutoff: f64,
}

impl TrafficLightConfig {
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn validate(&self) -> VgResult<()> {
        if self.window == 0 {
            return Err(invalid_parameter!("traffic_light.window", "must be positive"));
        }
        let (g, y) = (self.green_cutoff, self.yellow_cutoff);
        if !(g > 0.0 && g < y && y < 1.0) {
            return Err(invalid_parameter!(
                "traffic_light cutoffs",
                "need 0 < green ({g}) < yellow ({y}) < 1"
            ));
        }
        Ok(())
    }
}

impl Default for TrafficLightConfig {
    fn default() -> Self {
        Self {
            window: BASEL_WINDOW,
            green_cutoff: BASEL_GREEN_CUTOFF,
            yellow_cutoff: BASEL_YELLOW_CUTOFF,
        }
    }
}

/// Parameter set for one backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub distribution: DistributionSpec,
    #[serde(default)]
    pub conditional_mean: ConditionalMean,
    /// Test decisions reject the null when `p_value < significance_level`.
    pub significance_level: f64,
    pub min_sample_size: usize,
    #[serde(default)]
    pub traffic_light: TrafficLightConfig,
}

impl BacktestConfig {
    pub fn new(distribution: DistributionSpec) -> Self {
        Self {
            distribution,
            conditional_mean: ConditionalMean::Zero,
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            traffic_light: TrafficLightConfig::default(),
        }
    }

    pub fn with_distribution(mut self, distribution: DistributionSpec) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn with_conditional_mean(mut self, conditional_mean: ConditionalMean) -> Self {
        self.conditional_mean = conditional_mean;
        self
    }

    pub fn with_significance_level(mut self, significance_level: f64) -> Self {
        self.significance_level = significance_level;
        self
    }

    pub fn with_min_sample_size(mut self, min_sample_size: usize) -> Self {
        self.min_sample_size = min_sample_size;
        self
    }

    pub fn with_traffic_light(mut self, traffic_light: TrafficLightConfig) -> Self {
        self.traffic_light = traffic_light;
        self
    }

    pub fn validate(&self) -> VgResult<()> {
        self.distribution.validate()?;
        let a = self.significance_level;
        if !(a > 0.0 && a < 1.0) {
            return Err(invalid_parameter!(
                "significance_level",
                "must lie in (0, 1), got {a}"
            ));
        }
        if self.min_sample_size < 2 {
            return Err(invalid_parameter!(
                "min_sample_size",
                "coverage tests need at least 2 observations, got {}",
                self.min_sample_size
            ));
        }
        if let ConditionalMean::Constant { mean } = self.conditional_mean {
            if !mean.is_finite() {
                return Err(invalid_parameter!("conditional_mean", "must be finite"));
            }
        }
        self.traffic_light.validate()
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> VgResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> VgResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    pub fn to_json_string(&self) -> VgResult<String> {
        serde_json::to_string_pretty(self).map_err(VgError::from)
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self::new(DistributionSpec::default())
    }
}
