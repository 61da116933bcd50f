use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which hypothesis test produced a [`BacktestResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktestKind {
    /// Kupiec proportion-of-failures (unconditional coverage).
    KupiecPof,
    /// Christoffersen first-order Markov independence.
    ChristoffersenIndependence,
    /// Joint Kupiec + Christoffersen conditional coverage.
    ConditionalCoverage,
}

impl fmt::Display for BacktestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::KupiecPof => "Kupiec POF",
            Self::ChristoffersenIndependence => "Christoffersen independence",
            Self::ConditionalCoverage => "Conditional coverage",
        };
        f.write_str(name)
    }
}

/// Outcome of a test at a stated significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The risk model is judged miscalibrated.
    Reject,
    FailToReject,
}

/// Likelihood-ratio test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub test: BacktestKind,
    pub statistic: f64,
    /// Degrees of freedom of the asymptotic chi-square reference.
    pub degrees_of_freedom: u32,
    pub p_value: f64,
    pub significance_level: f64,
    pub decision: Decision,
}

impl BacktestResult {
    pub fn new(
        test: BacktestKind,
        statistic: f64,
        degrees_of_freedom: u32,
        p_value: f64,
        significance_level: f64,
    ) -> Self {
        let decision = if p_value < significance_level {
            Decision::Reject
        } else {
            Decision::FailToReject
        };
        Self {
            test,
            statistic,
            degrees_of_freedom,
            p_value,
            significance_level,
            decision,
        }
    }

    pub fn rejected(&self) -> bool {
        self.decision == Decision::Reject
    }
}

/// Basel traffic-light zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Green,
    Yellow,
    Red,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Green => f.write_str("GREEN"),
            Self::Yellow => f.write_str("YELLOW"),
            Self::Red => f.write_str("RED"),
        }
    }
}

/// Summary of one rolling window, dated at its last observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficLightRecord {
    pub date: NaiveDate,
    pub window_breach_count: usize,
    pub zone: Zone,
}
