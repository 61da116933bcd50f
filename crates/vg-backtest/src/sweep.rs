//! Grid sweep over distributions, confidence levels and forecast models.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vg_types::{
    BacktestConfig, DistributionFamily, DistributionSpec, MeanForecast, ReturnSeries, VgResult,
    VolatilityForecast, Zone,
};

use crate::pipeline::{BacktestPipeline, BacktestReport};

/// Distribution families crossed with confidence levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid {
    pub distributions: Vec<DistributionFamily>,
    pub confidence_levels: Vec<f64>,
}

impl SweepGrid {
    pub fn new() -> Self {
        Self {
            distributions: Vec::new(),
            confidence_levels: Vec::new(),
        }
    }

    pub fn add_distribution(mut self, family: DistributionFamily) -> Self {
        self.distributions.push(family);
        self
    }

    pub fn add_student_t(self, degrees_of_freedom: f64) -> Self {
        self.add_distribution(DistributionFamily::StudentT { degrees_of_freedom })
    }

    pub fn add_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_levels.push(confidence_level);
        self
    }

    /// Grid points in distribution-major order.
    pub fn specs(&self) -> Vec<DistributionSpec> {
        self.distributions
            .iter()
            .flat_map(|&family| {
                self.confidence_levels
                    .iter()
                    .map(move |&confidence_level| DistributionSpec {
                        family,
                        confidence_level,
                    })
            })
            .collect()
    }

    pub fn size(&self) -> usize {
        self.distributions.len() * self.confidence_levels.len()
    }
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// A volatility forecast tagged with the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedForecast {
    pub name: String,
    pub forecast: VolatilityForecast,
    /// Per-date conditional mean, used when the base config is `per_date`.
    #[serde(default)]
    pub mean: Option<MeanForecast>,
}

impl NamedForecast {
    pub fn new(name: impl Into<String>, forecast: VolatilityForecast) -> Self {
        Self {
            name: name.into(),
            forecast,
            mean: None,
        }
    }

    pub fn with_mean(mut self, mean: MeanForecast) -> Self {
        self.mean = Some(mean);
        self
    }
}

/// Result of one (model, distribution, confidence level) combination.
#[derive(Debug)]
pub struct SweepOutcome {
    pub model: String,
    pub distribution: DistributionSpec,
    pub result: VgResult<BacktestReport>,
}

impl SweepOutcome {
    /// `model/student_t(8)@0.99` style label.
    pub fn label(&self) -> String {
        format!("{}/{}", self.model, self.distribution.label())
    }

    /// Ran cleanly, no test rejected and the latest zone is Green.
    pub fn passed(&self) -> bool {
        match &self.result {
            Ok(report) => !report.any_rejected() && report.latest_zone() == Some(Zone::Green),
            Err(_) => false,
        }
    }
}

/// Run the full pipeline for every forecast × grid point.
///
/// Combinations run in parallel and fail independently; the output is in
/// forecast-major, then grid order regardless of scheduling.
pub fn run_sweep(
    returns: &ReturnSeries,
    forecasts: &[NamedForecast],
    grid: &SweepGrid,
    base: &BacktestConfig,
) -> Vec<SweepOutcome> {
    let specs = grid.specs();
    let combos: Vec<(&NamedForecast, DistributionSpec)> = forecasts
        .iter()
        .flat_map(|f| specs.iter().map(move |&spec| (f, spec)))
        .collect();

    info!(
        models = forecasts.len(),
        grid_points = specs.len(),
        combinations = combos.len(),
        "starting sweep"
    );

    let outcomes: Vec<SweepOutcome> = combos
        .into_par_iter()
        .map(|(named, spec)| {
            let config = base.with_distribution(spec);
            let result = BacktestPipeline::new(config).and_then(|pipeline| match &named.mean {
                Some(mean) => pipeline.run_with_mean(returns, &named.forecast, mean),
                None => pipeline.run(returns, &named.forecast),
            });
            SweepOutcome {
                model: named.name.clone(),
                distribution: spec,
                result,
            }
        })
        .collect();

    for outcome in &outcomes {
        if let Err(e) = &outcome.result {
            warn!(combination = %outcome.label(), error = %e, "combination failed");
        }
    }
    info!(
        passed = outcomes.iter().filter(|o| o.passed()).count(),
        total = outcomes.len(),
        "sweep completed"
    );
    outcomes
}
