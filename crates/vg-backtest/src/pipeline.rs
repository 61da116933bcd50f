//! End-to-end backtest: forecast -> VaR/CVaR -> breaches -> coverage tests ->
//! traffic light.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use vg_risk::{detect, BreachSummary, TailMultipliers, VarCalculator};
use vg_types::{
    ensure_aligned, BacktestConfig, BreachRecord, MeanForecast, ReturnSeries, VarEstimate,
    VgResult, VolatilityForecast, Zone,
};

use crate::christoffersen::{conditional_coverage, independence_test, ChristoffersenOutcome};
use crate::kupiec::{kupiec_pof, KupiecOutcome};
use crate::traffic_light::{rolling_traffic_light, TrafficLightOutcome};

/// Everything one backtest run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub config: BacktestConfig,
    pub multipliers: TailMultipliers,
    pub var_estimates: Vec<VarEstimate>,
    pub breaches: Vec<BreachRecord>,
    pub summary: BreachSummary,
    pub kupiec: KupiecOutcome,
    pub christoffersen: ChristoffersenOutcome,
    pub traffic_light: TrafficLightOutcome,
}

impl BacktestReport {
    pub fn latest_zone(&self) -> Option<Zone> {
        self.traffic_light.latest_zone()
    }

    /// True if any of the three likelihood-ratio tests rejects.
    pub fn any_rejected(&self) -> bool {
        self.kupiec.result.rejected()
            || self.christoffersen.independence.result.rejected()
            || self.christoffersen.conditional_coverage.rejected()
    }

    pub fn to_json_string(&self) -> VgResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs every stage for one configuration.
#[derive(Debug, Clone)]
pub struct BacktestPipeline {
    config: BacktestConfig,
    calculator: VarCalculator,
}

impl BacktestPipeline {
    pub fn new(config: BacktestConfig) -> VgResult<Self> {
        config.validate()?;
        let calculator = VarCalculator::new(config.distribution, config.conditional_mean)?;
        Ok(Self { config, calculator })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Backtest `forecast` against `returns`.
    ///
    /// Both series must cover exactly the same dates. The first failing stage
    /// aborts the run.
    pub fn run(
        &self,
        returns: &ReturnSeries,
        forecast: &VolatilityForecast,
    ) -> VgResult<BacktestReport> {
        self.run_inner(returns, forecast, None)
    }

    /// Like [`BacktestPipeline::run`] with a per-date conditional mean; the
    /// config must use [`vg_types::ConditionalMean::PerDate`].
    pub fn run_with_mean(
        &self,
        returns: &ReturnSeries,
        forecast: &VolatilityForecast,
        mean: &MeanForecast,
    ) -> VgResult<BacktestReport> {
        self.run_inner(returns, forecast, Some(mean))
    }

    fn run_inner(
        &self,
        returns: &ReturnSeries,
        forecast: &VolatilityForecast,
        mean: Option<&MeanForecast>,
    ) -> VgResult<BacktestReport> {
        let label = self.config.distribution.label();
        let _span = info_span!("backtest", distribution = %label).entered();

        ensure_aligned("returns", returns.dates(), "forecast", forecast.dates())?;

        let var_estimates = match mean {
            Some(mean) => self.calculator.compute_with_mean(forecast, mean)?,
            None => self.calculator.compute(forecast)?,
        };
        let breaches = detect(returns, &var_estimates)?;
        let summary =
            BreachSummary::from_records(&breaches, self.config.distribution.tail_probability());
        debug!(
            observations = summary.observations,
            breaches = summary.breaches,
            expected = summary.expected_breaches,
            "breaches detected"
        );

        let kupiec = kupiec_pof(&breaches, &self.config)?;
        let independence = independence_test(&breaches, &self.config)?;
        let coverage =
            conditional_coverage(&kupiec, &independence, self.config.significance_level)?;
        let traffic_light = rolling_traffic_light(&breaches, &self.config)?;

        let report = BacktestReport {
            config: self.config,
            multipliers: self.calculator.multipliers(),
            var_estimates,
            breaches,
            summary,
            kupiec,
            christoffersen: ChristoffersenOutcome {
                independence,
                conditional_coverage: coverage,
            },
            traffic_light,
        };

        info!(
            observations = report.summary.observations,
            breaches = report.summary.breaches,
            kupiec_p = report.kupiec.result.p_value,
            independence_p = report.christoffersen.independence.result.p_value,
            conditional_coverage_p = report.christoffersen.conditional_coverage.p_value,
            latest_zone = ?report.latest_zone(),
            "backtest completed"
        );
        for result in [
            &report.kupiec.result,
            &report.christoffersen.independence.result,
            &report.christoffersen.conditional_coverage,
        ] {
            if result.rejected() {
                warn!(
                    test = %result.test,
                    statistic = result.statistic,
                    p_value = result.p_value,
                    "null hypothesis rejected"
                );
            }
        }
        if let Some(zone) = report.latest_zone().filter(|z| *z != Zone::Green) {
            warn!(%zone, "latest traffic-light zone is not green");
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::distributions::Distribution;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use statrs::distribution::Normal;
    use vg_types::{ConditionalMean, DistributionSpec, VgError};

    fn day(offset: usize) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 1, 2).unwrap() + chrono::Duration::days(offset as i64)
    }

    /// Gaussian returns with a slowly cycling volatility, plus that volatility.
    fn synthetic(n: usize, seed: u64) -> (ReturnSeries, Vec<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let sigmas: Vec<f64> = (0..n)
            .map(|t| 0.01 * (1.0 + 0.5 * (t as f64 / 60.0).sin()))
            .collect();
        let returns = ReturnSeries::from_pairs(
            sigmas
                .iter()
                .enumerate()
                .map(|(t, s)| (day(t), s * normal.sample(&mut rng))),
        )
        .unwrap();
        (returns, sigmas)
    }

    fn forecast(sigmas: &[f64], scale: f64) -> VolatilityForecast {
        VolatilityForecast::from_pairs(
            sigmas.iter().enumerate().map(|(t, s)| (day(t), s * scale)),
        )
        .unwrap()
    }

    #[test]
    fn produces_consistent_report() {
        let (returns, sigmas) = synthetic(750, 7);
        let pipeline = BacktestPipeline::new(BacktestConfig::default()).unwrap();
        let report = pipeline.run(&returns, &forecast(&sigmas, 1.0)).unwrap();

        assert_eq!(report.var_estimates.len(), 750);
        assert_eq!(report.breaches.len(), 750);
        assert_eq!(report.summary.breaches, report.kupiec.breaches);
        assert_eq!(report.christoffersen.independence.counts.total(), 749);
        assert_eq!(report.traffic_light.records.len(), 750 - 250 + 1);
        assert!(report.latest_zone().is_some());
        assert!(report
            .var_estimates
            .iter()
            .all(|e| e.cvar <= e.var && e.var < 0.0));

        let json = report.to_json_string().unwrap();
        let back: BacktestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.summary, report.summary);
    }

    #[test]
    fn understated_volatility_is_flagged_everywhere() {
        let (returns, sigmas) = synthetic(500, 11);
        let pipeline = BacktestPipeline::new(BacktestConfig::default()).unwrap();
        let report = pipeline.run(&returns, &forecast(&sigmas, 1.0 / 3.0)).unwrap();

        // A 99% VaR at a third of the true volatility is breached about 22% of days.
        assert!(report.summary.breach_rate > 0.1);
        assert!(report.kupiec.result.rejected());
        assert!(report.christoffersen.conditional_coverage.rejected());
        assert!(report.any_rejected());
        assert_eq!(report.latest_zone(), Some(Zone::Red));
    }

    #[test]
    fn conditional_mean_shifts_thresholds() {
        let (returns, sigmas) = synthetic(300, 3);
        let base = BacktestConfig::default();
        let shifted = base.with_conditional_mean(ConditionalMean::Constant { mean: 0.001 });

        let a = BacktestPipeline::new(base)
            .unwrap()
            .run(&returns, &forecast(&sigmas, 1.0))
            .unwrap();
        let b = BacktestPipeline::new(shifted)
            .unwrap()
            .run(&returns, &forecast(&sigmas, 1.0))
            .unwrap();

        for (x, y) in a.var_estimates.iter().zip(&b.var_estimates) {
            assert!((y.var - x.var - 0.001).abs() < 1e-12);
        }
    }

    #[test]
    fn rejects_misaligned_inputs() {
        let (returns, sigmas) = synthetic(300, 5);
        let pipeline = BacktestPipeline::new(BacktestConfig::default()).unwrap();

        // One element short.
        let short = forecast(&sigmas[..299], 1.0);
        assert!(matches!(
            pipeline.run(&returns, &short),
            Err(VgError::MisalignedSeries { .. })
        ));

        // Same length, dates shifted by one day.
        let shifted = VolatilityForecast::from_pairs(
            sigmas.iter().enumerate().map(|(t, s)| (day(t + 1), *s)),
        )
        .unwrap();
        assert!(matches!(
            pipeline.run(&returns, &shifted),
            Err(VgError::MisalignedSeries { .. })
        ));
    }

    #[test]
    fn swapped_forecast_dates_never_reach_the_calculator() {
        let (returns, sigmas) = synthetic(300, 5);
        let pipeline = BacktestPipeline::new(BacktestConfig::default()).unwrap();

        let mut pairs: Vec<(NaiveDate, f64)> =
            sigmas.iter().enumerate().map(|(t, s)| (day(t), *s)).collect();
        pairs.swap(10, 11);
        let outcome = VolatilityForecast::from_pairs(pairs)
            .and_then(|forecast| pipeline.run(&returns, &forecast));
        assert!(matches!(outcome, Err(VgError::MisalignedSeries { .. })));
    }

    #[test]
    fn per_date_mean_matches_constant_mean_when_flat() {
        let (returns, sigmas) = synthetic(300, 13);
        let f = forecast(&sigmas, 1.0);
        let flat = MeanForecast::from_pairs((0..300).map(|t| (day(t), 0.0005))).unwrap();

        let per_date = BacktestPipeline::new(
            BacktestConfig::default().with_conditional_mean(ConditionalMean::PerDate),
        )
        .unwrap();
        let constant = BacktestPipeline::new(
            BacktestConfig::default()
                .with_conditional_mean(ConditionalMean::Constant { mean: 0.0005 }),
        )
        .unwrap();

        let a = per_date.run_with_mean(&returns, &f, &flat).unwrap();
        let b = constant.run(&returns, &f).unwrap();
        assert_eq!(a.var_estimates, b.var_estimates);
        assert_eq!(a.breaches, b.breaches);

        assert!(matches!(
            per_date.run(&returns, &f),
            Err(VgError::Config(_))
        ));
    }

    #[test]
    fn fails_fast_on_bad_volatility() {
        let (returns, mut sigmas) = synthetic(300, 9);
        sigmas[42] = 0.0;
        let pipeline = BacktestPipeline::new(BacktestConfig::default()).unwrap();
        match pipeline.run(&returns, &forecast(&sigmas, 1.0)) {
            Err(VgError::InvalidVolatility { date, value }) => {
                assert_eq!(date, day(42));
                assert_eq!(value, 0.0);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn short_history_is_insufficient() {
        let (returns, sigmas) = synthetic(200, 1);
        let pipeline =
            BacktestPipeline::new(BacktestConfig::new(DistributionSpec::student_t(6.0, 0.99)))
                .unwrap();
        assert!(matches!(
            pipeline.run(&returns, &forecast(&sigmas, 1.0)),
            Err(VgError::InsufficientSample { .. })
        ));
    }

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let config = BacktestConfig::default().with_significance_level(1.5);
        assert!(matches!(
            BacktestPipeline::new(config),
            Err(VgError::InvalidParameter { .. })
        ));
    }
}
