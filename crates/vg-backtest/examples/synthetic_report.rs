//! Backtest two rolling-volatility baselines on simulated GARCH(1,1) returns.
//!
//! Run with `RUST_LOG=debug` to see per-stage figures.

use anyhow::Result;
use chrono::{Datelike, NaiveDate, Weekday};
use rand::distributions::Distribution;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use statrs::distribution::StudentsT;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vg_backtest::{run_sweep, BacktestPipeline, NamedForecast, SweepGrid};
use vg_risk::{calibrate_variance_matched, RollingRmsForecaster};
use vg_types::{
    BacktestConfig, DistributionFamily, DistributionSpec, ReturnSeries, VolatilityForecast,
};

const DAYS: usize = 1_500;
const WARMUP: usize = 63;
const CALIBRATION_WARMUP: usize = 60;

fn trading_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    start
        .iter_days()
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(count)
        .collect()
}

/// GARCH(1,1) returns with unit-variance Student-t(5) shocks.
fn simulate_returns(seed: u64) -> Result<ReturnSeries> {
    let (omega, alpha, beta) = (1e-6, 0.08, 0.90);
    let nu = 5.0;
    let shocks = StudentsT::new(0.0, 1.0, nu)?;
    let unit = ((nu - 2.0) / nu).sqrt();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut variance: f64 = omega / (1.0 - alpha - beta);
    let mut pairs = Vec::with_capacity(DAYS);
    let start =
        NaiveDate::from_ymd_opt(2019, 1, 2).ok_or_else(|| anyhow::anyhow!("bad start date"))?;
    for date in trading_days(start, DAYS) {
        let r = variance.sqrt() * unit * shocks.sample(&mut rng);
        pairs.push((date, r));
        variance = omega + alpha * r * r + beta * variance;
    }
    Ok(ReturnSeries::from_pairs(pairs)?)
}

fn calibrated_rms(returns: &ReturnSeries, window: usize) -> Result<VolatilityForecast> {
    let mut forecaster = RollingRmsForecaster::new(window)?;
    let raw = VolatilityForecast::walk_forward(returns, WARMUP, &mut forecaster)?;
    let aligned = returns.restrict_to(raw.dates())?;
    Ok(calibrate_variance_matched(&aligned, &raw, CALIBRATION_WARMUP)?)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let returns = simulate_returns(7)?;
    let rms_21 = calibrated_rms(&returns, 21)?;
    let rms_63 = calibrated_rms(&returns, 63)?;
    let evaluated = returns.restrict_to(rms_21.dates())?;
    info!(observations = evaluated.len(), "simulated returns ready");

    let config = BacktestConfig::new(DistributionSpec::student_t(5.0, 0.99));
    let report = BacktestPipeline::new(config)?.run(&evaluated, &rms_21)?;
    let headline = serde_json::json!({
        "model": "rolling_rms_21",
        "distribution": config.distribution.label(),
        "summary": report.summary,
        "kupiec": report.kupiec.result,
        "independence": report.christoffersen.independence.result,
        "conditional_coverage": report.christoffersen.conditional_coverage,
        "zone_boundaries": report.traffic_light.boundaries,
        "latest_zone": report.latest_zone(),
    });
    println!("{}", serde_json::to_string_pretty(&headline)?);

    let grid = SweepGrid::new()
        .add_distribution(DistributionFamily::Gaussian)
        .add_student_t(5.0)
        .add_confidence_level(0.975)
        .add_confidence_level(0.99);
    let forecasts = [
        NamedForecast::new("rolling_rms_21", rms_21),
        NamedForecast::new("rolling_rms_63", rms_63),
    ];
    for outcome in run_sweep(&evaluated, &forecasts, &grid, &BacktestConfig::default()) {
        match &outcome.result {
            Ok(r) => println!(
                "{:<36} breaches {:>3}/{:<5.1} kupiec p={:.3} cc p={:.3} zone {}",
                outcome.label(),
                r.summary.breaches,
                r.summary.expected_breaches,
                r.kupiec.result.p_value,
                r.christoffersen.conditional_coverage.p_value,
                r.latest_zone().map_or_else(|| "-".to_string(), |z| z.to_string()),
            ),
            Err(e) => println!("{:<36} failed: {e}", outcome.label()),
        }
    }
    Ok(())
}
