//! Rolling Basel traffic-light classification.
//!
//! Zone cutoffs come from the Binomial(W, p) CDF rather than the fixed Basel
//! table, so any (p, W) pair works. For p = 0.01 and W = 250 they reproduce
//! the published table: 0-4 Green, 5-9 Yellow, 10+ Red.

use serde::{Deserialize, Serialize};
use statrs::distribution::{Binomial, DiscreteCDF};
use tracing::debug;

use vg_types::{
    invalid_parameter, BacktestConfig, BreachRecord, TrafficLightConfig, TrafficLightRecord,
    VgError, VgResult, Zone,
};

/// Breach-count cutoffs for one (p, W) pair.
///
/// Stored as the first Yellow and first Red count so that degenerate pairs
/// (where even zero breaches reach the Green cutoff) stay well-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneBoundaries {
    pub window: usize,
    /// Smallest count whose cumulative probability reaches the Green cutoff.
    pub yellow_from: usize,
    /// Smallest count whose cumulative probability reaches the Yellow cutoff.
    pub red_from: usize,
}

impl ZoneBoundaries {
    pub fn from_binomial(nominal_rate: f64, config: &TrafficLightConfig) -> VgResult<Self> {
        config.validate()?;
        let binomial = Binomial::new(nominal_rate, config.window as u64)
            .map_err(|e| invalid_parameter!("nominal_rate", "{e}"))?;

        let first_reaching = |cutoff: f64| {
            (0..=config.window)
                .find(|&k| binomial.cdf(k as u64) >= cutoff)
                .unwrap_or(config.window + 1)
        };

        let boundaries = Self {
            window: config.window,
            yellow_from: first_reaching(config.green_cutoff),
            red_from: first_reaching(config.yellow_cutoff),
        };
        debug!(
            window = boundaries.window,
            nominal_rate,
            green_max = ?boundaries.green_max(),
            yellow_max = ?boundaries.yellow_max(),
            "traffic-light boundaries"
        );
        Ok(boundaries)
    }

    /// Largest Green count, if any count is Green.
    pub fn green_max(&self) -> Option<usize> {
        self.yellow_from.checked_sub(1)
    }

    /// Largest Yellow count, if the Yellow band is non-empty.
    pub fn yellow_max(&self) -> Option<usize> {
        if self.red_from > self.yellow_from {
            Some(self.red_from - 1)
        } else {
            None
        }
    }

    pub fn classify(&self, breach_count: usize) -> Zone {
        if breach_count < self.yellow_from {
            Zone::Green
        } else if breach_count < self.red_from {
            Zone::Yellow
        } else {
            Zone::Red
        }
    }
}

/// Boundaries plus one record per window endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightOutcome {
    pub boundaries: ZoneBoundaries,
    pub records: Vec<TrafficLightRecord>,
}

impl TrafficLightOutcome {
    /// Zone at the most recent window endpoint.
    pub fn latest_zone(&self) -> Option<Zone> {
        self.records.last().map(|r| r.zone)
    }

    /// Number of endpoints classified into `zone`.
    pub fn days_in(&self, zone: Zone) -> usize {
        self.records.iter().filter(|r| r.zone == zone).count()
    }
}

/// Classify every trailing W-day window of the breach series.
///
/// The window ending at index `t` covers `breaches[t + 1 - W ..= t]`; the
/// first record is dated at index `W - 1`. Partial windows are never
/// classified.
pub fn rolling_traffic_light(
    breaches: &[BreachRecord],
    config: &BacktestConfig,
) -> VgResult<TrafficLightOutcome> {
    config.validate()?;
    let window = config.traffic_light.window;
    if breaches.len() < window {
        return Err(VgError::insufficient_sample(
            "Basel traffic light",
            window,
            breaches.len(),
        ));
    }

    let nominal_rate = config.distribution.tail_probability();
    let boundaries = ZoneBoundaries::from_binomial(nominal_rate, &config.traffic_light)?;

    let mut records = Vec::with_capacity(breaches.len() - window + 1);
    let mut count = breaches[..window - 1].iter().filter(|b| b.breach).count();
    for t in (window - 1)..breaches.len() {
        if breaches[t].breach {
            count += 1;
        }
        records.push(TrafficLightRecord {
            date: breaches[t].date,
            window_breach_count: count,
            zone: boundaries.classify(count),
        });
        // Drop the oldest observation before the window slides.
        if breaches[t + 1 - window].breach {
            count -= 1;
        }
    }

    Ok(TrafficLightOutcome {
        boundaries,
        records,
    })
}
