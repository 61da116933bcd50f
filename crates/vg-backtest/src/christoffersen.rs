//! Christoffersen (1998) independence and conditional-coverage tests.
//!
//! Breaches are modelled as a first-order Markov chain on {0, 1}. Under the
//! null the probability of a breach does not depend on whether the previous
//! day was a breach; clustering shows up as `pi1 >> pi0`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use vg_types::{BacktestConfig, BacktestKind, BacktestResult, BreachRecord, VgError, VgResult};

use crate::kupiec::{kupiec_pof, KupiecOutcome};
use crate::stats::{bernoulli_log_likelihood, chi_square_p_value, ratio};

/// Consecutive-day transition counts; `nij` counts state `i` followed by `j`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    pub n00: usize,
    pub n01: usize,
    pub n10: usize,
    pub n11: usize,
}

impl TransitionCounts {
    pub fn from_indicators<I>(indicators: I) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut counts = Self::default();
        let mut iter = indicators.into_iter();
        let Some(mut prev) = iter.next() else {
            return counts;
        };
        for curr in iter {
            match (prev, curr) {
                (false, false) => counts.n00 += 1,
                (false, true) => counts.n01 += 1,
                (true, false) => counts.n10 += 1,
                (true, true) => counts.n11 += 1,
            }
            prev = curr;
        }
        counts
    }

    pub fn from_records(records: &[BreachRecord]) -> Self {
        Self::from_indicators(records.iter().map(|r| r.breach))
    }

    /// Number of transitions (`N - 1` for a series of length `N`).
    pub fn total(&self) -> usize {
        self.n00 + self.n01 + self.n10 + self.n11
    }

    /// P(breach | no breach yesterday).
    pub fn pi0(&self) -> f64 {
        ratio(self.n01, self.n00 + self.n01)
    }

    /// P(breach | breach yesterday).
    pub fn pi1(&self) -> f64 {
        ratio(self.n11, self.n10 + self.n11)
    }

    /// Pooled breach probability.
    pub fn pi(&self) -> f64 {
        ratio(self.n01 + self.n11, self.total())
    }

    /// `LR_IND = -2 [ ln L(pi) - ln L(pi0, pi1) ]`, clamped at 0 against
    /// rounding noise.
    pub fn independence_statistic(&self) -> f64 {
        let ln_null = bernoulli_log_likelihood(self.n00 + self.n10, self.n01 + self.n11, self.pi());
        let ln_alt = bernoulli_log_likelihood(self.n00, self.n01, self.pi0())
            + bernoulli_log_likelihood(self.n10, self.n11, self.pi1());
        (-2.0 * (ln_null - ln_alt)).max(0.0)
    }
}

/// Independence test outcome with the Markov estimates behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndependenceOutcome {
    pub counts: TransitionCounts,
    pub pi0: f64,
    pub pi1: f64,
    pub pi: f64,
    pub result: BacktestResult,
}

/// Independence plus the joint conditional-coverage result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChristoffersenOutcome {
    pub independence: IndependenceOutcome,
    pub conditional_coverage: BacktestResult,
}

/// LR_IND test over a breach series.
pub fn independence_test(
    breaches: &[BreachRecord],
    config: &BacktestConfig,
) -> VgResult<IndependenceOutcome> {
    config.validate()?;
    let required = config.min_sample_size.max(2);
    if breaches.len() < required {
        return Err(VgError::insufficient_sample(
            "Christoffersen independence test",
            required,
            breaches.len(),
        ));
    }

    let counts = TransitionCounts::from_records(breaches);
    let statistic = counts.independence_statistic();
    let p_value = chi_square_p_value(statistic, 1)?;

    debug!(
        n00 = counts.n00,
        n01 = counts.n01,
        n10 = counts.n10,
        n11 = counts.n11,
        statistic,
        p_value,
        "Christoffersen independence computed"
    );

    Ok(IndependenceOutcome {
        counts,
        pi0: counts.pi0(),
        pi1: counts.pi1(),
        pi: counts.pi(),
        result: BacktestResult::new(
            BacktestKind::ChristoffersenIndependence,
            statistic,
            1,
            p_value,
            config.significance_level,
        ),
    })
}

/// `LR_CC = LR_POF + LR_IND`, chi-square with two degrees of freedom.
pub fn conditional_coverage(
    kupiec: &KupiecOutcome,
    independence: &IndependenceOutcome,
    significance_level: f64,
) -> VgResult<BacktestResult> {
    let statistic = kupiec.result.statistic + independence.result.statistic;
    let p_value = chi_square_p_value(statistic, 2)?;
    Ok(BacktestResult::new(
        BacktestKind::ConditionalCoverage,
        statistic,
        2,
        p_value,
        significance_level,
    ))
}

/// Independence and conditional coverage in one call.
pub fn christoffersen(
    breaches: &[BreachRecord],
    config: &BacktestConfig,
) -> VgResult<ChristoffersenOutcome> {
    let kupiec = kupiec_pof(breaches, config)?;
    let independence = independence_test(breaches, config)?;
    let conditional_coverage =
        conditional_coverage(&kupiec, &independence, config.significance_level)?;
    Ok(ChristoffersenOutcome {
        independence,
        conditional_coverage,
    })
}
