// crates/perf-ledger-core/src/rating.rs
// ============================================================================
// Module: Metric Ratings
// Description: Good / needs-improvement / poor ratings for normalized records.
// Purpose: Summarize a record against fixed web-performance thresholds.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Ratings are derived views over a [`MetricsRecord`]; they are never stored.
//! Each timing metric has a "good" ceiling and a "needs improvement" ceiling.
//! Category scores use floors instead, since higher is better.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::MetricsRecord;

// ============================================================================
// SECTION: Thresholds
// ============================================================================

/// Category score at or above which a category is good.
pub const SCORE_GOOD: f64 = 0.90;
/// Category score at or above which a category needs improvement.
pub const SCORE_AVERAGE: f64 = 0.50;

/// Upper bounds for a lower-is-better metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    /// Largest value still rated good.
    pub good: f64,
    /// Largest value still rated needs-improvement.
    pub needs_improvement: f64,
}

impl Threshold {
    /// Rates a value against this threshold.
    #[must_use]
    pub fn rate(self, value: f64) -> MetricRating {
        if value <= self.good {
            MetricRating::Good
        } else if value <= self.needs_improvement {
            MetricRating::NeedsImprovement
        } else {
            MetricRating::Poor
        }
    }
}

/// First contentful paint, milliseconds.
pub const FCP: Threshold = Threshold {
    good: 2000.0,
    needs_improvement: 4000.0,
};
/// Largest contentful paint, milliseconds.
pub const LCP: Threshold = Threshold {
    good: 2500.0,
    needs_improvement: 4000.0,
};
/// Cumulative layout shift, unitless.
pub const CLS: Threshold = Threshold {
    good: 0.1,
    needs_improvement: 0.25,
};
/// Time to interactive, milliseconds.
pub const TTI: Threshold = Threshold {
    good: 3800.0,
    needs_improvement: 7300.0,
};
/// Total blocking time, milliseconds.
pub const TBT: Threshold = Threshold {
    good: 200.0,
    needs_improvement: 600.0,
};
/// Speed index, milliseconds.
pub const SI: Threshold = Threshold {
    good: 3400.0,
    needs_improvement: 5800.0,
};

// ============================================================================
// SECTION: Ratings
// ============================================================================

/// Rating bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricRating {
    /// Within the good range.
    Good,
    /// Between the good and poor ranges.
    NeedsImprovement,
    /// Beyond the needs-improvement range.
    Poor,
}

impl MetricRating {
    /// Rates a category score in `[0, 1]`.
    #[must_use]
    pub fn for_score(score: f64) -> Self {
        if score >= SCORE_GOOD {
            Self::Good
        } else if score >= SCORE_AVERAGE {
            Self::NeedsImprovement
        } else {
            Self::Poor
        }
    }
}

/// Ratings for every rated field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRatings {
    /// Ratings per category score.
    pub scores: BTreeMap<String, MetricRating>,
    /// First contentful paint.
    pub fcp: MetricRating,
    /// Largest contentful paint.
    pub lcp: MetricRating,
    /// Cumulative layout shift.
    pub cls: MetricRating,
    /// Time to interactive.
    pub tti: MetricRating,
    /// Total blocking time.
    pub tbt: MetricRating,
    /// Speed index.
    pub si: MetricRating,
}

impl RecordRatings {
    /// Counts ratings in the poor bucket.
    #[must_use]
    pub fn poor_count(&self) -> usize {
        self.all().filter(|rating| *rating == MetricRating::Poor).count()
    }

    /// Iterates every rating, scores first.
    fn all(&self) -> impl Iterator<Item = MetricRating> + '_ {
        self.scores
            .values()
            .copied()
            .chain([self.fcp, self.lcp, self.cls, self.tti, self.tbt, self.si])
    }
}

/// Rates every score and timing metric of a record.
#[must_use]
#[allow(clippy::cast_precision_loss, reason = "Millisecond metrics are far below 2^52.")]
pub fn rate_record(record: &MetricsRecord) -> RecordRatings {
    let metrics = &record.metrics;
    RecordRatings {
        scores: record
            .scores
            .iter()
            .map(|(category, score)| (category.clone(), MetricRating::for_score(*score)))
            .collect(),
        fcp: FCP.rate(metrics.fcp as f64),
        lcp: LCP.rate(metrics.lcp as f64),
        cls: CLS.rate(metrics.cls),
        tti: TTI.rate(metrics.tti as f64),
        tbt: TBT.rate(metrics.tbt as f64),
        si: SI.rate(metrics.si as f64),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
