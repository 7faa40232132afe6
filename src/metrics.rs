//! Matched/total counters and their aggregation.
//!
//! Percentages are always derived from summed counts. Group and overall
//! figures never average per-file percentages.

use serde::{Serialize, Serializer};

use crate::config::ScanKind;

/// Matched and total counts for one comparison scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    pub total: usize,
    pub matched: usize,
}

impl Metrics {
    pub fn new(total: usize, matched: usize) -> Self {
        Self { total, matched }
    }

    /// `matched / total * 100` rounded to two decimals with exact ties going
    /// to the even digit; an empty comparison set counts as fully aligned.
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        round2(self.matched as f64 / self.total as f64 * 100.0)
    }

    pub fn absorb(&mut self, other: Metrics) {
        self.total += other.total;
        self.matched += other.matched;
    }
}

impl std::ops::Add for Metrics {
    type Output = Metrics;

    fn add(mut self, rhs: Metrics) -> Metrics {
        self.absorb(rhs);
        self
    }
}

impl Serialize for Metrics {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Metrics", 3)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("matched", &self.matched)?;
        state.serialize_field("percentage", &self.percentage())?;
        state.end()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Running totals for the actions group, the types group, and both combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsAccumulator {
    pub actions: Metrics,
    pub types: Metrics,
}

impl MetricsAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ScanKind, metrics: Metrics) {
        match kind {
            ScanKind::Actions => self.actions.absorb(metrics),
            ScanKind::Types => self.types.absorb(metrics),
        }
    }

    pub fn group(&self, kind: ScanKind) -> Metrics {
        match kind {
            ScanKind::Actions => self.actions,
            ScanKind::Types => self.types,
        }
    }

    pub fn overall(&self) -> Metrics {
        self.actions + self.types
    }
}
