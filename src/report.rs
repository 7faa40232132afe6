//! Audit report model and its JSON / table renderings.
//!
//! The JSON shape is a nested mapping:
//!
//! ```text
//! { "actions": { "<file>": { "db_only": { total, matched, percentage,
//!                                          unmatched, excluded_non_db } } },
//!   "types":   { ... same ... },
//!   "overall": { "db_only": { total, matched, percentage },
//!                "actions": { ... }, "types": { ... } } }
//! ```

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde::Serialize;

use crate::{
    classify::Classification,
    config::ScanKind,
    metrics::{Metrics, MetricsAccumulator},
    table::{Align, Table},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub db_only: FileMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileMetrics {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub unmatched: BTreeSet<String>,
    pub excluded_non_db: BTreeSet<String>,
}

impl From<Classification> for FileReport {
    fn from(classification: Classification) -> Self {
        let metrics = classification.metrics();
        Self {
            db_only: FileMetrics {
                metrics,
                unmatched: classification.unmatched,
                excluded_non_db: classification.excluded,
            },
        }
    }
}

impl FileReport {
    pub fn metrics(&self) -> Metrics {
        self.db_only.metrics
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallReport {
    pub db_only: Metrics,
    pub actions: Metrics,
    pub types: Metrics,
}

impl From<&MetricsAccumulator> for OverallReport {
    fn from(acc: &MetricsAccumulator) -> Self {
        Self {
            db_only: acc.overall(),
            actions: acc.group(ScanKind::Actions),
            types: acc.group(ScanKind::Types),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub actions: BTreeMap<String, FileReport>,
    pub types: BTreeMap<String, FileReport>,
    pub overall: OverallReport,
}

impl AuditReport {
    pub fn files(&self, kind: ScanKind) -> &BTreeMap<String, FileReport> {
        match kind {
            ScanKind::Actions => &self.actions,
            ScanKind::Types => &self.types,
        }
    }

    /// Combined percentage checked against `--fail-under`.
    pub fn overall_percentage(&self) -> f64 {
        self.overall.db_only.percentage()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new([
            "scope",
            "file",
            "total",
            "matched",
            "percentage",
            "unmatched",
            "excluded_non_db",
        ])
        .align(2, Align::Right)
        .align(3, Align::Right)
        .align(4, Align::Right);

        for kind in ScanKind::ALL {
            for (file, report) in self.files(kind) {
                let db_only = &report.db_only;
                table.push_row([
                    kind.to_string(),
                    file.clone(),
                    db_only.metrics.total.to_string(),
                    db_only.metrics.matched.to_string(),
                    format_percentage(db_only.metrics.percentage()),
                    join(&db_only.unmatched),
                    join(&db_only.excluded_non_db),
                ]);
            }
        }
        for (scope, metrics) in [
            ("actions", self.overall.actions),
            ("types", self.overall.types),
            ("overall", self.overall.db_only),
        ] {
            table.push_row([
                scope.to_string(),
                "*".to_string(),
                metrics.total.to_string(),
                metrics.matched.to_string(),
                format_percentage(metrics.percentage()),
                String::new(),
                String::new(),
            ]);
        }
        table
    }
}

fn join(values: &BTreeSet<String>) -> String {
    itertools::join(values, ", ")
}

pub fn format_percentage(value: f64) -> String {
    format!("{value:.2}%")
}
