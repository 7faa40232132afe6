//! Partitioning of extracted identifiers against a file's expected columns.
//!
//! Only identifiers that are real columns of the file's expected tables are
//! comparable. Everything else lands in `excluded`, whether or not it is on
//! the non-DB allow-list. This makes the resulting percentage a measure of
//! how many confirmed columns were referenced, not of whether every
//! referenced field exists: a reference to a column that is missing from the
//! schema is excluded rather than reported as unmatched.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::metrics::Metrics;

/// Three disjoint sets whose union is the classified identifier set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub matched: BTreeSet<String>,
    pub unmatched: BTreeSet<String>,
    pub excluded: BTreeSet<String>,
}

impl Classification {
    pub fn metrics(&self) -> Metrics {
        Metrics::new(
            self.matched.len() + self.unmatched.len(),
            self.matched.len(),
        )
    }
}

/// Splits `items` into comparable and excluded identifiers, then scores the
/// comparable ones against `db_columns`.
///
/// `non_db` marks identifiers known to be legitimate non-persisted keys.
/// They are excluded exactly like any other identifier outside
/// `db_columns`; the list documents intent rather than changing the split.
pub fn classify(
    items: &BTreeSet<String>,
    db_columns: &BTreeSet<String>,
    non_db: &BTreeSet<String>,
) -> Classification {
    let mut comparable = BTreeSet::new();
    let mut excluded = BTreeSet::new();
    for item in items {
        if db_columns.contains(item) {
            comparable.insert(item.clone());
        } else if non_db.contains(item) {
            excluded.insert(item.clone());
        } else {
            // Unconfirmed identifiers share the excluded bucket.
            excluded.insert(item.clone());
        }
    }

    // Every comparable item is already in `db_columns`, so `unmatched` is
    // always empty and the ratio only counts confirmed columns.
    let (matched, unmatched) = comparable
        .into_iter()
        .partition(|item| db_columns.contains(item));
    Classification {
        matched,
        unmatched,
        excluded,
    }
}

/// Removes identifiers that are themselves names of the expected tables, so
/// `.select('ticket_types ( price )')` does not count `ticket_types` as a
/// column.
pub fn without_table_names(
    items: &BTreeSet<String>,
    tables: &BTreeSet<String>,
) -> BTreeSet<String> {
    items.difference(tables).cloned().collect()
}
