//! Table/column catalog extracted from a SQL schema definition.
//!
//! The extractor is a tolerant text scanner, not a SQL parser. It locates
//! every `CREATE TABLE [IF NOT EXISTS] name ( ... );` block and takes the
//! leading identifier of each column definition inside the body. Constraint
//! lines (`PRIMARY KEY`, `FOREIGN KEY`, `UNIQUE`, `CHECK`, `CONSTRAINT`),
//! comments, and blank lines never introduce a column.
//!
//! Each line of a multi-line body yields at most one column, its leading
//! identifier. A body written on a single line (`users (id uuid, email text)`)
//! is split at commas outside parentheses and string literals so each
//! definition is still seen on its own.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

const CONSTRAINT_PREFIXES: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY KEY",
    "FOREIGN KEY",
    "UNIQUE",
    "CHECK",
];

fn table_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([a-zA-Z_][a-zA-Z0-9_]*)\s*\((.*?)\);",
        )
        .expect("table block pattern is valid")
    })
}

fn column_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*([a-z_][a-z0-9_]*)\s+").expect("column pattern is valid")
    })
}

/// Mapping from table name to the set of its declared column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnCatalog {
    tables: BTreeMap<String, BTreeSet<String>>,
}

impl ColumnCatalog {
    /// Builds the catalog from raw schema text. Text without any table block
    /// yields an empty catalog.
    pub fn parse(sql: &str) -> Self {
        let mut tables = BTreeMap::new();
        for captures in table_block_regex().captures_iter(sql) {
            let name = captures[1].to_string();
            let columns = parse_table_body(&captures[2]);
            // A redeclared table replaces the earlier definition.
            tables.insert(name, columns);
        }
        Self { tables }
    }

    /// Reads and parses a schema file. Read failures are fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let sql = fs::read_to_string(path)
            .with_context(|| format!("Reading schema from {path:?}"))?;
        Ok(Self::parse(&sql))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn columns(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.tables.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.tables
            .iter()
            .map(|(name, columns)| (name.as_str(), columns))
    }

    /// Union of the columns of every listed table. Tables absent from the
    /// catalog contribute nothing.
    pub fn columns_for<'a, I>(&self, tables: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        tables
            .into_iter()
            .filter_map(|table| self.tables.get(table))
            .flat_map(|columns| columns.iter().cloned())
            .collect()
    }
}

fn parse_table_body(body: &str) -> BTreeSet<String> {
    let definitions = if body.trim().contains('\n') {
        body.lines().collect::<Vec<_>>()
    } else {
        split_top_level(strip_line_comment(body))
    };
    definitions
        .into_iter()
        .filter_map(column_name)
        .map(str::to_string)
        .collect()
}

fn column_name(definition: &str) -> Option<&str> {
    let trimmed = definition.trim();
    if trimmed.is_empty() || trimmed.starts_with("--") {
        return None;
    }
    let upper = trimmed.to_ascii_uppercase();
    if CONSTRAINT_PREFIXES
        .iter()
        .any(|prefix| upper.starts_with(prefix))
    {
        return None;
    }
    // Trimming dropped the whitespace that used to follow a bare `name type`
    // at the end of a single-line body.
    let padded = format!("{trimmed} ");
    let end = column_regex().captures(&padded)?.get(1)?.end();
    Some(&trimmed[..end])
}

fn strip_line_comment(line: &str) -> &str {
    let mut in_literal = false;
    let mut prev_dash = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '\'' => in_literal = !in_literal,
            '-' if !in_literal && prev_dash => return &line[..idx - 1],
            _ => {}
        }
        prev_dash = ch == '-' && !in_literal;
    }
    line
}

/// Splits at commas outside parentheses and `'...'` literals, so
/// `numeric(10, 2)` and `DEFAULT 'a, b'` stay single definitions.
fn split_top_level(line: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_literal = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '\'' => in_literal = !in_literal,
            _ if in_literal => {}
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&line[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&line[start..]);
    parts
}
