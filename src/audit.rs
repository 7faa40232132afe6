//! Audit orchestration: schema once, then every source file of each scan
//! kind in sorted file-name order.
//!
//! [`audit_sources`] is the pure engine and works on in-memory text;
//! [`run_audit`] adds the file-system reads around it.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, info, warn};

use crate::{
    catalog::ColumnCatalog,
    classify::{classify, without_table_names},
    config::{AuditConfig, ScanKind},
    extract::{extract_query_fields, extract_type_keys},
    metrics::MetricsAccumulator,
    report::{AuditReport, FileReport, OverallReport},
};

/// One source file's name and UTF-8 contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub text: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("Source path {path:?} has no file name"))?;
        let text = fs::read_to_string(path)
            .with_context(|| format!("Reading source file {path:?}"))?;
        Ok(Self { name, text })
    }
}

/// Sources grouped by scan kind.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub actions: Vec<SourceFile>,
    pub types: Vec<SourceFile>,
}

impl Sources {
    pub fn get(&self, kind: ScanKind) -> &[SourceFile] {
        match kind {
            ScanKind::Actions => &self.actions,
            ScanKind::Types => &self.types,
        }
    }

    fn get_mut(&mut self, kind: ScanKind) -> &mut Vec<SourceFile> {
        match kind {
            ScanKind::Actions => &mut self.actions,
            ScanKind::Types => &mut self.types,
        }
    }
}

/// Raw identifiers of one file using the heuristics of `kind`.
pub fn extract_fields(kind: ScanKind, text: &str) -> BTreeSet<String> {
    match kind {
        ScanKind::Actions => extract_query_fields(text),
        ScanKind::Types => extract_type_keys(text),
    }
}

/// Extracts, filters, and classifies a single file.
pub fn audit_file(
    kind: ScanKind,
    source: &SourceFile,
    catalog: &ColumnCatalog,
    config: &AuditConfig,
) -> FileReport {
    let expected_tables = config.expected_tables(&source.name);
    if expected_tables.is_empty() {
        debug!("No expected tables mapped for {} file '{}'", kind, source.name);
    }
    let db_columns = catalog.columns_for(&expected_tables);

    let mut fields = extract_fields(kind, &source.text);
    if kind.filters_table_names() {
        fields = without_table_names(&fields, &expected_tables);
    }

    let classification = classify(&fields, &db_columns, &config.allow_list(kind));
    let report = FileReport::from(classification);
    debug!(
        "{} '{}': {} extracted, {}/{} matched",
        kind,
        source.name,
        fields.len(),
        report.metrics().matched,
        report.metrics().total
    );
    report
}

/// Audits in-memory sources. Files are visited in sorted name order so
/// identical inputs always produce identical reports.
pub fn audit_sources(
    catalog: &ColumnCatalog,
    config: &AuditConfig,
    sources: &Sources,
) -> AuditReport {
    for tables in config.file_tables.values() {
        for table in tables {
            if !catalog.contains_table(table) {
                warn!("Expected table '{table}' is not declared in the schema");
            }
        }
    }

    let mut accumulator = MetricsAccumulator::new();
    let mut groups: BTreeMap<ScanKind, BTreeMap<String, FileReport>> = BTreeMap::new();
    for kind in ScanKind::ALL {
        let mut ordered: Vec<&SourceFile> = sources.get(kind).iter().collect();
        ordered.sort_by(|a, b| a.name.cmp(&b.name));

        let files = groups.entry(kind).or_default();
        for source in ordered {
            let report = audit_file(kind, source, catalog, config);
            accumulator.record(kind, report.metrics());
            files.insert(source.name.clone(), report);
        }
    }

    AuditReport {
        actions: groups.remove(&ScanKind::Actions).unwrap_or_default(),
        types: groups.remove(&ScanKind::Types).unwrap_or_default(),
        overall: OverallReport::from(&accumulator),
    }
}

/// Lists files directly inside `dir` with the given extension, sorted.
/// A missing directory contributes no files.
pub fn discover_sources(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        warn!("Source directory {dir:?} does not exist; skipping");
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Listing directory {dir:?}"))? {
        let entry = entry.with_context(|| format!("Listing directory {dir:?}"))?;
        let path = entry.path();
        let matches_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == extension);
        if matches_extension && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Reads every source file named by `config`. Any unreadable file aborts
/// the audit.
pub fn load_sources(config: &AuditConfig) -> Result<Sources> {
    let mut sources = Sources::default();
    for kind in ScanKind::ALL {
        let dir = config.directory(kind);
        for path in discover_sources(dir, config.normalized_extension())? {
            sources.get_mut(kind).push(SourceFile::read(&path)?);
        }
        debug!(
            "Discovered {} {} file(s) in {:?}",
            sources.get(kind).len(),
            kind,
            dir
        );
    }
    Ok(sources)
}

/// Reads the schema and sources named by `config` and audits them.
pub fn run_audit(config: &AuditConfig) -> Result<AuditReport> {
    let catalog = ColumnCatalog::load(&config.schema)?;
    info!(
        "Parsed {} table(s) from {:?}",
        catalog.len(),
        config.schema
    );
    let sources = load_sources(config)?;
    let report = audit_sources(&catalog, config, &sources);
    info!(
        "Overall db_only alignment: {}/{} ({}%)",
        report.overall.db_only.matched,
        report.overall.db_only.total,
        report.overall_percentage()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (\n  user_id uuid,\n  email text,\n  full_name text,\n  created_at timestamptz\n);\nCREATE TABLE IF NOT EXISTS ticket_types (\n  ticket_type_id uuid,\n  price numeric\n);";

    fn config() -> AuditConfig {
        let mut config = AuditConfig::default();
        config.file_tables = [
            ("profile.ts", vec!["users"]),
            ("ticket.ts", vec!["ticket_types", "users"]),
        ]
        .into_iter()
        .map(|(file, tables)| {
            (
                file.to_string(),
                tables.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();
        config
    }

    #[test]
    fn action_files_drop_expected_table_names() {
        let catalog = ColumnCatalog::parse(SCHEMA);
        let source = SourceFile::new(
            "ticket.ts",
            "db.from('ticket_types').select('ticket_type_id, ticket_types ( price ), user_id')",
        );
        let report = audit_file(ScanKind::Actions, &source, &catalog, &config());
        assert_eq!(report.metrics().total, 2);
        assert_eq!(report.metrics().matched, 2);
        assert!(report.db_only.excluded_non_db.is_empty());
    }

    #[test]
    fn type_files_keep_table_names_as_excluded() {
        let catalog = ColumnCatalog::parse(SCHEMA);
        let source = SourceFile::new(
            "ticket.ts",
            "export interface Ticket {\n  ticket_type_id: string;\n  ticket_types: string[];\n  redirectTo: string;\n}",
        );
        let report = audit_file(ScanKind::Types, &source, &catalog, &config());
        assert_eq!(report.metrics().total, 1);
        let excluded: Vec<&str> = report
            .db_only
            .excluded_non_db
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(excluded, vec!["redirectTo", "ticket_types"]);
    }

    #[test]
    fn unmapped_file_has_nothing_comparable() {
        let catalog = ColumnCatalog::parse(SCHEMA);
        let source = SourceFile::new("misc.ts", ".eq('user_id', id)");
        let report = audit_file(ScanKind::Actions, &source, &catalog, &config());
        assert_eq!(report.metrics().total, 0);
        assert_eq!(report.metrics().percentage(), 100.0);
        assert!(report.db_only.excluded_non_db.contains("user_id"));
    }

    #[test]
    fn audit_sources_sums_groups() {
        let catalog = ColumnCatalog::parse(SCHEMA);
        let sources = Sources {
            actions: vec![
                SourceFile::new("ticket.ts", ".select('ticket_type_id')"),
                SourceFile::new("profile.ts", ".update({ full_name: name }).eq('user_id', id)"),
            ],
            types: vec![SourceFile::new(
                "profile.ts",
                "  created_at: string;\n  success: boolean;\n",
            )],
        };
        let report = audit_sources(&catalog, &config(), &sources);
        let names: Vec<&String> = report.actions.keys().collect();
        assert_eq!(names, vec!["profile.ts", "ticket.ts"]);
        assert_eq!(report.overall.actions.total, 3);
        assert_eq!(report.overall.types.total, 1);
        assert_eq!(report.overall.db_only.total, 4);
        assert_eq!(report.overall.db_only.matched, 4);
    }
}
