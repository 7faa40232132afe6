mod common;

use std::collections::{BTreeMap, BTreeSet};

use common::{TestWorkspace, project_root};
use schema_audit::{
    audit::{self, SourceFile, Sources},
    catalog::ColumnCatalog,
    config::{AuditConfig, ScanKind},
};

fn users_config() -> AuditConfig {
    AuditConfig {
        file_tables: BTreeMap::from([(
            "profile.ts".to_string(),
            BTreeSet::from(["users".to_string()]),
        )]),
        ..AuditConfig::default()
    }
}

#[test]
fn single_segment_projection_tokens_are_not_compared() {
    let catalog = ColumnCatalog::parse(
        "CREATE TABLE IF NOT EXISTS users (id uuid, email text, created_at timestamptz);",
    );
    let sources = Sources {
        actions: vec![SourceFile::new("profile.ts", ".select('created_at, email')")],
        types: Vec::new(),
    };

    let fields = audit::extract_fields(ScanKind::Actions, &sources.actions[0].text);
    assert_eq!(fields, BTreeSet::from(["created_at".to_string()]));

    let report = audit::audit_sources(&catalog, &users_config(), &sources);
    let db_only = &report.actions["profile.ts"].db_only;
    assert_eq!(db_only.metrics.total, 1);
    assert_eq!(db_only.metrics.matched, 1);
    assert_eq!(db_only.metrics.percentage(), 100.0);
    assert!(db_only.unmatched.is_empty());
}

#[test]
fn empty_schema_yields_degenerate_full_alignment() {
    let catalog = ColumnCatalog::parse("-- nothing here yet\n");
    let sources = Sources {
        actions: vec![SourceFile::new(
            "profile.ts",
            ".update({ full_name: n }).eq('user_id', id)",
        )],
        types: vec![SourceFile::new("profile.ts", "  user_id: string;\n")],
    };
    let report = audit::audit_sources(&catalog, &users_config(), &sources);
    assert_eq!(report.overall.db_only.total, 0);
    assert_eq!(report.overall_percentage(), 100.0);
    assert_eq!(
        report.actions["profile.ts"].db_only.excluded_non_db.len(),
        2
    );
}

#[test]
fn run_audit_reads_sample_project() {
    let config = AuditConfig::default().resolve_paths(&project_root());
    let report = audit::run_audit(&config).expect("audit sample project");
    assert_eq!(report.actions.len(), 3);
    assert_eq!(report.types.len(), 1);
    assert_eq!(
        report.overall.db_only.total,
        report.overall.actions.total + report.overall.types.total
    );
}

#[test]
fn run_audit_is_deterministic() {
    let config = AuditConfig::default().resolve_paths(&project_root());
    let first = audit::run_audit(&config).expect("first run");
    let second = audit::run_audit(&config).expect("second run");
    assert_eq!(
        first.to_json().expect("json"),
        second.to_json().expect("json")
    );
}

#[test]
fn discover_sources_filters_by_extension() {
    let workspace = TestWorkspace::new();
    workspace.write("lib/b.ts", "");
    workspace.write("lib/a.ts", "");
    workspace.write("lib/notes.md", "");
    workspace.write("lib/nested/c.ts", "");

    let files = audit::discover_sources(&workspace.path().join("lib"), "ts").expect("discover");
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.ts", "b.ts"]);
}

#[test]
fn missing_source_directory_contributes_nothing() {
    let workspace = TestWorkspace::new();
    let files =
        audit::discover_sources(&workspace.path().join("absent"), "ts").expect("discover");
    assert!(files.is_empty());
}

#[test]
fn missing_schema_file_is_fatal() {
    let workspace = TestWorkspace::new();
    let config = AuditConfig::default().resolve_paths(workspace.path());
    let err = audit::run_audit(&config).unwrap_err();
    assert!(format!("{err:#}").contains("Reading schema"));
}

#[test]
fn config_round_trips_through_yaml_file() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("audit.yml");
    let config = users_config();
    config.save(&path).expect("save config");
    let loaded = AuditConfig::load(&path).expect("load config");
    assert_eq!(loaded, config);
}
