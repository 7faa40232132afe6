//! Audit configuration: where the schema and sources live, which tables each
//! source file is expected to touch, and which type keys are known not to be
//! database columns.
//!
//! Configuration is YAML. Every field is optional; missing fields fall back
//! to [`AuditConfig::default`], which describes the layout of a Next.js +
//! Supabase project (`src/lib/actions`, `src/lib/types`, one migration file).

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEMA_PATH: &str = "supabase/migrations/20260223191944_initial_schema.sql";
pub const DEFAULT_ACTIONS_DIR: &str = "src/lib/actions";
pub const DEFAULT_TYPES_DIR: &str = "src/lib/types";
pub const DEFAULT_EXTENSION: &str = "ts";

const DEFAULT_FILE_TABLES: &[(&str, &[&str])] = &[
    ("auth.ts", &["users", "otp_records", "auth_flow_tokens"]),
    (
        "event.ts",
        &["events", "categories", "event_images", "ticket_types"],
    ),
    ("profile.ts", &["users"]),
    (
        "ticket.ts",
        &["tickets", "ticket_types", "events", "event_images"],
    ),
];

const DEFAULT_NON_DB_TYPE_KEYS: &[&str] = &[
    "success",
    "message",
    "token",
    "redirectTo",
    "needsVerification",
    "attemptsRemaining",
    "resetToken",
    "purpose",
    "remainingSeconds",
    "canResend",
    "data",
    "profile",
    "imageUrl",
    "primary_image",
    "category",
    "start_ticket_price",
    "images",
    "ticket_types",
    "ticket_type",
    "event",
];

/// The two source passes of an audit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ScanKind {
    /// Data-access modules scanned with the query heuristics.
    Actions,
    /// Type/interface declarations scanned for `key:` entries.
    Types,
}

impl ScanKind {
    pub const ALL: [ScanKind; 2] = [ScanKind::Actions, ScanKind::Types];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanKind::Actions => "actions",
            ScanKind::Types => "types",
        }
    }

    /// Whether identifiers equal to an expected table name are dropped
    /// before classification.
    pub fn filters_table_names(&self) -> bool {
        matches!(self, ScanKind::Actions)
    }

    /// Whether the non-DB allow-list takes part in classification.
    pub fn uses_allow_list(&self) -> bool {
        matches!(self, ScanKind::Types)
    }
}

impl fmt::Display for ScanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// SQL file holding the `CREATE TABLE` declarations.
    pub schema: PathBuf,
    pub actions_dir: PathBuf,
    pub types_dir: PathBuf,
    /// Extension (without the dot) of the source files to scan.
    pub extension: String,
    /// Source file name to the tables it is expected to reference. Files
    /// missing here are audited against an empty column set.
    pub file_tables: BTreeMap<String, BTreeSet<String>>,
    /// Type keys that are legitimately not persisted.
    pub non_db_type_keys: BTreeSet<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            schema: PathBuf::from(DEFAULT_SCHEMA_PATH),
            actions_dir: PathBuf::from(DEFAULT_ACTIONS_DIR),
            types_dir: PathBuf::from(DEFAULT_TYPES_DIR),
            extension: DEFAULT_EXTENSION.to_string(),
            file_tables: DEFAULT_FILE_TABLES
                .iter()
                .map(|(file, tables)| {
                    (
                        file.to_string(),
                        tables.iter().map(|t| t.to_string()).collect(),
                    )
                })
                .collect(),
            non_db_type_keys: DEFAULT_NON_DB_TYPE_KEYS
                .iter()
                .map(|key| key.to_string())
                .collect(),
        }
    }
}

impl AuditConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: AuditConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config file {path:?}"))?;
        config
            .validate()
            .with_context(|| format!("Validating config file {path:?}"))?;
        debug!(
            "Loaded config from {:?} ({} mapped file(s))",
            path,
            config.file_tables.len()
        );
        Ok(config)
    }

    /// Loads `path` when given, otherwise returns the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        let mut file =
            File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Writing config file {path:?}"))?;
        file.flush()?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.normalized_extension().is_empty(),
            "Source file extension cannot be empty"
        );
        for (file, tables) in &self.file_tables {
            ensure!(!file.trim().is_empty(), "Mapped file name cannot be empty");
            ensure!(
                tables.iter().all(|t| !t.trim().is_empty()),
                "File '{file}' maps to an empty table name"
            );
        }
        Ok(())
    }

    pub fn normalized_extension(&self) -> &str {
        self.extension.trim().trim_start_matches('.')
    }

    /// Joins every relative path onto `root`.
    pub fn resolve_paths(mut self, root: &Path) -> Self {
        let join = |path: &Path| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            }
        };
        self.schema = join(&self.schema);
        self.actions_dir = join(&self.actions_dir);
        self.types_dir = join(&self.types_dir);
        self
    }

    pub fn directory(&self, kind: ScanKind) -> &Path {
        match kind {
            ScanKind::Actions => &self.actions_dir,
            ScanKind::Types => &self.types_dir,
        }
    }

    /// Tables `file_name` is expected to touch; empty when unmapped.
    pub fn expected_tables(&self, file_name: &str) -> BTreeSet<String> {
        self.file_tables.get(file_name).cloned().unwrap_or_default()
    }

    /// Allow-list in effect for `kind`.
    pub fn allow_list(&self, kind: ScanKind) -> BTreeSet<String> {
        if kind.uses_allow_list() {
            self.non_db_type_keys.clone()
        } else {
            BTreeSet::new()
        }
    }
}
