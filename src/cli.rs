use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::ScanKind;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Audit how well application field usage lines up with a SQL schema",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare field usage in action and type sources against the schema
    Audit(AuditArgs),
    /// List the tables and columns parsed from a schema file
    Catalog(CatalogArgs),
    /// Print the identifiers extracted from a single source file
    Fields(FieldsArgs),
    /// Create or inspect audit configuration files
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Exit with status 1 if the overall db_only percentage is below this value
    #[arg(long = "fail-under", value_parser = parse_threshold)]
    pub fail_under: Option<f64>,
    /// Report format written to stdout
    #[arg(long, default_value = "json")]
    pub format: ReportFormat,
    /// YAML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Directory that relative configuration paths are resolved against
    #[arg(long, default_value = ".")]
    pub root: PathBuf,
    /// Override the schema file from the configuration
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
    /// Override the data-access source directory
    #[arg(long = "actions-dir")]
    pub actions_dir: Option<PathBuf>,
    /// Override the type declaration source directory
    #[arg(long = "types-dir")]
    pub types_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    /// SQL schema file to parse
    #[arg(short, long)]
    pub schema: PathBuf,
    /// Output format
    #[arg(long, default_value = "table")]
    pub format: ReportFormat,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Source file to scan
    #[arg(short, long)]
    pub input: PathBuf,
    /// Heuristics to apply: query usage (actions) or type keys (types)
    #[arg(long, default_value = "actions")]
    pub kind: ScanKind,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write the built-in default configuration as YAML
    Init(ConfigInitArgs),
    /// Print the effective configuration as YAML
    Show(ConfigShowArgs),
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Destination YAML file
    #[arg(short, long)]
    pub output: PathBuf,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct ConfigShowArgs {
    /// YAML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Json,
    Table,
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let parsed: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(format!(
            "Threshold must be a non-negative percentage, got '{value}'"
        ));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_threshold_accepts_percentages() {
        assert_eq!(parse_threshold("70"), Ok(70.0));
        assert_eq!(parse_threshold(" 62.5 "), Ok(62.5));
    }

    #[test]
    fn parse_threshold_rejects_invalid_values() {
        assert!(parse_threshold("abc").is_err());
        assert!(parse_threshold("-1").is_err());
        assert!(parse_threshold("NaN").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
