pub mod audit;
pub mod catalog;
pub mod classify;
pub mod cli;
pub mod config;
pub mod extract;
pub mod metrics;
pub mod report;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};
use thiserror::Error;

use crate::{
    catalog::ColumnCatalog,
    cli::{Cli, Commands, ConfigCommands, ReportFormat},
    config::AuditConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

/// Overall alignment fell below the requested `--fail-under` value. The
/// report has already been written when this is returned.
#[derive(Debug, Clone, PartialEq, Error)]
#[error(
    "Schema alignment check failed: db_only percentage {}% is below threshold {}%.",
    float_text(.percentage),
    float_text(.threshold)
)]
pub struct ThresholdViolation {
    pub percentage: f64,
    pub threshold: f64,
}

/// Whole values keep one decimal (`70.0`), others print in full (`62.5`).
fn float_text(value: &f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Returns the violation when `percentage` is strictly below `threshold`.
pub fn check_threshold(
    percentage: f64,
    threshold: Option<f64>,
) -> std::result::Result<(), ThresholdViolation> {
    match threshold {
        Some(threshold) if percentage < threshold => Err(ThresholdViolation {
            percentage,
            threshold,
        }),
        _ => Ok(()),
    }
}

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("schema_audit", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Audit(args) => handle_audit(&args),
        Commands::Catalog(args) => handle_catalog(&args),
        Commands::Fields(args) => handle_fields(&args),
        Commands::Config(ConfigCommands::Init(args)) => handle_config_init(&args),
        Commands::Config(ConfigCommands::Show(args)) => handle_config_show(&args),
    }
}

fn handle_audit(args: &cli::AuditArgs) -> Result<()> {
    let mut config = AuditConfig::load_or_default(args.config.as_deref())?;
    if let Some(schema) = &args.schema {
        config.schema = schema.clone();
    }
    if let Some(dir) = &args.actions_dir {
        config.actions_dir = dir.clone();
    }
    if let Some(dir) = &args.types_dir {
        config.types_dir = dir.clone();
    }
    let config = config.resolve_paths(&args.root);
    debug!("Effective audit config: {:?}", config);

    let report = audit::run_audit(&config)?;
    match args.format {
        ReportFormat::Json => println!("{}", report.to_json()?),
        ReportFormat::Table => report.to_table().print(),
    }

    check_threshold(report.overall_percentage(), args.fail_under)?;
    Ok(())
}

fn handle_catalog(args: &cli::CatalogArgs) -> Result<()> {
    let catalog = ColumnCatalog::load(&args.schema)?;
    info!(
        "Parsed {} table(s) from {:?}",
        catalog.len(),
        args.schema
    );
    match args.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&catalog)?),
        ReportFormat::Table => {
            let mut table = table::Table::new(["table", "columns", "names"])
                .align(1, table::Align::Right);
            for (name, columns) in catalog.tables() {
                table.push_row([
                    name.to_string(),
                    columns.len().to_string(),
                    itertools::join(columns, ", "),
                ]);
            }
            table.print();
        }
    }
    Ok(())
}

fn handle_fields(args: &cli::FieldsArgs) -> Result<()> {
    let source = audit::SourceFile::read(&args.input)?;
    let fields = audit::extract_fields(args.kind, &source.text);
    info!(
        "Extracted {} {} field(s) from {:?}",
        fields.len(),
        args.kind,
        args.input
    );
    for field in fields {
        println!("{field}");
    }
    Ok(())
}

fn handle_config_init(args: &cli::ConfigInitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        bail!(
            "Config file {:?} already exists; pass --force to overwrite",
            args.output
        );
    }
    AuditConfig::default()
        .save(&args.output)
        .with_context(|| format!("Writing default config to {:?}", args.output))?;
    info!("Default audit config written to {:?}", args.output);
    Ok(())
}

fn handle_config_show(args: &cli::ConfigShowArgs) -> Result<()> {
    let config = AuditConfig::load_or_default(args.config.as_deref())?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_fails_only_when_strictly_below() {
        assert!(check_threshold(62.5, Some(70.0)).is_err());
        assert!(check_threshold(62.5, Some(50.0)).is_ok());
        assert!(check_threshold(62.5, Some(62.5)).is_ok());
        assert!(check_threshold(0.0, None).is_ok());
    }

    #[test]
    fn violation_message_names_both_values() {
        let err = check_threshold(62.5, Some(70.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema alignment check failed: db_only percentage 62.5% is below threshold 70.0%."
        );
        let err = check_threshold(100.0, Some(100.5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Schema alignment check failed: db_only percentage 100.0% is below threshold 100.5%."
        );
    }
}
