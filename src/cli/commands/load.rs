//! `load` command
//!
//! Migrates the destination schema (unless skipped), then merges the newest
//! CSV of every directory under `--csvpath` into production.

use super::common::{report_failure, DatabaseArgs, EXIT_SUCCESS};
use super::migrate::run_migrations;
use crate::config::ToolkitConfig;
use crate::core::load::{LoadOptions, LoadSummary, Loader};
use crate::domain::{LmsError, Result};
use clap::Args;
use std::path::Path;

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Root of the CSV tree written by an extraction
    #[arg(long, env = "CSV_PATH")]
    pub csvpath: String,

    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Source system used for soft-delete when a table's files are empty
    #[arg(long, env = "SOURCE_SYSTEM")]
    pub source_system: Option<String>,

    /// Do not reload files already recorded as processed
    #[arg(long)]
    pub skip_processed: bool,

    /// Do not run schema migrations before loading
    #[arg(long)]
    pub skip_migrations: bool,

    /// Log the planned SQL without connecting to the destination
    #[arg(long)]
    pub dry_run: bool,
}

impl LoadArgs {
    /// Execute the load command
    pub async fn execute(&self, config: &ToolkitConfig) -> anyhow::Result<i32> {
        tracing::info!(csvpath = %self.csvpath, dry_run = self.dry_run, "Starting load");
        match self.run(config).await {
            Ok(summary) => {
                summary.log_summary();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => Ok(report_failure("load", &e)),
        }
    }

    async fn run(&self, config: &ToolkitConfig) -> Result<LoadSummary> {
        let base = Path::new(&self.csvpath);
        if !base.is_dir() {
            return Err(LmsError::Configuration(format!(
                "CSV path {} is not a directory",
                base.display()
            )));
        }

        let adapter = self.database.adapter(&config.database, self.dry_run)?;
        adapter.test_connection().await?;

        if self.skip_migrations {
            tracing::info!("Skipping migrations");
        } else {
            run_migrations(adapter.clone()).await?;
        }

        let options = LoadOptions {
            source_system: self.source_system.clone(),
            skip_processed: self.skip_processed,
        };
        Loader::new(adapter, options).load(base).await
    }
}
