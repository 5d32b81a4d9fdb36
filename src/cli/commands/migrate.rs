//! `migrate` command

use super::common::{report_failure, DatabaseArgs, EXIT_SUCCESS};
use crate::adapters::sql::SqlAdapter;
use crate::config::ToolkitConfig;
use crate::core::migrate::{MigrationReport, Migrator};
use crate::domain::Result;
use clap::Args;
use std::sync::Arc;

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// List the scripts that would run without executing them
    #[arg(long)]
    pub dry_run: bool,
}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(&self, config: &ToolkitConfig) -> anyhow::Result<i32> {
        match self.run(config).await {
            Ok(report) => {
                println!(
                    "Migrations applied: {}, already applied: {}",
                    report.applied.len(),
                    report.skipped.len()
                );
                Ok(EXIT_SUCCESS)
            }
            Err(e) => Ok(report_failure("migrate", &e)),
        }
    }

    async fn run(&self, config: &ToolkitConfig) -> Result<MigrationReport> {
        let adapter = self.database.adapter(&config.database, self.dry_run)?;
        adapter.test_connection().await?;
        run_migrations(adapter).await
    }
}

/// Run the pending migrations and log each script applied
pub async fn run_migrations(adapter: Arc<dyn SqlAdapter>) -> Result<MigrationReport> {
    let report = Migrator::new(adapter).migrate().await?;
    for script in &report.applied {
        tracing::info!(script = %script, "Applied migration");
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sql::RecordingAdapter;
    use crate::config::DatabaseEngine;
    use crate::core::migrate::{scripts, INITIALIZE_SCRIPT};

    #[tokio::test]
    async fn test_fresh_database_runs_every_script() {
        let adapter = Arc::new(RecordingAdapter::new(DatabaseEngine::Postgresql));
        let report = run_migrations(adapter).await.unwrap();

        assert_eq!(report.applied.len(), scripts(DatabaseEngine::Postgresql).len());
        assert_eq!(report.applied[0], INITIALIZE_SCRIPT);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_exits_cleanly() {
        let args = MigrateArgs {
            database: DatabaseArgs::default(),
            dry_run: true,
        };
        let code = args.execute(&ToolkitConfig::default()).await.unwrap();
        assert_eq!(code, EXIT_SUCCESS);
    }
}
