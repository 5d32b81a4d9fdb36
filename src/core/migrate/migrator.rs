//! Destination schema migration
//!
//! Applies the embedded scripts that are not yet in the journal, in order.
//! Each script and its journal row commit together.

use super::scripts::{scripts, split_statements, MigrationScript, INITIALIZE_SCRIPT};
use crate::adapters::sql::{SqlAdapter, Statement};
use crate::config::DatabaseEngine;
use crate::domain::{LmsError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// Scripts applied and skipped by one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

pub struct Migrator {
    adapter: Arc<dyn SqlAdapter>,
}

impl Migrator {
    pub fn new(adapter: Arc<dyn SqlAdapter>) -> Self {
        Self { adapter }
    }

    /// Bring the destination schema up to date
    ///
    /// # Errors
    ///
    /// Returns `LmsError::Migration` naming the first script that failed;
    /// later scripts are not attempted.
    pub async fn migrate(&self) -> Result<MigrationReport> {
        tracing::info!("Begin database auto-migration");
        let engine = self.adapter.engine();

        let applied = if self.journal_exists().await? {
            self.applied_scripts().await?
        } else {
            tracing::debug!("Migration journal not found, initializing database");
            HashSet::new()
        };

        let mut report = MigrationReport::default();
        for script in scripts(engine) {
            if applied.contains(script.name) {
                tracing::debug!(script = script.name, "Migration already applied");
                report.skipped.push(script.name.to_string());
                continue;
            }

            tracing::debug!(script = script.name, "Running migration");
            self.adapter
                .execute_transaction(&script_statements(engine, script))
                .await
                .map_err(|e| LmsError::migration(script.name, e))?;
            report.applied.push(script.name.to_string());
        }

        tracing::info!(
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            "Done with database auto-migration"
        );
        Ok(report)
    }

    async fn journal_exists(&self) -> Result<bool> {
        let lookup = Statement::new(
            "MigrationJournal: exists",
            "SELECT CAST(COUNT(*) AS BIGINT) FROM INFORMATION_SCHEMA.TABLES \
             WHERE LOWER(TABLE_SCHEMA) = 'lms' AND LOWER(TABLE_NAME) = 'migrationjournal_harmonizer'",
        );
        Ok(self.adapter.query_scalar_int(&lookup).await? > 0)
    }

    async fn applied_scripts(&self) -> Result<HashSet<String>> {
        let list = Statement::new(
            "MigrationJournal: list",
            "SELECT Script FROM lms.MigrationJournal_Harmonizer",
        );
        let scripts = self.adapter.query_strings(&list).await?;
        if !scripts.iter().any(|s| s == INITIALIZE_SCRIPT) {
            tracing::warn!("Migration journal exists without the initialization script");
        }
        Ok(scripts.into_iter().collect())
    }
}

/// Statements of `script` followed by its journal insert
fn script_statements(engine: DatabaseEngine, script: &MigrationScript) -> Vec<Statement> {
    let mut statements: Vec<Statement> = split_statements(script.sql)
        .into_iter()
        .enumerate()
        .map(|(i, sql)| Statement::new(format!("{} statement {}", script.name, i + 1), sql))
        .collect();

    let placeholder = match engine {
        DatabaseEngine::Postgresql => "$1",
        DatabaseEngine::Mssql => "@P1",
    };
    statements.push(
        Statement::new(
            format!("{}: journal", script.name),
            format!("INSERT INTO lms.MigrationJournal_Harmonizer (Script) VALUES ({placeholder})"),
        )
        .with_params(vec![Some(script.name.to_string())]),
    );
    statements
}
