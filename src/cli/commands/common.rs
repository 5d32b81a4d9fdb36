//! Flags and exit handling shared by the commands

use crate::adapters::sql::{create_sql_adapter, RecordingAdapter, SqlAdapter};
use crate::config::{secret_string, DatabaseConfig, DatabaseEngine};
use crate::core::extract::{Extraction, FeatureSet, RunSummary};
use crate::core::files::{CsvWriter, FileLayout};
use crate::core::sync::SyncStore;
use crate::domain::{ErrorKind, LmsError, Result};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::sync::Arc;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_CONFIGURATION: i32 = 2;

pub const FATAL_MESSAGE: &str =
    "A fatal error occurred, please review the log output for more information.";

/// Output flags of the extraction commands
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Root directory of the CSV tree
    #[arg(short, long, env = "OUTPUT_DIRECTORY", default_value = "data/")]
    pub output_directory: String,

    /// Directory holding the sync database
    #[arg(short = 'd', long, env = "SYNC_DATABASE_DIRECTORY", default_value = "data")]
    pub sync_database_directory: String,

    /// Optional tables to extract: activities, attendance, assignments, grades
    #[arg(short, long, env = "FEATURE", value_delimiter = ',')]
    pub feature: Vec<String>,
}

impl OutputArgs {
    /// Open the sync store and CSV writer for one run
    pub async fn extraction(&self, provider: &'static str) -> Result<Extraction> {
        let features = FeatureSet::parse(&self.feature)?;
        tracing::info!(
            provider,
            output = %self.output_directory,
            sync_database = %self.sync_database_directory,
            features = ?features.iter().map(|f| f.as_str()).collect::<Vec<_>>(),
            "Starting extraction"
        );

        let store = SyncStore::open(&self.sync_database_directory).await?;
        let layout = FileLayout::new(&self.output_directory, Local::now());
        Ok(Extraction::new(provider, store, CsvWriter::new(layout), features))
    }
}

/// Destination connection flags of `load` and `migrate`
///
/// Each flag overrides the `[database]` section of the configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Destination engine (mssql or postgresql)
    #[arg(long, env = "DB_ENGINE")]
    pub engine: Option<DatabaseEngine>,

    #[arg(long, env = "DB_SERVER")]
    pub server: Option<String>,

    /// Port; 5432 for PostgreSQL and 1433 for SQL Server when absent
    #[arg(long, env = "DB_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "DB_NAME")]
    pub dbname: Option<String>,

    /// Windows integrated authentication (SQL Server only)
    #[arg(long, env = "USE_INTEGRATED_SECURITY")]
    pub useintegratedsecurity: bool,

    #[arg(long, env = "DB_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Encrypt the connection
    #[arg(long, env = "ENCRYPT_SQL_CONNECTION")]
    pub encrypt: bool,

    /// Accept the server certificate without validation
    #[arg(long, env = "TRUST_SERVER_CERTIFICATE")]
    pub trust_certificate: bool,
}

impl DatabaseArgs {
    /// Apply the flags over the configured connection
    pub fn apply(&self, config: &DatabaseConfig) -> DatabaseConfig {
        let mut config = config.clone();
        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(port) = self.port {
            config.port = Some(port);
        }
        if let Some(name) = &self.dbname {
            config.database_name = name.clone();
        }
        if let Some(username) = &self.username {
            config.username = Some(username.clone());
        }
        if let Some(password) = &self.password {
            config.password = Some(secret_string(password.clone()));
        }
        config.integrated_security |= self.useintegratedsecurity;
        config.encrypt |= self.encrypt;
        config.trust_certificate |= self.trust_certificate;
        config
    }

    /// Connect to the destination, or record statements when `dry_run` is set
    pub fn adapter(&self, config: &DatabaseConfig, dry_run: bool) -> Result<Arc<dyn SqlAdapter>> {
        let config = self.apply(config);
        if config.integrated_security && config.engine == DatabaseEngine::Postgresql {
            return Err(LmsError::Configuration(
                "Integrated security is only supported for mssql".to_string(),
            ));
        }
        if dry_run {
            tracing::info!(engine = %config.engine, "Dry run, statements are logged and not executed");
            return Ok(Arc::new(RecordingAdapter::new(config.engine)));
        }
        create_sql_adapter(&config)
    }
}

/// Check a `YYYY-MM-DD` flag
pub fn check_date(flag: &str, value: &str) -> Result<()> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| {
            LmsError::Configuration(format!("Invalid {flag} '{value}', expected YYYY-MM-DD"))
        })
}

/// Exit code for a failed command
pub fn exit_code(error: &LmsError) -> i32 {
    match error.kind() {
        ErrorKind::Configuration => EXIT_CONFIGURATION,
        _ => EXIT_FATAL,
    }
}

/// Log a fatal error, print the user-facing line and return the exit code
pub fn report_failure(provider: &str, error: &LmsError) -> i32 {
    crate::log_error_with_context!(error, provider, "run", "-");
    eprintln!("{FATAL_MESSAGE}");
    exit_code(error)
}

/// Exit code of an extraction run
///
/// Skipped resources do not fail the run; they are listed in the summary log.
pub fn finish_extraction(provider: &str, result: Result<RunSummary>) -> i32 {
    match result {
        Ok(summary) => {
            if !summary.is_successful() {
                tracing::warn!(
                    provider,
                    skipped = summary.skipped_count(),
                    "Extraction finished with skipped resources"
                );
            }
            EXIT_SUCCESS
        }
        Err(e) => report_failure(provider, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(LmsError::Configuration("bad".to_string()), EXIT_CONFIGURATION; "configuration")]
    #[test_case(LmsError::Auth("401".to_string()), EXIT_FATAL; "auth")]
    #[test_case(LmsError::migration("0002", "boom"), EXIT_FATAL; "migration")]
    #[test_case(LmsError::Io("disk full".to_string()), EXIT_FATAL; "io")]
    fn test_exit_code(error: LmsError, expected: i32) {
        assert_eq!(exit_code(&error), expected);
    }

    #[test_case("2021-02-28", true)]
    #[test_case("2021-02-30", false)]
    #[test_case("02/28/2021", false)]
    fn test_check_date(value: &str, valid: bool) {
        assert_eq!(check_date("--start-date", value).is_ok(), valid);
    }

    #[test]
    fn test_database_flags_override_config() {
        let args = DatabaseArgs {
            engine: Some(DatabaseEngine::Mssql),
            server: Some("db.internal".to_string()),
            dbname: Some("lms".to_string()),
            username: Some("loader".to_string()),
            password: Some("pw".to_string()),
            trust_certificate: true,
            ..Default::default()
        };

        let config = args.apply(&DatabaseConfig::default());
        assert_eq!(config.engine, DatabaseEngine::Mssql);
        assert_eq!(config.server, "db.internal");
        assert_eq!(config.database_name, "lms");
        assert_eq!(config.port(), 1433);
        assert_eq!(config.username.as_deref(), Some("loader"));
        assert!(config.password.is_some());
        assert!(config.trust_certificate);
        assert!(!config.encrypt);
    }

    #[test]
    fn test_integrated_security_rejected_for_postgres() {
        let args = DatabaseArgs {
            useintegratedsecurity: true,
            ..Default::default()
        };
        let result = args.adapter(&DatabaseConfig::default(), true);
        assert!(matches!(result, Err(LmsError::Configuration(_))));
    }

    #[test]
    fn test_dry_run_uses_recording_adapter() {
        let adapter = DatabaseArgs::default()
            .adapter(&DatabaseConfig::default(), true)
            .unwrap();
        assert_eq!(adapter.engine(), DatabaseEngine::Postgresql);
    }
}
