//! Destination adapter factory

use super::mssql::MssqlAdapter;
use super::postgresql::PostgresAdapter;
use super::traits::SqlAdapter;
use crate::config::{DatabaseConfig, DatabaseEngine};
use crate::domain::Result;
use std::sync::Arc;

/// Create the adapter for the configured engine
///
/// # Errors
///
/// Returns a `Configuration` error if the connection settings are unusable.
pub fn create_sql_adapter(config: &DatabaseConfig) -> Result<Arc<dyn SqlAdapter>> {
    match config.engine {
        DatabaseEngine::Postgresql => {
            let adapter = PostgresAdapter::new(config)?;
            tracing::info!(database = %adapter.target(), "Using PostgreSQL destination");
            Ok(Arc::new(adapter))
        }
        DatabaseEngine::Mssql => {
            let adapter = MssqlAdapter::new(config)?;
            tracing::info!(database = %adapter.target(), "Using SQL Server destination");
            Ok(Arc::new(adapter))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    #[test]
    fn test_factory_picks_engine() {
        let pg = create_sql_adapter(&DatabaseConfig::default()).unwrap();
        assert_eq!(pg.engine(), DatabaseEngine::Postgresql);

        let mssql = create_sql_adapter(&DatabaseConfig {
            engine: DatabaseEngine::Mssql,
            username: Some("sa".to_string()),
            password: Some(secret_string("pw".to_string())),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(mssql.engine(), DatabaseEngine::Mssql);
    }
}
