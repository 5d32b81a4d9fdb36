//! PostgreSQL backend
//!
//! Connections come from a deadpool pool. TLS is negotiated with native-tls when
//! `encrypt` is set.

use super::traits::{SqlAdapter, Statement};
use crate::config::{DatabaseConfig, DatabaseEngine};
use crate::domain::{LmsError, Result};
use async_trait::async_trait;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;

/// PostgreSQL destination
pub struct PostgresAdapter {
    pool: Pool,
    target: String,
}

impl PostgresAdapter {
    /// Build the connection pool; no connection is opened until first use
    ///
    /// # Errors
    ///
    /// Returns a `Configuration` error if TLS cannot be set up or the pool
    /// cannot be built.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.server)
            .port(config.port())
            .dbname(&config.database_name)
            .application_name("lms-toolkit")
            .connect_timeout(Duration::from_secs(config.connection_timeout_seconds));
        if let Some(username) = &config.username {
            pg_config.user(username);
        }
        if let Some(password) = &config.password {
            pg_config.password(password.expose_secret().as_str());
        }

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let manager = if config.encrypt {
            let connector = native_tls::TlsConnector::builder()
                .danger_accept_invalid_certs(config.trust_certificate)
                .build()
                .map_err(|e| LmsError::Configuration(format!("TLS setup failed: {e}")))?;
            pg_config.ssl_mode(tokio_postgres::config::SslMode::Require);
            Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config)
        } else {
            Manager::from_config(pg_config, NoTls, manager_config)
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                LmsError::Configuration(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            target: format!(
                "postgresql://{}:{}/{}",
                config.server,
                config.port(),
                config.database_name
            ),
        })
    }

    async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            LmsError::Database(format!(
                "Failed to get connection to {}: {e}",
                self.target
            ))
        })
    }

    /// Connection target without credentials
    pub fn target(&self) -> &str {
        &self.target
    }
}

fn bind(params: &[Option<String>]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl SqlAdapter for PostgresAdapter {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Postgresql
    }

    async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| LmsError::Database(format!("Connection test failed: {e}")))?;

        tracing::info!(database = %self.target, "PostgreSQL connection test successful");
        Ok(())
    }

    async fn execute_transaction(&self, statements: &[Statement]) -> Result<Vec<u64>> {
        let mut client = self.get_connection().await?;
        let pg_client: &mut tokio_postgres::Client = &mut client;
        let transaction = pg_client.transaction().await?;

        let mut counts = Vec::with_capacity(statements.len());
        for statement in statements {
            let affected = transaction
                .execute(statement.sql.as_str(), &bind(&statement.params))
                .await
                .map_err(|e| LmsError::Database(format!("{}: {e}", statement.description)))?;
            tracing::trace!(step = %statement.description, affected, "Executed statement");
            counts.push(affected);
        }

        transaction.commit().await?;
        Ok(counts)
    }

    async fn query_scalar_int(&self, statement: &Statement) -> Result<i64> {
        let client = self.get_connection().await?;
        let row = client
            .query_one(statement.sql.as_str(), &bind(&statement.params))
            .await
            .map_err(|e| LmsError::Database(format!("{}: {e}", statement.description)))?;
        row.try_get::<_, i64>(0)
            .map_err(|e| LmsError::Database(format!("{}: {e}", statement.description)))
    }

    async fn query_strings(&self, statement: &Statement) -> Result<Vec<String>> {
        let client = self.get_connection().await?;
        let rows = client
            .query(statement.sql.as_str(), &bind(&statement.params))
            .await
            .map_err(|e| LmsError::Database(format!("{}: {e}", statement.description)))?;

        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(value) = row.try_get::<_, Option<String>>(0)? {
                values.push(value);
            }
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    #[test]
    fn test_target_hides_credentials() {
        let config = DatabaseConfig {
            username: Some("loader".to_string()),
            password: Some(secret_string("hunter2".to_string())),
            ..Default::default()
        };

        let adapter = PostgresAdapter::new(&config).unwrap();

        assert_eq!(adapter.target(), "postgresql://localhost:5432/lms");
        assert!(!adapter.target().contains("hunter2"));
        assert_eq!(adapter.engine(), DatabaseEngine::Postgresql);
    }
}
