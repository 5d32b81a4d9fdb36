//! SQL Server backend
//!
//! Uses tiberius over a tokio TCP stream. Each operation opens its own
//! connection; a transaction is bracketed with `BEGIN TRANSACTION` and
//! `COMMIT`, rolling back on the first failing statement.

use super::traits::{SqlAdapter, Statement};
use crate::config::{DatabaseConfig, DatabaseEngine};
use crate::domain::{LmsError, Result};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type MssqlClient = Client<Compat<TcpStream>>;

/// SQL Server destination
pub struct MssqlAdapter {
    config: Config,
    target: String,
}

impl MssqlAdapter {
    /// # Errors
    ///
    /// Returns a `Configuration` error when neither SQL credentials nor
    /// integrated security are available.
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        let mut tds = Config::new();
        tds.host(&config.server);
        tds.port(config.port());
        tds.database(&config.database_name);
        tds.application_name("lms-toolkit");
        tds.authentication(auth_method(config)?);
        tds.encryption(if config.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::Off
        });
        if config.trust_certificate {
            tds.trust_cert();
        }

        Ok(Self {
            config: tds,
            target: format!(
                "mssql://{}:{}/{}",
                config.server,
                config.port(),
                config.database_name
            ),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    async fn connect(&self) -> Result<MssqlClient> {
        let tcp = TcpStream::connect(self.config.get_addr())
            .await
            .map_err(|e| {
                LmsError::Database(format!("Failed to connect to {}: {e}", self.target))
            })?;
        tcp.set_nodelay(true)?;

        Client::connect(self.config.clone(), tcp.compat_write())
            .await
            .map_err(|e| LmsError::Database(format!("Failed to log in to {}: {e}", self.target)))
    }
}

#[cfg(windows)]
fn auth_method(config: &DatabaseConfig) -> Result<AuthMethod> {
    if config.integrated_security {
        return Ok(AuthMethod::Integrated);
    }
    sql_login(config)
}

#[cfg(not(windows))]
fn auth_method(config: &DatabaseConfig) -> Result<AuthMethod> {
    if config.integrated_security {
        return Err(LmsError::Configuration(
            "Integrated security is only available on Windows".to_string(),
        ));
    }
    sql_login(config)
}

fn sql_login(config: &DatabaseConfig) -> Result<AuthMethod> {
    let username = config.username.as_deref().ok_or_else(|| {
        LmsError::Configuration("A username is required without integrated security".to_string())
    })?;
    let password = config
        .password
        .as_ref()
        .map(|p| p.expose_secret().as_str().to_string())
        .unwrap_or_default();
    Ok(AuthMethod::sql_server(username, password))
}

fn query_for(statement: &Statement) -> Query<'_> {
    let mut query = Query::new(statement.sql.as_str());
    for param in &statement.params {
        query.bind(param.clone());
    }
    query
}

/// Transaction control runs as a plain batch so it is not scoped to `sp_executesql`
async fn simple(client: &mut MssqlClient, sql: &str) -> Result<()> {
    client.simple_query(sql).await?.into_results().await?;
    Ok(())
}

async fn run_all(client: &mut MssqlClient, statements: &[Statement]) -> Result<Vec<u64>> {
    let mut counts = Vec::with_capacity(statements.len());
    for statement in statements {
        let result = query_for(statement)
            .execute(client)
            .await
            .map_err(|e| LmsError::Database(format!("{}: {e}", statement.description)))?;
        let affected = result.total();
        tracing::trace!(step = %statement.description, affected, "Executed statement");
        counts.push(affected);
    }
    Ok(counts)
}

#[async_trait]
impl SqlAdapter for MssqlAdapter {
    fn engine(&self) -> DatabaseEngine {
        DatabaseEngine::Mssql
    }

    async fn test_connection(&self) -> Result<()> {
        let mut client = self.connect().await?;
        client
            .simple_query("SELECT 1")
            .await?
            .into_results()
            .await?;
        tracing::info!(database = %self.target, "SQL Server connection test successful");
        Ok(())
    }

    async fn execute_transaction(&self, statements: &[Statement]) -> Result<Vec<u64>> {
        let mut client = self.connect().await?;
        simple(&mut client, "SET XACT_ABORT ON; BEGIN TRANSACTION").await?;

        match run_all(&mut client, statements).await {
            Ok(counts) => {
                simple(&mut client, "COMMIT TRANSACTION").await?;
                Ok(counts)
            }
            Err(e) => {
                if let Err(rollback) =
                    simple(&mut client, "IF @@TRANCOUNT > 0 ROLLBACK TRANSACTION").await
                {
                    tracing::warn!(error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn query_scalar_int(&self, statement: &Statement) -> Result<i64> {
        let mut client = self.connect().await?;
        let row = query_for(statement)
            .query(&mut client)
            .await?
            .into_row()
            .await?
            .ok_or_else(|| {
                LmsError::Database(format!("{}: no rows returned", statement.description))
            })?;
        row.try_get::<i64, _>(0)?.ok_or_else(|| {
            LmsError::Database(format!("{}: NULL returned", statement.description))
        })
    }

    async fn query_strings(&self, statement: &Statement) -> Result<Vec<String>> {
        let mut client = self.connect().await?;
        let rows = query_for(statement)
            .query(&mut client)
            .await?
            .into_first_result()
            .await?;

        let mut values = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(value) = row.try_get::<&str, _>(0)? {
                values.push(value.to_string());
            }
        }
        Ok(values)
    }
}
