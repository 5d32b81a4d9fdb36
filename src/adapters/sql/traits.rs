//! Destination database abstraction
//!
//! The loader and migrator only speak SQL text with string parameters. Each
//! backend owns its connection handling and transaction boundaries.

use crate::config::DatabaseEngine;
use crate::domain::Result;
use async_trait::async_trait;

/// One SQL statement with positional parameters
///
/// Parameters are text or NULL; statements cast them to the column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Short label used in logs and errors, e.g. `LMSUser: insert new`
    pub description: String,
    pub sql: String,
    pub params: Vec<Option<String>>,
}

impl Statement {
    pub fn new(description: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<Option<String>>) -> Self {
        self.params = params;
        self
    }
}

/// A destination database
#[async_trait]
pub trait SqlAdapter: Send + Sync {
    fn engine(&self) -> DatabaseEngine;

    /// Check the database is reachable
    async fn test_connection(&self) -> Result<()>;

    /// Run `statements` in order inside one transaction
    ///
    /// Returns the affected row count of each statement. On any failure the
    /// transaction is rolled back and nothing is applied.
    async fn execute_transaction(&self, statements: &[Statement]) -> Result<Vec<u64>>;

    /// First column of the first row as an integer; the query must return a BIGINT
    async fn query_scalar_int(&self, statement: &Statement) -> Result<i64>;

    /// First column of every row; NULLs are skipped
    async fn query_strings(&self, statement: &Statement) -> Result<Vec<String>>;
}
