//! An adapter that records statements instead of running them
//!
//! Backs `load --dry-run`, where the planned SQL is logged but never sent, and
//! lets the load plan be inspected without a live database.

use super::traits::{SqlAdapter, Statement};
use crate::config::DatabaseEngine;
use crate::domain::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Records every transaction; queries answer from canned results
pub struct RecordingAdapter {
    engine: DatabaseEngine,
    transactions: Mutex<Vec<Vec<Statement>>>,
    scalars: Mutex<HashMap<String, i64>>,
    strings: Mutex<HashMap<String, Vec<String>>>,
}

impl RecordingAdapter {
    pub fn new(engine: DatabaseEngine) -> Self {
        Self {
            engine,
            transactions: Mutex::new(Vec::new()),
            scalars: Mutex::new(HashMap::new()),
            strings: Mutex::new(HashMap::new()),
        }
    }

    /// Answer scalar queries whose SQL contains `fragment` with `value`
    pub fn with_scalar(self, fragment: &str, value: i64) -> Self {
        if let Ok(mut scalars) = self.scalars.lock() {
            scalars.insert(fragment.to_string(), value);
        }
        self
    }

    /// Answer string queries whose SQL contains `fragment` with `values`
    pub fn with_strings(self, fragment: &str, values: &[&str]) -> Self {
        if let Ok(mut strings) = self.strings.lock() {
            strings.insert(
                fragment.to_string(),
                values.iter().map(|v| v.to_string()).collect(),
            );
        }
        self
    }

    /// Every transaction executed so far, in order
    pub fn transactions(&self) -> Vec<Vec<Statement>> {
        self.transactions
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    /// Every statement executed so far, flattened
    pub fn statements(&self) -> Vec<Statement> {
        self.transactions().into_iter().flatten().collect()
    }
}

#[async_trait]
impl SqlAdapter for RecordingAdapter {
    fn engine(&self) -> DatabaseEngine {
        self.engine
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn execute_transaction(&self, statements: &[Statement]) -> Result<Vec<u64>> {
        for statement in statements {
            tracing::debug!(step = %statement.description, params = statement.params.len(), "{}", statement.sql);
        }
        if let Ok(mut transactions) = self.transactions.lock() {
            transactions.push(statements.to_vec());
        }
        Ok(vec![0; statements.len()])
    }

    async fn query_scalar_int(&self, statement: &Statement) -> Result<i64> {
        let scalars = self.scalars.lock().map(|s| s.clone()).unwrap_or_default();
        Ok(scalars
            .iter()
            .find(|(fragment, _)| statement.sql.contains(fragment.as_str()))
            .map(|(_, value)| *value)
            .unwrap_or(0))
    }

    async fn query_strings(&self, statement: &Statement) -> Result<Vec<String>> {
        let strings = self.strings.lock().map(|s| s.clone()).unwrap_or_default();
        Ok(strings
            .iter()
            .find(|(fragment, _)| statement.sql.contains(fragment.as_str()))
            .map(|(_, values)| values.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_transactions() {
        let adapter = RecordingAdapter::new(DatabaseEngine::Postgresql)
            .with_scalar("MigrationJournal", 1)
            .with_strings("SELECT Script", &["0001_initialize_lms_database"]);

        adapter
            .execute_transaction(&[Statement::new("one", "SELECT 1"), Statement::new("two", "SELECT 2")])
            .await
            .unwrap();

        assert_eq!(adapter.transactions().len(), 1);
        assert_eq!(adapter.statements()[1].description, "two");
        let journal = Statement::new("journal", "SELECT COUNT(*) FROM lms.MigrationJournal_Harmonizer");
        assert_eq!(adapter.query_scalar_int(&journal).await.unwrap(), 1);
        let scripts = Statement::new("scripts", "SELECT Script FROM x");
        assert_eq!(adapter.query_strings(&scripts).await.unwrap().len(), 1);
    }
}
