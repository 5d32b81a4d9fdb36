//! Destination databases
//!
//! - [`postgresql`] - PostgreSQL via tokio-postgres and deadpool
//! - [`mssql`] - SQL Server via tiberius
//! - [`recording`] - records statements without a database, for dry runs
//!
//! Everything above this layer works through the [`SqlAdapter`] trait.

pub mod factory;
pub mod mssql;
pub mod postgresql;
pub mod recording;
pub mod traits;

pub use factory::create_sql_adapter;
pub use mssql::MssqlAdapter;
pub use postgresql::PostgresAdapter;
pub use recording::RecordingAdapter;
pub use traits::{SqlAdapter, Statement};
