//! Destination loading
//!
//! - [`catalog`] - production tables, their columns and relations
//! - [`sql_builder`] - staging and merge SQL for PostgreSQL and SQL Server
//! - [`splitter`] - assignment submission type rows
//! - [`loader`] - the per-table merge

pub mod catalog;
pub mod loader;
pub mod splitter;
pub mod sql_builder;

pub use catalog::{table, tables, TableDef};
pub use loader::{newest_files, LoadOptions, LoadSummary, Loader, TableOutcome};
pub use sql_builder::SqlBuilder;
