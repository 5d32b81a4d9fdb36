//! Core pipeline logic
//!
//! # Modules
//!
//! - [`sync`] - SQLite sync store: change detection and stable timestamps
//! - [`mapping`] - provider records to UDM rows
//! - [`files`] - the CSV tree: layout, writer and reader
//! - [`extract`] - per-provider extraction runs
//! - [`load`] - staging and merge into the destination
//! - [`migrate`] - destination schema migrations
//!
//! # Workflow
//!
//! An extraction run fetches each resource, passes it through the sync store,
//! maps it and writes one timestamped CSV per directory. A load run reads the
//! newest file of every directory, stages it and merges it into production.
//!
//! ```rust,no_run
//! use lms_toolkit::adapters::sql::RecordingAdapter;
//! use lms_toolkit::config::DatabaseEngine;
//! use lms_toolkit::core::load::{LoadOptions, Loader};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> lms_toolkit::domain::Result<()> {
//! let adapter = Arc::new(RecordingAdapter::new(DatabaseEngine::Postgresql));
//! let loader = Loader::new(adapter, LoadOptions::default());
//! let summary = loader.load(Path::new("data")).await?;
//! println!("{} rows", summary.rows_loaded());
//! # Ok(())
//! # }
//! ```

pub mod extract;
pub mod files;
pub mod load;
pub mod mapping;
pub mod migrate;
pub mod sync;
