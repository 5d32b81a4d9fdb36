// LMS Toolkit - LMS extraction and relational loading
// Copyright (c) 2025 LMS Toolkit Contributors
// Licensed under the MIT License

//! # LMS Toolkit
//!
//! Extracts rosters, coursework and activity from Canvas, Schoology and Google
//! Classroom, normalizes them into a unified data model (UDM), writes them as a
//! tree of timestamped CSV files, and merges those files into PostgreSQL or
//! SQL Server.
//!
//! ## Overview
//!
//! - **Extract**: one [`RequestClient`](adapters::lms::RequestClient) per
//!   provider handles auth, paging, retries and rate limits
//! - **Sync**: a local SQLite store detects new and changed records so that
//!   `CreateDate` and `LastModifiedDate` stay stable across runs
//! - **Map**: provider records become UDM rows
//! - **Write**: one CSV per directory, named by the run's start time
//! - **Load**: the newest file of each directory is staged, then merged into
//!   production with inserts, updates and soft deletes
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Sync store, mapping, CSV files, extraction, load, migrations
//! - [`adapters`] - LMS providers and destination databases
//! - [`domain`] - UDM row types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lms_toolkit::adapters::lms::schoology::SchoologyApi;
//! use lms_toolkit::adapters::lms::{AuthStrategy, ClientSettings, RequestBudget, RequestClient};
//! use lms_toolkit::config::{secret_string, ToolkitConfig};
//! use lms_toolkit::core::extract::{Extraction, FeatureSet, SchoologyExtractor};
//! use lms_toolkit::core::files::{CsvWriter, FileLayout};
//! use lms_toolkit::core::sync::SyncStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ToolkitConfig::default();
//!     let client = RequestClient::new(
//!         "Schoology",
//!         "https://api.schoology.com/v1",
//!         AuthStrategy::oauth1("key", secret_string("secret".to_string())),
//!         ClientSettings::from_config(&config.http),
//!     )?
//!     .with_budget(RequestBudget::from_config(&config.schoology));
//!
//!     let ctx = Extraction::new(
//!         "Schoology",
//!         SyncStore::open("data").await?,
//!         CsvWriter::new(FileLayout::new("data/", chrono::Local::now())),
//!         FeatureSet::parse(&["assignments", "attendance"])?,
//!     );
//!     let summary = SchoologyExtractor::new(SchoologyApi::new(client)).run(ctx).await?;
//!     println!("{} rows written", summary.rows_written());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`domain::Result`]. Authentication, I/O, migration
//! and configuration errors end a run; any other error skips the resource it
//! belongs to and is reported in the run summary.
//!
//! ## Logging
//!
//! ```rust,no_run
//! use lms_toolkit::config::LoggingConfig;
//! use lms_toolkit::logging::init_logging;
//!
//! # fn example() -> lms_toolkit::domain::Result<()> {
//! let _guard = init_logging("INFO", &LoggingConfig::default())?;
//! tracing::info!("Starting extraction");
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
