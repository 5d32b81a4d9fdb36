//! External system integrations
//!
//! - [`lms`] - LMS provider APIs (Canvas, Schoology, Google Classroom)
//! - [`sql`] - destination databases (PostgreSQL, SQL Server)
//!
//! Adapters isolate third-party clients so the core only sees typed records,
//! the [`lms::RequestClient`] page protocol and the [`sql::SqlAdapter`] trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use lms_toolkit::adapters::sql::{create_sql_adapter, SqlAdapter};
//! use lms_toolkit::config::DatabaseConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let adapter = create_sql_adapter(&DatabaseConfig::default())?;
//! adapter.test_connection().await?;
//! # Ok(())
//! # }
//! ```

pub mod lms;
pub mod sql;
