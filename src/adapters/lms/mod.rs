//! LMS provider integrations
//!
//! One [`RequestClient`] per provider issues authenticated GET requests (and
//! Canvas GraphQL POSTs) and exposes each resource as a lazy sequence of pages.
//! Provider modules wrap the client with their endpoints, record pointers and
//! sync table definitions:
//!
//! - [`canvas`] - bearer token, `Link` header paging, optional GraphQL bulk path
//! - [`schoology`] - OAuth 1.0a PLAINTEXT, body links, request budget
//! - [`google`] - service-account JWT, page tokens
//!
//! # Example
//!
//! ```rust,no_run
//! use lms_toolkit::adapters::lms::canvas::CanvasApi;
//! use lms_toolkit::adapters::lms::{AuthStrategy, ClientSettings, RequestClient};
//! use lms_toolkit::config::secret_string;
//!
//! # async fn example() -> lms_toolkit::domain::Result<()> {
//! let client = RequestClient::new(
//!     "Canvas",
//!     "https://canvas.example.edu",
//!     AuthStrategy::bearer(secret_string("token".to_string())),
//!     ClientSettings::default(),
//! )?;
//! let canvas = CanvasApi::new(client);
//! let courses = canvas.courses("2021-01-01", "2021-06-30").await?;
//! println!("{} courses", courses.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod canvas;
pub mod client;
pub mod google;
pub mod models;
pub mod pagination;
pub mod rate_limit;
pub mod schoology;

pub use auth::{AuthStrategy, ServiceAccountAuth, ServiceAccountKey};
pub use client::{ClientSettings, Pages, RequestClient, Resource};
pub use pagination::PageStyle;
pub use rate_limit::RequestBudget;
