//! Domain models and types for the toolkit.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **UDM records** ([`LmsUser`], [`LmsSection`], [`Assignment`], ...) whose field order is the
//!   CSV column order
//! - **Entity catalog** ([`UdmEntity`]) naming directories and destination tables
//! - **Error types** ([`LmsError`], [`RequestError`], [`ErrorKind`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LmsError>`]. Callers branch on
//! [`LmsError::is_fatal`] to decide whether a failure ends the run or only the
//! current table:
//!
//! ```rust
//! use lms_toolkit::domain::{LmsError, Result};
//!
//! fn example() -> Result<()> {
//!     Err(LmsError::Protocol("404 Not Found".to_string()))
//! }
//!
//! assert!(!example().unwrap_err().is_fatal());
//! ```

pub mod errors;
pub mod result;
pub mod udm;

pub use errors::{ErrorKind, LmsError, RequestError, ResourceErrorDetail};
pub use result::Result;
pub use udm::{
    source_system, Assignment, AssignmentSubmission, LmsAttendanceEvent, LmsGrade,
    LmsSection, LmsSectionActivity, LmsSectionAssociation, LmsSystemActivity, LmsUser,
    SyncDates, UdmEntity, UdmRecord,
};
