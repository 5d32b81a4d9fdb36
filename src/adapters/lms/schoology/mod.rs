//! Schoology
//!
//! OAuth 1.0a PLAINTEXT auth, body-link paging and a published request budget.

pub mod api;
pub mod models;

pub use api::{sync_resources, SchoologyApi};
pub use models::{
    flatten_attendance, SchoologyAssignment, SchoologyAttendance, SchoologyCourse,
    SchoologyEnrollment, SchoologyRole, SchoologySection, SchoologySectionUpdate,
    SchoologySubmission, SchoologyUpdateComment, SchoologyUser,
};
