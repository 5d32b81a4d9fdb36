//! Google Classroom
//!
//! Service-account auth with domain-wide delegation, page-token paging.

pub mod api;
pub mod models;

pub use api::{sync_resources, GoogleApi, CLASSROOM_BASE_URL, REPORTS_BASE_URL};
pub use models::{
    GoogleCourse, GoogleCourseUser, GoogleCourseWork, GoogleDate, GoogleLoginActivity,
    GoogleSubmission, GoogleSubmissionHistory, GoogleTimeOfDay,
};
