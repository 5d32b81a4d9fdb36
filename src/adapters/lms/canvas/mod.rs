//! Canvas LMS
//!
//! REST resources are paged with the `Link` header. The GraphQL path pulls the
//! same data in bulk and flattens it into the REST shapes.

pub mod api;
pub mod graphql;
pub mod models;

pub use api::{sync_resources, CanvasApi};
pub use models::{
    CanvasAccount, CanvasAssignment, CanvasAuthenticationEvent, CanvasCourse, CanvasEnrollment,
    CanvasGrades, CanvasSection, CanvasSubmission, CanvasUser,
};
