//! Canvas API data models
//!
//! These structs decode the REST payloads (and the GraphQL payloads after
//! they have been flattened into the same shape). Only the fields the mappers
//! read are declared; everything else stays in the sync store's JSON.

use crate::adapters::lms::models::{flag, string_list, string_or_number};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasAccount {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasCourse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub workflow_state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasSection {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub course_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sis_section_id: String,
}

/// A user returned by the course users endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasUser {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub sis_user_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub login_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub email: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasGrades {
    #[serde(default, deserialize_with = "string_or_number")]
    pub final_score: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub current_score: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasEnrollment {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub course_section_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub enrollment_state: String,
    /// `StudentEnrollment`, `TeacherEnrollment`, ...
    #[serde(default, rename = "type", deserialize_with = "string_or_number")]
    pub enrollment_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub created_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub updated_at: String,
    #[serde(default)]
    pub grades: Option<CanvasGrades>,
}

impl CanvasEnrollment {
    pub fn is_student(&self) -> bool {
        self.enrollment_type == "StudentEnrollment"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasAssignment {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub course_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub created_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub updated_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub lock_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub unlock_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub due_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub points_possible: String,
    #[serde(default, deserialize_with = "string_list")]
    pub submission_types: Vec<String>,
}

/// A submission, tagged with the section it was requested for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasSubmission {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub section_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub assignment_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default, deserialize_with = "flag")]
    pub late: bool,
    #[serde(default, deserialize_with = "flag")]
    pub missing: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    pub submitted_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub graded_at: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub grade: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub score: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub workflow_state: String,
}

/// An authentication event with the synthetic id assigned at fetch time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanvasAuthenticationEvent {
    /// `<event_type>#<user_id>#<created_at>`
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub event_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub created_at: String,
}
