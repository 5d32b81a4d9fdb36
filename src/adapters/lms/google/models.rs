//! Google Classroom and Reports API data models
//!
//! Google's JSON omits zero-valued and empty fields, so every field is
//! defaulted.

use crate::adapters::lms::models::{flag, string_or_number};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCourse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub description_heading: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub course_state: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub creation_time: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub update_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleName {
    #[serde(default, deserialize_with = "string_or_number")]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProfile {
    #[serde(default)]
    pub name: GoogleName,
    #[serde(default, deserialize_with = "string_or_number")]
    pub email_address: String,
}

/// A student or teacher of one course
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCourseUser {
    #[serde(default, deserialize_with = "string_or_number")]
    pub course_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default)]
    pub profile: GoogleProfile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleDate {
    #[serde(default)]
    pub year: u32,
    #[serde(default)]
    pub month: u32,
    #[serde(default)]
    pub day: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoogleTimeOfDay {
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleCourseWork {
    #[serde(default, deserialize_with = "string_or_number")]
    pub course_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub work_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub scheduled_time: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub max_points: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub creation_time: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub update_time: String,
    #[serde(default)]
    pub due_date: Option<GoogleDate>,
    #[serde(default)]
    pub due_time: Option<GoogleTimeOfDay>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleStateHistory {
    #[serde(default, deserialize_with = "string_or_number")]
    pub state: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub state_timestamp: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub actor_user_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleGradeHistory {
    #[serde(default, deserialize_with = "string_or_number")]
    pub grade_timestamp: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub grade_change_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub actor_user_id: String,
}

/// One `submissionHistory` entry; exactly one side is set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSubmissionHistory {
    #[serde(default)]
    pub state_history: Option<GoogleStateHistory>,
    #[serde(default)]
    pub grade_history: Option<GoogleGradeHistory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSubmission {
    #[serde(default, deserialize_with = "string_or_number")]
    pub course_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub course_work_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub user_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub creation_time: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub update_time: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub state: String,
    #[serde(default, deserialize_with = "flag")]
    pub late: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    pub assigned_grade: String,
    #[serde(default)]
    pub submission_history: Vec<GoogleSubmissionHistory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleActivityId {
    #[serde(default, deserialize_with = "string_or_number")]
    pub time: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub unique_qualifier: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleActor {
    #[serde(default, deserialize_with = "string_or_number")]
    pub profile_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleActivityEvent {
    #[serde(default, rename = "type", deserialize_with = "string_or_number")]
    pub event_type: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
}

/// A Reports API login activity, with `activityId` set at fetch time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginActivity {
    #[serde(default, deserialize_with = "string_or_number")]
    pub activity_id: String,
    #[serde(default)]
    pub id: GoogleActivityId,
    #[serde(default)]
    pub actor: GoogleActor,
    #[serde(default)]
    pub events: Vec<GoogleActivityEvent>,
}
