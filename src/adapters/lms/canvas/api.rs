//! Canvas REST resources
//!
//! Every method returns the raw JSON records so they can go through the sync
//! store before being decoded into the typed models.

use crate::adapters::lms::models::scalar_to_string;
use crate::adapters::lms::pagination::PageStyle;
use crate::adapters::lms::{RequestClient, Resource};
use crate::core::sync::SyncResource;
use crate::domain::Result;
use serde_json::Value;

/// Sync store tables for the Canvas resources
pub mod sync_resources {
    use super::SyncResource;

    pub fn courses() -> SyncResource {
        SyncResource::new("Canvas_Courses", &["id"])
    }
    pub fn sections() -> SyncResource {
        SyncResource::new("Canvas_Sections", &["id"])
    }
    pub fn students() -> SyncResource {
        SyncResource::new("Canvas_Students", &["id"])
    }
    pub fn enrollments() -> SyncResource {
        SyncResource::new("Canvas_Enrollments", &["id"])
    }
    pub fn assignments() -> SyncResource {
        SyncResource::new("Canvas_Assignments", &["id"])
    }
    pub fn submissions() -> SyncResource {
        SyncResource::new("Canvas_Submissions", &["id", "section_id"])
    }
    pub fn authentication_events() -> SyncResource {
        SyncResource::new("Canvas_Authentication_Events", &["id"])
    }
}

/// Canvas REST API
pub struct CanvasApi {
    client: RequestClient,
}

impl CanvasApi {
    pub fn new(client: RequestClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    fn list(&self, name: &str, path: String) -> Resource {
        Resource::get(name, path)
            .query("per_page", self.client.page_size().to_string())
            .paged(PageStyle::LinkHeader)
    }

    pub async fn accounts(&self) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list("accounts", "api/v1/accounts".to_string()))
            .await
    }

    /// Available and completed courses of every account overlapping the window
    pub async fn courses(&self, start_date: &str, end_date: &str) -> Result<Vec<Value>> {
        let mut courses = Vec::new();
        for account in self.accounts().await? {
            let account_id = scalar_to_string(&account["id"]);
            let resource = self
                .list("courses", format!("api/v1/accounts/{account_id}/courses"))
                .query("state[]", "available")
                .query("state[]", "completed")
                .query("starts_before", end_date)
                .query("ends_after", start_date);
            courses.extend(self.client.get_all(resource).await?);
        }
        Ok(courses)
    }

    pub async fn sections(&self, course_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list("sections", format!("api/v1/courses/{course_id}/sections")))
            .await
    }

    pub async fn students(&self, course_id: &str) -> Result<Vec<Value>> {
        let resource = self
            .list("students", format!("api/v1/courses/{course_id}/users"))
            .query("enrollment_type[]", "student")
            .query("include[]", "email");
        self.client.get_all(resource).await
    }

    pub async fn enrollments(&self, section_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "enrollments",
                format!("api/v1/sections/{section_id}/enrollments"),
            ))
            .await
    }

    pub async fn assignments(&self, course_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "assignments",
                format!("api/v1/courses/{course_id}/assignments"),
            ))
            .await
    }

    /// Submissions of one assignment by the students of one section
    ///
    /// Each record is tagged with `section_id` so the same submission can be
    /// tracked per section.
    pub async fn submissions(&self, section_id: &str, assignment_id: &str) -> Result<Vec<Value>> {
        let mut records = self
            .client
            .get_all(self.list(
                "submissions",
                format!("api/v1/sections/{section_id}/assignments/{assignment_id}/submissions"),
            ))
            .await?;
        for record in &mut records {
            if let Value::Object(map) = record {
                map.insert("section_id".to_string(), Value::String(section_id.to_string()));
            }
        }
        Ok(records)
    }

    /// Authentication events of one user within the window
    pub async fn authentication_events(
        &self,
        user_id: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<Vec<Value>> {
        let resource = self
            .list(
                "authentication_events",
                format!("api/v1/audit/authentication/users/{user_id}"),
            )
            .query("start_time", start_date)
            .query("end_time", end_date)
            .records_at("/events");
        let records = self.client.get_all(resource).await?;
        Ok(records
            .into_iter()
            .map(|event| with_event_identity(event, user_id))
            .collect())
    }
}

/// Authentication events carry no id of their own; derive one from the event
/// type, the user and the timestamp.
pub fn with_event_identity(mut event: Value, fallback_user: &str) -> Value {
    let user = event
        .pointer("/links/user")
        .map(scalar_to_string)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| fallback_user.to_string());
    let event_type = scalar_to_string(&event["event_type"]);
    let created_at = scalar_to_string(&event["created_at"]);

    if let Value::Object(map) = &mut event {
        map.insert(
            "id".to_string(),
            Value::String(format!("{event_type}#{user}#{created_at}")),
        );
        map.insert("user_id".to_string(), Value::String(user));
    }
    event
}
