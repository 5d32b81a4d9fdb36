//! Schoology REST resources
//!
//! Paged resources start at `start=0&limit=<page size>` and follow the
//! absolute `links.next` URL in the body. Every page wraps its records in a key
//! named after the resource (`user`, `section`, `revision`, ...).

use crate::adapters::lms::models::string_at;
use crate::adapters::lms::pagination::PageStyle;
use crate::adapters::lms::{RequestClient, Resource};
use crate::core::sync::SyncResource;
use crate::domain::Result;
use serde_json::Value;

/// Sync store tables for the Schoology resources
pub mod sync_resources {
    use super::SyncResource;

    pub fn users() -> SyncResource {
        SyncResource::new("Schoology_Users", &["uid"])
    }
    pub fn roles() -> SyncResource {
        SyncResource::new("Schoology_Roles", &["id"])
    }
    pub fn courses() -> SyncResource {
        SyncResource::new("Schoology_Courses", &["id"])
    }
    pub fn sections() -> SyncResource {
        SyncResource::new("Schoology_Sections", &["id"])
    }
    pub fn enrollments() -> SyncResource {
        SyncResource::new("Schoology_Enrollments", &["id"])
    }
    pub fn assignments() -> SyncResource {
        SyncResource::new("Schoology_Assignments", &["id"])
    }
    pub fn submissions() -> SyncResource {
        SyncResource::new("Schoology_Submissions", &["id"])
    }
    pub fn section_updates() -> SyncResource {
        SyncResource::new("Schoology_Section_Updates", &["id"])
    }
    pub fn update_comments() -> SyncResource {
        SyncResource::new("Schoology_Section_Update_Comments", &["id", "update_id"])
    }
    pub fn attendance() -> SyncResource {
        SyncResource::new("Schoology_Attendance_Events", &["enrollment_id", "date"])
    }
}

/// Schoology REST API
pub struct SchoologyApi {
    client: RequestClient,
}

impl SchoologyApi {
    /// The client should carry a request budget; see [`RequestClient::with_budget`]
    pub fn new(client: RequestClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    fn list(&self, name: &str, path: String, key: &str) -> Resource {
        Resource::get(name, path)
            .query("start", "0")
            .query("limit", self.client.page_size().to_string())
            .records_at(format!("/{key}"))
            .paged(PageStyle::body_link())
    }

    pub async fn users(&self) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list("users", "users".to_string(), "user"))
            .await
    }

    pub async fn roles(&self) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list("roles", "roles".to_string(), "role"))
            .await
    }

    pub async fn courses(&self) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list("courses", "courses".to_string(), "course"))
            .await
    }

    pub async fn sections(&self, course_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "sections",
                format!("courses/{course_id}/sections"),
                "section",
            ))
            .await
    }

    pub async fn enrollments(&self, section_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "enrollments",
                format!("sections/{section_id}/enrollments"),
                "enrollment",
            ))
            .await
    }

    pub async fn assignments(&self, section_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "assignments",
                format!("sections/{section_id}/assignments"),
                "assignment",
            ))
            .await
    }

    /// Submission revisions of one assignment
    ///
    /// Revisions carry no id of their own; each gets
    /// `<section>#<assignment>#<uid>`.
    pub async fn submissions(&self, section_id: &str, assignment_id: &str) -> Result<Vec<Value>> {
        let records = self
            .client
            .get_all(self.list(
                "submissions",
                format!("sections/{section_id}/submissions/{assignment_id}"),
                "revision",
            ))
            .await?;
        Ok(records
            .into_iter()
            .map(|mut record| {
                let uid = string_at(&record, "/uid");
                set_field(
                    &mut record,
                    "id",
                    format!("{section_id}#{assignment_id}#{uid}"),
                );
                record
            })
            .collect())
    }

    /// Attendance `date` nodes of a section; this endpoint is not paged
    pub async fn attendance(&self, section_id: &str) -> Result<Vec<Value>> {
        let resource = Resource::get("attendance", format!("sections/{section_id}/attendance"))
            .records_at("/date")
            .paged(PageStyle::Single);
        self.client.get_all(resource).await
    }

    pub async fn section_updates(&self, section_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "section_updates",
                format!("sections/{section_id}/updates"),
                "update",
            ))
            .await
    }

    /// Comments on one section update, tagged with `update_id`
    pub async fn update_comments(&self, section_id: &str, update_id: &str) -> Result<Vec<Value>> {
        let records = self
            .client
            .get_all(self.list(
                "update_comments",
                format!("sections/{section_id}/updates/{update_id}/comments"),
                "comment",
            ))
            .await?;
        Ok(records
            .into_iter()
            .map(|mut record| {
                set_field(&mut record, "update_id", update_id.to_string());
                record
            })
            .collect())
    }
}

fn set_field(record: &mut Value, key: &str, value: String) {
    if let Value::Object(map) = record {
        map.insert(key.to_string(), Value::String(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::lms::{AuthStrategy, ClientSettings};
    use crate::config::secret_string;
    use mockito::Matcher;
    use serde_json::json;

    fn api(url: &str) -> SchoologyApi {
        let client = RequestClient::new(
            "Schoology",
            url,
            AuthStrategy::oauth1("key", secret_string("secret".to_string())),
            ClientSettings::default(),
        )
        .unwrap();
        SchoologyApi::new(client)
    }

    #[tokio::test]
    async fn test_users_follow_body_links() {
        let mut server = mockito::Server::new_async().await;
        let next = format!("{}/users?start=1&limit=100", server.url());
        let first = server
            .mock("GET", "/users")
            .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
            .match_header(
                "authorization",
                Matcher::Regex(r#"oauth_signature="secret%26""#.to_string()),
            )
            .with_body(json!({"user": [{"uid": 1}], "links": {"next": next}}).to_string())
            .create_async()
            .await;
        let second = server
            .mock("GET", "/users")
            .match_query(Matcher::UrlEncoded("start".into(), "1".into()))
            .with_body(json!({"user": [{"uid": 2}], "links": {"self": "x"}}).to_string())
            .create_async()
            .await;

        let users = api(&server.url()).users().await.unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[1]["uid"], 2);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_record_key_is_an_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/sections/5/updates")
            .match_query(Matcher::Any)
            .with_body(r#"{"total": 0, "links": {"self": "x"}}"#)
            .create_async()
            .await;

        let updates = api(&server.url()).section_updates("5").await.unwrap();
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn test_submissions_get_synthetic_ids() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/sections/5/submissions/12")
            .match_query(Matcher::Any)
            .with_body(r#"{"revision": [{"revision_id": 1, "uid": 100, "late": 0}]}"#)
            .create_async()
            .await;

        let revisions = api(&server.url()).submissions("5", "12").await.unwrap();
        assert_eq!(revisions[0]["id"], "5#12#100");
        assert_eq!(
            sync_resources::submissions().source_id(&revisions[0]).unwrap(),
            "5#12#100"
        );
    }

    #[tokio::test]
    async fn test_attendance_is_single_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/sections/5/attendance")
            .with_body(r#"{"date": [{"date": "2021-02-01"}, {"date": "2021-02-02"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let dates = api(&server.url()).attendance("5").await.unwrap();
        assert_eq!(dates.len(), 2);
        mock.assert_async().await;
    }
}
