//! Google Classroom and Admin Reports resources
//!
//! Both APIs page with an opaque `nextPageToken`. The Reports API lives on a
//! different host; its URL is configurable so tests can point it at a mock.

use crate::adapters::lms::models::string_at;
use crate::adapters::lms::pagination::PageStyle;
use crate::adapters::lms::{RequestClient, Resource};
use crate::core::sync::SyncResource;
use crate::domain::Result;
use serde_json::Value;

/// Default Classroom API root
pub const CLASSROOM_BASE_URL: &str = "https://classroom.googleapis.com";

/// Default Admin SDK root, home of the Reports API
pub const REPORTS_BASE_URL: &str = "https://admin.googleapis.com";

/// Sync store tables for the Google resources
pub mod sync_resources {
    use super::SyncResource;

    pub fn courses() -> SyncResource {
        SyncResource::new("Google_Courses", &["id"])
    }
    pub fn students() -> SyncResource {
        SyncResource::new("Google_Students", &["userId", "courseId"])
    }
    pub fn teachers() -> SyncResource {
        SyncResource::new("Google_Teachers", &["userId", "courseId"])
    }
    pub fn course_work() -> SyncResource {
        SyncResource::new("Google_CourseWork", &["courseId", "id"])
    }
    pub fn submissions() -> SyncResource {
        SyncResource::new("Google_Submissions", &["courseId", "courseWorkId", "id"])
    }
    pub fn login_activities() -> SyncResource {
        SyncResource::new("Google_Login_Activities", &["activityId"])
    }
}

/// Google Classroom API
pub struct GoogleApi {
    client: RequestClient,
    reports_base_url: String,
}

impl GoogleApi {
    pub fn new(client: RequestClient) -> Self {
        Self {
            client,
            reports_base_url: REPORTS_BASE_URL.to_string(),
        }
    }

    /// Send Reports API requests to another host
    pub fn with_reports_url(mut self, url: impl Into<String>) -> Self {
        self.reports_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    fn list(&self, name: &str, path: String, key: &str) -> Resource {
        Resource::get(name, path)
            .query("pageSize", self.client.page_size().to_string())
            .records_at(format!("/{key}"))
            .paged(PageStyle::PageToken)
    }

    /// Active courses visible to the credentials
    pub async fn courses(&self) -> Result<Vec<Value>> {
        let resource = self
            .list("courses", "v1/courses".to_string(), "courses")
            .query("courseStates", "ACTIVE");
        self.client.get_all(resource).await
    }

    pub async fn students(&self, course_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "students",
                format!("v1/courses/{course_id}/students"),
                "students",
            ))
            .await
    }

    pub async fn teachers(&self, course_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "teachers",
                format!("v1/courses/{course_id}/teachers"),
                "teachers",
            ))
            .await
    }

    pub async fn course_work(&self, course_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "course_work",
                format!("v1/courses/{course_id}/courseWork"),
                "courseWork",
            ))
            .await
    }

    /// Every student submission of every coursework item in a course
    pub async fn submissions(&self, course_id: &str) -> Result<Vec<Value>> {
        self.client
            .get_all(self.list(
                "submissions",
                format!("v1/courses/{course_id}/courseWork/-/studentSubmissions"),
                "studentSubmissions",
            ))
            .await
    }

    /// Login and logout events from the Reports API
    ///
    /// `start_time` and `end_time` are RFC 3339 timestamps; empty means
    /// unbounded. Each record gets `activityId` from `id.uniqueQualifier`.
    pub async fn login_activities(&self, start_time: &str, end_time: &str) -> Result<Vec<Value>> {
        let mut resource = Resource::get(
            "login_activities",
            format!(
                "{}/admin/reports/v1/activity/users/all/applications/login",
                self.reports_base_url
            ),
        )
        .query("maxResults", self.client.page_size().to_string())
        .records_at("/items")
        .paged(PageStyle::PageToken);
        if !start_time.is_empty() {
            resource = resource.query("startTime", start_time);
        }
        if !end_time.is_empty() {
            resource = resource.query("endTime", end_time);
        }

        let records = self.client.get_all(resource).await?;
        Ok(records
            .into_iter()
            .map(|mut record| {
                let qualifier = string_at(&record, "/id/uniqueQualifier");
                if let Value::Object(map) = &mut record {
                    map.insert("activityId".to_string(), Value::String(qualifier));
                }
                record
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::lms::{AuthStrategy, ClientSettings};
    use crate::config::secret_string;
    use mockito::Matcher;
    use serde_json::json;

    fn api(url: &str) -> GoogleApi {
        let client = RequestClient::new(
            "Google",
            url,
            AuthStrategy::Static(secret_string("ya29.token".to_string())),
            ClientSettings::default(),
        )
        .unwrap();
        GoogleApi::new(client).with_reports_url(url)
    }

    #[tokio::test]
    async fn test_courses_follow_page_tokens() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/v1/courses")
            .match_query(Matcher::Regex(
                r"^pageSize=\d+&courseStates=ACTIVE$".into(),
            ))
            .with_body(json!({"courses": [{"id": "1"}], "nextPageToken": "p2"}).to_string())
            .create_async()
            .await;
        let second = server
            .mock("GET", "/v1/courses")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("courseStates".into(), "ACTIVE".into()),
                Matcher::UrlEncoded("pageToken".into(), "p2".into()),
            ]))
            .with_body(json!({"courses": [{"id": "2"}]}).to_string())
            .create_async()
            .await;

        let courses = api(&server.url()).courses().await.unwrap();

        assert_eq!(courses.len(), 2);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_course_without_students_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/courses/1/students")
            .match_query(Matcher::Any)
            .with_body("{}")
            .create_async()
            .await;

        assert!(api(&server.url()).students("1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_activities_get_activity_ids() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/admin/reports/v1/activity/users/all/applications/login")
            .match_query(Matcher::UrlEncoded("startTime".into(), "2021-03-01T00:00:00Z".into()))
            .with_body(
                json!({"items": [{
                    "id": {"time": "2021-03-01T10:00:00.000Z", "uniqueQualifier": "-42"},
                    "actor": {"profileId": "111"},
                    "events": [{"type": "login", "name": "login_success"}]
                }]})
                .to_string(),
            )
            .create_async()
            .await;

        let activities = api(&server.url())
            .login_activities("2021-03-01T00:00:00Z", "")
            .await
            .unwrap();
        assert_eq!(activities[0]["activityId"], "-42");
    }
}
