//! Canvas GraphQL bulk extraction
//!
//! One paged query over the account's `coursesConnection` returns courses with
//! their sections, enrollments, assignments and submissions nested inside.
//! The nested nodes are flattened into the same record shapes the REST
//! endpoints return, so the sync tables and mappers are shared between both
//! paths.
//!
//! Only `coursesConnection` is paged. Nested connections return whatever the
//! server's default node cap allows.

use crate::adapters::lms::models::{scalar_to_string, string_at};
use crate::adapters::lms::{RequestClient, Resource};
use crate::domain::Result;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

const COURSES_CONNECTION: &str = "/data/account/coursesConnection";

/// Build the paged courses query for an account
pub fn courses_query(account_id: &str, page_size: usize) -> String {
    format!(
        r#"query Courses($after: String) {{
  account(id: "{account_id}") {{
    coursesConnection(first: {page_size}, after: $after) {{
      nodes {{
        _id
        name
        state
        term {{ startAt endAt }}
        sectionsConnection {{ nodes {{ _id sisId name createdAt updatedAt }} }}
        enrollmentsConnection {{
          nodes {{
            _id
            createdAt
            updatedAt
            state
            type
            section {{ _id }}
            user {{ _id sisId createdAt email name loginId }}
            grades {{ finalScore currentScore }}
          }}
        }}
        assignmentsConnection {{
          nodes {{
            _id name description createdAt updatedAt lockAt unlockAt dueAt
            submissionTypes pointsPossible
          }}
        }}
        submissionsConnection {{
          nodes {{
            _id late missing submittedAt grade score gradedAt state
            user {{ _id }}
            assignment {{ _id }}
          }}
        }}
      }}
      pageInfo {{ hasNextPage endCursor }}
    }}
  }}
}}"#
    )
}

/// REST-shaped records flattened out of the GraphQL course nodes
#[derive(Debug, Default, Clone)]
pub struct GraphQlExtract {
    pub courses: Vec<Value>,
    pub sections: Vec<Value>,
    pub students: Vec<Value>,
    pub enrollments: Vec<Value>,
    pub assignments: Vec<Value>,
    pub submissions: Vec<Value>,
}

/// Fetch every course page of an account and flatten it
///
/// Courses that are neither available nor completed, or whose term lies
/// entirely outside `[start_date, end_date]`, are dropped.
pub async fn extract(
    client: &RequestClient,
    account_id: &str,
    start_date: &str,
    end_date: &str,
) -> Result<GraphQlExtract> {
    let resource = Resource::graphql(
        "graphql_courses",
        "api/graphql",
        courses_query(account_id, client.page_size()),
        COURSES_CONNECTION,
    );

    let mut extract = GraphQlExtract::default();
    let mut pages = client.get(resource);
    while let Some(page) = pages.next_page().await? {
        for course in page {
            if course_in_window(&course, start_date, end_date) {
                flatten_course(&course, &mut extract);
            }
        }
    }
    Ok(extract)
}

fn course_in_window(course: &Value, start_date: &str, end_date: &str) -> bool {
    let state = string_at(course, "/state");
    if state != "available" && state != "completed" {
        return false;
    }
    let term_start = string_at(course, "/term/startAt");
    let term_end = string_at(course, "/term/endAt");
    if term_start.is_empty() || term_end.is_empty() {
        return true;
    }
    // ISO dates compare lexically
    term_start.get(..10).unwrap_or(term_start.as_str()) <= end_date
        && term_end.get(..10).unwrap_or(term_end.as_str()) >= start_date
}

fn nodes<'a>(value: &'a Value, connection: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(connection)
        .and_then(|c| c.get("nodes"))
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|v| !v.is_null())
}

fn record(pairs: Vec<(&str, Value)>) -> Value {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert(k.to_string(), v);
    }
    Value::Object(map)
}

/// Flatten one course node into REST-shaped records
pub fn flatten_course(course: &Value, out: &mut GraphQlExtract) {
    let course_id = string_at(course, "/_id");
    out.courses.push(json!({
        "id": course_id,
        "name": string_at(course, "/name"),
        "workflow_state": string_at(course, "/state"),
    }));

    for section in nodes(course, "sectionsConnection") {
        out.sections.push(json!({
            "id": string_at(section, "/_id"),
            "course_id": course_id,
            "name": string_at(section, "/name"),
            "sis_section_id": string_at(section, "/sisId"),
        }));
    }

    let mut seen_students: HashSet<String> =
        out.students.iter().map(|s| scalar_to_string(&s["id"])).collect();
    let mut student_sections: HashMap<String, String> = HashMap::new();

    for enrollment in nodes(course, "enrollmentsConnection") {
        let user_id = string_at(enrollment, "/user/_id");
        let section_id = string_at(enrollment, "/section/_id");
        let enrollment_type = string_at(enrollment, "/type");

        out.enrollments.push(record(vec![
            ("id", json!(string_at(enrollment, "/_id"))),
            ("user_id", json!(user_id)),
            ("course_section_id", json!(section_id)),
            ("enrollment_state", json!(string_at(enrollment, "/state"))),
            ("type", json!(enrollment_type)),
            ("created_at", json!(string_at(enrollment, "/createdAt"))),
            ("updated_at", json!(string_at(enrollment, "/updatedAt"))),
            (
                "grades",
                json!({
                    "final_score": enrollment.pointer("/grades/finalScore").cloned().unwrap_or(Value::Null),
                    "current_score": enrollment.pointer("/grades/currentScore").cloned().unwrap_or(Value::Null),
                }),
            ),
        ]));

        if enrollment_type == "StudentEnrollment" && !user_id.is_empty() {
            student_sections
                .entry(user_id.clone())
                .or_insert_with(|| section_id.clone());
            if seen_students.insert(user_id.clone()) {
                out.students.push(json!({
                    "id": user_id,
                    "sis_user_id": string_at(enrollment, "/user/sisId"),
                    "login_id": string_at(enrollment, "/user/loginId"),
                    "name": string_at(enrollment, "/user/name"),
                    "email": string_at(enrollment, "/user/email"),
                    "created_at": string_at(enrollment, "/user/createdAt"),
                }));
            }
        }
    }

    for assignment in nodes(course, "assignmentsConnection") {
        out.assignments.push(json!({
            "id": string_at(assignment, "/_id"),
            "course_id": course_id,
            "name": string_at(assignment, "/name"),
            "description": string_at(assignment, "/description"),
            "created_at": string_at(assignment, "/createdAt"),
            "updated_at": string_at(assignment, "/updatedAt"),
            "lock_at": string_at(assignment, "/lockAt"),
            "unlock_at": string_at(assignment, "/unlockAt"),
            "due_at": string_at(assignment, "/dueAt"),
            "points_possible": string_at(assignment, "/pointsPossible"),
            "submission_types": assignment.get("submissionTypes").cloned().unwrap_or(json!([])),
        }));
    }

    for submission in nodes(course, "submissionsConnection") {
        let user_id = string_at(submission, "/user/_id");
        // submissions are filed under the student's section in this course
        let Some(section_id) = student_sections.get(&user_id) else {
            continue;
        };
        out.submissions.push(json!({
            "id": string_at(submission, "/_id"),
            "section_id": section_id,
            "assignment_id": string_at(submission, "/assignment/_id"),
            "user_id": user_id,
            "late": submission.get("late").cloned().unwrap_or(Value::Bool(false)),
            "missing": submission.get("missing").cloned().unwrap_or(Value::Bool(false)),
            "submitted_at": string_at(submission, "/submittedAt"),
            "graded_at": string_at(submission, "/gradedAt"),
            "grade": string_at(submission, "/grade"),
            "score": string_at(submission, "/score"),
            "workflow_state": string_at(submission, "/state"),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::lms::canvas::models::{CanvasEnrollment, CanvasSubmission};
    use crate::adapters::lms::{AuthStrategy, ClientSettings};
    use crate::config::secret_string;

    fn course_node() -> Value {
        json!({
            "_id": "1",
            "name": "Algebra",
            "state": "available",
            "term": {"startAt": "2021-01-01T00:00:00Z", "endAt": "2021-06-30T00:00:00Z"},
            "sectionsConnection": {"nodes": [{"_id": "2", "name": "Algebra A", "sisId": "ALG-A"}]},
            "enrollmentsConnection": {"nodes": [
                {"_id": "4", "state": "invited", "type": "StudentEnrollment",
                 "section": {"_id": "2"},
                 "user": {"_id": "5", "name": "Ada", "email": "ada@example.edu"},
                 "grades": {"finalScore": 91.5, "currentScore": 90}},
                {"_id": "6", "state": "active", "type": "TeacherEnrollment",
                 "section": {"_id": "2"}, "user": {"_id": "8"}}
            ]},
            "assignmentsConnection": {"nodes": [
                {"_id": "103", "name": "Quiz", "submissionTypes": ["online_quiz"]}
            ]},
            "submissionsConnection": {"nodes": [
                {"_id": "77", "late": true, "user": {"_id": "5"}, "assignment": {"_id": "103"}},
                {"_id": "78", "user": {"_id": "999"}, "assignment": {"_id": "103"}}
            ]}
        })
    }

    #[test]
    fn test_flatten_course() {
        let mut out = GraphQlExtract::default();
        flatten_course(&course_node(), &mut out);

        assert_eq!(out.courses.len(), 1);
        assert_eq!(out.sections[0]["course_id"], "1");
        assert_eq!(out.enrollments.len(), 2);
        assert_eq!(out.students.len(), 1);
        assert_eq!(out.assignments[0]["course_id"], "1");
        // submission of a user without a student enrollment is dropped
        assert_eq!(out.submissions.len(), 1);

        let enrollment: CanvasEnrollment = serde_json::from_value(out.enrollments[0].clone()).unwrap();
        assert_eq!(enrollment.grades.unwrap().final_score, "91.5");

        let submission: CanvasSubmission = serde_json::from_value(out.submissions[0].clone()).unwrap();
        assert_eq!(submission.section_id, "2");
        assert!(submission.late);
    }

    #[test]
    fn test_course_window_filter() {
        let course = course_node();
        assert!(course_in_window(&course, "2021-03-01", "2021-04-01"));
        assert!(!course_in_window(&course, "2022-01-01", "2022-06-01"));

        let mut deleted = course_node();
        deleted["state"] = json!("deleted");
        assert!(!course_in_window(&deleted, "2021-03-01", "2021-04-01"));
    }

    #[tokio::test]
    async fn test_extract_pages_with_cursor() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/api/graphql")
            .match_body(mockito::Matcher::PartialJson(json!({"variables": {"after": null}})))
            .with_body(
                json!({"data": {"account": {"coursesConnection": {
                    "nodes": [course_node()],
                    "pageInfo": {"hasNextPage": true, "endCursor": "MQ"}
                }}}})
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("POST", "/api/graphql")
            .match_body(mockito::Matcher::PartialJson(json!({"variables": {"after": "MQ"}})))
            .with_body(
                json!({"data": {"account": {"coursesConnection": {
                    "nodes": [],
                    "pageInfo": {"hasNextPage": false, "endCursor": null}
                }}}})
                .to_string(),
            )
            .create_async()
            .await;

        let client = RequestClient::new(
            "Canvas",
            server.url(),
            AuthStrategy::bearer(secret_string("t".to_string())),
            ClientSettings::default(),
        )
        .unwrap();

        let out = extract(&client, "1", "2021-01-01", "2021-06-30").await.unwrap();
        assert_eq!(out.courses.len(), 1);
        first.assert_async().await;
        second.assert_async().await;
    }
}
