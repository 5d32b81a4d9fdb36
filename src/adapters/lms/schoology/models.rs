//! Schoology API data models

use crate::adapters::lms::models::{scalar_to_string, string_at, string_or_number, value_to_flag};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Schoology flags arrive as `0`/`1` numbers or strings
fn numeric_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_to_flag).unwrap_or(false))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologyUser {
    #[serde(default, deserialize_with = "string_or_number")]
    pub uid: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub role_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub school_uid: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name_first: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name_middle: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name_last: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub username: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub primary_email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologyRole {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologyCourse {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologySection {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub section_title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub section_school_code: String,
    #[serde(default, deserialize_with = "numeric_flag")]
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologyEnrollment {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub uid: String,
    /// Numeric status code, 1 through 5
    #[serde(default, deserialize_with = "string_or_number")]
    pub status: String,
    #[serde(default, deserialize_with = "numeric_flag")]
    pub admin: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologyAssignment {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub description: String,
    /// `YYYY-MM-DD HH:MM:SS`, or empty
    #[serde(default, deserialize_with = "string_or_number")]
    pub due: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub max_points: String,
    #[serde(default, rename = "type", deserialize_with = "string_or_number")]
    pub assignment_type: String,
}

/// A submission revision, with the synthetic id assigned at fetch time
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologySubmission {
    /// `<section>#<assignment>#<uid>`
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub uid: String,
    /// Unix seconds
    #[serde(default, deserialize_with = "string_or_number")]
    pub created: String,
    #[serde(default, deserialize_with = "numeric_flag")]
    pub late: bool,
    #[serde(default, deserialize_with = "numeric_flag")]
    pub draft: bool,
}

impl SchoologySubmission {
    /// Assignment id embedded in the synthetic id
    pub fn assignment_id(&self) -> &str {
        self.id.split('#').nth(1).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologySectionUpdate {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub uid: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub body: String,
    /// Unix seconds
    #[serde(default, deserialize_with = "string_or_number")]
    pub created: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchoologyUpdateComment {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub uid: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub comment: String,
    /// Unix seconds
    #[serde(default, deserialize_with = "string_or_number")]
    pub created: String,
    /// Set at fetch time
    #[serde(default, deserialize_with = "string_or_number")]
    pub update_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub status: String,
}

/// One flattened attendance mark
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoologyAttendance {
    #[serde(default, deserialize_with = "string_or_number")]
    pub enrollment_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub date: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub status: String,
}

/// Flatten the `date[] → statuses.status[] → attendances.attendance[]` tree
///
/// Nodes missing any of the nested keys are skipped.
pub fn flatten_attendance(dates: &[Value]) -> Vec<SchoologyAttendance> {
    let mut marks = Vec::new();
    for date_node in dates {
        let date = date_node
            .get("date")
            .map(scalar_to_string)
            .unwrap_or_default();
        let Some(statuses) = date_node.pointer("/statuses/status").and_then(Value::as_array) else {
            continue;
        };
        for status in statuses {
            let Some(attendances) = status
                .pointer("/attendances/attendance")
                .and_then(Value::as_array)
            else {
                continue;
            };
            for attendance in attendances {
                marks.push(SchoologyAttendance {
                    enrollment_id: string_at(attendance, "/enrollment_id"),
                    date: date.clone(),
                    status: string_at(attendance, "/status"),
                });
            }
        }
    }
    marks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flags_and_ids() {
        let enrollment: SchoologyEnrollment = serde_json::from_value(json!({
            "id": "7", "uid": 100, "status": 3, "admin": 1
        }))
        .unwrap();
        assert_eq!(enrollment.uid, "100");
        assert_eq!(enrollment.status, "3");
        assert!(enrollment.admin);

        let section: SchoologySection =
            serde_json::from_value(json!({"id": 5, "active": "0"})).unwrap();
        assert!(!section.active);
    }

    #[test]
    fn test_submission_assignment_id() {
        let submission = SchoologySubmission {
            id: "5#12#100".into(),
            ..Default::default()
        };
        assert_eq!(submission.assignment_id(), "12");
    }

    #[test]
    fn test_flatten_attendance() {
        let dates = vec![
            json!({"date": "2021-02-01", "statuses": {"status": [
                {"attendances": {"attendance": [
                    {"enrollment_id": 7, "status": 1},
                    {"enrollment_id": 8, "status": 2}
                ]}}
            ]}}),
            json!({"date": "2021-02-02"}),
            json!({"date": "2021-02-03", "statuses": {"status": [{"totals": {}}]}}),
        ];

        let marks = flatten_attendance(&dates);
        assert_eq!(marks.len(), 2);
        assert_eq!(
            marks[1],
            SchoologyAttendance {
                enrollment_id: "8".into(),
                date: "2021-02-01".into(),
                status: "2".into(),
            }
        );
    }
}
