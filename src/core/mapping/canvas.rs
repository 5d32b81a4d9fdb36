//! Canvas to UDM

use super::dates::{is_after, normalize_timestamp};
use super::status::{canvas_enrollment_status, submission_status, SubmissionFacts};
use super::submission_type_literal;
use crate::adapters::lms::canvas::{
    CanvasAssignment, CanvasAuthenticationEvent, CanvasEnrollment, CanvasSection, CanvasSubmission,
    CanvasUser,
};
use crate::core::sync::Synced;
use crate::domain::udm::source_system::CANVAS;
use crate::domain::{
    Assignment, AssignmentSubmission, LmsGrade, LmsSection, LmsSectionAssociation,
    LmsSystemActivity, LmsUser,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

pub const STUDENT_ROLE: &str = "Student";
pub const ASSIGNMENT_CATEGORY: &str = "assignment";
pub const FINAL_GRADE: &str = "Final";

/// `<section>-<assignment>`, the key of an assignment copied into one section
pub fn section_assignment_key(section_id: &str, assignment_id: &str) -> String {
    format!("{section_id}-{assignment_id}")
}

pub fn map_users(users: &[Synced<CanvasUser>]) -> Vec<LmsUser> {
    users
        .iter()
        .map(|synced| {
            let user = &synced.record;
            LmsUser {
                source_system_identifier: user.id.clone(),
                source_system: CANVAS.to_string(),
                user_role: STUDENT_ROLE.to_string(),
                sis_user_identifier: user.sis_user_id.clone(),
                local_user_identifier: user.login_id.clone(),
                name: user.name.clone(),
                email_address: user.email.clone(),
                source_create_date: normalize_timestamp(&user.created_at),
                source_last_modified_date: String::new(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

pub fn map_sections(sections: &[Synced<CanvasSection>]) -> Vec<LmsSection> {
    sections
        .iter()
        .map(|synced| {
            let section = &synced.record;
            LmsSection {
                source_system_identifier: section.id.clone(),
                source_system: CANVAS.to_string(),
                sis_section_identifier: section.sis_section_id.clone(),
                title: section.name.clone(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
                ..Default::default()
            }
        })
        .collect()
}

pub fn map_section_associations(
    enrollments: &[Synced<CanvasEnrollment>],
) -> Vec<LmsSectionAssociation> {
    enrollments
        .iter()
        .map(|synced| {
            let enrollment = &synced.record;
            LmsSectionAssociation {
                source_system_identifier: enrollment.id.clone(),
                source_system: CANVAS.to_string(),
                enrollment_status: canvas_enrollment_status(&enrollment.enrollment_state)
                    .to_string(),
                lms_user_source_system_identifier: enrollment.user_id.clone(),
                lms_section_source_system_identifier: enrollment.course_section_id.clone(),
                start_date: String::new(),
                end_date: String::new(),
                source_create_date: normalize_timestamp(&enrollment.created_at),
                source_last_modified_date: normalize_timestamp(&enrollment.updated_at),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

/// One assignment per (section of the course, assignment)
pub fn map_assignments(
    assignments: &[Synced<CanvasAssignment>],
    sections: &[CanvasSection],
) -> Vec<Assignment> {
    let mut seen = HashSet::new();
    let mut mapped = Vec::new();

    for section in sections {
        for synced in assignments
            .iter()
            .filter(|a| a.record.course_id == section.course_id)
        {
            let assignment = &synced.record;
            let key = section_assignment_key(&section.id, &assignment.id);
            if !seen.insert(key.clone()) {
                continue;
            }
            mapped.push(Assignment {
                source_system_identifier: key,
                source_system: CANVAS.to_string(),
                lms_section_source_system_identifier: section.id.clone(),
                title: assignment.name.clone(),
                assignment_category: ASSIGNMENT_CATEGORY.to_string(),
                assignment_description: assignment.description.clone(),
                start_date_time: normalize_timestamp(&assignment.unlock_at),
                end_date_time: normalize_timestamp(&assignment.lock_at),
                due_date_time: normalize_timestamp(&assignment.due_at),
                submission_type: submission_type_literal(&assignment.submission_types),
                max_points: assignment.points_possible.clone(),
                source_create_date: normalize_timestamp(&assignment.created_at),
                source_last_modified_date: normalize_timestamp(&assignment.updated_at),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            });
        }
    }
    mapped
}

/// Derive a Canvas submission's status
///
/// `due_at` is the parent assignment's due date; an unsubmitted submission
/// whose due date is still ahead of `now` is upcoming.
pub fn canvas_submission_status(
    submission: &CanvasSubmission,
    due_at: &str,
    now: DateTime<Utc>,
) -> &'static str {
    submission_status(SubmissionFacts {
        late: submission.late,
        missing: submission.missing,
        graded: !submission.graded_at.is_empty(),
        upcoming: submission.submitted_at.is_empty() && is_after(due_at, now),
    })
}

/// Map submissions; `due_dates` is keyed by assignment id
pub fn map_submissions(
    submissions: &[Synced<CanvasSubmission>],
    due_dates: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> Vec<AssignmentSubmission> {
    submissions
        .iter()
        .map(|synced| {
            let submission = &synced.record;
            let due_at = due_dates
                .get(&submission.assignment_id)
                .map(String::as_str)
                .unwrap_or("");
            AssignmentSubmission {
                source_system_identifier: section_assignment_key(
                    &submission.section_id,
                    &submission.id,
                ),
                source_system: CANVAS.to_string(),
                assignment_source_system_identifier: section_assignment_key(
                    &submission.section_id,
                    &submission.assignment_id,
                ),
                lms_user_source_system_identifier: submission.user_id.clone(),
                submission_status: canvas_submission_status(submission, due_at, now).to_string(),
                submission_date_time: normalize_timestamp(&submission.submitted_at),
                earned_points: submission.score.clone(),
                grade: submission.grade.clone(),
                source_create_date: String::new(),
                source_last_modified_date: String::new(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

/// Final grades of student enrollments
pub fn map_grades(enrollments: &[Synced<CanvasEnrollment>]) -> Vec<LmsGrade> {
    enrollments
        .iter()
        .filter(|synced| synced.record.is_student())
        .filter_map(|synced| {
            let enrollment = &synced.record;
            let grades = enrollment.grades.as_ref()?;
            Some(LmsGrade {
                source_system_identifier: format!("g#{}", enrollment.id),
                source_system: CANVAS.to_string(),
                association_source_system_identifier: enrollment.id.clone(),
                lms_user_source_system_identifier: enrollment.user_id.clone(),
                lms_section_source_system_identifier: enrollment.course_section_id.clone(),
                grade: grades.final_score.clone(),
                grade_type: FINAL_GRADE.to_string(),
                source_create_date: String::new(),
                source_last_modified_date: String::new(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            })
        })
        .collect()
}

pub fn map_system_activities(
    events: &[Synced<CanvasAuthenticationEvent>],
) -> Vec<LmsSystemActivity> {
    events
        .iter()
        .map(|synced| {
            let event = &synced.record;
            let activity_type = if event.event_type == "login" {
                "sign-in"
            } else {
                "sign-out"
            };
            LmsSystemActivity {
                source_system_identifier: event.id.clone(),
                source_system: CANVAS.to_string(),
                lms_user_source_system_identifier: event
                    .id
                    .split('#')
                    .nth(1)
                    .unwrap_or(&event.user_id)
                    .to_string(),
                activity_type: activity_type.to_string(),
                activity_date_time: normalize_timestamp(&event.created_at),
                activity_status: "active".to_string(),
                parent_source_system_identifier: String::new(),
                activity_time_in_minutes: String::new(),
                content: String::new(),
                source_create_date: normalize_timestamp(&event.created_at),
                source_last_modified_date: String::new(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::SyncStatus;
    use crate::domain::SyncDates;
    use chrono::TimeZone;
    use serde_json::json;

    fn synced<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Synced<T> {
        Synced {
            source_id: String::new(),
            status: SyncStatus::New,
            dates: SyncDates {
                create_date: "2021-03-01 00:00:00".into(),
                last_modified_date: "2021-03-01 00:00:00".into(),
            },
            record: serde_json::from_value(value).unwrap(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_invited_enrollment_maps_to_invite_pending() {
        let enrollments = vec![synced::<CanvasEnrollment>(json!({
            "id": 4,
            "user_id": 5,
            "course_section_id": 2,
            "enrollment_state": "invited",
            "created_at": "2020-08-31T16:59:00Z",
            "updated_at": "2020-09-02T21:47:09Z"
        }))];

        let mapped = map_section_associations(&enrollments);

        assert_eq!(mapped.len(), 1);
        let row = &mapped[0];
        assert_eq!(row.source_system_identifier, "4");
        assert_eq!(row.enrollment_status, "Invite pending");
        assert_eq!(row.source_system, "Canvas");
        assert_eq!(row.source_create_date, "2020-08-31 16:59:00");
        assert_eq!(row.source_last_modified_date, "2020-09-02 21:47:09");
        assert_eq!(row.lms_user_source_system_identifier, "5");
        assert_eq!(row.lms_section_source_system_identifier, "2");
        assert_eq!(row.create_date, "2021-03-01 00:00:00");
    }

    #[test]
    fn test_late_beats_graded() {
        let submissions = vec![synced::<CanvasSubmission>(json!({
            "id": 9,
            "section_id": 2,
            "assignment_id": 103,
            "user_id": 5,
            "late": "True",
            "missing": "False",
            "graded_at": "2021-03-01T00:00:00Z",
            "submitted_at": "2021-02-28T10:00:00Z"
        }))];

        let mapped = map_submissions(&submissions, &HashMap::new(), now());

        assert_eq!(mapped[0].submission_status, "late");
        assert_eq!(mapped[0].source_system_identifier, "2-9");
        assert_eq!(mapped[0].assignment_source_system_identifier, "2-103");
        assert_eq!(mapped[0].submission_date_time, "2021-02-28 10:00:00");
    }

    #[test]
    fn test_unsubmitted_with_future_due_date_is_upcoming() {
        let submission: CanvasSubmission =
            serde_json::from_value(json!({"id": 1, "assignment_id": 103})).unwrap();
        assert_eq!(
            canvas_submission_status(&submission, "2021-03-05T00:00:00Z", now()),
            "upcoming"
        );
        assert_eq!(
            canvas_submission_status(&submission, "2021-02-05T00:00:00Z", now()),
            "on-time"
        );
    }

    #[test]
    fn test_assignments_are_copied_into_each_section() {
        let assignments = vec![synced::<CanvasAssignment>(json!({
            "id": 103,
            "course_id": 1,
            "name": "Essay",
            "due_at": "2021-03-05T23:59:00Z",
            "submission_types": ["online_text_entry", "online_upload"]
        }))];
        let sections: Vec<CanvasSection> = vec![
            serde_json::from_value(json!({"id": 2, "course_id": 1})).unwrap(),
            serde_json::from_value(json!({"id": 3, "course_id": 1})).unwrap(),
            serde_json::from_value(json!({"id": 4, "course_id": 99})).unwrap(),
        ];

        let mapped = map_assignments(&assignments, &sections);

        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].source_system_identifier, "2-103");
        assert_eq!(mapped[1].lms_section_source_system_identifier, "3");
        assert_eq!(mapped[0].due_date_time, "2021-03-05 23:59:00");
        assert_eq!(
            mapped[0].submission_type,
            "['online_text_entry', 'online_upload']"
        );
        assert_eq!(mapped[0].assignment_category, "assignment");
    }

    #[test]
    fn test_grades_only_for_students() {
        let enrollments = vec![
            synced::<CanvasEnrollment>(json!({
                "id": 4, "user_id": 5, "course_section_id": 2,
                "type": "StudentEnrollment", "grades": {"final_score": 91.5}
            })),
            synced::<CanvasEnrollment>(json!({
                "id": 6, "user_id": 8, "course_section_id": 2,
                "type": "TeacherEnrollment", "grades": {"final_score": 100}
            })),
        ];

        let grades = map_grades(&enrollments);

        assert_eq!(grades.len(), 1);
        assert_eq!(grades[0].source_system_identifier, "g#4");
        assert_eq!(grades[0].association_source_system_identifier, "4");
        assert_eq!(grades[0].grade, "91.5");
        assert_eq!(grades[0].grade_type, "Final");
    }

    #[test]
    fn test_authentication_events() {
        let events = vec![
            synced::<CanvasAuthenticationEvent>(json!({
                "id": "login#12#2021-02-01T10:00:00Z", "user_id": "12",
                "event_type": "login", "created_at": "2021-02-01T10:00:00Z"
            })),
            synced::<CanvasAuthenticationEvent>(json!({
                "id": "logout#12#2021-02-01T11:00:00Z", "user_id": "12",
                "event_type": "logout", "created_at": "2021-02-01T11:00:00Z"
            })),
        ];

        let mapped = map_system_activities(&events);

        assert_eq!(mapped[0].activity_type, "sign-in");
        assert_eq!(mapped[1].activity_type, "sign-out");
        assert_eq!(mapped[0].lms_user_source_system_identifier, "12");
        assert_eq!(mapped[0].activity_date(), "2021-02-01");
        assert_eq!(mapped[0].activity_status, "active");
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        assert!(map_users(&[]).is_empty());
        assert!(map_assignments(&[], &[]).is_empty());
    }
}
