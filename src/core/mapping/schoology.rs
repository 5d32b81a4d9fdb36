//! Schoology to UDM

use super::dates::{from_unix_seconds, normalize_timestamp};
use super::status::{
    schoology_attendance_status, schoology_enrollment_status, submission_status, SubmissionFacts,
};
use crate::adapters::lms::schoology::{
    SchoologyAssignment, SchoologyAttendance, SchoologyEnrollment, SchoologyRole,
    SchoologySection, SchoologySectionUpdate, SchoologySubmission, SchoologyUpdateComment,
    SchoologyUser,
};
use crate::core::sync::Synced;
use crate::domain::udm::source_system::SCHOOLOGY;
use crate::domain::{
    Assignment, AssignmentSubmission, LmsAttendanceEvent, LmsSection, LmsSectionActivity,
    LmsSectionAssociation, LmsUser,
};
use std::collections::HashMap;

pub const SECTION_UPDATE: &str = "section-update";
pub const SECTION_UPDATE_COMMENT: &str = "section-update-comment";

/// First, middle and last name joined, with the gap of an empty part collapsed
pub fn full_name(first: &str, middle: &str, last: &str) -> String {
    [first, middle, last].join(" ").replace("  ", " ").trim().to_string()
}

/// Users with their role title; a user whose role is unknown gets an empty role
pub fn map_users(users: &[Synced<SchoologyUser>], roles: &[SchoologyRole]) -> Vec<LmsUser> {
    let titles: HashMap<&str, &str> = roles
        .iter()
        .map(|r| (r.id.as_str(), r.title.as_str()))
        .collect();

    users
        .iter()
        .map(|synced| {
            let user = &synced.record;
            LmsUser {
                source_system_identifier: user.uid.clone(),
                source_system: SCHOOLOGY.to_string(),
                user_role: titles
                    .get(user.role_id.as_str())
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
                sis_user_identifier: user.school_uid.clone(),
                local_user_identifier: user.username.clone(),
                name: full_name(&user.name_first, &user.name_middle, &user.name_last),
                email_address: user.primary_email.clone(),
                source_create_date: String::new(),
                source_last_modified_date: String::new(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

pub fn map_sections(sections: &[Synced<SchoologySection>]) -> Vec<LmsSection> {
    sections
        .iter()
        .map(|synced| {
            let section = &synced.record;
            LmsSection {
                source_system_identifier: section.id.clone(),
                source_system: SCHOOLOGY.to_string(),
                sis_section_identifier: section.section_school_code.clone(),
                title: section.section_title.clone(),
                section_description: section.description.clone(),
                term: String::new(),
                lms_section_status: if section.active { "active" } else { "inactive" }.to_string(),
                source_create_date: String::new(),
                source_last_modified_date: String::new(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

/// Enrollments of one section; section admins (teachers) are excluded
pub fn map_section_associations(
    enrollments: &[Synced<SchoologyEnrollment>],
    section_id: &str,
) -> Vec<LmsSectionAssociation> {
    enrollments
        .iter()
        .filter(|synced| !synced.record.admin)
        .map(|synced| {
            let enrollment = &synced.record;
            LmsSectionAssociation {
                source_system_identifier: enrollment.id.clone(),
                source_system: SCHOOLOGY.to_string(),
                enrollment_status: schoology_enrollment_status(&enrollment.status).to_string(),
                lms_user_source_system_identifier: enrollment.uid.clone(),
                lms_section_source_system_identifier: section_id.to_string(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
                ..Default::default()
            }
        })
        .collect()
}

pub fn map_assignments(
    assignments: &[Synced<SchoologyAssignment>],
    section_id: &str,
) -> Vec<Assignment> {
    assignments
        .iter()
        .map(|synced| {
            let assignment = &synced.record;
            Assignment {
                source_system_identifier: assignment.id.clone(),
                source_system: SCHOOLOGY.to_string(),
                lms_section_source_system_identifier: section_id.to_string(),
                title: assignment.title.clone(),
                assignment_category: assignment.assignment_type.clone(),
                assignment_description: assignment.description.clone(),
                due_date_time: normalize_timestamp(&assignment.due),
                max_points: assignment.max_points.clone(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
                ..Default::default()
            }
        })
        .collect()
}

/// Late revisions are late, drafts are upcoming, everything else is on time
pub fn map_submissions(submissions: &[Synced<SchoologySubmission>]) -> Vec<AssignmentSubmission> {
    submissions
        .iter()
        .map(|synced| {
            let submission = &synced.record;
            let status = submission_status(SubmissionFacts {
                late: submission.late,
                upcoming: submission.draft,
                ..Default::default()
            });
            AssignmentSubmission {
                source_system_identifier: submission.id.clone(),
                source_system: SCHOOLOGY.to_string(),
                assignment_source_system_identifier: submission.assignment_id().to_string(),
                lms_user_source_system_identifier: submission.uid.clone(),
                submission_status: status.to_string(),
                submission_date_time: from_unix_seconds(&submission.created),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
                ..Default::default()
            }
        })
        .collect()
}

pub fn section_update_key(update_id: &str) -> String {
    format!("su#{update_id}")
}

pub fn map_section_updates(
    updates: &[Synced<SchoologySectionUpdate>],
    section_id: &str,
) -> Vec<LmsSectionActivity> {
    updates
        .iter()
        .map(|synced| {
            let update = &synced.record;
            LmsSectionActivity {
                source_system_identifier: section_update_key(&update.id),
                source_system: SCHOOLOGY.to_string(),
                lms_user_source_system_identifier: update.uid.clone(),
                lms_section_source_system_identifier: section_id.to_string(),
                activity_type: SECTION_UPDATE.to_string(),
                activity_date_time: from_unix_seconds(&update.created),
                content: update.body.clone(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
                ..Default::default()
            }
        })
        .collect()
}

pub fn map_update_comments(
    comments: &[Synced<SchoologyUpdateComment>],
    section_id: &str,
) -> Vec<LmsSectionActivity> {
    comments
        .iter()
        .map(|synced| {
            let comment = &synced.record;
            LmsSectionActivity {
                source_system_identifier: format!("suc#{}", comment.id),
                source_system: SCHOOLOGY.to_string(),
                lms_user_source_system_identifier: comment.uid.clone(),
                lms_section_source_system_identifier: section_id.to_string(),
                activity_type: SECTION_UPDATE_COMMENT.to_string(),
                activity_date_time: from_unix_seconds(&comment.created),
                parent_source_system_identifier: section_update_key(&comment.update_id),
                content: comment.comment.clone(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
                ..Default::default()
            }
        })
        .collect()
}

/// Attendance marks joined to the section's associations
///
/// Marks whose enrollment is not among `associations` are dropped.
pub fn map_attendance(
    marks: &[Synced<SchoologyAttendance>],
    associations: &[LmsSectionAssociation],
) -> Vec<LmsAttendanceEvent> {
    let by_enrollment: HashMap<&str, &LmsSectionAssociation> = associations
        .iter()
        .map(|a| (a.source_system_identifier.as_str(), a))
        .collect();

    marks
        .iter()
        .filter_map(|synced| {
            let mark = &synced.record;
            let association = by_enrollment.get(mark.enrollment_id.as_str())?;
            Some(LmsAttendanceEvent {
                source_system_identifier: format!("{}#{}", mark.enrollment_id, mark.date),
                source_system: SCHOOLOGY.to_string(),
                lms_user_source_system_identifier: association
                    .lms_user_source_system_identifier
                    .clone(),
                lms_section_source_system_identifier: association
                    .lms_section_source_system_identifier
                    .clone(),
                association_source_system_identifier: mark.enrollment_id.clone(),
                event_date: mark.date.clone(),
                attendance_status: schoology_attendance_status(&mark.status).to_string(),
                source_create_date: String::new(),
                source_last_modified_date: String::new(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::SyncStatus;
    use crate::domain::SyncDates;
    use serde_json::json;
    use test_case::test_case;

    fn synced<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Synced<T> {
        Synced {
            source_id: String::new(),
            status: SyncStatus::Unchanged,
            dates: SyncDates {
                create_date: "2021-01-01 00:00:00".into(),
                last_modified_date: "2021-02-01 00:00:00".into(),
            },
            record: serde_json::from_value(value).unwrap(),
        }
    }

    #[test_case("Ada", "", "Lovelace", "Ada Lovelace" ; "no middle name")]
    #[test_case("Ada", "King", "Lovelace", "Ada King Lovelace" ; "middle name")]
    fn test_full_name(first: &str, middle: &str, last: &str, expected: &str) {
        assert_eq!(full_name(first, middle, last), expected);
    }

    #[test]
    fn test_users_join_roles() {
        let users = vec![synced::<SchoologyUser>(json!({
            "uid": 100, "role_id": 7, "school_uid": "S-1",
            "name_first": "Ada", "name_middle": "", "name_last": "Lovelace",
            "username": "ada", "primary_email": "ada@example.edu"
        }))];
        let roles = vec![SchoologyRole { id: "7".into(), title: "Student".into() }];

        let mapped = map_users(&users, &roles);

        assert_eq!(mapped[0].user_role, "Student");
        assert_eq!(mapped[0].name, "Ada Lovelace");
        assert_eq!(mapped[0].local_user_identifier, "ada");
        assert_eq!(mapped[0].last_modified_date, "2021-02-01 00:00:00");
    }

    #[test]
    fn test_admins_are_not_associations() {
        let enrollments = vec![
            synced::<SchoologyEnrollment>(json!({"id": 1, "uid": 100, "status": 1, "admin": 0})),
            synced::<SchoologyEnrollment>(json!({"id": 2, "uid": 200, "status": 1, "admin": 1})),
        ];

        let mapped = map_section_associations(&enrollments, "5");

        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].enrollment_status, "Active");
        assert_eq!(mapped[0].lms_section_source_system_identifier, "5");
    }

    #[test]
    fn test_submission_statuses() {
        let submissions = vec![
            synced::<SchoologySubmission>(json!({"id": "5#12#100", "uid": 100, "late": 1, "draft": 1, "created": 1614592800})),
            synced::<SchoologySubmission>(json!({"id": "5#12#101", "uid": 101, "late": 0, "draft": 1})),
            synced::<SchoologySubmission>(json!({"id": "5#12#102", "uid": 102, "late": 0, "draft": 0})),
        ];

        let mapped = map_submissions(&submissions);

        assert_eq!(mapped[0].submission_status, "late");
        assert_eq!(mapped[1].submission_status, "upcoming");
        assert_eq!(mapped[2].submission_status, "on-time");
        assert_eq!(mapped[0].assignment_source_system_identifier, "12");
        assert_eq!(mapped[0].submission_date_time, "2021-03-01 10:00:00");
    }

    #[test]
    fn test_update_comments_point_at_their_update() {
        let comments = vec![synced::<SchoologyUpdateComment>(json!({
            "id": 9, "uid": 100, "comment": "Thanks", "created": 1614592800, "update_id": "3"
        }))];

        let mapped = map_update_comments(&comments, "5");

        assert_eq!(mapped[0].source_system_identifier, "suc#9");
        assert_eq!(mapped[0].parent_source_system_identifier, "su#3");
        assert_eq!(mapped[0].activity_type, "section-update-comment");
    }

    #[test]
    fn test_attendance_joins_associations() {
        let marks = vec![
            synced::<SchoologyAttendance>(json!({"enrollment_id": 1, "date": "2021-02-01", "status": 3})),
            synced::<SchoologyAttendance>(json!({"enrollment_id": 99, "date": "2021-02-01", "status": 1})),
        ];
        let associations = vec![LmsSectionAssociation {
            source_system_identifier: "1".into(),
            lms_user_source_system_identifier: "100".into(),
            lms_section_source_system_identifier: "5".into(),
            ..Default::default()
        }];

        let events = map_attendance(&marks, &associations);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source_system_identifier, "1#2021-02-01");
        assert_eq!(events[0].attendance_status, "late");
        assert_eq!(events[0].lms_user_source_system_identifier, "100");
        assert_eq!(events[0].lms_section_source_system_identifier, "5");
    }
}
