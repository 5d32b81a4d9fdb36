//! Google Classroom to UDM
//!
//! Classroom has no section below the course, so the course id is the section
//! key throughout. Composite identifiers join their parts with `-`.

use super::dates::normalize_timestamp;
use super::status::{enrollment, submission_status, SubmissionFacts};
use crate::adapters::lms::google::{
    GoogleCourse, GoogleCourseUser, GoogleCourseWork, GoogleDate, GoogleLoginActivity,
    GoogleSubmission, GoogleTimeOfDay,
};
use crate::core::sync::Synced;
use crate::domain::udm::source_system::GOOGLE;
use crate::domain::{
    Assignment, AssignmentSubmission, LmsSection, LmsSectionActivity, LmsSectionAssociation,
    LmsSystemActivity, LmsUser, SyncDates,
};
use std::collections::HashSet;

pub const STUDENT_ROLE: &str = "Student";
pub const TEACHER_ROLE: &str = "Teacher";
pub const STATE_CHANGE: &str = "Submission State Change";
pub const GRADE_CHANGE: &str = "Submission Grade Change";

const TURNED_IN: &str = "TURNED_IN";
const RETURNED: &str = "RETURNED";
const NOT_TURNED_IN: [&str; 3] = ["CREATED", "NEW", "RECLAIMED_BY_STUDENT"];

/// Students first, then teachers; a user enrolled in several courses appears once
pub fn map_users(
    students: &[Synced<GoogleCourseUser>],
    teachers: &[Synced<GoogleCourseUser>],
) -> Vec<LmsUser> {
    let mut seen = HashSet::new();
    let roles = students
        .iter()
        .map(|s| (s, STUDENT_ROLE))
        .chain(teachers.iter().map(|t| (t, TEACHER_ROLE)));

    roles
        .filter(|(synced, _)| seen.insert(synced.record.user_id.clone()))
        .map(|(synced, role)| {
            let user = &synced.record;
            LmsUser {
                source_system_identifier: user.user_id.clone(),
                source_system: GOOGLE.to_string(),
                user_role: role.to_string(),
                sis_user_identifier: String::new(),
                local_user_identifier: user.profile.email_address.clone(),
                name: user.profile.name.full_name.clone(),
                email_address: user.profile.email_address.clone(),
                source_create_date: String::new(),
                source_last_modified_date: String::new(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

pub fn map_sections(courses: &[Synced<GoogleCourse>]) -> Vec<LmsSection> {
    courses
        .iter()
        .map(|synced| {
            let course = &synced.record;
            LmsSection {
                source_system_identifier: course.id.clone(),
                source_system: GOOGLE.to_string(),
                sis_section_identifier: String::new(),
                title: course.name.clone(),
                section_description: course.description_heading.clone(),
                term: String::new(),
                lms_section_status: course.course_state.clone(),
                source_create_date: normalize_timestamp(&course.creation_time),
                source_last_modified_date: normalize_timestamp(&course.update_time),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

/// Every roster entry, student or teacher, is an active association
pub fn map_section_associations(
    students: &[Synced<GoogleCourseUser>],
    teachers: &[Synced<GoogleCourseUser>],
) -> Vec<LmsSectionAssociation> {
    let mut seen = HashSet::new();
    students
        .iter()
        .chain(teachers)
        .filter_map(|synced| {
            let user = &synced.record;
            let key = format!("{}-{}", user.user_id, user.course_id);
            if !seen.insert(key.clone()) {
                return None;
            }
            Some(LmsSectionAssociation {
                source_system_identifier: key,
                source_system: GOOGLE.to_string(),
                enrollment_status: enrollment::ACTIVE.to_string(),
                lms_user_source_system_identifier: user.user_id.clone(),
                lms_section_source_system_identifier: user.course_id.clone(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
                ..Default::default()
            })
        })
        .collect()
}

/// Assemble a due timestamp from Classroom's split date and time of day
///
/// Both parts must be present and the date complete. Zero hours or minutes are
/// omitted on the wire and default to zero here.
pub fn due_date_time(date: Option<GoogleDate>, time: Option<GoogleTimeOfDay>) -> String {
    let (Some(date), Some(time)) = (date, time) else {
        return String::new();
    };
    if date.year == 0 || date.month == 0 || date.day == 0 {
        return String::new();
    }
    normalize_timestamp(&format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:00",
        date.year, date.month, date.day, time.hours, time.minutes
    ))
}

pub fn assignment_key(course_id: &str, course_work_id: &str) -> String {
    format!("{course_id}-{course_work_id}")
}

pub fn map_assignments(course_work: &[Synced<GoogleCourseWork>]) -> Vec<Assignment> {
    course_work
        .iter()
        .map(|synced| {
            let work = &synced.record;
            Assignment {
                source_system_identifier: assignment_key(&work.course_id, &work.id),
                source_system: GOOGLE.to_string(),
                lms_section_source_system_identifier: work.course_id.clone(),
                title: work.title.clone(),
                assignment_category: work.work_type.clone(),
                assignment_description: work.description.clone(),
                start_date_time: normalize_timestamp(&work.scheduled_time),
                end_date_time: String::new(),
                due_date_time: due_date_time(work.due_date, work.due_time),
                submission_type: String::new(),
                max_points: work.max_points.clone(),
                source_create_date: normalize_timestamp(&work.creation_time),
                source_last_modified_date: normalize_timestamp(&work.update_time),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

/// Status from the submission state and its late flag
pub fn google_submission_status(submission: &GoogleSubmission) -> &'static str {
    let state = submission.state.as_str();
    submission_status(SubmissionFacts {
        late: submission.late && state == TURNED_IN,
        missing: submission.late && NOT_TURNED_IN.contains(&state),
        graded: state == RETURNED,
        upcoming: false,
    })
}

/// Latest time the submission entered `TURNED_IN`, normalized
fn turned_in_at(submission: &GoogleSubmission) -> String {
    submission
        .submission_history
        .iter()
        .filter_map(|entry| entry.state_history.as_ref())
        .filter(|history| history.state == TURNED_IN)
        .filter_map(|history| super::dates::parse_timestamp(&history.state_timestamp))
        .max()
        .map(|ts| super::dates::format_timestamp(&ts))
        .unwrap_or_default()
}

pub fn map_submissions(submissions: &[Synced<GoogleSubmission>]) -> Vec<AssignmentSubmission> {
    submissions
        .iter()
        .map(|synced| {
            let submission = &synced.record;
            AssignmentSubmission {
                source_system_identifier: format!(
                    "{}-{}-{}",
                    submission.course_id, submission.course_work_id, submission.id
                ),
                source_system: GOOGLE.to_string(),
                assignment_source_system_identifier: assignment_key(
                    &submission.course_id,
                    &submission.course_work_id,
                ),
                lms_user_source_system_identifier: submission.user_id.clone(),
                submission_status: google_submission_status(submission).to_string(),
                submission_date_time: turned_in_at(submission),
                earned_points: submission.assigned_grade.clone(),
                grade: submission.assigned_grade.clone(),
                source_create_date: normalize_timestamp(&submission.creation_time),
                source_last_modified_date: normalize_timestamp(&submission.update_time),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
            }
        })
        .collect()
}

fn history_activity(
    key: String,
    submission: &GoogleSubmission,
    activity_type: &str,
    status: &str,
    actor: &str,
    timestamp: &str,
    dates: &SyncDates,
) -> LmsSectionActivity {
    LmsSectionActivity {
        source_system_identifier: key,
        source_system: GOOGLE.to_string(),
        lms_user_source_system_identifier: actor.to_string(),
        lms_section_source_system_identifier: submission.course_id.clone(),
        activity_type: activity_type.to_string(),
        activity_date_time: normalize_timestamp(timestamp),
        activity_status: status.to_string(),
        create_date: dates.create_date.clone(),
        last_modified_date: dates.last_modified_date.clone(),
        ..Default::default()
    }
}

/// One activity per state or grade history entry, keyed `S-` and `G-` respectively
pub fn map_submission_activities(
    submissions: &[Synced<GoogleSubmission>],
) -> Vec<LmsSectionActivity> {
    let mut seen = HashSet::new();
    let mut activities = Vec::new();

    for synced in submissions {
        let submission = &synced.record;
        let base = format!(
            "{}-{}-{}",
            submission.course_id, submission.course_work_id, submission.id
        );
        for entry in &submission.submission_history {
            if let Some(state) = &entry.state_history {
                let key = format!("S-{base}-{}", state.state_timestamp);
                if seen.insert(key.clone()) {
                    activities.push(history_activity(
                        key,
                        submission,
                        STATE_CHANGE,
                        &state.state,
                        &state.actor_user_id,
                        &state.state_timestamp,
                        &synced.dates,
                    ));
                }
            }
            if let Some(grade) = &entry.grade_history {
                let key = format!("G-{base}-{}", grade.grade_timestamp);
                if seen.insert(key.clone()) {
                    activities.push(history_activity(
                        key,
                        submission,
                        GRADE_CHANGE,
                        &grade.grade_change_type,
                        &grade.actor_user_id,
                        &grade.grade_timestamp,
                        &synced.dates,
                    ));
                }
            }
        }
    }
    activities
}

/// Sign-in and sign-out events; other login events are dropped
pub fn map_system_activities(activities: &[Synced<GoogleLoginActivity>]) -> Vec<LmsSystemActivity> {
    activities
        .iter()
        .filter_map(|synced| {
            let activity = &synced.record;
            let activity_type = activity.events.iter().find_map(|event| match event.name.as_str() {
                "login_success" => Some("sign-in"),
                "logout" => Some("sign-out"),
                _ => None,
            })?;
            Some(LmsSystemActivity {
                source_system_identifier: activity.activity_id.clone(),
                source_system: GOOGLE.to_string(),
                lms_user_source_system_identifier: activity.actor.profile_id.clone(),
                activity_type: activity_type.to_string(),
                activity_date_time: normalize_timestamp(&activity.id.time),
                activity_status: "active".to_string(),
                create_date: synced.dates.create_date.clone(),
                last_modified_date: synced.dates.last_modified_date.clone(),
                ..Default::default()
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sync::SyncStatus;
    use serde_json::json;
    use test_case::test_case;

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

    fn roster_entry(course: &str, user: &str) -> Synced<GoogleCourseUser> {
        synced(json!({
            "courseId": course,
            "userId": user,
            "profile": {"name": {"fullName": format!("User {user}")}, "emailAddress": format!("{user}@example.edu")}
        }))
    }

    #[test]
    fn test_users_are_deduplicated_across_courses() {
        let students = vec![roster_entry("c1", "u1"), roster_entry("c2", "u1")];
        let teachers = vec![roster_entry("c1", "t1")];

        let users = map_users(&students, &teachers);

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_role, "Student");
        assert_eq!(users[1].user_role, "Teacher");
        assert_eq!(users[0].email_address, "u1@example.edu");

        let associations = map_section_associations(&students, &teachers);
        assert_eq!(associations.len(), 3);
        assert_eq!(associations[0].source_system_identifier, "u1-c1");
        assert_eq!(associations[2].enrollment_status, "Active");
    }

    #[test_case(Some((2021, 3, 1)), Some((14, 30)), "2021-03-01 14:30:00" ; "complete")]
    #[test_case(Some((2021, 3, 1)), Some((0, 0)), "2021-03-01 00:00:00" ; "midnight")]
    #[test_case(Some((2021, 3, 1)), None, "" ; "no time")]
    #[test_case(None, Some((14, 30)), "" ; "no date")]
    #[test_case(Some((2021, 0, 1)), Some((14, 30)), "" ; "incomplete date")]
    fn test_due_date_time(date: Option<(u32, u32, u32)>, time: Option<(u32, u32)>, expected: &str) {
        let date = date.map(|(year, month, day)| GoogleDate { year, month, day });
        let time = time.map(|(hours, minutes)| GoogleTimeOfDay { hours, minutes });
        assert_eq!(due_date_time(date, time), expected);
    }

    #[test_case("TURNED_IN", true, "late")]
    #[test_case("CREATED", true, "missing")]
    #[test_case("RECLAIMED_BY_STUDENT", true, "missing")]
    #[test_case("RETURNED", true, "graded")]
    #[test_case("RETURNED", false, "graded")]
    #[test_case("TURNED_IN", false, "on-time")]
    #[test_case("CREATED", false, "on-time")]
    fn test_submission_status(state: &str, late: bool, expected: &str) {
        let submission = GoogleSubmission {
            state: state.to_string(),
            late,
            ..Default::default()
        };
        assert_eq!(google_submission_status(&submission), expected);
    }

    #[test]
    fn test_submission_history() {
        let submissions = vec![synced::<GoogleSubmission>(json!({
            "courseId": "c1",
            "courseWorkId": "w1",
            "id": "s1",
            "userId": "u1",
            "state": "RETURNED",
            "assignedGrade": 9,
            "submissionHistory": [
                {"stateHistory": {"state": "CREATED", "stateTimestamp": "2021-03-01T09:00:00Z", "actorUserId": "u1"}},
                {"stateHistory": {"state": "TURNED_IN", "stateTimestamp": "2021-03-01T10:00:00Z", "actorUserId": "u1"}},
                {"stateHistory": {"state": "TURNED_IN", "stateTimestamp": "2021-03-02T10:00:00Z", "actorUserId": "u1"}},
                {"gradeHistory": {"gradeTimestamp": "2021-03-03T10:00:00Z", "gradeChangeType": "ASSIGNED_GRADE_POINTS_EARNED_CHANGE", "actorUserId": "t1"}},
                {"stateHistory": {"state": "TURNED_IN", "stateTimestamp": "2021-03-02T10:00:00Z", "actorUserId": "u1"}}
            ]
        }))];

        let mapped = map_submissions(&submissions);
        assert_eq!(mapped[0].source_system_identifier, "c1-w1-s1");
        assert_eq!(mapped[0].assignment_source_system_identifier, "c1-w1");
        assert_eq!(mapped[0].submission_status, "graded");
        assert_eq!(mapped[0].submission_date_time, "2021-03-02 10:00:00");
        assert_eq!(mapped[0].grade, "9");

        let activities = map_submission_activities(&submissions);
        assert_eq!(activities.len(), 4);
        assert!(activities[0].source_system_identifier.starts_with("S-c1-w1-s1-"));
        assert_eq!(activities[3].source_system_identifier, "G-c1-w1-s1-2021-03-03T10:00:00Z");
        assert_eq!(activities[3].activity_type, "Submission Grade Change");
        assert_eq!(activities[3].lms_user_source_system_identifier, "t1");
        assert_eq!(activities[3].lms_section_source_system_identifier, "c1");
    }

    #[test]
    fn test_login_activities() {
        let activities = vec![
            synced::<GoogleLoginActivity>(json!({
                "activityId": "a1",
                "id": {"time": "2021-03-01T08:00:00.000Z", "uniqueQualifier": "a1"},
                "actor": {"profileId": "u1"},
                "events": [{"type": "login", "name": "login_success"}]
            })),
            synced::<GoogleLoginActivity>(json!({
                "activityId": "a2",
                "id": {"time": "2021-03-01T08:05:00.000Z", "uniqueQualifier": "a2"},
                "actor": {"profileId": "u1"},
                "events": [{"type": "login", "name": "login_failure"}]
            })),
        ];

        let mapped = map_system_activities(&activities);

        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].activity_type, "sign-in");
        assert_eq!(mapped[0].activity_date_time, "2021-03-01 08:00:00");
        assert_eq!(mapped[0].lms_user_source_system_identifier, "u1");
    }

    #[test]
    fn test_empty_input() {
        assert!(map_sections(&[]).is_empty());
        assert!(map_assignments(&[]).is_empty());
        assert!(map_submission_activities(&[]).is_empty());
    }
}
