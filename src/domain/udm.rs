//! Unified Data Model records
//!
//! Every extractor produces these records and every loader consumes them. The
//! field order of each struct is the CSV column order.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source system tags
pub mod source_system {
    pub const CANVAS: &str = "Canvas";
    pub const SCHOOLOGY: &str = "Schoology";
    pub const GOOGLE: &str = "Google";
}

/// Entity kinds produced by the extractors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UdmEntity {
    Users,
    Sections,
    SectionAssociations,
    Assignments,
    Submissions,
    SectionActivities,
    SystemActivities,
    AttendanceEvents,
    Grades,
}

impl UdmEntity {
    /// All entities in dependency order
    pub const ALL: [UdmEntity; 9] = [
        UdmEntity::Users,
        UdmEntity::Sections,
        UdmEntity::SectionAssociations,
        UdmEntity::Assignments,
        UdmEntity::Submissions,
        UdmEntity::SectionActivities,
        UdmEntity::SystemActivities,
        UdmEntity::AttendanceEvents,
        UdmEntity::Grades,
    ];

    /// Directory name in the canonical file layout
    pub fn directory_name(self) -> &'static str {
        match self {
            UdmEntity::Users => "users",
            UdmEntity::Sections => "sections",
            UdmEntity::SectionAssociations => "section-associations",
            UdmEntity::Assignments => "assignments",
            UdmEntity::Submissions => "submissions",
            UdmEntity::SectionActivities => "section-activities",
            UdmEntity::SystemActivities => "system-activities",
            UdmEntity::AttendanceEvents => "attendance-events",
            UdmEntity::Grades => "grades",
        }
    }

    /// Destination table name
    pub fn table_name(self) -> &'static str {
        match self {
            UdmEntity::Users => "LMSUser",
            UdmEntity::Sections => "LMSSection",
            UdmEntity::SectionAssociations => "LMSUserLMSSectionAssociation",
            UdmEntity::Assignments => "Assignment",
            UdmEntity::Submissions => "AssignmentSubmission",
            UdmEntity::SectionActivities => "LMSSectionActivity",
            UdmEntity::SystemActivities => "LMSSystemActivity",
            UdmEntity::AttendanceEvents => "LMSUserAttendanceEvent",
            UdmEntity::Grades => "LMSGrade",
        }
    }
}

impl fmt::Display for UdmEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directory_name())
    }
}

/// Dates assigned by the sync store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncDates {
    /// First time the record was observed
    pub create_date: String,
    /// Last time the record's content hash changed
    pub last_modified_date: String,
}

/// Behaviour shared by every UDM record
pub trait UdmRecord: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The entity this record belongs to
    const ENTITY: UdmEntity;

    fn source_system(&self) -> &str;

    fn source_system_identifier(&self) -> &str;

    /// Section the record is filed under, for section-level entities
    fn section_key(&self) -> Option<&str> {
        None
    }
}

/// LMSUser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LmsUser {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "UserRole")]
    pub user_role: String,
    #[serde(rename = "SISUserIdentifier")]
    pub sis_user_identifier: String,
    #[serde(rename = "LocalUserIdentifier")]
    pub local_user_identifier: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "EmailAddress")]
    pub email_address: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

/// LMSSection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LmsSection {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "SISSectionIdentifier")]
    pub sis_section_identifier: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "SectionDescription")]
    pub section_description: String,
    #[serde(rename = "Term")]
    pub term: String,
    #[serde(rename = "LMSSectionStatus")]
    pub lms_section_status: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

/// LMSUserLMSSectionAssociation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LmsSectionAssociation {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "EnrollmentStatus")]
    pub enrollment_status: String,
    #[serde(rename = "LMSUserSourceSystemIdentifier")]
    pub lms_user_source_system_identifier: String,
    #[serde(rename = "LMSSectionSourceSystemIdentifier")]
    pub lms_section_source_system_identifier: String,
    #[serde(rename = "StartDate")]
    pub start_date: String,
    #[serde(rename = "EndDate")]
    pub end_date: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

/// Assignment
///
/// `SubmissionType` holds a list literal such as `['online_upload', 'online_text_entry']`;
/// the loader splits it into `AssignmentSubmissionType` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Assignment {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "LMSSectionSourceSystemIdentifier")]
    pub lms_section_source_system_identifier: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "AssignmentCategory")]
    pub assignment_category: String,
    #[serde(rename = "AssignmentDescription")]
    pub assignment_description: String,
    #[serde(rename = "StartDateTime")]
    pub start_date_time: String,
    #[serde(rename = "EndDateTime")]
    pub end_date_time: String,
    #[serde(rename = "DueDateTime")]
    pub due_date_time: String,
    #[serde(rename = "SubmissionType")]
    pub submission_type: String,
    #[serde(rename = "MaxPoints")]
    pub max_points: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

/// AssignmentSubmission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AssignmentSubmission {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "AssignmentSourceSystemIdentifier")]
    pub assignment_source_system_identifier: String,
    #[serde(rename = "LMSUserSourceSystemIdentifier")]
    pub lms_user_source_system_identifier: String,
    #[serde(rename = "SubmissionStatus")]
    pub submission_status: String,
    #[serde(rename = "SubmissionDateTime")]
    pub submission_date_time: String,
    #[serde(rename = "EarnedPoints")]
    pub earned_points: String,
    #[serde(rename = "Grade")]
    pub grade: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

/// LMSSectionActivity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LmsSectionActivity {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "LMSUserSourceSystemIdentifier")]
    pub lms_user_source_system_identifier: String,
    #[serde(rename = "LMSSectionSourceSystemIdentifier")]
    pub lms_section_source_system_identifier: String,
    #[serde(rename = "ActivityType")]
    pub activity_type: String,
    #[serde(rename = "ActivityDateTime")]
    pub activity_date_time: String,
    #[serde(rename = "ActivityStatus")]
    pub activity_status: String,
    #[serde(rename = "ParentSourceSystemIdentifier")]
    pub parent_source_system_identifier: String,
    #[serde(rename = "ActivityTimeInMinutes")]
    pub activity_time_in_minutes: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

/// LMSSystemActivity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LmsSystemActivity {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "LMSUserSourceSystemIdentifier")]
    pub lms_user_source_system_identifier: String,
    #[serde(rename = "ActivityType")]
    pub activity_type: String,
    #[serde(rename = "ActivityDateTime")]
    pub activity_date_time: String,
    #[serde(rename = "ActivityStatus")]
    pub activity_status: String,
    #[serde(rename = "ParentSourceSystemIdentifier")]
    pub parent_source_system_identifier: String,
    #[serde(rename = "ActivityTimeInMinutes")]
    pub activity_time_in_minutes: String,
    #[serde(rename = "Content")]
    pub content: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

impl LmsSystemActivity {
    /// Calendar date (`YYYY-MM-DD`) of the activity, used for the `date=` partition
    pub fn activity_date(&self) -> &str {
        self.activity_date_time.get(..10).unwrap_or("")
    }
}

/// LMSUserAttendanceEvent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LmsAttendanceEvent {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "LMSUserSourceSystemIdentifier")]
    pub lms_user_source_system_identifier: String,
    #[serde(rename = "LMSSectionSourceSystemIdentifier")]
    pub lms_section_source_system_identifier: String,
    #[serde(rename = "LMSUserLMSSectionAssociationSourceSystemIdentifier")]
    pub association_source_system_identifier: String,
    #[serde(rename = "EventDate")]
    pub event_date: String,
    #[serde(rename = "AttendanceStatus")]
    pub attendance_status: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

/// LMSGrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LmsGrade {
    #[serde(rename = "SourceSystemIdentifier")]
    pub source_system_identifier: String,
    #[serde(rename = "SourceSystem")]
    pub source_system: String,
    #[serde(rename = "LMSUserLMSSectionAssociationSourceSystemIdentifier")]
    pub association_source_system_identifier: String,
    #[serde(rename = "LMSUserSourceSystemIdentifier")]
    pub lms_user_source_system_identifier: String,
    #[serde(rename = "LMSSectionSourceSystemIdentifier")]
    pub lms_section_source_system_identifier: String,
    #[serde(rename = "Grade")]
    pub grade: String,
    #[serde(rename = "GradeType")]
    pub grade_type: String,
    #[serde(rename = "SourceCreateDate")]
    pub source_create_date: String,
    #[serde(rename = "SourceLastModifiedDate")]
    pub source_last_modified_date: String,
    #[serde(rename = "CreateDate")]
    pub create_date: String,
    #[serde(rename = "LastModifiedDate")]
    pub last_modified_date: String,
}

macro_rules! impl_udm_record {
    ($ty:ty, $entity:expr) => {
        impl_udm_record!($ty, $entity, |_r: &$ty| None);
    };
    ($ty:ty, $entity:expr, $section:expr) => {
        impl UdmRecord for $ty {
            const ENTITY: UdmEntity = $entity;

            fn source_system(&self) -> &str {
                &self.source_system
            }

            fn source_system_identifier(&self) -> &str {
                &self.source_system_identifier
            }

            fn section_key(&self) -> Option<&str> {
                let f: fn(&$ty) -> Option<&str> = $section;
                f(self)
            }
        }
    };
}

impl_udm_record!(LmsUser, UdmEntity::Users);
impl_udm_record!(LmsSection, UdmEntity::Sections);
impl_udm_record!(LmsSystemActivity, UdmEntity::SystemActivities);
impl_udm_record!(
    LmsSectionAssociation,
    UdmEntity::SectionAssociations,
    |r| Some(r.lms_section_source_system_identifier.as_str())
);
impl_udm_record!(Assignment, UdmEntity::Assignments, |r| Some(
    r.lms_section_source_system_identifier.as_str()
));
impl_udm_record!(AssignmentSubmission, UdmEntity::Submissions);
impl_udm_record!(LmsSectionActivity, UdmEntity::SectionActivities, |r| Some(
    r.lms_section_source_system_identifier.as_str()
));
impl_udm_record!(LmsAttendanceEvent, UdmEntity::AttendanceEvents, |r| Some(
    r.lms_section_source_system_identifier.as_str()
));
impl_udm_record!(LmsGrade, UdmEntity::Grades, |r| Some(
    r.lms_section_source_system_identifier.as_str()
));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_directory_names() {
        assert_eq!(UdmEntity::SectionAssociations.directory_name(), "section-associations");
        assert_eq!(UdmEntity::AttendanceEvents.directory_name(), "attendance-events");
        assert_eq!(UdmEntity::SystemActivities.to_string(), "system-activities");
    }

    #[test]
    fn test_entity_table_names() {
        assert_eq!(UdmEntity::Users.table_name(), "LMSUser");
        assert_eq!(UdmEntity::Submissions.table_name(), "AssignmentSubmission");
    }

    #[test]
    fn test_section_key() {
        let assignment = Assignment {
            lms_section_source_system_identifier: "2".into(),
            ..Default::default()
        };
        assert_eq!(assignment.section_key(), Some("2"));
        assert_eq!(LmsUser::default().section_key(), None);
    }

    #[test]
    fn test_activity_date() {
        let activity = LmsSystemActivity {
            activity_date_time: "2021-03-04 10:11:12".into(),
            ..Default::default()
        };
        assert_eq!(activity.activity_date(), "2021-03-04");
        assert_eq!(LmsSystemActivity::default().activity_date(), "");
    }
}
