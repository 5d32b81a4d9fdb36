//! Destination table catalog
//!
//! Describes each production table the loader merges into: the CSV columns it
//! stores, their destination types, and the parent tables whose surrogate
//! identifiers are resolved during the merge.

use crate::config::DatabaseEngine;
use crate::domain::UdmEntity;

/// Destination column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Bounded string
    Varchar(u16),
    /// Unbounded string
    LongText,
    Timestamp,
    Date,
    Decimal,
    Integer,
}

impl ColumnType {
    /// Type name used in casts and DDL
    pub fn sql(self, engine: DatabaseEngine) -> String {
        match (self, engine) {
            (ColumnType::Varchar(len), DatabaseEngine::Postgresql) => format!("VARCHAR({len})"),
            (ColumnType::Varchar(len), DatabaseEngine::Mssql) => format!("NVARCHAR({len})"),
            (ColumnType::LongText, DatabaseEngine::Postgresql) => "TEXT".to_string(),
            (ColumnType::LongText, DatabaseEngine::Mssql) => "NVARCHAR(MAX)".to_string(),
            (ColumnType::Timestamp, DatabaseEngine::Postgresql) => "TIMESTAMP".to_string(),
            (ColumnType::Timestamp, DatabaseEngine::Mssql) => "DATETIME2".to_string(),
            (ColumnType::Date, _) => "DATE".to_string(),
            (ColumnType::Decimal, _) => "DECIMAL(18, 4)".to_string(),
            (ColumnType::Integer, _) => "INT".to_string(),
        }
    }

    pub fn is_text(self) -> bool {
        matches!(self, ColumnType::Varchar(_) | ColumnType::LongText)
    }
}

/// A stored CSV column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty }
}

const KEY: ColumnType = ColumnType::Varchar(255);
const TEXT: ColumnType = ColumnType::Varchar(255);
const TS: ColumnType = ColumnType::Timestamp;

/// Maximum stored length of `AssignmentDescription`
pub const ASSIGNMENT_DESCRIPTION_MAX: usize = 1024;

/// A foreign key resolved through the parent's natural key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// CSV column carrying the parent's `SourceSystemIdentifier`
    pub csv_column: &'static str,
    /// Production column receiving the parent's surrogate identifier
    pub identifier: &'static str,
    /// Parent table
    pub parent: &'static str,
}

pub const USER: Relation = Relation {
    csv_column: "LMSUserSourceSystemIdentifier",
    identifier: "LMSUserIdentifier",
    parent: "LMSUser",
};

pub const SECTION: Relation = Relation {
    csv_column: "LMSSectionSourceSystemIdentifier",
    identifier: "LMSSectionIdentifier",
    parent: "LMSSection",
};

pub const ASSIGNMENT: Relation = Relation {
    csv_column: "AssignmentSourceSystemIdentifier",
    identifier: "AssignmentIdentifier",
    parent: "Assignment",
};

pub const ASSOCIATION: Relation = Relation {
    csv_column: "LMSUserLMSSectionAssociationSourceSystemIdentifier",
    identifier: "LMSUserLMSSectionAssociationIdentifier",
    parent: "LMSUserLMSSectionAssociation",
};

/// Sync-store dates carried into staging but not into production
pub const SYNC_DATE_COLUMNS: [&str; 2] = ["CreateDate", "LastModifiedDate"];

/// Sync envelope columns present only on staging tables
pub const ENVELOPE_COLUMNS: [Column; 4] = [
    col("SourceId", KEY),
    col("Json", ColumnType::LongText),
    col("Hash", ColumnType::Varchar(64)),
    col("SyncNeeded", ColumnType::Integer),
];

/// One production table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    pub entity: UdmEntity,
    /// Surrogate key column
    pub identifier: &'static str,
    /// Stored content columns, including the natural key
    pub columns: &'static [Column],
    pub relations: &'static [Relation],
}

impl TableDef {
    pub fn name(&self) -> &'static str {
        self.entity.table_name()
    }

    /// Every column staged from the CSV, in staging order
    pub fn staged_columns(&self) -> Vec<Column> {
        let mut columns = self.columns.to_vec();
        columns.extend(self.relations.iter().map(|r| col(r.csv_column, KEY)));
        columns.extend(SYNC_DATE_COLUMNS.iter().map(|name| col(name, TS)));
        columns
    }
}

const USER_COLUMNS: &[Column] = &[
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("UserRole", TEXT),
    col("SISUserIdentifier", TEXT),
    col("LocalUserIdentifier", TEXT),
    col("Name", TEXT),
    col("EmailAddress", TEXT),
    col("SourceCreateDate", TS),
    col("SourceLastModifiedDate", TS),
];

const SECTION_COLUMNS: &[Column] = &[
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("SISSectionIdentifier", TEXT),
    col("Title", TEXT),
    col("SectionDescription", ColumnType::LongText),
    col("Term", TEXT),
    col("LMSSectionStatus", TEXT),
    col("SourceCreateDate", TS),
    col("SourceLastModifiedDate", TS),
];

const ASSOCIATION_COLUMNS: &[Column] = &[
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("EnrollmentStatus", TEXT),
    col("StartDate", TS),
    col("EndDate", TS),
    col("SourceCreateDate", TS),
    col("SourceLastModifiedDate", TS),
];

const ASSIGNMENT_COLUMNS: &[Column] = &[
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("Title", TEXT),
    col("AssignmentCategory", TEXT),
    col("AssignmentDescription", ColumnType::Varchar(1024)),
    col("StartDateTime", TS),
    col("EndDateTime", TS),
    col("DueDateTime", TS),
    col("MaxPoints", ColumnType::Decimal),
    col("SourceCreateDate", TS),
    col("SourceLastModifiedDate", TS),
];

const SUBMISSION_COLUMNS: &[Column] = &[
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("SubmissionStatus", TEXT),
    col("SubmissionDateTime", TS),
    col("EarnedPoints", ColumnType::Decimal),
    col("Grade", TEXT),
    col("SourceCreateDate", TS),
    col("SourceLastModifiedDate", TS),
];

const SECTION_ACTIVITY_COLUMNS: &[Column] = &[
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("ActivityType", TEXT),
    col("ActivityDateTime", TS),
    col("ActivityStatus", TEXT),
    col("ParentSourceSystemIdentifier", KEY),
    col("ActivityTimeInMinutes", ColumnType::Integer),
    col("Content", ColumnType::LongText),
    col("SourceCreateDate", TS),
    col("SourceLastModifiedDate", TS),
];

const ATTENDANCE_COLUMNS: &[Column] = &[
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("EventDate", ColumnType::Date),
    col("AttendanceStatus", TEXT),
    col("SourceCreateDate", TS),
    col("SourceLastModifiedDate", TS),
];

const GRADE_COLUMNS: &[Column] = &[
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("Grade", TEXT),
    col("GradeType", TEXT),
    col("SourceCreateDate", TS),
    col("SourceLastModifiedDate", TS),
];

/// Definition of the production table for `entity`
pub fn table(entity: UdmEntity) -> TableDef {
    let (identifier, columns, relations): (_, _, &'static [Relation]) = match entity {
        UdmEntity::Users => ("LMSUserIdentifier", USER_COLUMNS, &[]),
        UdmEntity::Sections => ("LMSSectionIdentifier", SECTION_COLUMNS, &[]),
        UdmEntity::SectionAssociations => (
            "LMSUserLMSSectionAssociationIdentifier",
            ASSOCIATION_COLUMNS,
            &[USER, SECTION],
        ),
        UdmEntity::Assignments => ("AssignmentIdentifier", ASSIGNMENT_COLUMNS, &[SECTION]),
        UdmEntity::Submissions => (
            "AssignmentSubmissionIdentifier",
            SUBMISSION_COLUMNS,
            &[ASSIGNMENT, USER],
        ),
        UdmEntity::SectionActivities => (
            "LMSSectionActivityIdentifier",
            SECTION_ACTIVITY_COLUMNS,
            &[USER, SECTION],
        ),
        UdmEntity::SystemActivities => (
            "LMSSystemActivityIdentifier",
            SECTION_ACTIVITY_COLUMNS,
            &[USER],
        ),
        UdmEntity::AttendanceEvents => (
            "LMSUserAttendanceEventIdentifier",
            ATTENDANCE_COLUMNS,
            &[USER, SECTION, ASSOCIATION],
        ),
        UdmEntity::Grades => ("LMSGradeIdentifier", GRADE_COLUMNS, &[ASSOCIATION, USER, SECTION]),
    };

    TableDef {
        entity,
        identifier,
        columns,
        relations,
    }
}

/// Every production table in load order
pub fn tables() -> Vec<TableDef> {
    UdmEntity::ALL.into_iter().map(table).collect()
}

/// Child table holding one row per assignment submission type
pub const SUBMISSION_TYPE_TABLE: &str = "AssignmentSubmissionType";

/// Staging columns of the submission type table
pub const SUBMISSION_TYPE_STAGED: [Column; 3] = [
    col("SourceSystemIdentifier", KEY),
    col("SourceSystem", KEY),
    col("SubmissionType", TEXT),
];
