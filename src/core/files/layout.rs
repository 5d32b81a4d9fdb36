//! Canonical directory layout
//!
//! ```text
//! <base>/users/<timestamp>.csv
//! <base>/sections/<timestamp>.csv
//! <base>/system-activities/date=YYYY-MM-DD/<timestamp>.csv
//! <base>/section=<id>/<entity>/<timestamp>.csv
//! <base>/section=<id>/assignment=<aid>/submissions/<timestamp>.csv
//! ```

use crate::domain::UdmEntity;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// File name format, local time
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

pub const SECTION_PREFIX: &str = "section=";
pub const ASSIGNMENT_PREFIX: &str = "assignment=";
pub const DATE_PREFIX: &str = "date=";

/// Entities written under `section=<id>/`
pub const SECTION_ENTITIES: [UdmEntity; 5] = [
    UdmEntity::SectionAssociations,
    UdmEntity::SectionActivities,
    UdmEntity::Assignments,
    UdmEntity::Grades,
    UdmEntity::AttendanceEvents,
];

/// Strip trailing separators from an output directory, keeping a bare root intact
pub fn normalize_base(base: &str) -> PathBuf {
    let trimmed = base.trim_end_matches(['/', std::path::MAIN_SEPARATOR]);
    if trimmed.is_empty() && !base.is_empty() {
        PathBuf::from(&base[..1])
    } else {
        PathBuf::from(trimmed)
    }
}

/// Paths for one extraction; the timestamp is fixed when the layout is created
#[derive(Debug, Clone)]
pub struct FileLayout {
    base: PathBuf,
    timestamp: String,
}

impl FileLayout {
    pub fn new(base: &str, started_at: DateTime<Local>) -> Self {
        Self {
            base: normalize_base(base),
            timestamp: started_at.format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Directory of a top-level entity (`users`, `sections`)
    pub fn root_dir(&self, entity: UdmEntity) -> PathBuf {
        self.base.join(entity.directory_name())
    }

    pub fn system_activity_dir(&self, date: &str) -> PathBuf {
        self.root_dir(UdmEntity::SystemActivities)
            .join(format!("{DATE_PREFIX}{date}"))
    }

    pub fn section_root(&self, section: &str) -> PathBuf {
        section_root(&self.base, section)
    }

    /// Directory of a section-level entity
    pub fn section_dir(&self, section: &str, entity: UdmEntity) -> PathBuf {
        self.section_root(section).join(entity.directory_name())
    }

    pub fn submissions_dir(&self, section: &str, assignment: &str) -> PathBuf {
        assignment_root(&self.base, section, assignment)
            .join(UdmEntity::Submissions.directory_name())
    }

    /// The file this extraction writes inside `dir`
    pub fn file_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.csv", self.timestamp))
    }
}

pub fn section_root(base: &Path, section: &str) -> PathBuf {
    base.join(format!("{SECTION_PREFIX}{section}"))
}

pub fn assignment_root(base: &Path, section: &str, assignment: &str) -> PathBuf {
    section_root(base, section).join(format!("{ASSIGNMENT_PREFIX}{assignment}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use test_case::test_case;

    fn layout() -> FileLayout {
        let started = Local.with_ymd_and_hms(2021, 3, 1, 14, 5, 9).unwrap();
        FileLayout::new("data/", started)
    }

    #[test_case("data/", "data" ; "trailing slash")]
    #[test_case("data//", "data" ; "repeated slash")]
    #[test_case("data", "data" ; "no slash")]
    #[test_case("/", "/" ; "root")]
    fn test_normalize_base(input: &str, expected: &str) {
        assert_eq!(normalize_base(input), PathBuf::from(expected));
    }

    #[test]
    fn test_paths() {
        let layout = layout();
        assert_eq!(layout.timestamp(), "2021-03-01-14-05-09");
        assert_eq!(
            layout.file_in(&layout.root_dir(UdmEntity::Users)),
            Path::new("data").join("users").join("2021-03-01-14-05-09.csv")
        );
        assert_eq!(
            layout.section_dir("7", UdmEntity::SectionAssociations),
            Path::new("data").join("section=7").join("section-associations")
        );
        assert_eq!(
            layout.submissions_dir("7", "7-103"),
            Path::new("data")
                .join("section=7")
                .join("assignment=7-103")
                .join("submissions")
        );
        assert_eq!(
            layout.system_activity_dir("2021-03-01"),
            Path::new("data")
                .join("system-activities")
                .join("date=2021-03-01")
        );
    }
}
