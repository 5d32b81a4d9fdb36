//! CSV writer
//!
//! Each table is written to `<timestamp>.csv.partial` and renamed into place
//! once complete, so a reader never observes a half-written file.

use super::layout::FileLayout;
use crate::domain::{AssignmentSubmission, LmsError, LmsSystemActivity, Result, UdmRecord};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes UDM tables into a [`FileLayout`]
#[derive(Debug, Clone)]
pub struct CsvWriter {
    layout: FileLayout,
}

impl CsvWriter {
    pub fn new(layout: FileLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    /// Write `users` or `sections`
    pub fn write_root<T: UdmRecord + Default>(&self, records: &[T]) -> Result<PathBuf> {
        let dir = self.layout.root_dir(T::ENTITY);
        self.write_table(&dir, records)
    }

    /// Write a section-level table, one file per section
    ///
    /// Every section in `sections` gets a file, header-only when it has no rows,
    /// so a later load sees that section's previous rows as gone. Records whose
    /// section is not listed are still written under their own section.
    pub fn write_by_section<T: UdmRecord + Default>(
        &self,
        sections: &[String],
        records: &[T],
    ) -> Result<Vec<PathBuf>> {
        let mut grouped: BTreeMap<&str, Vec<&T>> = sections
            .iter()
            .map(|s| (s.as_str(), Vec::new()))
            .collect();
        for record in records {
            let Some(section) = record.section_key() else {
                return Err(LmsError::Mapping(format!(
                    "{} record {} has no section",
                    T::ENTITY,
                    record.source_system_identifier()
                )));
            };
            grouped.entry(section).or_default().push(record);
        }

        grouped
            .into_iter()
            .map(|(section, rows)| {
                let dir = self.layout.section_dir(section, T::ENTITY);
                self.write_table(&dir, rows)
            })
            .collect()
    }

    /// Write the submissions of one assignment in one section
    pub fn write_submissions(
        &self,
        section: &str,
        assignment: &str,
        records: &[AssignmentSubmission],
    ) -> Result<PathBuf> {
        let dir = self.layout.submissions_dir(section, assignment);
        self.write_table(&dir, records)
    }

    /// Write system activities partitioned by the date of `ActivityDateTime`
    ///
    /// Undated activities are filed under the extraction date.
    pub fn write_system_activities(&self, records: &[LmsSystemActivity]) -> Result<Vec<PathBuf>> {
        let run_date = &self.layout.timestamp()[..10];
        let mut grouped: BTreeMap<&str, Vec<&LmsSystemActivity>> = BTreeMap::new();
        for record in records {
            let date = match record.activity_date() {
                "" => run_date,
                date => date,
            };
            grouped.entry(date).or_default().push(record);
        }

        grouped
            .into_iter()
            .map(|(date, rows)| {
                let dir = self.layout.system_activity_dir(date);
                self.write_table(&dir, rows)
            })
            .collect()
    }

    /// Write `records` to this extraction's file inside `dir`
    pub fn write_table<'a, T>(
        &self,
        dir: &Path,
        records: impl IntoIterator<Item = &'a T>,
    ) -> Result<PathBuf>
    where
        T: UdmRecord + Default,
    {
        fs::create_dir_all(dir)?;
        let path = self.layout.file_in(dir);
        let partial = path.with_extension("csv.partial");

        let rows = match write_csv(&partial, records) {
            Ok(rows) => rows,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial) {
                    warn!(path = %partial.display(), error = %cleanup, "Failed to remove partial file");
                }
                return Err(e);
            }
        };
        fs::rename(&partial, &path)?;

        debug!(path = %path.display(), rows, "Wrote CSV file");
        Ok(path)
    }
}

/// Header row of a record type, derived from its serde field names
pub fn header_line<T: UdmRecord + Default>() -> Result<Vec<u8>> {
    let mut writer = new_writer(Vec::new());
    writer.serialize(T::default())?;
    let bytes = writer
        .into_inner()
        .map_err(|e| LmsError::Io(e.to_string()))?;
    let end = bytes
        .iter()
        .position(|b| *b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(bytes.len());
    Ok(bytes[..end].to_vec())
}

fn new_writer<W: std::io::Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(inner)
}

fn write_csv<'a, T: UdmRecord + Default>(
    path: &Path,
    records: impl IntoIterator<Item = &'a T>,
) -> Result<usize> {
    let mut writer = new_writer(fs::File::create(path)?);
    let mut rows = 0;
    for record in records {
        writer.serialize(record)?;
        rows += 1;
    }
    writer.flush()?;
    drop(writer);

    if rows == 0 {
        fs::write(path, header_line::<T>()?)?;
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LmsSectionAssociation, LmsUser};
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn writer(dir: &TempDir) -> CsvWriter {
        let started = Local.with_ymd_and_hms(2021, 3, 1, 14, 5, 9).unwrap();
        let base = format!("{}/", dir.path().display());
        CsvWriter::new(FileLayout::new(&base, started))
    }

    fn user(id: &str, name: &str) -> LmsUser {
        LmsUser {
            source_system_identifier: id.into(),
            source_system: "Canvas".into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_write_users() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);

        let path = writer
            .write_root(&[user("1", "Ada"), user("2", "Lovelace, Ada")])
            .unwrap();

        assert_eq!(path, dir.path().join("users").join("2021-03-01-14-05-09.csv"));
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines
            .next()
            .unwrap()
            .starts_with("SourceSystemIdentifier,SourceSystem,UserRole"));
        assert!(lines.next().unwrap().starts_with("1,Canvas,"));
        assert!(lines.next().unwrap().contains("\"Lovelace, Ada\""));
        assert!(!content.contains('\r'));
        assert!(!path.with_extension("csv.partial").exists());
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);

        let path = writer.write_root::<LmsUser>(&[]).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with('\n'));
        assert!(content.len() > 4);
    }

    #[test]
    fn test_every_listed_section_gets_a_file() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let association = LmsSectionAssociation {
            source_system_identifier: "4".into(),
            source_system: "Canvas".into(),
            lms_section_source_system_identifier: "2".into(),
            ..Default::default()
        };

        let paths = writer
            .write_by_section(&["2".to_string(), "3".to_string()], &[association])
            .unwrap();

        assert_eq!(paths.len(), 2);
        let empty = fs::read_to_string(
            dir.path()
                .join("section=3")
                .join("section-associations")
                .join("2021-03-01-14-05-09.csv"),
        )
        .unwrap();
        assert_eq!(empty.lines().count(), 1);
    }

    #[test]
    fn test_system_activities_partitioned_by_date() {
        let dir = TempDir::new().unwrap();
        let writer = writer(&dir);
        let activity = |id: &str, at: &str| LmsSystemActivity {
            source_system_identifier: id.into(),
            source_system: "Canvas".into(),
            activity_date_time: at.into(),
            ..Default::default()
        };

        let paths = writer
            .write_system_activities(&[
                activity("a", "2021-02-27 08:00:00"),
                activity("b", "2021-02-28 08:00:00"),
                activity("c", "2021-02-28 09:00:00"),
            ])
            .unwrap();

        assert_eq!(paths.len(), 2);
        assert!(dir
            .path()
            .join("system-activities")
            .join("date=2021-02-28")
            .join("2021-03-01-14-05-09.csv")
            .exists());
    }
}
