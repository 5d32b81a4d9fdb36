//! Newest-file discovery and CSV reading
//!
//! A directory may hold the files of many extractions. Readers take the
//! lexically greatest file name, which is the newest because names are
//! timestamps, and ignore files of four bytes or fewer.

use super::layout::{section_root, ASSIGNMENT_PREFIX, DATE_PREFIX, SECTION_PREFIX};
use crate::domain::{Result, UdmEntity};
use serde::de::DeserializeOwned;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Files at or below this size carry no data
pub const MIN_DATA_FILE_BYTES: u64 = 4;

/// Every `*.csv` in `dir`, oldest first; a missing directory has none
pub fn all_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The newest CSV in `dir` that is larger than [`MIN_DATA_FILE_BYTES`]
pub fn newest_file(dir: &Path) -> Result<Option<PathBuf>> {
    for path in all_files(dir)?.into_iter().rev() {
        if fs::metadata(&path)?.len() > MIN_DATA_FILE_BYTES {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

/// Values of `<prefix><value>` subdirectories of `dir`, sorted
fn prefixed_dirs(dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut values = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(value) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_prefix(prefix))
        {
            values.push(value.to_string());
        }
    }
    values.sort();
    Ok(values)
}

/// Section ids from the `section=<id>` directories under `base`
pub fn section_ids(base: &Path) -> Result<Vec<String>> {
    prefixed_dirs(base, SECTION_PREFIX)
}

/// Assignment ids from the `assignment=<id>` directories of one section
pub fn assignment_ids(base: &Path, section: &str) -> Result<Vec<String>> {
    prefixed_dirs(&section_root(base, section), ASSIGNMENT_PREFIX)
}

/// Every directory that may hold files of `entity`
pub fn entity_directories(base: &Path, entity: UdmEntity) -> Result<Vec<PathBuf>> {
    let dirs = match entity {
        UdmEntity::Users | UdmEntity::Sections => vec![base.join(entity.directory_name())],
        UdmEntity::SystemActivities => {
            let root = base.join(entity.directory_name());
            prefixed_dirs(&root, DATE_PREFIX)?
                .into_iter()
                .map(|date| root.join(format!("{DATE_PREFIX}{date}")))
                .collect()
        }
        UdmEntity::Submissions => {
            let mut dirs = Vec::new();
            for section in section_ids(base)? {
                for assignment in assignment_ids(base, &section)? {
                    dirs.push(
                        section_root(base, &section)
                            .join(format!("{ASSIGNMENT_PREFIX}{assignment}"))
                            .join(entity.directory_name()),
                    );
                }
            }
            dirs
        }
        _ => section_ids(base)?
            .into_iter()
            .map(|section| section_root(base, &section).join(entity.directory_name()))
            .collect(),
    };
    Ok(dirs)
}

/// Untyped CSV contents, as the loader stages them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Append another file's rows, aligning its columns to this table's headers
    pub fn extend(&mut self, other: CsvTable) {
        if self.headers.is_empty() {
            *self = other;
            return;
        }
        let positions: Vec<Option<usize>> = self
            .headers
            .iter()
            .map(|h| other.column_index(h))
            .collect();
        for row in other.rows {
            self.rows.push(
                positions
                    .iter()
                    .map(|p| p.and_then(|i| row.get(i).cloned()).unwrap_or_default())
                    .collect(),
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn read_table(path: &Path) -> Result<CsvTable> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(CsvTable { headers, rows })
}

/// Read a file into typed records
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}
