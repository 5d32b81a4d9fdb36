//! CSV output in the canonical directory layout
//!
//! The layout is the only contract between extraction and load: the loader
//! discovers everything it needs from directory and file names.

pub mod layout;
pub mod reader;
pub mod writer;

pub use layout::{normalize_base, FileLayout, SECTION_ENTITIES, TIMESTAMP_FORMAT};
pub use reader::{
    all_files, assignment_ids, entity_directories, newest_file, read_records, read_table,
    section_ids, CsvTable,
};
pub use writer::CsvWriter;
