//! Provider extraction pipelines
//!
//! Each provider runs Extract → Sync → Map → Write for its tables in
//! dependency order: users, sections, section associations, assignments,
//! submissions, activities, then attendance.

pub mod canvas;
pub mod context;
pub mod features;
pub mod google;
pub mod schoology;
pub mod summary;

pub use canvas::{CanvasExtractor, CanvasOptions};
pub use context::Extraction;
pub use features::{Feature, FeatureSet};
pub use google::{GoogleExtractor, GoogleOptions};
pub use schoology::SchoologyExtractor;
pub use summary::{ResourceOutcome, ResourceReport, RunSummary};
