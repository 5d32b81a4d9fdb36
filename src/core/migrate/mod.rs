//! Destination schema migrations
//!
//! Scripts live under `migrations/<engine>/` and are compiled into the binary.

pub mod migrator;
pub mod scripts;

pub use migrator::{MigrationReport, Migrator};
pub use scripts::{scripts, split_statements, MigrationScript, INITIALIZE_SCRIPT};
