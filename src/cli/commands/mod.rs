//! CLI command implementations
//!
//! Every command returns its process exit code: 0 on success, 1 after a
//! fatal pipeline error, 2 for a configuration error.

pub mod canvas;
pub mod common;
pub mod google;
pub mod load;
pub mod migrate;
pub mod schoology;
