//! Provider records to UDM records
//!
//! Mappers are pure functions from synced provider records to UDM rows. Empty
//! input yields empty output, and absent optional values become empty strings.
//! The sync envelope supplies `CreateDate` and `LastModifiedDate`.

pub mod canvas;
pub mod dates;
pub mod google;
pub mod schoology;
pub mod status;

pub use dates::{normalize_timestamp, parse_timestamp, UDM_DATE_FORMAT};

/// Render submission types as a list literal, e.g. `['online_upload', 'online_text_entry']`
///
/// An empty list renders as the empty string so it yields no child rows.
pub fn submission_type_literal(types: &[String]) -> String {
    if types.is_empty() {
        return String::new();
    }
    let quoted: Vec<String> = types.iter().map(|t| format!("'{t}'")).collect();
    format!("[{}]", quoted.join(", "))
}
