//! Assignment submission type splitting
//!
//! Assignment CSVs carry submission types as a list literal,
//! `['online_text_entry', 'online_upload']`. The loader stages one child row
//! per distinct type.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// One `AssignmentSubmissionType` staging row
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubmissionTypeRow {
    pub source_system_identifier: String,
    pub source_system: String,
    pub submission_type: String,
}

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)'").expect("quoted submission type pattern"));

/// Distinct submission types in a list literal, in first-seen order
///
/// An empty or unquoted value yields no types.
pub fn submission_types(literal: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    QUOTED
        .captures_iter(literal)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

/// Child rows for one assignment
pub fn split_assignment(
    source_system_identifier: &str,
    source_system: &str,
    literal: &str,
) -> Vec<SubmissionTypeRow> {
    submission_types(literal)
        .into_iter()
        .map(|submission_type| SubmissionTypeRow {
            source_system_identifier: source_system_identifier.to_string(),
            source_system: source_system.to_string(),
            submission_type,
        })
        .collect()
}
