//! Optional extraction features
//!
//! Users, sections and section associations are always extracted; the rest
//! is opt-in with `--feature`.

use crate::domain::{LmsError, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feature {
    Activities,
    Attendance,
    Assignments,
    Grades,
}

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Activities => "activities",
            Feature::Attendance => "attendance",
            Feature::Assignments => "assignments",
            Feature::Grades => "grades",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = LmsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "activities" => Ok(Feature::Activities),
            "attendance" => Ok(Feature::Attendance),
            "assignments" => Ok(Feature::Assignments),
            "grades" => Ok(Feature::Grades),
            other => Err(LmsError::Configuration(format!(
                "Unknown feature '{other}', expected one of: activities, attendance, assignments, grades"
            ))),
        }
    }
}

/// The features requested for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet(BTreeSet<Feature>);

impl FeatureSet {
    /// Parse repeated or comma-separated feature names
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self> {
        let mut features = BTreeSet::new();
        for value in values {
            for name in value.as_ref().split(',').filter(|n| !n.trim().is_empty()) {
                features.insert(name.parse()?);
            }
        }
        Ok(Self(features))
    }

    pub fn all() -> Self {
        Self(
            [
                Feature::Activities,
                Feature::Attendance,
                Feature::Assignments,
                Feature::Grades,
            ]
            .into_iter()
            .collect(),
        )
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }

    pub fn iter(&self) -> impl Iterator<Item = Feature> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&["assignments"], &[Feature::Assignments] ; "single")]
    #[test_case(&["grades,activities"], &[Feature::Activities, Feature::Grades] ; "comma separated")]
    #[test_case(&["Attendance", "grades", "grades"], &[Feature::Attendance, Feature::Grades] ; "repeated")]
    #[test_case(&[], &[] ; "none")]
    fn test_parse(values: &[&str], expected: &[Feature]) {
        let set = FeatureSet::parse(values).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_unknown_feature_is_configuration_error() {
        assert!(matches!(
            FeatureSet::parse(&["quizzes"]),
            Err(LmsError::Configuration(_))
        ));
    }
}
