//! Extraction run summary
//!
//! Tracks what happened to every UDM table of one provider run.

use crate::domain::{LmsError, ResourceErrorDetail};
use std::time::Duration;

/// What happened to one resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    /// Files written with this many rows in total
    Written { rows: usize },
    /// Not produced this run; previously written files stay in place
    Skipped { error: String },
}

#[derive(Debug, Clone)]
pub struct ResourceReport {
    pub resource: String,
    pub outcome: ResourceOutcome,
}

/// Summary of one provider run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub provider: String,
    pub resources: Vec<ResourceReport>,
    pub duration: Duration,
    pub errors: Vec<ResourceErrorDetail>,
}

impl RunSummary {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            resources: Vec::new(),
            duration: Duration::from_secs(0),
            errors: Vec::new(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn record_written(&mut self, resource: &str, rows: usize) {
        self.resources.push(ResourceReport {
            resource: resource.to_string(),
            outcome: ResourceOutcome::Written { rows },
        });
    }

    /// Record a non-fatal failure; the resource is skipped
    pub fn record_skipped(&mut self, resource: &str, error: &LmsError) {
        crate::log_error_with_context!(error, self.provider, resource, "-");
        self.errors.push(
            ResourceErrorDetail::new(error)
                .with_provider(self.provider.clone())
                .with_resource(resource),
        );
        self.resources.push(ResourceReport {
            resource: resource.to_string(),
            outcome: ResourceOutcome::Skipped {
                error: error.to_string(),
            },
        });
    }

    /// Record a resource skipped because a resource it depends on was
    pub fn record_dependent_skip(&mut self, resource: &str, parent: &str) {
        tracing::warn!(
            provider = %self.provider,
            resource,
            parent,
            "Skipping resource because its parent was not extracted"
        );
        self.resources.push(ResourceReport {
            resource: resource.to_string(),
            outcome: ResourceOutcome::Skipped {
                error: format!("{parent} was not extracted"),
            },
        });
    }

    pub fn outcome(&self, resource: &str) -> Option<&ResourceOutcome> {
        self.resources
            .iter()
            .find(|r| r.resource == resource)
            .map(|r| &r.outcome)
    }

    pub fn rows_written(&self) -> usize {
        self.resources
            .iter()
            .map(|r| match r.outcome {
                ResourceOutcome::Written { rows } => rows,
                ResourceOutcome::Skipped { .. } => 0,
            })
            .sum()
    }

    pub fn skipped_count(&self) -> usize {
        self.resources
            .iter()
            .filter(|r| matches!(r.outcome, ResourceOutcome::Skipped { .. }))
            .count()
    }

    /// True when every resource was written
    pub fn is_successful(&self) -> bool {
        self.skipped_count() == 0
    }

    pub fn log_summary(&self) {
        tracing::info!(
            provider = %self.provider,
            resources = self.resources.len(),
            rows = self.rows_written(),
            skipped = self.skipped_count(),
            duration_secs = self.duration.as_secs(),
            "Extraction completed"
        );

        for report in &self.resources {
            match &report.outcome {
                ResourceOutcome::Written { rows } => {
                    tracing::debug!(resource = %report.resource, rows, "Resource written")
                }
                ResourceOutcome::Skipped { error } => {
                    tracing::warn!(resource = %report.resource, error = %error, "Resource skipped")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new("Canvas");
        summary.record_written("users", 10);
        summary.record_written("sections", 2);
        summary.record_skipped(
            "assignments",
            &LmsError::Protocol("404 Not Found".to_string()),
        );
        summary.record_dependent_skip("submissions", "assignments");

        assert_eq!(summary.rows_written(), 12);
        assert_eq!(summary.skipped_count(), 2);
        assert!(!summary.is_successful());
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].resource.as_deref(), Some("assignments"));
        assert_eq!(
            summary.outcome("users"),
            Some(&ResourceOutcome::Written { rows: 10 })
        );
    }

    #[test]
    fn test_empty_summary_is_successful() {
        let summary = RunSummary::new("Google").with_duration(Duration::from_secs(3));
        assert!(summary.is_successful());
        assert_eq!(summary.duration.as_secs(), 3);
    }
}
