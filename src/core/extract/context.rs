//! State shared by the steps of one provider run
//!
//! A step fetches, syncs and maps one UDM table, then hands the mapped rows to
//! [`Extraction::write`]. Failures are settled here: fatal errors end the run,
//! anything else skips the table and is recorded in the [`RunSummary`].

use super::features::{Feature, FeatureSet};
use super::summary::RunSummary;
use crate::core::files::CsvWriter;
use crate::core::sync::{SyncResource, SyncStore, Synced};
use crate::domain::{Result, UdmEntity};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Instant;

pub struct Extraction {
    provider: &'static str,
    store: SyncStore,
    writer: CsvWriter,
    features: FeatureSet,
    summary: RunSummary,
    started: Instant,
}

impl Extraction {
    pub fn new(
        provider: &'static str,
        store: SyncStore,
        writer: CsvWriter,
        features: FeatureSet,
    ) -> Self {
        Self {
            provider,
            store,
            writer,
            features,
            summary: RunSummary::new(provider),
            started: Instant::now(),
        }
    }

    pub fn provider(&self) -> &'static str {
        self.provider
    }

    pub fn wants(&self, feature: Feature) -> bool {
        self.features.contains(feature)
    }

    pub fn writer(&self) -> &CsvWriter {
        &self.writer
    }

    /// Log the start of a table and return its clock
    pub fn start(&self, entity: UdmEntity) -> Instant {
        crate::log_resource_start!(self.provider, entity);
        Instant::now()
    }

    /// Pass fetched records through the sync store
    pub async fn sync<T: DeserializeOwned>(
        &self,
        resource: &SyncResource,
        records: Vec<Value>,
    ) -> Result<Vec<Synced<T>>> {
        let outcome = self.store.sync::<T>(resource, records).await?;
        tracing::debug!(
            provider = self.provider,
            resource = resource.table(),
            new = outcome.counts.new,
            changed = outcome.counts.changed,
            unchanged = outcome.counts.unchanged,
            "Synced resource"
        );
        Ok(outcome.records)
    }

    /// Settle the fetch stage of a table
    ///
    /// Returns `Ok(None)` when the table is skipped.
    pub fn settle<T>(&mut self, entity: UdmEntity, result: Result<T>) -> Result<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.summary.record_skipped(entity.directory_name(), &e);
                Ok(None)
            }
        }
    }

    /// Write a mapped table and record the outcome
    ///
    /// A failed write skips only this table; the writer has already removed
    /// the partial file. Returns whether the table was written.
    pub fn write<F>(&mut self, entity: UdmEntity, rows: usize, started: Instant, write: F) -> bool
    where
        F: FnOnce(&CsvWriter) -> Result<Vec<PathBuf>>,
    {
        match write(&self.writer) {
            Ok(files) => {
                tracing::debug!(provider = self.provider, resource = %entity, files = files.len(), "Wrote table");
                crate::log_resource_complete!(self.provider, entity, rows, started.elapsed());
                self.summary.record_written(entity.directory_name(), rows);
                true
            }
            Err(e) => {
                self.summary.record_skipped(entity.directory_name(), &e);
                false
            }
        }
    }

    /// Skip a table whose parent was not extracted
    pub fn skip_dependent(&mut self, entity: UdmEntity, parent: UdmEntity) {
        self.summary
            .record_dependent_skip(entity.directory_name(), parent.directory_name());
    }

    /// Close the run and log its summary
    pub fn finish(self) -> RunSummary {
        let summary = self.summary.with_duration(self.started.elapsed());
        summary.log_summary();
        summary
    }
}
