//! SQLite-backed sync store
//!
//! One table per provider resource remembers the canonical JSON and hash of
//! every record seen so far. Each `sync` call partitions the incoming records
//! into new, changed and unchanged and hands back the dates the mapper needs.

use super::hash::{canonical_json, hash_str};
use crate::domain::{LmsError, Result, SyncDates};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// File name of the store inside the sync database directory
pub const SYNC_DATABASE_FILE: &str = "sync.sqlite";

/// Format of every date the store emits
pub const SYNC_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const JOURNAL_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS SyncJournal (
    Resource       TEXT NOT NULL,
    SyncedAt       TEXT NOT NULL,
    NewCount       INTEGER NOT NULL,
    ChangedCount   INTEGER NOT NULL,
    UnchangedCount INTEGER NOT NULL
);
";

/// A provider resource tracked by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResource {
    table: String,
    identity: Vec<String>,
}

impl SyncResource {
    /// Describe a resource by its table name and identity columns
    ///
    /// Identity columns are sorted so the `SourceId` does not depend on the
    /// order they were declared in.
    pub fn new(table: impl Into<String>, identity: &[&str]) -> Self {
        let mut identity: Vec<String> = identity.iter().map(|c| c.to_string()).collect();
        identity.sort();
        Self {
            table: table.into(),
            identity,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn validate(&self) -> Result<()> {
        let valid = !self.table.is_empty()
            && self
                .table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(LmsError::Validation(format!(
                "Invalid sync table name '{}'",
                self.table
            )));
        }
        if self.identity.is_empty() {
            return Err(LmsError::Validation(format!(
                "Sync resource '{}' has no identity columns",
                self.table
            )));
        }
        Ok(())
    }

    /// Build the `SourceId` of a record from its identity columns
    pub fn source_id(&self, record: &Value) -> Result<String> {
        let mut parts = Vec::with_capacity(self.identity.len());
        for column in &self.identity {
            let part = match record.get(column) {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                _ => {
                    return Err(LmsError::Mapping(format!(
                        "{}: record is missing identity column '{}'",
                        self.table, column
                    )))
                }
            };
            parts.push(part);
        }
        Ok(parts.join("-"))
    }
}

/// How a record compared with the previous extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    New,
    Changed,
    Unchanged,
}

/// A decoded record together with its sync envelope
#[derive(Debug, Clone)]
pub struct Synced<T> {
    pub source_id: String,
    pub status: SyncStatus,
    pub dates: SyncDates,
    pub record: T,
}

/// Per-sync partition sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl SyncCounts {
    pub fn total(&self) -> usize {
        self.new + self.changed + self.unchanged
    }
}

/// Result of one `sync` call
#[derive(Debug, Clone)]
pub struct SyncOutcome<T> {
    pub records: Vec<Synced<T>>,
    pub counts: SyncCounts,
}

/// Sync store backed by a single SQLite file
///
/// Cloning is cheap; the connection is shared.
#[derive(Clone)]
pub struct SyncStore {
    conn: tokio_rusqlite::Connection,
}

struct PreparedRow {
    source_id: String,
    json: String,
    hash: String,
    original: Value,
}

impl SyncStore {
    /// Open (or create) `sync.sqlite` inside `directory`
    pub async fn open(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        std::fs::create_dir_all(directory).map_err(|e| {
            LmsError::Io(format!(
                "Failed to create sync database directory {}: {}",
                directory.display(),
                e
            ))
        })?;

        let path = directory.join(SYNC_DATABASE_FILE);
        let conn = tokio_rusqlite::Connection::open(&path).await?;
        let store = Self { conn };
        store.init_schema().await?;

        tracing::debug!(path = %path.display(), "Opened sync store");
        Ok(store)
    }

    /// Open an in-memory store
    pub async fn open_in_memory() -> Result<Self> {
        let conn = tokio_rusqlite::Connection::open_in_memory().await?;
        let store = Self { conn };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        self.conn
            .call(|conn| {
                conn.execute_batch(JOURNAL_SCHEMA)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Reconcile `records` with the previous extraction of `resource`
    pub async fn sync<T: DeserializeOwned>(
        &self,
        resource: &SyncResource,
        records: Vec<Value>,
    ) -> Result<SyncOutcome<T>> {
        self.sync_at(resource, records, Utc::now()).await
    }

    /// [`SyncStore::sync`] with an explicit clock
    pub async fn sync_at<T: DeserializeOwned>(
        &self,
        resource: &SyncResource,
        records: Vec<Value>,
        now: DateTime<Utc>,
    ) -> Result<SyncOutcome<T>> {
        resource.validate()?;

        let mut seen = HashSet::new();
        let mut prepared = Vec::with_capacity(records.len());
        for record in records {
            let source_id = resource.source_id(&record)?;
            if !seen.insert(source_id.clone()) {
                tracing::warn!(
                    resource = resource.table(),
                    source_id = %source_id,
                    "Dropping duplicate record"
                );
                continue;
            }
            let json = canonical_json(&record)?;
            let hash = hash_str(&json);
            prepared.push(PreparedRow {
                source_id,
                json,
                hash,
                original: record,
            });
        }

        let rows: Vec<(String, String, String)> = prepared
            .iter()
            .map(|r| (r.source_id.clone(), r.json.clone(), r.hash.clone()))
            .collect();
        let table = resource.table().to_string();
        let now_str = now.format(SYNC_DATE_FORMAT).to_string();

        let envelopes: Vec<(SyncStatus, SyncDates)> = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute_batch(&format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        SourceId         TEXT PRIMARY KEY,
                        Json             TEXT NOT NULL,
                        Hash             TEXT NOT NULL,
                        CreateDate       TEXT NOT NULL,
                        LastModifiedDate TEXT NOT NULL,
                        SyncNeeded       INTEGER NOT NULL
                    );"
                ))?;

                let previous: HashMap<String, (String, String, String)> = {
                    let mut stmt = tx.prepare(&format!(
                        "SELECT SourceId, Hash, CreateDate, LastModifiedDate FROM {table}"
                    ))?;
                    let mapped = stmt.query_map([], |r| {
                        Ok((r.get::<_, String>(0)?, (r.get(1)?, r.get(2)?, r.get(3)?)))
                    })?;
                    mapped.collect::<rusqlite::Result<_>>()?
                };

                let mut envelopes = Vec::with_capacity(rows.len());
                let (mut new, mut changed, mut unchanged) = (0i64, 0i64, 0i64);
                {
                    let mut upsert = tx.prepare(&format!(
                        "INSERT INTO {table}
                            (SourceId, Json, Hash, CreateDate, LastModifiedDate, SyncNeeded)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                         ON CONFLICT(SourceId) DO UPDATE SET
                            Json = excluded.Json,
                            Hash = excluded.Hash,
                            LastModifiedDate = excluded.LastModifiedDate,
                            SyncNeeded = excluded.SyncNeeded"
                    ))?;

                    for (source_id, json, hash) in &rows {
                        let (status, dates) = match previous.get(source_id) {
                            None => {
                                new += 1;
                                (
                                    SyncStatus::New,
                                    SyncDates {
                                        create_date: now_str.clone(),
                                        last_modified_date: now_str.clone(),
                                    },
                                )
                            }
                            Some((old_hash, create, _)) if old_hash != hash => {
                                changed += 1;
                                (
                                    SyncStatus::Changed,
                                    SyncDates {
                                        create_date: create.clone(),
                                        last_modified_date: now_str.clone(),
                                    },
                                )
                            }
                            Some((_, create, modified)) => {
                                unchanged += 1;
                                (
                                    SyncStatus::Unchanged,
                                    SyncDates {
                                        create_date: create.clone(),
                                        last_modified_date: modified.clone(),
                                    },
                                )
                            }
                        };

                        let sync_needed = i64::from(status != SyncStatus::Unchanged);
                        upsert.execute(rusqlite::params![
                            source_id,
                            json,
                            hash,
                            dates.create_date,
                            dates.last_modified_date,
                            sync_needed
                        ])?;
                        envelopes.push((status, dates));
                    }
                }

                tx.execute(
                    "INSERT INTO SyncJournal
                        (Resource, SyncedAt, NewCount, ChangedCount, UnchangedCount)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![table, now_str, new, changed, unchanged],
                )?;
                tx.commit()?;
                Ok(envelopes)
            })
            .await?;

        let mut counts = SyncCounts::default();
        let mut synced = Vec::with_capacity(prepared.len());
        for (row, (status, dates)) in prepared.into_iter().zip(envelopes) {
            match status {
                SyncStatus::New => counts.new += 1,
                SyncStatus::Changed => counts.changed += 1,
                SyncStatus::Unchanged => counts.unchanged += 1,
            }
            let record: T = serde_json::from_value(row.original).map_err(|e| {
                LmsError::Mapping(format!(
                    "{}: failed to decode record {}: {}",
                    resource.table(),
                    row.source_id,
                    e
                ))
            })?;
            synced.push(Synced {
                source_id: row.source_id,
                status,
                dates,
                record,
            });
        }

        tracing::debug!(
            resource = resource.table(),
            new = counts.new,
            changed = counts.changed,
            unchanged = counts.unchanged,
            "Synced resource"
        );

        Ok(SyncOutcome {
            records: synced,
            counts,
        })
    }

    /// Number of records remembered for a resource
    pub async fn count(&self, resource: &SyncResource) -> Result<usize> {
        resource.validate()?;
        let table = resource.table().to_string();
        let count: i64 = self
            .conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    rusqlite::params![table],
                    |r| r.get(0),
                )?;
                if !exists {
                    return Ok(0);
                }
                let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| {
                    r.get(0)
                })?;
                Ok(n)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Number of journal entries written for a resource
    pub async fn journal_entries(&self, resource: &SyncResource) -> Result<usize> {
        let table = resource.table().to_string();
        let count: i64 = self
            .conn
            .call(move |conn| {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM SyncJournal WHERE Resource = ?1",
                    rusqlite::params![table],
                    |r| r.get(0),
                )?;
                Ok(n)
            })
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
