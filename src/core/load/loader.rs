//! CSV to destination merge
//!
//! For every table, in dependency order, the newest file of each directory is
//! read and staged, then merged into production in a single transaction.

use super::catalog::{self, TableDef, ASSIGNMENT_DESCRIPTION_MAX, SUBMISSION_TYPE_TABLE};
use super::splitter::split_assignment;
use super::sql_builder::SqlBuilder;
use crate::adapters::sql::{SqlAdapter, Statement};
use crate::core::files::{entity_directories, newest_file, read_table, CsvTable};
use crate::domain::{Result, UdmEntity};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Loader behaviour switches
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Source system used for soft-delete when a table's files carry no rows
    pub source_system: Option<String>,
    /// Skip tables whose newest files are all recorded in `ProcessedFiles`
    pub skip_processed: bool,
}

/// What happened to one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Loaded {
        files: usize,
        rows: usize,
        inserted: u64,
        updated: u64,
        soft_deleted: u64,
    },
    NoFiles,
    AlreadyProcessed,
}

#[derive(Debug, Clone)]
pub struct TableLoad {
    pub table: &'static str,
    pub outcome: TableOutcome,
}

/// Result of one load run
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub tables: Vec<TableLoad>,
    pub duration: Duration,
}

impl LoadSummary {
    pub fn rows_loaded(&self) -> usize {
        self.tables
            .iter()
            .map(|t| match t.outcome {
                TableOutcome::Loaded { rows, .. } => rows,
                _ => 0,
            })
            .sum()
    }

    pub fn log_summary(&self) {
        for table in &self.tables {
            match &table.outcome {
                TableOutcome::Loaded {
                    files,
                    rows,
                    inserted,
                    updated,
                    soft_deleted,
                } => tracing::info!(
                    table = table.table,
                    files,
                    rows,
                    inserted,
                    updated,
                    soft_deleted,
                    "Table loaded"
                ),
                TableOutcome::NoFiles => {
                    tracing::debug!(table = table.table, "No files to load")
                }
                TableOutcome::AlreadyProcessed => {
                    tracing::info!(table = table.table, "Files already processed")
                }
            }
        }
        tracing::info!(
            rows = self.rows_loaded(),
            duration_ms = self.duration.as_millis() as u64,
            "Load complete"
        );
    }
}

/// Statements for one table, with the positions of the counted steps
#[derive(Debug, Clone)]
pub struct TablePlan {
    pub statements: Vec<Statement>,
    insert_step: usize,
    update_step: usize,
    delete_step: Option<usize>,
}

/// The rows of a table read from disk
#[derive(Debug, Clone, Default)]
pub struct StagedTable {
    pub files: Vec<PathBuf>,
    pub csv: CsvTable,
}

impl StagedTable {
    /// First non-empty `SourceSystem` value
    pub fn source_system(&self) -> Option<String> {
        let index = self.csv.column_index("SourceSystem")?;
        self.csv
            .rows
            .iter()
            .filter_map(|row| row.get(index))
            .find(|value| !value.is_empty())
            .cloned()
    }
}

pub struct Loader {
    adapter: Arc<dyn SqlAdapter>,
    builder: SqlBuilder,
    options: LoadOptions,
}

impl Loader {
    pub fn new(adapter: Arc<dyn SqlAdapter>, options: LoadOptions) -> Self {
        let builder = SqlBuilder::new(adapter.engine());
        Self {
            adapter,
            builder,
            options,
        }
    }

    /// Load every table found under `base`
    ///
    /// # Errors
    ///
    /// Any read or transaction failure stops the run; tables already merged
    /// stay merged.
    pub async fn load(&self, base: &Path) -> Result<LoadSummary> {
        let start = Instant::now();
        let mut summary = LoadSummary::default();
        let mut run_source = self.options.source_system.clone();

        for def in catalog::tables() {
            let outcome = self.load_table(base, &def, &mut run_source).await?;
            summary.tables.push(TableLoad {
                table: def.name(),
                outcome,
            });
        }

        summary.duration = start.elapsed();
        Ok(summary)
    }

    async fn load_table(
        &self,
        base: &Path,
        def: &TableDef,
        run_source: &mut Option<String>,
    ) -> Result<TableOutcome> {
        let files = newest_files(base, def.entity)?;
        if files.is_empty() {
            return Ok(TableOutcome::NoFiles);
        }
        if self.options.skip_processed && self.all_processed(&files).await? {
            return Ok(TableOutcome::AlreadyProcessed);
        }

        crate::log_resource_start!("load", def.name());
        let start = Instant::now();
        let staged = read_staged(files)?;

        let file_source = staged.source_system();
        if run_source.is_none() {
            run_source.clone_from(&file_source);
        }
        let source_system = file_source.or_else(|| run_source.clone());
        if source_system.is_none() {
            tracing::warn!(
                table = def.name(),
                "Source system unknown for an empty table, skipping soft delete"
            );
        }

        let plan = self.plan(def, &staged, source_system.as_deref());
        let counts = self.adapter.execute_transaction(&plan.statements).await?;
        let count = |step: usize| counts.get(step).copied().unwrap_or(0);

        let rows = staged.csv.rows.len();
        crate::log_resource_complete!("load", def.name(), rows, start.elapsed());
        Ok(TableOutcome::Loaded {
            files: staged.files.len(),
            rows,
            inserted: count(plan.insert_step),
            updated: count(plan.update_step),
            soft_deleted: plan.delete_step.map(count).unwrap_or(0),
        })
    }

    async fn all_processed(&self, files: &[PathBuf]) -> Result<bool> {
        for file in files {
            let lookup = self.builder.processed_file_count(&file.to_string_lossy());
            if self.adapter.query_scalar_int(&lookup).await? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The merge transaction for one table
    pub fn plan(&self, def: &TableDef, staged: &StagedTable, source_system: Option<&str>) -> TablePlan {
        let table = def.name();
        let columns = def.staged_columns();
        let rows = staging_rows(def, &staged.csv);

        let mut statements = vec![
            self.builder.disable_staging_index(table),
            self.builder.truncate_staging(table),
        ];
        statements.extend(self.builder.insert_staging(table, &columns, &rows));

        let insert_step = statements.len();
        statements.push(self.builder.insert_new(def));
        let update_step = statements.len();
        statements.push(self.builder.update_changed(def));
        let delete_step = source_system.map(|source| {
            statements.push(self.builder.soft_delete(def, source));
            statements.len() - 1
        });

        if def.entity == UdmEntity::Assignments {
            statements.extend(self.submission_type_steps(&staged.csv, source_system));
        }

        statements.push(self.builder.enable_staging_index(table));
        for file in &staged.files {
            statements.push(self.builder.record_processed_file(
                &file.to_string_lossy(),
                table,
                staged.csv.rows.len(),
            ));
        }

        TablePlan {
            statements,
            insert_step,
            update_step,
            delete_step,
        }
    }

    fn submission_type_steps(&self, csv: &CsvTable, source_system: Option<&str>) -> Vec<Statement> {
        let value = |row: &Vec<String>, name: &str| {
            csv.column_index(name)
                .and_then(|i| row.get(i))
                .cloned()
                .unwrap_or_default()
        };
        let rows: Vec<Vec<Option<String>>> = csv
            .rows
            .iter()
            .flat_map(|row| {
                split_assignment(
                    &value(row, "SourceSystemIdentifier"),
                    &value(row, "SourceSystem"),
                    &value(row, "SubmissionType"),
                )
            })
            .map(|r| {
                vec![
                    Some(r.source_system_identifier),
                    Some(r.source_system),
                    Some(r.submission_type),
                ]
            })
            .collect();

        let mut statements = vec![
            self.builder.disable_staging_index(SUBMISSION_TYPE_TABLE),
            self.builder.truncate_staging(SUBMISSION_TYPE_TABLE),
        ];
        statements.extend(self.builder.insert_submission_type_staging(&rows));
        statements.push(self.builder.insert_new_submission_types());
        if let Some(source) = source_system {
            statements.push(self.builder.soft_delete_submission_types(source));
        }
        statements.push(self.builder.restore_submission_types());
        statements.push(self.builder.enable_staging_index(SUBMISSION_TYPE_TABLE));
        statements
    }
}

/// The newest data file of every directory holding `entity`
pub fn newest_files(base: &Path, entity: UdmEntity) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in entity_directories(base, entity)? {
        if let Some(file) = newest_file(&dir)? {
            files.push(file);
        }
    }
    Ok(files)
}

fn read_staged(files: Vec<PathBuf>) -> Result<StagedTable> {
    let mut csv = CsvTable::default();
    for file in &files {
        csv.extend(read_table(file)?);
    }
    Ok(StagedTable { files, csv })
}

/// CSV rows aligned to the table's staged columns; absent columns are NULL
fn staging_rows(def: &TableDef, csv: &CsvTable) -> Vec<Vec<Option<String>>> {
    let positions: Vec<(Option<usize>, &str)> = def
        .staged_columns()
        .iter()
        .map(|c| (csv.column_index(c.name), c.name))
        .collect();

    csv.rows
        .iter()
        .map(|row| {
            positions
                .iter()
                .map(|(index, name)| {
                    let value = index.and_then(|i| row.get(i))?;
                    if *name == "AssignmentDescription" {
                        Some(value.chars().take(ASSIGNMENT_DESCRIPTION_MAX).collect())
                    } else {
                        Some(value.clone())
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sql::RecordingAdapter;
    use crate::config::DatabaseEngine;
    use crate::core::load::catalog::table;

    fn staged(headers: &[&str], rows: &[&[&str]]) -> StagedTable {
        StagedTable {
            files: vec![PathBuf::from("/data/users/2021-01-01-00-00-00.csv")],
            csv: CsvTable {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|r| r.iter().map(|v| v.to_string()).collect())
                    .collect(),
            },
        }
    }

    fn loader(engine: DatabaseEngine) -> Loader {
        Loader::new(Arc::new(RecordingAdapter::new(engine)), LoadOptions::default())
    }

    fn descriptions(plan: &TablePlan) -> Vec<String> {
        plan.statements.iter().map(|s| s.description.clone()).collect()
    }

    #[test]
    fn test_plan_step_order() {
        let staged = staged(
            &["SourceSystemIdentifier", "SourceSystem", "Name"],
            &[&["1", "Canvas", "Alice"]],
        );
        let plan = loader(DatabaseEngine::Postgresql).plan(&table(UdmEntity::Users), &staged, Some("Canvas"));

        assert_eq!(
            descriptions(&plan),
            vec![
                "LMSUser: disable staging index",
                "LMSUser: truncate staging",
                "LMSUser: stage batch 1",
                "LMSUser: insert new",
                "LMSUser: update changed",
                "LMSUser: soft delete",
                "LMSUser: enable staging index",
                "ProcessedFiles: record LMSUser",
            ]
        );
        assert_eq!(plan.insert_step, 3);
        assert_eq!(plan.delete_step, Some(5));
    }

    #[test]
    fn test_plan_without_source_skips_soft_delete() {
        let staged = staged(&["SourceSystemIdentifier", "SourceSystem"], &[]);
        let plan = loader(DatabaseEngine::Mssql).plan(&table(UdmEntity::Users), &staged, None);
        assert!(plan.delete_step.is_none());
        assert!(!descriptions(&plan).iter().any(|d| d.contains("soft delete")));
        assert!(!descriptions(&plan).iter().any(|d| d.contains("stage batch")));
    }

    #[test]
    fn test_assignment_plan_splits_submission_types() {
        let long = "x".repeat(2000);
        let staged = staged(
            &["SourceSystemIdentifier", "SourceSystem", "AssignmentDescription", "SubmissionType"],
            &[
                &["103", "Canvas", long.as_str(), "['online_text_entry','online_upload']"],
                &["104", "Canvas", "short", ""],
            ],
        );
        let plan = loader(DatabaseEngine::Postgresql).plan(&table(UdmEntity::Assignments), &staged, Some("Canvas"));
        let steps = descriptions(&plan);

        let child_stage = plan
            .statements
            .iter()
            .find(|s| s.description == "AssignmentSubmissionType: stage batch 1")
            .unwrap();
        assert_eq!(child_stage.params.len(), 6);
        assert_eq!(child_stage.params[2].as_deref(), Some("online_text_entry"));
        assert_eq!(child_stage.params[5].as_deref(), Some("online_upload"));

        let parent_stage = &plan.statements[2];
        let description = parent_stage
            .params
            .iter()
            .flatten()
            .find(|v| v.starts_with('x'))
            .unwrap();
        assert_eq!(description.chars().count(), ASSIGNMENT_DESCRIPTION_MAX);

        let position = |name: &str| steps.iter().position(|s| s == name).unwrap();
        assert!(position("Assignment: insert new") < position("AssignmentSubmissionType: insert new"));
        assert!(position("AssignmentSubmissionType: soft delete") < position("Assignment: enable staging index"));
        assert!(steps.contains(&"AssignmentSubmissionType: restore".to_string()));
    }

    #[test]
    fn test_staged_source_system_skips_blanks() {
        let staged = staged(
            &["SourceSystemIdentifier", "SourceSystem"],
            &[&["1", ""], &["2", "Schoology"]],
        );
        assert_eq!(staged.source_system().as_deref(), Some("Schoology"));
    }
}
