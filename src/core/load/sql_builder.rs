//! SQL for the staging merge, per dialect
//!
//! Every statement targets the `lms` schema. Staging tables are named
//! `stg_<Table>`; production rows are matched on
//! `(SourceSystemIdentifier, SourceSystem)`.

use super::catalog::{Column, ColumnType, TableDef, SUBMISSION_TYPE_STAGED, SUBMISSION_TYPE_TABLE};
use crate::adapters::sql::Statement;
use crate::config::DatabaseEngine;

const POSTGRES_MAX_PARAMS: usize = 65_535;
const MSSQL_MAX_PARAMS: usize = 2_099;
const MAX_ROWS_PER_INSERT: usize = 1_000;

/// Natural key columns of the staging index
pub fn staging_index_columns(table: &str) -> &'static [&'static str] {
    if table == SUBMISSION_TYPE_TABLE {
        &["SourceSystemIdentifier", "SourceSystem", "SubmissionType"]
    } else {
        &["SourceSystemIdentifier", "SourceSystem", "LastModifiedDate"]
    }
}

/// Builds merge statements for one engine
#[derive(Debug, Clone, Copy)]
pub struct SqlBuilder {
    engine: DatabaseEngine,
}

impl SqlBuilder {
    pub fn new(engine: DatabaseEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> DatabaseEngine {
        self.engine
    }

    /// Placeholder `n` (1-based) cast to `ty`, with empty strings as NULL
    fn param(&self, n: usize, ty: ColumnType) -> String {
        let raw = match self.engine {
            DatabaseEngine::Postgresql => format!("NULLIF(${n}::varchar, '')"),
            DatabaseEngine::Mssql => format!("NULLIF(@P{n}, '')"),
        };
        if ty.is_text() {
            raw
        } else {
            format!("CAST({raw} AS {})", ty.sql(self.engine))
        }
    }

    fn staging_index_name(&self, table: &str) -> String {
        match self.engine {
            DatabaseEngine::Postgresql => format!("ix_stg_{}_natural_key", table.to_lowercase()),
            DatabaseEngine::Mssql => format!("IX_stg_{table}_Natural_Key"),
        }
    }

    /// Rows per multi-row insert that stay under the engine's parameter limit
    pub fn rows_per_insert(&self, column_count: usize) -> usize {
        let limit = match self.engine {
            DatabaseEngine::Postgresql => POSTGRES_MAX_PARAMS,
            DatabaseEngine::Mssql => MSSQL_MAX_PARAMS,
        };
        (limit / column_count.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
    }

    pub fn disable_staging_index(&self, table: &str) -> Statement {
        let index = self.staging_index_name(table);
        let sql = match self.engine {
            DatabaseEngine::Postgresql => format!("DROP INDEX IF EXISTS lms.{index}"),
            DatabaseEngine::Mssql => format!("ALTER INDEX {index} ON lms.stg_{table} DISABLE"),
        };
        Statement::new(format!("{table}: disable staging index"), sql)
    }

    pub fn enable_staging_index(&self, table: &str) -> Statement {
        let index = self.staging_index_name(table);
        let sql = match self.engine {
            DatabaseEngine::Postgresql => format!(
                "CREATE INDEX {index} ON lms.stg_{table} ({})",
                staging_index_columns(table).join(", ")
            ),
            DatabaseEngine::Mssql => format!("ALTER INDEX {index} ON lms.stg_{table} REBUILD"),
        };
        Statement::new(format!("{table}: enable staging index"), sql)
    }

    pub fn truncate_staging(&self, table: &str) -> Statement {
        let sql = match self.engine {
            DatabaseEngine::Postgresql => format!("TRUNCATE TABLE lms.stg_{table} RESTART IDENTITY"),
            DatabaseEngine::Mssql => format!("TRUNCATE TABLE lms.stg_{table}"),
        };
        Statement::new(format!("{table}: truncate staging"), sql)
    }

    /// Batched inserts of `rows` into `stg_<table>`; each row aligns with `columns`
    pub fn insert_staging(
        &self,
        table: &str,
        columns: &[Column],
        rows: &[Vec<Option<String>>],
    ) -> Vec<Statement> {
        let names = columns.iter().map(|c| c.name).collect::<Vec<_>>().join(", ");
        let per_statement = self.rows_per_insert(columns.len());

        rows.chunks(per_statement)
            .enumerate()
            .map(|(batch, chunk)| {
                let mut params = Vec::with_capacity(chunk.len() * columns.len());
                let values: Vec<String> = chunk
                    .iter()
                    .map(|row| {
                        let placeholders: Vec<String> = columns
                            .iter()
                            .enumerate()
                            .map(|(i, column)| {
                                params.push(row.get(i).cloned().flatten());
                                self.param(params.len(), column.ty)
                            })
                            .collect();
                        format!("({})", placeholders.join(", "))
                    })
                    .collect();

                Statement::new(
                    format!("{table}: stage batch {}", batch + 1),
                    format!(
                        "INSERT INTO lms.stg_{table} ({names}) VALUES {}",
                        values.join(", ")
                    ),
                )
                .with_params(params)
            })
            .collect()
    }

    fn relation_joins(&self, def: &TableDef) -> String {
        def.relations
            .iter()
            .map(|r| {
                format!(
                    " INNER JOIN lms.{parent} AS {parent} ON {parent}.SourceSystemIdentifier = stg.{csv} AND {parent}.SourceSystem = stg.SourceSystem",
                    parent = r.parent,
                    csv = r.csv_column
                )
            })
            .collect()
    }

    /// Insert staging rows whose natural key is new to production
    pub fn insert_new(&self, def: &TableDef) -> Statement {
        let table = def.name();
        let mut targets: Vec<String> = def.columns.iter().map(|c| c.name.to_string()).collect();
        let mut sources: Vec<String> = def.columns.iter().map(|c| format!("stg.{}", c.name)).collect();
        for r in def.relations {
            targets.push(r.identifier.to_string());
            sources.push(format!("{}.{}", r.parent, r.identifier));
        }

        let sql = format!(
            "INSERT INTO lms.{table} ({}, CreateDate, LastModifiedDate) \
             SELECT {}, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP \
             FROM lms.stg_{table} AS stg{} \
             WHERE NOT EXISTS (SELECT 1 FROM lms.{table} AS t \
             WHERE t.SourceSystemIdentifier = stg.SourceSystemIdentifier AND t.SourceSystem = stg.SourceSystem)",
            targets.join(", "),
            sources.join(", "),
            self.relation_joins(def)
        );
        Statement::new(format!("{table}: insert new"), sql)
    }

    /// Overwrite production rows whose content differs or that were soft-deleted
    pub fn update_changed(&self, def: &TableDef) -> Statement {
        let table = def.name();
        let content = def
            .columns
            .iter()
            .filter(|c| c.name != "SourceSystemIdentifier" && c.name != "SourceSystem");

        let mut assignments = Vec::new();
        let mut staged = Vec::new();
        let mut current = Vec::new();
        for column in content {
            assignments.push(format!("{name} = stg.{name}", name = column.name));
            staged.push(format!("stg.{}", column.name));
            current.push(format!("t.{}", column.name));
        }
        for r in def.relations {
            assignments.push(format!("{} = {}.{}", r.identifier, r.parent, r.identifier));
            staged.push(format!("{}.{}", r.parent, r.identifier));
            current.push(format!("t.{}", r.identifier));
        }
        assignments.push("LastModifiedDate = CURRENT_TIMESTAMP".to_string());
        assignments.push("DeletedAt = NULL".to_string());

        let changed = format!(
            "(t.DeletedAt IS NOT NULL OR EXISTS (SELECT {} EXCEPT SELECT {}))",
            staged.join(", "),
            current.join(", ")
        );
        let key_match = "t.SourceSystemIdentifier = stg.SourceSystemIdentifier AND t.SourceSystem = stg.SourceSystem";
        let joins = self.relation_joins(def);

        let sql = match self.engine {
            DatabaseEngine::Postgresql => format!(
                "UPDATE lms.{table} AS t SET {} FROM lms.stg_{table} AS stg{joins} WHERE {key_match} AND {changed}",
                assignments.join(", ")
            ),
            DatabaseEngine::Mssql => format!(
                "UPDATE t SET {} FROM lms.{table} AS t INNER JOIN lms.stg_{table} AS stg ON {key_match}{joins} WHERE {changed}",
                assignments.join(", ")
            ),
        };
        Statement::new(format!("{table}: update changed"), sql)
    }

    /// Mark live rows of `source_system` missing from staging as deleted
    pub fn soft_delete(&self, def: &TableDef, source_system: &str) -> Statement {
        let table = def.name();
        let filter = format!(
            "t.DeletedAt IS NULL AND t.SourceSystem = {} \
             AND NOT EXISTS (SELECT 1 FROM lms.stg_{table} AS stg \
             WHERE stg.SourceSystemIdentifier = t.SourceSystemIdentifier AND stg.SourceSystem = t.SourceSystem)",
            self.param(1, ColumnType::Varchar(255))
        );
        let sql = match self.engine {
            DatabaseEngine::Postgresql => {
                format!("UPDATE lms.{table} AS t SET DeletedAt = CURRENT_TIMESTAMP WHERE {filter}")
            }
            DatabaseEngine::Mssql => {
                format!("UPDATE t SET DeletedAt = CURRENT_TIMESTAMP FROM lms.{table} AS t WHERE {filter}")
            }
        };
        Statement::new(format!("{table}: soft delete"), sql)
            .with_params(vec![Some(source_system.to_string())])
    }

    /// Staging inserts for the submission type child table
    pub fn insert_submission_type_staging(&self, rows: &[Vec<Option<String>>]) -> Vec<Statement> {
        self.insert_staging(SUBMISSION_TYPE_TABLE, &SUBMISSION_TYPE_STAGED, rows)
    }

    /// Insert (assignment, type) pairs not yet in production
    pub fn insert_new_submission_types(&self) -> Statement {
        let sql = format!(
            "INSERT INTO lms.{SUBMISSION_TYPE_TABLE} (AssignmentIdentifier, SubmissionType, CreateDate, LastModifiedDate) \
             SELECT a.AssignmentIdentifier, stg.SubmissionType, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP \
             FROM lms.stg_{SUBMISSION_TYPE_TABLE} AS stg \
             INNER JOIN lms.Assignment AS a ON a.SourceSystemIdentifier = stg.SourceSystemIdentifier AND a.SourceSystem = stg.SourceSystem \
             WHERE NOT EXISTS (SELECT 1 FROM lms.{SUBMISSION_TYPE_TABLE} AS ast \
             WHERE ast.AssignmentIdentifier = a.AssignmentIdentifier AND ast.SubmissionType = stg.SubmissionType)"
        );
        Statement::new(format!("{SUBMISSION_TYPE_TABLE}: insert new"), sql)
    }

    fn submission_type_update(&self, set: &str, filter: &str) -> String {
        match self.engine {
            DatabaseEngine::Postgresql => format!(
                "UPDATE lms.{SUBMISSION_TYPE_TABLE} AS ast SET {set} FROM lms.Assignment AS a \
                 WHERE ast.AssignmentIdentifier = a.AssignmentIdentifier AND {filter}"
            ),
            DatabaseEngine::Mssql => format!(
                "UPDATE ast SET {set} FROM lms.{SUBMISSION_TYPE_TABLE} AS ast \
                 INNER JOIN lms.Assignment AS a ON ast.AssignmentIdentifier = a.AssignmentIdentifier \
                 WHERE {filter}"
            ),
        }
    }

    fn staged_pair(&self) -> String {
        format!(
            "SELECT 1 FROM lms.stg_{SUBMISSION_TYPE_TABLE} AS stg \
             WHERE stg.SourceSystemIdentifier = a.SourceSystemIdentifier AND stg.SourceSystem = a.SourceSystem \
             AND stg.SubmissionType = ast.SubmissionType"
        )
    }

    /// Soft-delete pairs of `source_system` assignments missing from staging
    pub fn soft_delete_submission_types(&self, source_system: &str) -> Statement {
        let filter = format!(
            "ast.DeletedAt IS NULL AND a.SourceSystem = {} AND NOT EXISTS ({})",
            self.param(1, ColumnType::Varchar(255)),
            self.staged_pair()
        );
        Statement::new(
            format!("{SUBMISSION_TYPE_TABLE}: soft delete"),
            self.submission_type_update("DeletedAt = CURRENT_TIMESTAMP", &filter),
        )
        .with_params(vec![Some(source_system.to_string())])
    }

    /// Clear `DeletedAt` on pairs present in staging again
    pub fn restore_submission_types(&self) -> Statement {
        let filter = format!("ast.DeletedAt IS NOT NULL AND EXISTS ({})", self.staged_pair());
        Statement::new(
            format!("{SUBMISSION_TYPE_TABLE}: restore"),
            self.submission_type_update(
                "DeletedAt = NULL, LastModifiedDate = CURRENT_TIMESTAMP",
                &filter,
            ),
        )
    }

    /// Number of `ProcessedFiles` rows for `path`
    pub fn processed_file_count(&self, path: &str) -> Statement {
        Statement::new(
            "ProcessedFiles: lookup",
            format!(
                "SELECT CAST(COUNT(*) AS BIGINT) FROM lms.ProcessedFiles WHERE FullPath = {}",
                self.param(1, ColumnType::LongText)
            ),
        )
        .with_params(vec![Some(path.to_string())])
    }

    pub fn record_processed_file(&self, path: &str, resource: &str, rows: usize) -> Statement {
        Statement::new(
            format!("ProcessedFiles: record {resource}"),
            format!(
                "INSERT INTO lms.ProcessedFiles (FullPath, ResourceName, NumberOfRows, CreateDate) \
                 VALUES ({}, {}, {}, CURRENT_TIMESTAMP)",
                self.param(1, ColumnType::LongText),
                self.param(2, ColumnType::Varchar(255)),
                self.param(3, ColumnType::Integer)
            ),
        )
        .with_params(vec![
            Some(path.to_string()),
            Some(resource.to_string()),
            Some(rows.to_string()),
        ])
    }
}
