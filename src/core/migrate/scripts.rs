//! Embedded migration scripts and statement splitting

use crate::config::DatabaseEngine;

/// One schema script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationScript {
    /// File basename without extension, as recorded in the journal
    pub name: &'static str,
    pub sql: &'static str,
}

/// Creates the schema and the journal; runs whenever the journal is missing
pub const INITIALIZE_SCRIPT: &str = "0001_initialize_lms_database";

const POSTGRESQL: &[MigrationScript] = &[
    MigrationScript {
        name: INITIALIZE_SCRIPT,
        sql: include_str!("../../../migrations/postgresql/0001_initialize_lms_database.sql"),
    },
    MigrationScript {
        name: "0002_create_lms_tables",
        sql: include_str!("../../../migrations/postgresql/0002_create_lms_tables.sql"),
    },
];

const MSSQL: &[MigrationScript] = &[
    MigrationScript {
        name: INITIALIZE_SCRIPT,
        sql: include_str!("../../../migrations/mssql/0001_initialize_lms_database.sql"),
    },
    MigrationScript {
        name: "0002_create_lms_tables",
        sql: include_str!("../../../migrations/mssql/0002_create_lms_tables.sql"),
    },
];

/// Scripts for `engine` in application order
pub fn scripts(engine: DatabaseEngine) -> &'static [MigrationScript] {
    match engine {
        DatabaseEngine::Postgresql => POSTGRESQL,
        DatabaseEngine::Mssql => MSSQL,
    }
}

/// Split a script into statements
///
/// Lines holding only `GO` are dropped, then the text is split on `;`
/// outside string literals, quoted identifiers and comments. Comments are
/// removed and blank statements skipped.
pub fn split_statements(script: &str) -> Vec<String> {
    let text: String = script
        .lines()
        .filter(|line| !line.trim().eq_ignore_ascii_case("go"))
        .collect::<Vec<_>>()
        .join("\n");

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                current.push(c);
                for inner in chars.by_ref() {
                    current.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = ' ';
                for inner in chars.by_ref() {
                    if previous == '*' && inner == '/' {
                        break;
                    }
                    previous = inner;
                }
                current.push(' ');
            }
            ';' => push_statement(&mut statements, &mut current),
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_lines_and_comments_are_dropped() {
        let script = "-- header; with a semicolon\nCREATE TABLE a (x INT);\nGO\n/* block; */\ngo\nINSERT INTO a VALUES (1)";
        assert_eq!(
            split_statements(script),
            vec!["CREATE TABLE a (x INT)", "INSERT INTO a VALUES (1)"]
        );
    }

    #[test]
    fn test_semicolons_inside_literals_stay() {
        let script = "IF NOT EXISTS (SELECT 1) EXEC ('CREATE SCHEMA lms; ');\nSELECT \"a;b\" FROM t;";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "IF NOT EXISTS (SELECT 1) EXEC ('CREATE SCHEMA lms; ')");
        assert_eq!(statements[1], "SELECT \"a;b\" FROM t");
    }

    #[test]
    fn test_go_inside_identifier_is_kept() {
        let statements = split_statements("SELECT 1 AS going;");
        assert_eq!(statements, vec!["SELECT 1 AS going"]);
    }

    #[test]
    fn test_embedded_scripts_are_ordered_and_split() {
        for engine in [DatabaseEngine::Postgresql, DatabaseEngine::Mssql] {
            let all = scripts(engine);
            assert_eq!(all[0].name, INITIALIZE_SCRIPT);
            assert!(all.windows(2).all(|w| w[0].name < w[1].name));

            let init = split_statements(all[0].sql);
            assert!(init.iter().any(|s| s.contains("MigrationJournal_Harmonizer")));
            assert!(init.iter().any(|s| s.contains("ProcessedFiles")));

            let tables = split_statements(all[1].sql);
            assert!(tables.iter().any(|s| s.starts_with("CREATE TABLE lms.stg_AssignmentSubmissionType")));
            assert!(tables.iter().all(|s| !s.eq_ignore_ascii_case("go")));
        }
    }

    #[test]
    fn test_initialize_script_is_rerunnable() {
        for engine in [DatabaseEngine::Postgresql, DatabaseEngine::Mssql] {
            let init = split_statements(scripts(engine)[0].sql);
            let creates: Vec<_> = init.iter().filter(|s| s.contains("CREATE TABLE")).collect();
            assert_eq!(creates.len(), 2, "{engine:?}");
            for statement in creates {
                assert!(
                    statement.contains("IF NOT EXISTS") || statement.starts_with("IF OBJECT_ID("),
                    "{engine:?}: {statement}"
                );
            }
        }
    }
}
