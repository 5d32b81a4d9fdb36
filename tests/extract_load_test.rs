//! End-to-end tests: provider API → sync store → CSV tree → load plan
//!
//! Providers are served by mockito; the destination is a recording adapter,
//! so the merge SQL is inspected rather than executed.

use chrono::{Duration, Local};
use lms_toolkit::adapters::lms::canvas::CanvasApi;
use lms_toolkit::adapters::lms::{AuthStrategy, ClientSettings, RequestClient};
use lms_toolkit::adapters::sql::RecordingAdapter;
use lms_toolkit::config::{secret_string, DatabaseEngine};
use lms_toolkit::core::extract::{CanvasExtractor, CanvasOptions, Extraction, FeatureSet};
use lms_toolkit::core::files::{newest_file, read_records, CsvWriter, FileLayout};
use lms_toolkit::core::load::{LoadOptions, Loader, TableOutcome};
use lms_toolkit::core::sync::SyncStore;
use lms_toolkit::domain::LmsUser;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

fn canvas(url: &str) -> CanvasExtractor {
    let client = RequestClient::new(
        "Canvas",
        url,
        AuthStrategy::bearer(secret_string("token".to_string())),
        ClientSettings::default(),
    )
    .unwrap();
    CanvasExtractor::new(
        CanvasApi::new(client),
        CanvasOptions {
            start_date: "2021-01-01".to_string(),
            end_date: "2021-06-30".to_string(),
            use_graphql: false,
            account_id: "1".to_string(),
        },
    )
}

async fn extraction(base: &Path, started_at: chrono::DateTime<Local>) -> Extraction {
    Extraction::new(
        "Canvas",
        SyncStore::open(base.join("sync")).await.unwrap(),
        CsvWriter::new(FileLayout::new(
            &base.join("csv").to_string_lossy(),
            started_at,
        )),
        FeatureSet::parse::<&str>(&[]).unwrap(),
    )
}

async fn mock(server: &mut ServerGuard, path: &str, body: Value) -> Mock {
    server
        .mock("GET", path)
        .match_query(Matcher::Any)
        .with_body(body.to_string())
        .create_async()
        .await
}

async fn mock_course(server: &mut ServerGuard) {
    mock(server, "/api/v1/accounts", json!([{"id": 1}])).await;
    mock(
        server,
        "/api/v1/accounts/1/courses",
        json!([{"id": 100, "name": "Math", "workflow_state": "available"}]),
    )
    .await;
    mock(
        server,
        "/api/v1/courses/100/sections",
        json!([{"id": 10, "course_id": 100, "name": "Math 1", "sis_section_id": "M1"}]),
    )
    .await;
    mock(
        server,
        "/api/v1/sections/10/enrollments",
        json!([{
            "id": 4, "user_id": 5, "course_section_id": 10,
            "enrollment_state": "active", "type": "StudentEnrollment"
        }]),
    )
    .await;
}

fn newest_users(base: &Path) -> Vec<LmsUser> {
    let file = newest_file(&base.join("csv").join("users")).unwrap().unwrap();
    read_records(&file).unwrap()
}

#[tokio::test]
async fn test_unchanged_records_keep_their_dates() {
    let mut server = Server::new_async().await;
    mock_course(&mut server).await;
    let users = mock(
        &mut server,
        "/api/v1/courses/100/users",
        json!([{"id": 5, "name": "Ada", "login_id": "ada", "email": "ada@example.edu"}]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let first_run = Local::now() - Duration::minutes(10);

    canvas(&server.url())
        .run(extraction(dir.path(), first_run).await)
        .await
        .unwrap();
    let first = newest_users(dir.path());

    canvas(&server.url())
        .run(extraction(dir.path(), first_run + Duration::minutes(1)).await)
        .await
        .unwrap();
    let second = newest_users(dir.path());

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    assert_eq!(first[0].create_date, second[0].create_date);
    assert_eq!(first[0].last_modified_date, second[0].last_modified_date);

    users.remove_async().await;
    mock(
        &mut server,
        "/api/v1/courses/100/users",
        json!([{"id": 5, "name": "Ada Lovelace", "login_id": "ada", "email": "ada@example.edu"}]),
    )
    .await;

    canvas(&server.url())
        .run(extraction(dir.path(), first_run + Duration::minutes(2)).await)
        .await
        .unwrap();
    let third = newest_users(dir.path());

    assert_eq!(third[0].name, "Ada Lovelace");
    assert_eq!(third[0].create_date, first[0].create_date);
}

#[tokio::test]
async fn test_extracted_tree_loads_in_dependency_order() {
    let mut server = Server::new_async().await;
    mock_course(&mut server).await;
    mock(
        &mut server,
        "/api/v1/courses/100/users",
        json!([{"id": 5, "name": "Ada", "login_id": "ada", "email": "ada@example.edu"}]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let summary = canvas(&server.url())
        .run(extraction(dir.path(), Local::now()).await)
        .await
        .unwrap();
    assert!(summary.is_successful());

    let adapter = Arc::new(RecordingAdapter::new(DatabaseEngine::Postgresql));
    let loader = Loader::new(adapter.clone(), LoadOptions::default());
    let loaded = loader.load(&dir.path().join("csv")).await.unwrap();

    let loaded_tables: Vec<&str> = loaded
        .tables
        .iter()
        .filter(|t| matches!(t.outcome, TableOutcome::Loaded { .. }))
        .map(|t| t.table)
        .collect();
    assert_eq!(
        loaded_tables,
        vec!["LMSUser", "LMSSection", "LMSUserLMSSectionAssociation"]
    );
    assert_eq!(loaded.rows_loaded(), 3);

    // One transaction per loaded table, each opened on that table's staging
    let transactions = adapter.transactions();
    assert_eq!(transactions.len(), 3);
    assert!(transactions[0][0].description.starts_with("LMSUser:"));
    assert!(transactions[1][0].description.starts_with("LMSSection:"));
    assert!(transactions[2][0]
        .description
        .starts_with("LMSUserLMSSectionAssociation:"));

    // Every table of a known source is soft-delete scoped to it
    let soft_delete = adapter
        .statements()
        .into_iter()
        .find(|s| s.description == "LMSUser: soft delete")
        .unwrap();
    assert_eq!(soft_delete.params, vec![Some("Canvas".to_string())]);
}

#[tokio::test]
async fn test_header_only_file_soft_deletes_with_run_source() {
    let dir = tempfile::tempdir().unwrap();
    let writer = CsvWriter::new(FileLayout::new(&dir.path().to_string_lossy(), Local::now()));
    writer.write_root::<LmsUser>(&[]).unwrap();

    let adapter = Arc::new(RecordingAdapter::new(DatabaseEngine::Mssql));
    let loader = Loader::new(
        adapter.clone(),
        LoadOptions {
            source_system: Some("Schoology".to_string()),
            skip_processed: false,
        },
    );
    let summary = loader.load(dir.path()).await.unwrap();
    assert_eq!(summary.rows_loaded(), 0);

    let soft_delete = adapter
        .statements()
        .into_iter()
        .find(|s| s.description == "LMSUser: soft delete")
        .unwrap();
    assert_eq!(soft_delete.params, vec![Some("Schoology".to_string())]);
}

#[tokio::test]
async fn test_header_only_file_without_source_skips_soft_delete() {
    let dir = tempfile::tempdir().unwrap();
    let writer = CsvWriter::new(FileLayout::new(&dir.path().to_string_lossy(), Local::now()));
    writer.write_root::<LmsUser>(&[]).unwrap();

    let adapter = Arc::new(RecordingAdapter::new(DatabaseEngine::Postgresql));
    Loader::new(adapter.clone(), LoadOptions::default())
        .load(dir.path())
        .await
        .unwrap();

    assert!(adapter
        .statements()
        .iter()
        .all(|s| !s.description.ends_with("soft delete")));
}

#[tokio::test]
async fn test_processed_files_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let writer = CsvWriter::new(FileLayout::new(&dir.path().to_string_lossy(), Local::now()));
    writer
        .write_root(&[LmsUser {
            source_system_identifier: "5".to_string(),
            source_system: "Canvas".to_string(),
            name: "Ada".to_string(),
            ..Default::default()
        }])
        .unwrap();

    let adapter =
        Arc::new(RecordingAdapter::new(DatabaseEngine::Postgresql).with_scalar("ProcessedFiles", 1));
    let summary = Loader::new(
        adapter.clone(),
        LoadOptions {
            source_system: None,
            skip_processed: true,
        },
    )
    .load(dir.path())
    .await
    .unwrap();

    assert_eq!(summary.tables[0].outcome, TableOutcome::AlreadyProcessed);
    assert!(adapter.transactions().is_empty());
}
