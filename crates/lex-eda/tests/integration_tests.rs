//! Integration tests for the EDA session.
//!
//! These tests drive uploads end to end: load, clean, chart, store, export.

use lex_eda::{
    ChartData, ChartKind, ChartResolver, ChartSelector, DataLoader, EdaConfig, EdaError,
    ImputationAction, MISSING_LABEL, PNG_SIGNATURE, PlotStore, SessionStage, Session, Table,
    UploadedFile,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn sales_upload() -> UploadedFile {
    UploadedFile::from_path(fixtures_path().join("sales.csv")).expect("Failed to read fixture")
}

fn test_config(dir: &TempDir) -> EdaConfig {
    EdaConfig::builder()
        .store_path(dir.path().join("plots.db"))
        .image_size(320, 240)
        .sample_seed(42)
        .build()
        .expect("Failed to build config")
}

fn test_session(dir: &TempDir) -> Session {
    Session::builder()
        .config(test_config(dir))
        .build()
        .expect("Failed to build session")
}

fn stored_names(session: &Session) -> Vec<String> {
    session
        .store()
        .entries()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect()
}

// ============================================================================
// Loading & Cleaning
// ============================================================================

#[test]
fn test_csv_missing_value_thresholds() {
    let dir = TempDir::new().unwrap();
    let mut session = test_session(&dir);

    let report = session.load(sales_upload(), None).unwrap();

    assert_eq!(report.rows, 40);
    assert_eq!(report.columns_before, 7);
    assert_eq!(report.columns_after, 5);

    // 1 of 40 missing
    assert_eq!(report.action_for("price"), Some(&ImputationAction::FilledZero));
    assert_eq!(
        report.action_for("region"),
        Some(&ImputationAction::FilledConstant {
            value: MISSING_LABEL.to_string()
        })
    );
    // 4 of 40 and 8 of 40 missing
    match report.action_for("quantity") {
        Some(ImputationAction::FilledMean { mean }) => {
            assert!((mean - 178.0 / 36.0).abs() < 1e-9);
        }
        other => panic!("Expected mean fill for quantity, got {:?}", other),
    }
    assert_eq!(
        report.action_for("channel"),
        Some(&ImputationAction::LeftUnchanged)
    );
    // 16 of 40 is exactly the drop threshold
    assert_eq!(report.dropped_columns(), vec!["discount", "notes"]);
    assert_eq!(report.action_for("id"), Some(&ImputationAction::NoMissing));

    let table = session.table().unwrap();
    assert_eq!(table.height(), 40);
    assert_eq!(
        table.column_names(),
        vec!["id", "price", "quantity", "region", "channel"]
    );
    assert_eq!(table.series("price").unwrap().null_count(), 0);
    assert_eq!(table.series("quantity").unwrap().null_count(), 0);
    assert_eq!(table.series("channel").unwrap().null_count(), 8);

    let price = table.series("price").unwrap().f64().unwrap();
    assert_eq!(price.get(6), Some(0.0));
    let region = table.series("region").unwrap().str().unwrap();
    assert_eq!(region.get(10), Some(MISSING_LABEL));
}

#[test]
fn test_cleaning_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let mut session = test_session(&dir);
    session.load(sales_upload(), None).unwrap();
    let first = session.table().unwrap().clone();

    let report = session.ingest(first.clone()).unwrap();
    let second = session.table().unwrap();

    assert!(report.dropped_columns().is_empty());
    assert!(report.columns.iter().all(|c| matches!(
        c.action,
        ImputationAction::NoMissing | ImputationAction::LeftUnchanged
    )));
    assert!(first.frame().equals_missing(second.frame()));
}

#[test]
fn test_unsupported_upload_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut session = test_session(&dir);

    let err = session
        .load(UploadedFile::new("notes.txt", b"a,b\n1,2\n".to_vec()), None)
        .unwrap_err();

    assert_eq!(err.error_code(), "UNSUPPORTED_FORMAT");
    assert!(session.table().is_none());
}

#[test]
fn test_sqlite_upload_end_to_end() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("shop.sqlite");
    {
        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute_batch(
            "CREATE TABLE orders (id INTEGER, status TEXT, amount REAL);
             CREATE TABLE \"order items\" (sku TEXT);
             INSERT INTO orders VALUES (1, 'open', 10.5);
             INSERT INTO orders VALUES (2, 'shipped', 20.0);
             INSERT INTO orders VALUES (3, 'open', 7.25);
             INSERT INTO orders VALUES (4, 'returned', 3.0);
             INSERT INTO orders VALUES (5, 'shipped', 12.0);",
        )
        .unwrap();
    }
    let bytes = std::fs::read(&db_path).unwrap();
    let mut session = test_session(&dir);

    let err = session
        .load(UploadedFile::new("shop.sqlite", bytes.clone()), None)
        .unwrap_err();
    match err {
        EdaError::WithContext { source, .. } => match *source {
            EdaError::TableNotSelected { available } => {
                assert_eq!(available, vec!["orders", "order items"]);
            }
            other => panic!("Expected TableNotSelected, got {:?}", other),
        },
        other => panic!("Expected context error, got {:?}", other),
    }

    let report = session
        .load(UploadedFile::new("shop.sqlite", bytes), Some("orders"))
        .unwrap();
    assert_eq!(report.rows, 5);
    assert_eq!(report.columns_after, 3);

    let outcomes = session.visualize(&["amount", "status"]).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].spec.kind, ChartKind::Box);
    assert!(outcomes[0].is_ok());
    assert_eq!(stored_names(&session), vec!["Box Plot: amount by status"]);
}

// ============================================================================
// Chart Selection & Data
// ============================================================================

#[test]
fn test_long_numeric_column_is_sampled() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let df = df!["reading" => (0..2000).map(|i| (i % 97) as f64).collect::<Vec<_>>()].unwrap();
    let table = Table::new(df);

    let specs = ChartSelector::new(&config)
        .select(&table, &["reading"])
        .unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].kind, ChartKind::Line);
    assert_eq!(specs[1].kind, ChartKind::Histogram);

    let mut rng = StdRng::seed_from_u64(7);
    let data = ChartResolver::new(&config)
        .resolve(&specs[0], &table, &mut rng)
        .unwrap();
    match data {
        ChartData::Line { points, smoothed } => {
            assert_eq!(points.len(), 1000);
            assert!(smoothed);
            assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
            assert!(points.iter().all(|(row, _)| *row < 2000));
        }
        other => panic!("Expected line data, got {:?}", other),
    }

    let histogram = ChartResolver::new(&config)
        .resolve(&specs[1], &table, &mut rng)
        .unwrap();
    assert_eq!(histogram.total_count(), Some(2000));
}

#[test]
fn test_bar_chart_keeps_top_ten_categories() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    // category `c{i}` occurs 15 - i times
    let values: Vec<String> = (0..15)
        .flat_map(|i| std::iter::repeat_n(format!("c{:02}", i), 15 - i))
        .collect();
    let table = Table::new(df!["category" => values].unwrap());

    let specs = ChartSelector::new(&config)
        .select(&table, &["category"])
        .unwrap();
    assert_eq!(
        specs.iter().map(|s| s.kind).collect::<Vec<_>>(),
        vec![ChartKind::Bar, ChartKind::Pie]
    );

    let mut rng = StdRng::seed_from_u64(1);
    let data = ChartResolver::new(&config)
        .resolve(&specs[0], &table, &mut rng)
        .unwrap();
    match data {
        ChartData::Categories { counts } => {
            assert_eq!(counts.len(), 10);
            assert_eq!(counts[0].value, "c00");
            assert_eq!(counts[0].count, 15);
            assert_eq!(counts[9].value, "c09");
            assert!(counts.windows(2).all(|w| w[0].count >= w[1].count));
        }
        other => panic!("Expected category counts, got {:?}", other),
    }
}

#[test]
fn test_grouped_bar_counts_cleaned_pairs() {
    let dir = TempDir::new().unwrap();
    let mut session = test_session(&dir);
    session.load(sales_upload(), None).unwrap();
    let table = session.table().unwrap().clone();
    let config = test_config(&dir);

    let specs = ChartSelector::new(&config)
        .select(&table, &["region", "channel"])
        .unwrap();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].kind, ChartKind::GroupedBar);

    let mut rng = StdRng::seed_from_u64(1);
    let data = ChartResolver::new(&config)
        .resolve(&specs[0], &table, &mut rng)
        .unwrap();
    // rows whose channel is still missing are not counted
    assert_eq!(data.total_count(), Some(32));
}

// ============================================================================
// Rendering, Storage & Export
// ============================================================================

#[test]
fn test_visualize_stores_png_charts() {
    let dir = TempDir::new().unwrap();
    let mut session = test_session(&dir);
    session.load(sales_upload(), None).unwrap();

    let outcomes = session.visualize(&["price"]).unwrap();
    let outcomes_scatter = session.visualize(&["price", "quantity"]).unwrap();

    assert!(outcomes.iter().chain(&outcomes_scatter).all(|o| o.is_ok()));
    assert_eq!(
        stored_names(&session),
        vec![
            "Line Plot: price",
            "Histogram: price",
            "Scatter Plot: price vs quantity"
        ]
    );
    for plot in session.store().entries().unwrap() {
        assert!(plot.image.starts_with(&PNG_SIGNATURE));
    }
}

#[test]
fn test_failed_chart_does_not_block_others() {
    let dir = TempDir::new().unwrap();
    let mut session = test_session(&dir);
    let df = df!["spike" => [f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY]].unwrap();
    session.ingest(Table::new(df)).unwrap();

    // Neither chart has a finite value to draw
    let outcomes = session.visualize(&["spike"]).unwrap();

    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        match &outcome.result {
            Err(e) => {
                assert_eq!(e.error_code(), "RENDER_FAILED");
                assert!(!e.is_terminal_for_upload());
            }
            Ok(_) => panic!("'{}' should fail without finite values", outcome.spec.title),
        }
    }
    assert!(session.store().is_empty().unwrap());

    // The session keeps working after failed charts
    let df = df!["city" => ["Oslo", "Rome", "Oslo"]].unwrap();
    session.ingest(Table::new(df)).unwrap();
    assert!(session.visualize(&["city"]).unwrap().iter().all(|o| o.is_ok()));
    assert_eq!(
        stored_names(&session),
        vec!["Bar Chart: city", "Pie Chart: city"]
    );
}

#[test]
fn test_export_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut session = test_session(&dir);
    session.load(sales_upload(), None).unwrap();
    session.visualize(&["region"]).unwrap();

    let artifact = session.export().unwrap();
    assert_eq!(artifact.file_name, "plots.db");
    assert_eq!(artifact.content_type, "application/octet-stream");
    assert_eq!(
        artifact.bytes,
        std::fs::read(dir.path().join("plots.db")).unwrap()
    );

    let copy = dir.path().join("download.db");
    session.store().export_to(&copy).unwrap();
    let exported = PlotStore::open(&copy).unwrap();
    assert_eq!(
        exported.entries().unwrap(),
        session.store().entries().unwrap()
    );
}

#[test]
fn test_store_persists_across_sessions() {
    let dir = TempDir::new().unwrap();
    {
        let mut session = test_session(&dir);
        session.load(sales_upload(), None).unwrap();
        session.visualize(&["region"]).unwrap();
    }

    let mut session = test_session(&dir);
    session.load(sales_upload(), None).unwrap();
    session.visualize(&["quantity", "region"]).unwrap();

    assert_eq!(
        stored_names(&session),
        vec![
            "Bar Chart: region",
            "Pie Chart: region",
            "Box Plot: quantity by region"
        ]
    );
}

#[test]
fn test_progress_reaches_complete() {
    let dir = TempDir::new().unwrap();
    let updates = Arc::new(Mutex::new(Vec::new()));
    let seen = updates.clone();
    let mut session = Session::builder()
        .config(test_config(&dir))
        .on_progress(move |update| seen.lock().unwrap().push(update))
        .build()
        .unwrap();

    session.load(sales_upload(), None).unwrap();
    session.visualize(&["price", "region"]).unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(updates.first().map(|u| u.stage), Some(SessionStage::Loading));
    assert_eq!(updates.last().map(|u| u.stage), Some(SessionStage::Complete));
    assert!(updates.iter().all(|u| (0.0..=1.0).contains(&u.progress)));
    assert!(
        updates
            .windows(2)
            .all(|w| w[0].progress <= w[1].progress + 1e-6)
    );
}

#[test]
fn test_loader_reads_fixture_directly() {
    let table = DataLoader::load(sales_upload(), None).unwrap();
    assert_eq!(table.width(), 7);
    assert_eq!(table.series("notes").unwrap().null_count(), 34);
}
