//! Facade-level tests against a relational-only store.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use ratestore::{
    FieldValue, FindQuery, Mode, Record, Store, StoreConfig, StoreError, WriteOutcome,
};

fn open_store(dir: &TempDir, mode: Mode) -> Store {
    let config = StoreConfig::new("quotes", "rates", mode)
        .data_dir(dir.path())
        .relational_only();
    Store::open(config).unwrap()
}

fn aux_record(ts: &str, currency: &str, rate: f64) -> Record {
    Record::from(vec![
        FieldValue::from(ts),
        FieldValue::from(currency),
        FieldValue::from(rate),
    ])
}

fn main_record(ts: &str, currency: &str) -> Record {
    Record::from(vec![
        FieldValue::from(ts),
        FieldValue::from(currency),
        FieldValue::from(105.0),
        FieldValue::from(95.0),
        FieldValue::from(10.0),
        FieldValue::from(100.0),
        FieldValue::Null,
        FieldValue::from(0.42),
        FieldValue::from(1.3),
        FieldValue::now(),
    ])
}

#[test]
fn undeclared_document_source_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::new("quotes", "rates", Mode::Aux).data_dir(dir.path());
    match Store::open(config) {
        Err(StoreError::Configuration(_)) => {}
        other => panic!("expected configuration error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn duplicate_single_insert_keeps_first_value() {
    // Scenario A: second insert with the same (timestamp, currency) key is
    // reported as a duplicate and the first value survives.
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);

    let report = store.insert_one(&aux_record("2024-01-01T00:00:00Z", "BTC", 100.0));
    assert!(report.relational.is_inserted());
    assert!(report.document.is_none());

    let report = store.insert_one(&aux_record("2024-01-01T00:00:00Z", "BTC", 105.0));
    assert!(report.relational.is_duplicate());

    let rows = store.find(&FindQuery::new()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["rate"], 100.0);
}

#[test]
fn not_null_violation_reports_error_not_duplicate() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);

    let record = Record::from(vec![
        FieldValue::from("2024-01-01T00:00:00Z"),
        FieldValue::from("BTC"),
        FieldValue::Null,
    ]);
    let report = store.insert_one(&record);
    assert!(matches!(report.relational, WriteOutcome::Error(_)));

    assert!(store.find(&FindQuery::new()).unwrap().is_empty());
}

#[test]
fn colliding_batch_rolls_back_in_full() {
    // Scenario B: main-mode batch where record 2 collides with record 1 on
    // the primary key. All-or-nothing: zero rows persisted, not two.
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Main);

    let records = vec![
        main_record("2024-01-01T00:00:00Z", "BTC"),
        main_record("2024-01-01T00:00:00Z", "ETH"),
        main_record("2024-01-01T06:00:00Z", "BTC"),
    ];
    let report = store.insert_many(&records);
    assert!(!report.relational.success);
    assert_eq!(report.relational.inserted, 0);

    assert!(store.find(&FindQuery::new()).unwrap().is_empty());
}

#[test]
fn sort_desc_with_limit_returns_newest_first() {
    // Scenario C: five aux rows, sort by timestamp descending, limit 2.
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);

    for hour in 0..5 {
        let ts = format!("2024-01-01T{:02}:00:00Z", hour);
        let report = store.insert_one(&aux_record(&ts, "BTC", 100.0 + hour as f64));
        assert!(report.relational.is_inserted());
    }

    let rows = store
        .find(&FindQuery::new().sort("timestamp", "DESC").limit(2))
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["timestamp"], "2024-01-01T04:00:00Z");
    assert_eq!(rows[1]["timestamp"], "2024-01-01T03:00:00Z");
}

#[test]
fn sort_asc_is_non_decreasing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);

    // inserted out of order on purpose
    for hour in [3, 0, 4, 1, 2] {
        let ts = format!("2024-01-01T{:02}:00:00Z", hour);
        store.insert_one(&aux_record(&ts, "BTC", 1.0));
    }

    let rows = store
        .find(&FindQuery::new().sort("timestamp", 1))
        .unwrap();
    let timestamps: Vec<&str> = rows
        .iter()
        .map(|r| r["timestamp"].as_str().unwrap())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);
}

#[test]
fn unfiltered_find_returns_all_minus_duplicates() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);

    for hour in 0..4 {
        let ts = format!("2024-01-01T{:02}:00:00Z", hour);
        store.insert_one(&aux_record(&ts, "BTC", 1.0));
    }
    // two duplicates rejected
    store.insert_one(&aux_record("2024-01-01T00:00:00Z", "BTC", 9.0));
    store.insert_one(&aux_record("2024-01-01T01:00:00Z", "BTC", 9.0));

    assert_eq!(store.find(&FindQuery::new()).unwrap().len(), 4);
}

#[test]
fn structured_filter_behaves_like_clause() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);

    store.insert_one(&aux_record("2024-01-01T00:00:00Z", "BTC", 100.0));
    store.insert_one(&aux_record("2024-01-01T00:00:00Z", "ETH", 10.0));
    store.insert_one(&aux_record("2024-01-01T01:00:00Z", "BTC", 120.0));

    let by_filter = store
        .find(&FindQuery::new().filter(mongodb::bson::doc! {
            "currency": "BTC",
            "rate": { "$gt": 101.0 },
        }))
        .unwrap();
    let by_clause = store
        .find(&FindQuery::new().clause("currency = 'BTC' AND rate > 101"))
        .unwrap();

    assert_eq!(by_filter, by_clause);
    assert_eq!(by_filter.len(), 1);
    assert_eq!(by_filter[0]["rate"], 120.0);
}

#[test]
fn malformed_clause_surfaces_an_error() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);
    store.insert_one(&aux_record("2024-01-01T00:00:00Z", "BTC", 1.0));

    let result = store.find(&FindQuery::new().clause("currency ==== 'BTC'"));
    assert!(result.is_err());
}

#[test]
fn concurrent_single_inserts_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir, Mode::Aux));

    let mut handles = Vec::new();
    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..25 {
                let ts = format!("2024-01-0{}T{:02}:00:00Z", t + 1, i);
                let report = store.insert_one(&aux_record(&ts, "BTC", 1.0));
                assert!(report.relational.is_inserted());
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.find(&FindQuery::new()).unwrap().len(), 200);
}

#[test]
fn concurrent_batches_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(open_store(&dir, Mode::Aux));

    let mut handles = Vec::new();
    for t in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            let records: Vec<Record> = (0..20)
                .map(|i| {
                    let ts = format!("2024-02-0{}T{:02}:00:00Z", t + 1, i);
                    aux_record(&ts, "ETH", 2.0)
                })
                .collect();
            let report = store.insert_many(&records);
            assert!(report.relational.success);
            assert_eq!(report.relational.inserted, 20);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.find(&FindQuery::new()).unwrap().len(), 80);
}

#[test]
fn destroy_then_reopen_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);
    store.insert_one(&aux_record("2024-01-01T00:00:00Z", "BTC", 1.0));
    store.destroy().unwrap();

    let store = open_store(&dir, Mode::Aux);
    assert!(store.find(&FindQuery::new()).unwrap().is_empty());
}

#[test]
fn destroy_is_best_effort_on_missing_file() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, Mode::Aux);

    // pull the database file out from under the store
    for name in ["quotes.db", "quotes.db-wal", "quotes.db-shm"] {
        std::fs::remove_file(dir.path().join(name)).ok();
    }
    assert!(!dir.path().join("quotes.db").exists());

    store.destroy().unwrap();
}
