//! End-to-end tests for the generate → persist → reload → analyze pipeline

use loglens::analytics::{
    aggregate, endpoint_slice, session_summary, Grouping, LogFilter, NoGeoDatabase,
    PredictError, TrendModel, UNKNOWN_COUNTRY,
};
use loglens::analytics::{enrich_countries, CountryResolver};
use loglens::logs::{GeneratorConfig, LogGenerator};
use loglens::models::{
    parse_timestamp, Browser, Device, LogRecord, LogTable, Method, SportsActivity, Status,
    HEADER,
};
use loglens::storage::{LogStore, StorageError, TableCache};
use std::fs;
use std::net::Ipv4Addr;
use tempfile::TempDir;

fn seeded_generator(seed: u64) -> LogGenerator {
    LogGenerator::new(GeneratorConfig {
        start: parse_timestamp("2024-07-26 08:00:00"),
        seed: Some(seed),
        ..Default::default()
    })
}

fn boundary_records() -> Vec<LogRecord> {
    vec![
        LogRecord {
            timestamp: parse_timestamp("2024-07-26 08:00:00").unwrap(),
            ip_address: Ipv4Addr::new(0, 0, 0, 0),
            method: Method::Get,
            endpoint: "/index.html".to_string(),
            status: Status::Ok,
            country: "Korea, Republic of".to_string(),
            sports_activity: SportsActivity::Cricket,
            device: Device::Desktop,
            browser: Browser::Firefox,
            duration: 0.0,
        },
        LogRecord {
            timestamp: parse_timestamp("2024-07-27 23:59:59").unwrap(),
            ip_address: Ipv4Addr::new(255, 255, 255, 255),
            method: Method::Post,
            endpoint: "/searchsports.php".to_string(),
            status: Status::InternalServerError,
            country: "Côte d'Ivoire".to_string(),
            sports_activity: SportsActivity::Volleyball,
            device: Device::Tablet,
            browser: Browser::Edge,
            duration: 143_999.0,
        },
    ]
}

#[test]
fn test_append_then_load_round_trips_every_field() {
    let dir = TempDir::new().unwrap();
    let store = LogStore::new(dir.path().join("web_server_logs.csv"));

    let records = boundary_records();
    store.append(&records).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.table.records(), records.as_slice());
}

#[test]
fn test_two_appends_write_one_header() {
    let dir = TempDir::new().unwrap();
    let store = LogStore::new(dir.path().join("web_server_logs.csv"));
    let mut generator = seeded_generator(1);

    store.append(&generator.generate(30)).unwrap();
    store.append(&generator.generate(45)).unwrap();

    let contents = fs::read_to_string(store.path()).unwrap();
    let header = HEADER.join(",");
    assert_eq!(contents.lines().filter(|line| *line == header).count(), 1);
    assert_eq!(contents.lines().next(), Some(header.as_str()));
    assert_eq!(contents.lines().count(), 1 + 30 + 45);
    assert_eq!(store.load().unwrap().table.len(), 75);
}

#[test]
fn test_generate_persist_reload_device_counts_sum() {
    let dir = TempDir::new().unwrap();
    let store = LogStore::new(dir.path().join("web_server_logs.csv"));

    store.append(&LogGenerator::default().generate(50)).unwrap();
    let table = store.load().unwrap().table;

    let result = aggregate(&table);
    let devices = result.grouping(Grouping::Device).unwrap();
    assert!(devices.entries.len() <= 3);
    assert_eq!(devices.total(), 50);
}

#[test]
fn test_reloaded_batch_keeps_duration_invariants() {
    let dir = TempDir::new().unwrap();
    let store = LogStore::new(dir.path().join("logs.csv"));
    store.append(&seeded_generator(8).generate(120)).unwrap();

    let table = store.load().unwrap().table;
    let records = table.records();
    assert_eq!(records[0].duration, 0.0);
    for pair in records.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
        let gap = (pair[1].timestamp - pair[0].timestamp).num_seconds() as f64;
        assert_eq!(pair[1].duration, gap);
    }
}

#[test]
fn test_missing_table_and_schema_mismatch() {
    let dir = TempDir::new().unwrap();
    let store = LogStore::new(dir.path().join("absent.csv"));
    assert!(matches!(store.load(), Err(StorageError::NotFound(_))));

    let renamed = dir.path().join("renamed.csv");
    fs::write(
        &renamed,
        "When,IP Address,Method,Endpoint,Status,Country,Sports Activity,Device,Browser,Duration\n",
    )
    .unwrap();
    let store = LogStore::new(&renamed);
    assert!(matches!(
        store.load(),
        Err(StorageError::SchemaMismatch { .. })
    ));
    assert!(store.load_or_empty().unwrap().table.is_empty());
}

#[test]
fn test_filtered_analysis_and_prediction() {
    let table = LogTable::new(seeded_generator(21).generate(400));

    let filter = LogFilter {
        devices: vec!["Mobile".to_string()],
        ..Default::default()
    };
    let mobile = filter.apply(&table);
    let result = aggregate(&mobile);
    assert_eq!(
        result.grouping(Grouping::Device).unwrap().count_of("Mobile"),
        Some(mobile.len())
    );

    let slice = endpoint_slice(&table, "/football.html");
    assert_eq!(slice.spread, (slice.visits as f64).sqrt());

    let sessions = session_summary(&table);
    assert_eq!(sessions.samples, table.len());

    let model = TrendModel::fit(&table).unwrap();
    assert!(model.predict(12).unwrap().is_finite());
    assert_eq!(model.predict(24), Err(PredictError::InvalidArgument(24)));
}

#[test]
fn test_enrichment_without_database_marks_unknown() {
    let mut table = LogTable::new(seeded_generator(2).generate(10));
    let stats = enrich_countries(&mut table, &NoGeoDatabase);

    assert_eq!(stats.unknown, 10);
    assert!(table.iter().all(|r| r.country == UNKNOWN_COUNTRY));
    assert_eq!(NoGeoDatabase.resolve("not.an.ip"), UNKNOWN_COUNTRY);
}

#[test]
fn test_cache_sees_appends() {
    let dir = TempDir::new().unwrap();
    let store = LogStore::new(dir.path().join("logs.csv"));
    let cache = TableCache::default();
    let mut generator = seeded_generator(4);

    cache.append(&store, &generator.generate(5)).unwrap();
    assert_eq!(cache.load(&store).unwrap().table.len(), 5);

    cache.append(&store, &generator.generate(7)).unwrap();
    assert_eq!(cache.load(&store).unwrap().table.len(), 12);
}
