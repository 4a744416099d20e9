//! Unit tests for the persistence and deduplication layer, using an
//! in-memory SQLite database.

use std::sync::Arc;

use webtrail::database::Database;
use webtrail::managers::history_store::{HistoryStore, HistoryStoreTrait};
use webtrail::types::category::CategoryScore;
use webtrail::types::history::{HistoryItem, TimeRange, VisitDetail};

fn setup() -> HistoryStore {
    let db = Arc::new(Database::open_in_memory().expect("Failed to open in-memory database"));
    HistoryStore::new(db)
}

fn item(url: &str, t: i64) -> HistoryItem {
    HistoryItem {
        url: url.to_string(),
        title: format!("Title of {}", url),
        last_visit_time: t,
        visit_count: 1,
        typed_count: 0,
        domain: "example.com".to_string(),
    }
}

fn visit(id: &str, url: &str, t: i64) -> VisitDetail {
    VisitDetail {
        visit_id: id.to_string(),
        url: url.to_string(),
        visit_time: t,
        referring_visit_id: None,
        transition: "link".to_string(),
    }
}

// ─── History item dedup ───

#[test]
fn test_storing_same_batch_twice_is_idempotent() {
    let store = setup();
    let items = vec![
        item("https://example.com/a", 1_000),
        item("https://example.com/b", 2_000),
        item("https://example.com/c", 3_000),
    ];

    let first = store.store_history_items(&items).unwrap();
    assert_eq!(first.stored.len(), 3);
    assert_eq!(first.duplicates, 0);

    let second = store.store_history_items(&items).unwrap();
    assert_eq!(second.stored.len(), 0);
    assert_eq!(second.duplicates, 3);

    let range = TimeRange { start: 0, end: 10_000 };
    assert_eq!(store.history_in_range(range).unwrap().len(), 3);
}

#[test]
fn test_same_url_different_timestamps_both_stored() {
    let store = setup();
    let items = vec![
        item("https://example.com/a", 1_000),
        item("https://example.com/a", 5_000),
    ];

    let batch = store.store_history_items(&items).unwrap();
    assert_eq!(batch.stored.len(), 2);

    let rows = store.history_for_url("https://example.com/a").unwrap();
    assert_eq!(rows.len(), 2);
    // Most recent first.
    assert_eq!(rows[0].last_visit_time, 5_000);
}

#[test]
fn test_duplicate_within_single_batch_written_once() {
    let store = setup();
    let items = vec![
        item("https://example.com/a", 1_000),
        item("https://example.com/a", 1_000),
    ];

    let batch = store.store_history_items(&items).unwrap();
    assert_eq!(batch.stored.len(), 1);
    assert_eq!(batch.duplicates, 1);
}

#[test]
fn test_empty_batch_is_a_noop() {
    let store = setup();
    let batch = store.store_history_items(&[]).unwrap();
    assert_eq!(batch.stored.len(), 0);
    assert_eq!(batch.duplicates, 0);
}

// ─── Range queries ───

#[test]
fn test_history_range_is_half_open() {
    let store = setup();
    store
        .store_history_items(&[
            item("https://example.com/a", 1_000),
            item("https://example.com/b", 2_000),
            item("https://example.com/c", 3_000),
        ])
        .unwrap();

    let rows = store
        .history_in_range(TimeRange { start: 1_000, end: 3_000 })
        .unwrap();
    let urls: Vec<&str> = rows.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(urls, vec!["https://example.com/b", "https://example.com/a"]);
}

#[test]
fn test_history_for_domain_filters_by_hostname() {
    let store = setup();
    let mut other = item("https://other.org/x", 1_500);
    other.domain = "other.org".to_string();
    store
        .store_history_items(&[item("https://example.com/a", 1_000), other])
        .unwrap();

    let rows = store
        .history_for_domain("other.org", TimeRange { start: 0, end: 10_000 })
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].url, "https://other.org/x");
}

// ─── Visit details ───

#[test]
fn test_visits_stored_once_and_immutable() {
    let store = setup();
    let url = "https://example.com/a";
    let visits = vec![visit("v1", url, 100), visit("v2", url, 200)];

    assert_eq!(store.store_visit_details(url, &visits).unwrap(), 2);

    // Re-storing the same visit ids writes nothing and leaves the
    // original rows untouched.
    let mut altered = visits.clone();
    altered[0].transition = "typed".to_string();
    assert_eq!(store.store_visit_details(url, &altered).unwrap(), 0);

    let stored = store.visits_for_url(url).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].visit_id, "v1");
    assert_eq!(stored[0].transition, "link");
}

#[test]
fn test_visits_in_range_ordered_by_time() {
    let store = setup();
    store
        .store_visit_details("https://a.com", &[visit("v2", "https://a.com", 300)])
        .unwrap();
    store
        .store_visit_details("https://b.com", &[visit("v1", "https://b.com", 100)])
        .unwrap();

    let rows = store
        .visits_in_range(TimeRange { start: 0, end: 1_000 })
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].visit_id, "v1");
    assert_eq!(rows[1].visit_id, "v2");
}

// ─── Category records ───

#[test]
fn test_category_record_overwritten_on_reclassification() {
    let store = setup();
    let url = "https://example.com/a";

    store
        .store_category(
            url,
            &[
                CategoryScore { label: "News".to_string(), score: 0.9 },
                CategoryScore { label: "Politics".to_string(), score: 0.6 },
            ],
            1_000,
        )
        .unwrap();

    store
        .store_category(
            url,
            &[CategoryScore { label: "Sports".to_string(), score: 0.8 }],
            2_000,
        )
        .unwrap();

    let record = store.category_for_url(url).unwrap().expect("record exists");
    assert_eq!(record.categories.len(), 1);
    assert_eq!(record.categories[0].label, "Sports");
    assert_eq!(record.last_visit_time, 2_000);
}

#[test]
fn test_category_for_unknown_url_is_none() {
    let store = setup();
    assert!(store.category_for_url("https://nowhere.com").unwrap().is_none());
}

#[test]
fn test_categories_in_range_preserves_ranking_order() {
    let store = setup();
    store
        .store_category(
            "https://example.com/a",
            &[
                CategoryScore { label: "Tech".to_string(), score: 0.95 },
                CategoryScore { label: "Science".to_string(), score: 0.7 },
            ],
            1_000,
        )
        .unwrap();

    let records = store
        .categories_in_range(TimeRange { start: 0, end: 2_000 })
        .unwrap();
    assert_eq!(records.len(), 1);
    let labels: Vec<&str> = records[0].categories.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Tech", "Science"]);
}

// ─── Maintenance ───

#[test]
fn test_prune_removes_rows_older_than_cutoff() {
    let store = setup();
    store
        .store_history_items(&[
            item("https://example.com/old", 1_000),
            item("https://example.com/new", 9_000),
        ])
        .unwrap();
    store
        .store_visit_details("https://example.com/old", &[visit("v1", "https://example.com/old", 1_000)])
        .unwrap();
    store
        .store_category("https://example.com/old", &[CategoryScore::uncategorized()], 1_000)
        .unwrap();

    let deleted = store.prune_older_than(5_000).unwrap();
    assert_eq!(deleted, 3);

    let remaining = store
        .history_in_range(TimeRange { start: 0, end: 10_000 })
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].url, "https://example.com/new");
}
