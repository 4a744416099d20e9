//! Unit tests for the RPC method handler: dispatch, parameter handling,
//! and the error path for unknown methods.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use webtrail::app::App;
use webtrail::database::Database;
use webtrail::managers::history_store::{HistoryStore, HistoryStoreTrait};
use webtrail::rpc_handler::handle_method;
use webtrail::services::analytics::AnalyticsEngine;
use webtrail::services::config::PipelineConfig;
use webtrail::types::history::{HistoryItem, VisitDetail};

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// App over an in-memory database, bypassing config-file loading.
fn setup() -> Mutex<App> {
    let db = Arc::new(Database::open_in_memory().expect("Failed to open in-memory database"));
    let store = Arc::new(HistoryStore::new(db.clone()));
    let config = PipelineConfig::default();
    let analytics = AnalyticsEngine::new(store.clone(), config.session_gap_minutes);
    Mutex::new(App {
        db,
        store,
        analytics,
        config,
    })
}

fn seed(app: &Mutex<App>) {
    let now = now_ms();
    let a = app.lock().unwrap();
    a.store
        .store_history_items(&[
            HistoryItem {
                url: "https://example.com/a".to_string(),
                title: "A".to_string(),
                last_visit_time: now - 60_000,
                visit_count: 5,
                typed_count: 1,
                domain: "example.com".to_string(),
            },
            HistoryItem {
                url: "https://other.org/b".to_string(),
                title: "B".to_string(),
                last_visit_time: now - 120_000,
                visit_count: 2,
                typed_count: 0,
                domain: "other.org".to_string(),
            },
        ])
        .unwrap();
    a.store
        .store_visit_details(
            "https://example.com/a",
            &[VisitDetail {
                visit_id: "v1".to_string(),
                url: "https://example.com/a".to_string(),
                visit_time: now - 60_000,
                referring_visit_id: None,
                transition: "link".to_string(),
            }],
        )
        .unwrap();
}

// ─── Query dispatch ───

#[test]
fn test_get_history_returns_rows_in_window() {
    let app = setup();
    seed(&app);

    let (data, rows) = handle_method(&app, "getHistory", &json!({"days": 7})).unwrap();
    assert_eq!(rows, 2);
    assert_eq!(data.as_array().unwrap().len(), 2);
}

#[test]
fn test_get_visits_requires_url_param() {
    let app = setup();
    seed(&app);

    let err = handle_method(&app, "getVisits", &json!({})).unwrap_err();
    assert_eq!(err, "missing url");

    let (data, rows) =
        handle_method(&app, "getVisits", &json!({"url": "https://example.com/a"})).unwrap();
    assert_eq!(rows, 1);
    assert_eq!(data[0]["visit_id"], "v1");
}

#[test]
fn test_get_most_visited_ranks_by_count() {
    let app = setup();
    seed(&app);

    let (data, rows) =
        handle_method(&app, "getMostVisited", &json!({"days": 7, "limit": 10})).unwrap();
    assert_eq!(rows, 2);
    assert_eq!(data[0]["url"], "https://example.com/a");
    assert_eq!(data[0]["visit_count"], 5);
}

#[test]
fn test_get_top_visited_domains_groups_by_root() {
    let app = setup();
    seed(&app);

    let (data, rows) =
        handle_method(&app, "getTopVisitedDomains", &json!({"days": 7, "limit": 1})).unwrap();
    assert_eq!(rows, 1);
    let first = &data[0];
    assert!(first["domain"].is_string());
    assert!(first["time_label"].is_string());
}

#[test]
fn test_analytics_extras_dispatch() {
    let app = setup();
    seed(&app);

    for method in [
        "getRecencyRanking",
        "getTimeSpent",
        "getTransitionPatterns",
        "getCategoryTrends",
        "getCategoryCooccurrence",
        "getActivityHistogram",
        "getUniqueSiteCount",
    ] {
        let result = handle_method(&app, method, &json!({"days": 7}));
        assert!(result.is_ok(), "{} should dispatch", method);
    }
}

#[test]
fn test_unique_site_count_payload() {
    let app = setup();
    seed(&app);

    let (data, _) = handle_method(&app, "getUniqueSiteCount", &json!({"days": 7})).unwrap();
    assert_eq!(data["count"], 2);
}

// ─── Error and default handling ───

#[test]
fn test_unknown_method_is_rejected() {
    let app = setup();
    let err = handle_method(&app, "dropAllTables", &json!({})).unwrap_err();
    assert!(err.starts_with("unknown method"));
}

#[test]
fn test_missing_params_fall_back_to_config_defaults() {
    let app = setup();
    seed(&app);

    // No days/limit given: the configured lookback and top-limit apply.
    let (_, rows) = handle_method(&app, "getHistory", &json!({})).unwrap();
    assert_eq!(rows, 2);

    let (_, rows) = handle_method(&app, "getMostVisited", &json!({})).unwrap();
    assert_eq!(rows, 2);
}

#[test]
fn test_non_positive_days_ignored() {
    let app = setup();
    seed(&app);

    let (_, rows) = handle_method(&app, "getHistory", &json!({"days": -3})).unwrap();
    assert_eq!(rows, 2);
}
