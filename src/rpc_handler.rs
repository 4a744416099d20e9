//! RPC method handler for the webtrail query surface.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches named query operations to the store and
//! analytics engine via the `App` struct, returning the response payload
//! and the row count for the caller's `stats` envelope.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};

use crate::app::App;
use crate::managers::history_store::HistoryStoreTrait;
use crate::services::analytics::AnalyticsEngineTrait;

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

fn days_param(params: &Value, default: i64) -> i64 {
    params
        .get("days")
        .and_then(|v| v.as_i64())
        .filter(|d| *d > 0)
        .unwrap_or(default)
}

fn limit_param(params: &Value, default: usize) -> usize {
    params
        .get("limit")
        .and_then(|v| v.as_u64())
        .filter(|l| *l > 0)
        .map(|l| l as usize)
        .unwrap_or(default)
}

/// Dispatches a named query operation.
///
/// Returns `Ok((data, rows))` on success or `Err(String)` with an error
/// message; the server layer wraps both into the
/// `{success, data, stats}` / `{success:false, error}` envelope.
pub fn handle_method(
    app: &Mutex<App>,
    method: &str,
    params: &Value,
) -> Result<(Value, usize), String> {
    let app = app.lock().map_err(|e| e.to_string())?;
    let now = now_ms();
    let default_days = app.config.lookback_days;
    let default_limit = app.config.top_limit;

    match method {
        "getHistory" => {
            let days = days_param(params, default_days);
            let range = crate::types::history::TimeRange::lookback_days(now, days);
            let items = app.store.history_in_range(range).map_err(|e| e.to_string())?;
            let rows = items.len();
            Ok((json!(items), rows))
        }
        "getVisits" => {
            let url = params
                .get("url")
                .and_then(|v| v.as_str())
                .ok_or("missing url")?;
            let visits = app.store.visits_for_url(url).map_err(|e| e.to_string())?;
            let rows = visits.len();
            Ok((json!(visits), rows))
        }
        "getMostVisited" => {
            let days = days_param(params, default_days);
            let limit = limit_param(params, default_limit);
            let pages = app
                .analytics
                .most_visited(now, days, limit)
                .map_err(|e| e.to_string())?;
            let rows = pages.len();
            Ok((json!(pages), rows))
        }
        "getTopVisitedDomains" => {
            let days = days_param(params, default_days);
            let limit = limit_param(params, default_limit);
            let domains = app
                .analytics
                .top_domains(now, days, limit)
                .map_err(|e| e.to_string())?;
            let rows = domains.len();
            Ok((json!(domains), rows))
        }
        "getRecencyRanking" => {
            let days = days_param(params, default_days);
            let limit = limit_param(params, default_limit);
            let ranks = app
                .analytics
                .recency_ranking(now, days, limit)
                .map_err(|e| e.to_string())?;
            let rows = ranks.len();
            Ok((json!(ranks), rows))
        }
        "getTimeSpent" => {
            let days = days_param(params, default_days);
            let engagement = app
                .analytics
                .time_spent(now, days)
                .map_err(|e| e.to_string())?;
            let rows = engagement.len();
            Ok((json!(engagement), rows))
        }
        "getTransitionPatterns" => {
            let days = days_param(params, default_days);
            let summary = app
                .analytics
                .transition_patterns(now, days)
                .map_err(|e| e.to_string())?;
            let rows = summary.top_patterns.len();
            Ok((json!(summary), rows))
        }
        "getCategoryTrends" => {
            let days = days_param(params, default_days);
            let trends = app
                .analytics
                .category_trends(now, days)
                .map_err(|e| e.to_string())?;
            let rows = trends.len();
            Ok((json!(trends), rows))
        }
        "getCategoryCooccurrence" => {
            let days = days_param(params, default_days);
            let pairs = app
                .analytics
                .category_cooccurrence(now, days)
                .map_err(|e| e.to_string())?;
            let rows = pairs.len();
            Ok((json!(pairs), rows))
        }
        "getActivityHistogram" => {
            let days = days_param(params, default_days);
            let histogram = app
                .analytics
                .activity_histogram(now, days)
                .map_err(|e| e.to_string())?;
            Ok((json!(histogram), 1))
        }
        "getUniqueSiteCount" => {
            let days = days_param(params, default_days);
            let count = app
                .analytics
                .unique_site_count(now, days)
                .map_err(|e| e.to_string())?;
            Ok((json!({ "count": count }), 1))
        }
        _ => Err(format!("unknown method: {}", method)),
    }
}
