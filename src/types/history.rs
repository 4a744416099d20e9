use serde::{Deserialize, Serialize};

/// A page-level history event as delivered by the history provider.
///
/// The pair (url, last_visit_time) identifies an item; a URL may recur
/// with different visit timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryItem {
    pub url: String,
    pub title: String,
    /// Epoch milliseconds of the most recent visit.
    pub last_visit_time: i64,
    pub visit_count: i64,
    pub typed_count: i64,
    /// Hostname extracted at ingestion time; empty when the URL has no host.
    pub domain: String,
}

/// A single visit to a URL, immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisitDetail {
    /// Provider-owned opaque id.
    pub visit_id: String,
    pub url: String,
    /// Epoch milliseconds.
    pub visit_time: i64,
    pub referring_visit_id: Option<String>,
    /// Provider-defined transition kind ("link", "typed", "reload", ...).
    pub transition: String,
}

/// Half-open time range in epoch milliseconds, `start <= t < end`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    /// Range covering the last `days` days ending at `now` (epoch ms).
    pub fn lookback_days(now: i64, days: i64) -> Self {
        Self {
            start: now - days * 86_400_000,
            end: now,
        }
    }

    pub fn contains(&self, t: i64) -> bool {
        t >= self.start && t < self.end
    }
}
