use serde::{Deserialize, Serialize};

/// Aggregated usage for one registrable domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainUsage {
    pub domain: String,
    pub visit_count: i64,
    /// Accumulated on-site time in milliseconds.
    pub total_time_ms: i64,
    /// Human-readable duration ("45s", "12m", "2h 05m").
    pub time_label: String,
}

/// Recency/frequency ranking entry for one domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainRank {
    pub domain: String,
    pub visit_count: i64,
    pub days_since_last_visit: i64,
    /// visit_count / (1 + days_since_last_visit)
    pub score: f64,
}

/// Per-URL engagement derived from session reconstruction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteEngagement {
    pub url: String,
    pub total_minutes: f64,
    pub visit_count: i64,
    pub session_count: i64,
    pub avg_session_minutes: f64,
}

/// One cross-site navigation pair with its observed count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionPattern {
    pub from_url: String,
    pub to_url: String,
    pub count: i64,
}

/// Transition analysis output: top pairs plus summary totals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionSummary {
    pub total_transitions: i64,
    pub unique_pairs: i64,
    pub top_pair: Option<TransitionPattern>,
    /// At most the ten most frequent pairs, descending.
    pub top_patterns: Vec<TransitionPattern>,
}

/// Frequency of one category label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Label frequencies for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendDay {
    /// "YYYY-MM-DD" (UTC).
    pub date: String,
    /// Sorted descending by count.
    pub labels: Vec<LabelCount>,
}

/// Co-occurrence count for an unordered label pair (a < b lexically).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryPair {
    pub first: String,
    pub second: String,
    pub count: i64,
}

/// Visit-time histograms over the query window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityHistogram {
    /// Average visits per hour of day, normalized by distinct days observed.
    pub hourly_average: Vec<f64>,
    /// Raw visit counts keyed by weekday name, Monday first.
    pub weekday_counts: Vec<LabelCount>,
    pub days_observed: i64,
}

/// Visit totals for one page, backing the most-visited query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageVisits {
    pub url: String,
    pub title: String,
    pub visit_count: i64,
    pub last_visit_time: i64,
}
