//! Analytics aggregation engine.
//!
//! Every operation is a pure, read-only query over a time-bounded slice of
//! persisted data (cutoff = now − N days), recomputed per request. Nothing
//! here is materialized or incremental; the store's indexes keep the range
//! reads cheap at browsing-history scale.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Timelike};

use crate::managers::history_store::{HistoryStore, HistoryStoreTrait};
use crate::services::domains;
use crate::types::analytics::{
    ActivityHistogram, CategoryPair, DomainRank, DomainUsage, LabelCount, PageVisits,
    SiteEngagement, TransitionPattern, TransitionSummary, TrendDay,
};
use crate::types::errors::StoreError;
use crate::types::history::{TimeRange, VisitDetail};

const WEEKDAY_NAMES: &[&str] = &[
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Trait defining the analytics query operations.
///
/// All methods take an explicit `now` (epoch ms) so callers and tests
/// control the window deterministically.
pub trait AnalyticsEngineTrait {
    fn top_domains(&self, now: i64, days: i64, limit: usize) -> Result<Vec<DomainUsage>, StoreError>;
    fn recency_ranking(&self, now: i64, days: i64, limit: usize) -> Result<Vec<DomainRank>, StoreError>;
    fn time_spent(&self, now: i64, days: i64) -> Result<Vec<SiteEngagement>, StoreError>;
    fn transition_patterns(&self, now: i64, days: i64) -> Result<TransitionSummary, StoreError>;
    fn category_cooccurrence(&self, now: i64, days: i64) -> Result<Vec<CategoryPair>, StoreError>;
    fn category_trends(&self, now: i64, days: i64) -> Result<Vec<TrendDay>, StoreError>;
    fn activity_histogram(&self, now: i64, days: i64) -> Result<ActivityHistogram, StoreError>;
    fn unique_site_count(&self, now: i64, days: i64) -> Result<usize, StoreError>;
    fn most_visited(&self, now: i64, days: i64, limit: usize) -> Result<Vec<PageVisits>, StoreError>;
}

/// Analytics engine reading from the history store.
pub struct AnalyticsEngine {
    store: Arc<HistoryStore>,
    session_gap_ms: i64,
}

impl AnalyticsEngine {
    /// Creates an engine with the given session-gap threshold in minutes
    /// (gaps at or below it count as continuous engagement).
    pub fn new(store: Arc<HistoryStore>, session_gap_minutes: i64) -> Self {
        Self {
            store,
            session_gap_ms: session_gap_minutes * 60_000,
        }
    }

    /// Formats a duration in milliseconds as "42s", "17m", or "2h 05m"
    /// depending on magnitude.
    pub fn format_duration(ms: i64) -> String {
        let secs = ms / 1000;
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m", secs / 60)
        } else {
            format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60)
        }
    }

    /// Walks a URL's time-sorted visits: gaps at or below the session
    /// threshold accumulate time, larger gaps open a new session.
    /// Returns (accumulated_ms, session_count); session_count is 0 for an
    /// empty visit list.
    fn walk_sessions(&self, visits: &[VisitDetail]) -> (i64, i64) {
        if visits.is_empty() {
            return (0, 0);
        }
        let mut total_ms = 0i64;
        let mut sessions = 1i64;
        for pair in visits.windows(2) {
            let gap = pair[1].visit_time - pair[0].visit_time;
            if gap <= self.session_gap_ms {
                total_ms += gap;
            } else {
                sessions += 1;
            }
        }
        (total_ms, sessions)
    }

    /// Groups visits in the window by URL, time-sorted within each group.
    fn visits_by_url(&self, range: TimeRange) -> Result<HashMap<String, Vec<VisitDetail>>, StoreError> {
        let visits = self.store.visits_in_range(range)?;
        let mut by_url: HashMap<String, Vec<VisitDetail>> = HashMap::new();
        for visit in visits {
            by_url.entry(visit.url.clone()).or_default().push(visit);
        }
        for group in by_url.values_mut() {
            group.sort_by_key(|v| v.visit_time);
        }
        Ok(by_url)
    }

    /// Registrable root domain for a stored item's hostname, falling back
    /// to parsing the URL when the domain column is empty.
    fn root_of(domain: &str, url: &str) -> Option<String> {
        if !domain.is_empty() {
            return Some(domains::registrable_domain(domain));
        }
        domains::hostname(url).map(|h| domains::registrable_domain(&h))
    }

    fn day_of(t: i64) -> Option<String> {
        DateTime::from_timestamp_millis(t).map(|dt| dt.format("%Y-%m-%d").to_string())
    }
}

impl AnalyticsEngineTrait for AnalyticsEngine {
    /// Ranks registrable domains by accumulated on-site time.
    ///
    /// Visit counts come from the stored history items; durations come from
    /// the per-URL session walk over visit details, summed into each URL's
    /// root domain.
    fn top_domains(&self, now: i64, days: i64, limit: usize) -> Result<Vec<DomainUsage>, StoreError> {
        let range = TimeRange::lookback_days(now, days);

        let mut visit_counts: HashMap<String, i64> = HashMap::new();
        for item in self.store.history_in_range(range)? {
            if let Some(root) = Self::root_of(&item.domain, &item.url) {
                *visit_counts.entry(root).or_insert(0) += item.visit_count;
            }
        }

        let mut durations: HashMap<String, i64> = HashMap::new();
        for (url, visits) in self.visits_by_url(range)? {
            let (total_ms, _) = self.walk_sessions(&visits);
            if let Some(root) = domains::hostname(&url).map(|h| domains::registrable_domain(&h)) {
                *durations.entry(root).or_insert(0) += total_ms;
            }
        }

        let mut rows: Vec<DomainUsage> = visit_counts
            .into_iter()
            .map(|(domain, visit_count)| {
                let total_time_ms = durations.get(&domain).copied().unwrap_or(0);
                DomainUsage {
                    time_label: Self::format_duration(total_time_ms),
                    domain,
                    visit_count,
                    total_time_ms,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_time_ms
                .cmp(&a.total_time_ms)
                .then(b.visit_count.cmp(&a.visit_count))
                .then(a.domain.cmp(&b.domain))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Scores each domain as `visit_count / (1 + days_since_last_visit)`,
    /// descending. Recently visited, frequently visited sites rise.
    fn recency_ranking(&self, now: i64, days: i64, limit: usize) -> Result<Vec<DomainRank>, StoreError> {
        let range = TimeRange::lookback_days(now, days);

        struct Acc {
            visit_count: i64,
            last_visit: i64,
        }
        let mut by_domain: HashMap<String, Acc> = HashMap::new();
        for item in self.store.history_in_range(range)? {
            let root = match Self::root_of(&item.domain, &item.url) {
                Some(r) => r,
                None => continue,
            };
            let acc = by_domain.entry(root).or_insert(Acc {
                visit_count: 0,
                last_visit: 0,
            });
            acc.visit_count += item.visit_count;
            acc.last_visit = acc.last_visit.max(item.last_visit_time);
        }

        let mut rows: Vec<DomainRank> = by_domain
            .into_iter()
            .map(|(domain, acc)| {
                let days_since = ((now - acc.last_visit) / 86_400_000).max(0);
                DomainRank {
                    domain,
                    visit_count: acc.visit_count,
                    days_since_last_visit: days_since,
                    score: acc.visit_count as f64 / (1.0 + days_since as f64),
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.visit_count.cmp(&a.visit_count))
                .then(a.domain.cmp(&b.domain))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    /// Reconstructs per-URL engagement from visit gaps.
    fn time_spent(&self, now: i64, days: i64) -> Result<Vec<SiteEngagement>, StoreError> {
        let range = TimeRange::lookback_days(now, days);

        let mut rows: Vec<SiteEngagement> = self
            .visits_by_url(range)?
            .into_iter()
            .map(|(url, visits)| {
                let (total_ms, sessions) = self.walk_sessions(&visits);
                let total_minutes = total_ms as f64 / 60_000.0;
                SiteEngagement {
                    url,
                    total_minutes,
                    visit_count: visits.len() as i64,
                    session_count: sessions,
                    avg_session_minutes: if sessions > 0 {
                        total_minutes / sessions as f64
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_minutes
                .partial_cmp(&a.total_minutes)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.visit_count.cmp(&a.visit_count))
                .then(a.url.cmp(&b.url))
        });
        Ok(rows)
    }

    /// Counts cross-site navigations between consecutive visits.
    ///
    /// Pairs on the same hostname, or whose hostnames share their first DNS
    /// label, are treated as same-site navigation and skipped.
    fn transition_patterns(&self, now: i64, days: i64) -> Result<TransitionSummary, StoreError> {
        let range = TimeRange::lookback_days(now, days);
        let visits = self.store.visits_in_range(range)?;

        let mut counts: HashMap<(String, String), i64> = HashMap::new();
        let mut total = 0i64;
        for pair in visits.windows(2) {
            let from_host = domains::hostname(&pair[0].url);
            let to_host = domains::hostname(&pair[1].url);
            let (from_host, to_host) = match (from_host, to_host) {
                (Some(f), Some(t)) => (f, t),
                _ => continue,
            };
            if from_host == to_host
                || domains::first_label(&from_host) == domains::first_label(&to_host)
            {
                continue;
            }
            *counts
                .entry((pair[0].url.clone(), pair[1].url.clone()))
                .or_insert(0) += 1;
            total += 1;
        }

        let unique_pairs = counts.len() as i64;
        let mut patterns: Vec<TransitionPattern> = counts
            .into_iter()
            .map(|((from_url, to_url), count)| TransitionPattern {
                from_url,
                to_url,
                count,
            })
            .collect();
        patterns.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.from_url.cmp(&b.from_url))
                .then(a.to_url.cmp(&b.to_url))
        });
        patterns.truncate(10);

        Ok(TransitionSummary {
            total_transitions: total,
            unique_pairs,
            top_pair: patterns.first().cloned(),
            top_patterns: patterns,
        })
    }

    /// Counts, for every classified record in the window, each unordered
    /// pair of distinct labels. Pair keys are canonicalized lexically, so
    /// label order in the source record never matters.
    fn category_cooccurrence(&self, now: i64, days: i64) -> Result<Vec<CategoryPair>, StoreError> {
        let range = TimeRange::lookback_days(now, days);

        let mut counts: BTreeMap<(String, String), i64> = BTreeMap::new();
        for record in self.store.categories_in_range(range)? {
            let mut labels: Vec<String> =
                record.categories.iter().map(|c| c.label.clone()).collect();
            labels.sort();
            labels.dedup();
            for i in 0..labels.len() {
                for j in (i + 1)..labels.len() {
                    *counts
                        .entry((labels[i].clone(), labels[j].clone()))
                        .or_insert(0) += 1;
                }
            }
        }

        let mut rows: Vec<CategoryPair> = counts
            .into_iter()
            .map(|((first, second), count)| CategoryPair {
                first,
                second,
                count,
            })
            .collect();
        rows.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then(a.first.cmp(&b.first))
                .then(a.second.cmp(&b.second))
        });
        Ok(rows)
    }

    /// Buckets classified records by calendar day (UTC) and tallies label
    /// frequency within each day.
    fn category_trends(&self, now: i64, days: i64) -> Result<Vec<TrendDay>, StoreError> {
        let range = TimeRange::lookback_days(now, days);

        let mut by_day: BTreeMap<String, HashMap<String, i64>> = BTreeMap::new();
        for record in self.store.categories_in_range(range)? {
            let day = match Self::day_of(record.last_visit_time) {
                Some(d) => d,
                None => continue,
            };
            let tally = by_day.entry(day).or_default();
            for category in &record.categories {
                *tally.entry(category.label.clone()).or_insert(0) += 1;
            }
        }

        Ok(by_day
            .into_iter()
            .map(|(date, tally)| {
                let mut labels: Vec<LabelCount> = tally
                    .into_iter()
                    .map(|(label, count)| LabelCount { label, count })
                    .collect();
                labels.sort_by(|a, b| b.count.cmp(&a.count).then(a.label.cmp(&b.label)));
                TrendDay { date, labels }
            })
            .collect())
    }

    /// Hour-of-day and day-of-week visit histograms.
    ///
    /// Hour buckets are divided by the number of distinct calendar days
    /// observed, yielding an average day's shape rather than a raw sum.
    fn activity_histogram(&self, now: i64, days: i64) -> Result<ActivityHistogram, StoreError> {
        let range = TimeRange::lookback_days(now, days);

        let mut hourly = [0i64; 24];
        let mut weekdays = [0i64; 7];
        let mut days_seen: HashSet<String> = HashSet::new();
        for visit in self.store.visits_in_range(range)? {
            let dt = match DateTime::from_timestamp_millis(visit.visit_time) {
                Some(dt) => dt,
                None => continue,
            };
            hourly[dt.hour() as usize] += 1;
            weekdays[dt.weekday().num_days_from_monday() as usize] += 1;
            days_seen.insert(dt.format("%Y-%m-%d").to_string());
        }

        let days_observed = days_seen.len() as i64;
        let divisor = days_observed.max(1) as f64;
        Ok(ActivityHistogram {
            hourly_average: hourly.iter().map(|&n| n as f64 / divisor).collect(),
            weekday_counts: WEEKDAY_NAMES
                .iter()
                .zip(weekdays.iter())
                .map(|(name, &count)| LabelCount {
                    label: name.to_string(),
                    count,
                })
                .collect(),
            days_observed,
        })
    }

    /// Number of distinct registrable domains observed in the window.
    fn unique_site_count(&self, now: i64, days: i64) -> Result<usize, StoreError> {
        let range = TimeRange::lookback_days(now, days);
        let mut roots: HashSet<String> = HashSet::new();
        for item in self.store.history_in_range(range)? {
            if let Some(root) = Self::root_of(&item.domain, &item.url) {
                roots.insert(root);
            }
        }
        Ok(roots.len())
    }

    /// Pages ranked by cumulative visit count.
    ///
    /// A URL may be stored once per visit timestamp; the latest row carries
    /// the provider's cumulative count, so rows are collapsed to the most
    /// recent one per URL rather than summed.
    fn most_visited(&self, now: i64, days: i64, limit: usize) -> Result<Vec<PageVisits>, StoreError> {
        let range = TimeRange::lookback_days(now, days);

        let mut latest: HashMap<String, PageVisits> = HashMap::new();
        for item in self.store.history_in_range(range)? {
            let entry = latest.entry(item.url.clone()).or_insert(PageVisits {
                url: item.url.clone(),
                title: item.title.clone(),
                visit_count: item.visit_count,
                last_visit_time: item.last_visit_time,
            });
            if item.last_visit_time > entry.last_visit_time {
                entry.title = item.title.clone();
                entry.visit_count = item.visit_count;
                entry.last_visit_time = item.last_visit_time;
            }
        }

        let mut rows: Vec<PageVisits> = latest.into_values().collect();
        rows.sort_by(|a, b| {
            b.visit_count
                .cmp(&a.visit_count)
                .then(b.last_visit_time.cmp(&a.last_visit_time))
                .then(a.url.cmp(&b.url))
        });
        rows.truncate(limit);
        Ok(rows)
    }
}
