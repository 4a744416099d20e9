//! Domain blocklist filter.
//!
//! Loads a remote rule list once per process (shared by all concurrent
//! callers), parses it into an immutable [`BlocklistSnapshot`], and answers
//! `is_blocked(url)` against it. Until a load has succeeded every check
//! returns blocked, so unfiltered traffic can never reach the store.
//!
//! Two rule formats are supported. Plain lists carry one hostname per line;
//! regex lists are detected by a comment line containing the token `regex`
//! within the first ten lines, and every non-comment line compiles to a
//! pattern matched against the full hostname.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::services::domains;
use crate::types::errors::BlocklistError;

/// Number of leading lines scanned for the regex-format header marker.
const FORMAT_SNIFF_LINES: usize = 10;

/// Source of blocklist rule text. Implemented over HTTP in production and
/// by in-memory fixtures in tests.
#[async_trait]
pub trait BlocklistSource: Send + Sync {
    async fn fetch(&self) -> Result<String, BlocklistError>;
}

/// Fetches the rule list from an HTTP(S) URL.
pub struct HttpBlocklistSource {
    url: String,
    client: reqwest::Client,
}

impl HttpBlocklistSource {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BlocklistSource for HttpBlocklistSource {
    async fn fetch(&self) -> Result<String, BlocklistError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| BlocklistError::FetchError(e.to_string()))?
            .error_for_status()
            .map_err(|e| BlocklistError::FetchError(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| BlocklistError::FetchError(e.to_string()))
    }
}

/// Parsed, immutable rule set. Built fully before being published, so
/// concurrent readers observe either the previous snapshot or this one,
/// never a partially filled set.
#[derive(Debug, Default)]
pub struct BlocklistSnapshot {
    domains: HashSet<String>,
    regexes: Vec<Regex>,
}

impl BlocklistSnapshot {
    /// Parses rule text in either supported format.
    ///
    /// # Errors
    /// Returns `ParseError` when the text yields no usable rules — an empty
    /// or comment-only body, or a regex list with no compilable pattern.
    /// Admitting such a snapshot would silently allow everything; the filter
    /// treats it as a failed load instead.
    pub fn parse(text: &str) -> Result<Self, BlocklistError> {
        let snapshot = if Self::is_regex_format(text) {
            Self::parse_regex_lines(text)
        } else {
            Self::parse_domain_lines(text)
        };
        if snapshot.domains.is_empty() && snapshot.regexes.is_empty() {
            return Err(BlocklistError::ParseError(
                "rule list contains no usable rules".to_string(),
            ));
        }
        Ok(snapshot)
    }

    fn is_regex_format(text: &str) -> bool {
        text.lines().take(FORMAT_SNIFF_LINES).any(|line| {
            let line = line.trim();
            (line.starts_with('#') || line.starts_with('!'))
                && line.to_ascii_lowercase().contains("regex")
        })
    }

    fn parse_domain_lines(text: &str) -> Self {
        let mut domains = HashSet::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with('!')
                || line.starts_with('/')
            {
                continue;
            }
            let mut host = line.to_ascii_lowercase();
            if let Some(stripped) = host.strip_prefix("*.") {
                host = stripped.to_string();
            }
            host = host.trim_start_matches('.').to_string();
            if host.is_empty() || domains::is_ipv4(&host) {
                continue;
            }
            domains.insert(host);
        }
        Self {
            domains,
            regexes: Vec::new(),
        }
    }

    fn parse_regex_lines(text: &str) -> Self {
        let mut regexes = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            match Regex::new(line) {
                Ok(re) => regexes.push(re),
                Err(e) => debug!(pattern = line, error = %e, "skipping invalid blocklist pattern"),
            }
        }
        Self {
            domains: HashSet::new(),
            regexes,
        }
    }

    /// Whether a hostname matches the rule set.
    ///
    /// Checks, in order: regex patterns, the exact hostname, the registrable
    /// root domain, then each intermediate parent suffix between the
    /// hostname and its root. The suffix walk is what catches lists that
    /// name an ad-serving subdomain rather than the leaf host or bare root.
    pub fn is_host_blocked(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();

        if self.regexes.iter().any(|re| re.is_match(&host)) {
            return true;
        }
        if self.domains.contains(&host) {
            return true;
        }

        let root = domains::registrable_domain(&host);
        if root != host && self.domains.contains(&root) {
            return true;
        }

        // Parent suffixes from the second label upward, stopping at the root
        // or a dot-free remainder.
        let mut rest = host.as_str();
        while let Some((_, suffix)) = rest.split_once('.') {
            if suffix == root || !suffix.contains('.') {
                break;
            }
            if self.domains.contains(suffix) {
                return true;
            }
            rest = suffix;
        }

        false
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    pub fn regex_count(&self) -> usize {
        self.regexes.len()
    }
}

/// Loaded-rule counts for the query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlocklistStats {
    pub domains: usize,
    pub regexes: usize,
}

/// Blocklist filter with a load-once snapshot guard.
///
/// The snapshot slot is held behind an async mutex across the load, so N
/// concurrent first-callers trigger exactly one fetch; the rest wait and
/// reuse the published snapshot. A failed fetch or parse leaves the slot
/// empty — the caller is answered fail-closed and the next check retries.
pub struct BlocklistFilter {
    source: Box<dyn BlocklistSource>,
    state: Mutex<Option<Arc<BlocklistSnapshot>>>,
}

impl BlocklistFilter {
    pub fn new(source: Box<dyn BlocklistSource>) -> Self {
        Self {
            source,
            state: Mutex::new(None),
        }
    }

    /// Filter backed by an HTTP rule-list source.
    pub fn over_http(url: &str) -> Self {
        Self::new(Box::new(HttpBlocklistSource::new(url)))
    }

    async fn snapshot(&self) -> Option<Arc<BlocklistSnapshot>> {
        let mut guard = self.state.lock().await;
        if let Some(snapshot) = guard.as_ref() {
            return Some(snapshot.clone());
        }
        match self.source.fetch().await {
            Ok(text) => match BlocklistSnapshot::parse(&text) {
                Ok(snapshot) => {
                    let snapshot = Arc::new(snapshot);
                    info!(
                        domains = snapshot.domain_count(),
                        regexes = snapshot.regex_count(),
                        "blocklist loaded"
                    );
                    *guard = Some(snapshot.clone());
                    Some(snapshot)
                }
                Err(e) => {
                    warn!(error = %e, "blocklist parse failed, failing closed");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "blocklist load failed, failing closed");
                None
            }
        }
    }

    /// Whether the URL should be kept out of the pipeline.
    ///
    /// Returns true when the hostname matches the loaded rules, when the
    /// URL has no extractable hostname, and when no rule list has been
    /// loaded yet (fail-closed).
    pub async fn is_blocked(&self, url: &str) -> bool {
        let snapshot = match self.snapshot().await {
            Some(s) => s,
            None => return true,
        };
        match domains::hostname(url) {
            Some(host) => snapshot.is_host_blocked(&host),
            None => true,
        }
    }

    /// Drops the current snapshot; the next check re-fetches the rule list.
    pub async fn reload(&self) {
        *self.state.lock().await = None;
    }

    /// Rule counts of the currently loaded snapshot, if any. Does not
    /// trigger a load.
    pub async fn stats(&self) -> Option<BlocklistStats> {
        self.state.lock().await.as_ref().map(|s| BlocklistStats {
            domains: s.domain_count(),
            regexes: s.regex_count(),
        })
    }
}
