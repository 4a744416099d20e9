//! Ingestion coordinator.
//!
//! Drives the pipeline: pull a batch of raw visit events from the history
//! provider, drop blocklisted entries, deduplicate and persist the rest,
//! then fetch the visit sequence and classify each newly stored item.
//! Per-item failures (visit fetch, classification) are logged and skipped;
//! only provider and batch-write failures abort a pass. Re-running a pass
//! over an overlapping window is safe — the store's dedup key makes it a
//! no-op for already-seen events.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::managers::history_store::{HistoryStore, HistoryStoreTrait};
use crate::services::blocklist::BlocklistFilter;
use crate::services::classifier::ClassificationGateway;
use crate::services::domains;
use crate::types::errors::{IngestError, ProviderError};
use crate::types::history::{HistoryItem, TimeRange, VisitDetail};

/// Source of raw browsing-history events.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Raw history events within a time range.
    async fn search(&self, range: TimeRange) -> Result<Vec<HistoryItem>, ProviderError>;
    /// The individual visit sequence for one URL.
    async fn get_visits(&self, url: &str) -> Result<Vec<VisitDetail>, ProviderError>;
}

/// Summary of one ingestion pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Correlation id, also attached to the pass's log records.
    pub batch_id: Uuid,
    pub fetched: usize,
    pub blocked: usize,
    pub duplicates: usize,
    pub stored: usize,
    pub classified: usize,
    /// Items whose visit fetch or classification failed and were skipped.
    pub failed: usize,
}

/// Coordinator wiring the provider, filter, store, and gateway together.
pub struct IngestionCoordinator {
    provider: Box<dyn HistoryProvider>,
    filter: Arc<BlocklistFilter>,
    store: Arc<HistoryStore>,
    gateway: ClassificationGateway,
}

impl IngestionCoordinator {
    pub fn new(
        provider: Box<dyn HistoryProvider>,
        filter: Arc<BlocklistFilter>,
        store: Arc<HistoryStore>,
        gateway: ClassificationGateway,
    ) -> Self {
        Self {
            provider,
            filter,
            store,
            gateway,
        }
    }

    /// Ingests the lookback window ending at `now` (epoch ms).
    pub async fn ingest_window(&self, now: i64, days: i64) -> Result<IngestReport, IngestError> {
        let range = TimeRange::lookback_days(now, days);
        let raw = self
            .provider
            .search(range)
            .await
            .map_err(|e| IngestError::ProviderError(e.to_string()))?;
        self.process_batch(raw).await
    }

    /// Processes a single live "visited" notification through the same
    /// filter → dedup → store → classify sequence as a scheduled pass.
    pub async fn handle_visited(&self, item: HistoryItem) -> Result<IngestReport, IngestError> {
        self.process_batch(vec![item]).await
    }

    async fn process_batch(&self, raw: Vec<HistoryItem>) -> Result<IngestReport, IngestError> {
        let batch_id = Uuid::new_v4();
        let fetched = raw.len();

        let mut kept = Vec::new();
        let mut blocked = 0usize;
        for mut item in raw {
            if self.filter.is_blocked(&item.url).await {
                blocked += 1;
                continue;
            }
            if item.domain.is_empty() {
                if let Some(host) = domains::hostname(&item.url) {
                    item.domain = host;
                }
            }
            kept.push(item);
        }

        let batch = self
            .store
            .store_history_items(&kept)
            .map_err(|e| IngestError::StoreError(e.to_string()))?;

        let mut classified = 0usize;
        let mut failed = 0usize;
        for item in &batch.stored {
            match self.provider.get_visits(&item.url).await {
                Ok(visits) => {
                    if let Err(e) = self.store.store_visit_details(&item.url, &visits) {
                        warn!(batch = %batch_id, url = %item.url, error = %e, "storing visits failed, skipping item");
                        failed += 1;
                        continue;
                    }
                }
                Err(e) => {
                    warn!(batch = %batch_id, url = %item.url, error = %e, "visit fetch failed, skipping item");
                    failed += 1;
                    continue;
                }
            }

            match self
                .gateway
                .classify(&item.url, &item.title, item.last_visit_time)
                .await
            {
                Ok(_) => classified += 1,
                Err(e) => {
                    warn!(batch = %batch_id, url = %item.url, error = %e, "classification failed, skipping item");
                    failed += 1;
                }
            }
        }

        let report = IngestReport {
            batch_id,
            fetched,
            blocked,
            duplicates: batch.duplicates,
            stored: batch.stored.len(),
            classified,
            failed,
        };
        info!(
            batch = %batch_id,
            fetched = report.fetched,
            blocked = report.blocked,
            duplicates = report.duplicates,
            stored = report.stored,
            classified = report.classified,
            failed = report.failed,
            "ingestion pass complete"
        );
        Ok(report)
    }
}
