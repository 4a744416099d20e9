//! Classification gateway.
//!
//! Front-end to the external topic-classification service: waits for the
//! engine to become ready (bounded poll), checks the user capability grant,
//! performs the one-time engine activation, then classifies page text and
//! persists the surviving category records.
//!
//! Activation state is session-scoped: a [`ClassifierSession`] is handed to
//! the gateway at construction, and once a call has activated the engine the
//! remaining calls in that session skip the setup protocol. Concurrent first
//! calls may both run it; activation is idempotent and last-write-wins on
//! the flag.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::managers::history_store::{HistoryStore, HistoryStoreTrait};
use crate::types::category::CategoryScore;
use crate::types::errors::ClassifyError;

/// Progress/telemetry event emitted by the service during activation
/// (e.g. model download progress). Forwarded to the registered observer,
/// never blocking or altering classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProgressEvent {
    pub stage: String,
    /// Completion fraction in [0, 1].
    pub completed: f64,
}

/// Observer callback for progress events.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Opaque engine activation parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub task: String,
    pub language: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            task: "topic-classification".to_string(),
            language: None,
        }
    }
}

/// External classification service interface.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    /// Whether the engine can accept an activation call right now.
    async fn is_ready(&self) -> bool;
    /// Asks the user to grant the classification capability.
    async fn request_capability(&self) -> bool;
    /// One-time engine activation; may report progress through `progress`.
    async fn activate(
        &self,
        config: &EngineConfig,
        progress: Option<ProgressSink>,
    ) -> Result<(), ClassifyError>;
    /// Classifies a text payload into ranked (label, score) pairs,
    /// highest confidence first.
    async fn run(&self, text: &str) -> Result<Vec<CategoryScore>, ClassifyError>;
}

/// Session-scoped gateway state.
///
/// Held explicitly rather than in ambient process-wide storage so tests
/// and embedders control session boundaries.
#[derive(Debug, Default)]
pub struct ClassifierSession {
    activated: bool,
    capability_granted: Option<bool>,
}

/// Tuning knobs for the gateway.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Minimum score a label must reach to be persisted.
    pub threshold: f64,
    /// Total readiness-poll budget before failing `EngineUnavailable`.
    pub availability_timeout: Duration,
    /// Delay between readiness probes.
    pub poll_interval: Duration,
    pub engine: EngineConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            availability_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(750),
            engine: EngineConfig::default(),
        }
    }
}

/// Gateway owning the service handle, the session state, and the store
/// writes for category records.
pub struct ClassificationGateway {
    service: Box<dyn ClassificationService>,
    store: Arc<HistoryStore>,
    config: ClassifierConfig,
    session: Mutex<ClassifierSession>,
    observer: Option<ProgressSink>,
}

impl ClassificationGateway {
    pub fn new(
        service: Box<dyn ClassificationService>,
        store: Arc<HistoryStore>,
        config: ClassifierConfig,
        session: ClassifierSession,
    ) -> Self {
        Self {
            service,
            store,
            config,
            session: Mutex::new(session),
            observer: None,
        }
    }

    /// Registers an observer for progress events from the service.
    pub fn set_progress_observer(&mut self, observer: ProgressSink) {
        self.observer = Some(observer);
    }

    /// Classifies `url` + `title` and persists the resulting category
    /// record for `url`.
    ///
    /// Labels scoring below the threshold are dropped; when nothing
    /// survives, a single uncategorized entry is stored so the record is
    /// never empty. The service's ranking order is preserved.
    ///
    /// # Errors
    /// `EngineUnavailable` when the readiness poll times out,
    /// `PermissionDenied` when the capability grant is refused (remembered
    /// for the rest of the session), `ServiceError` / `StoreError` for
    /// per-call failures.
    pub async fn classify(
        &self,
        url: &str,
        title: &str,
        last_visit_time: i64,
    ) -> Result<Vec<CategoryScore>, ClassifyError> {
        self.ensure_session().await?;

        let input = format!("{} {}", url, title);
        let ranked = self.service.run(&input).await?;

        let threshold = self.config.threshold;
        let surviving: Vec<CategoryScore> = ranked
            .into_iter()
            .filter(|c| c.score >= threshold)
            .collect();
        let categories = if surviving.is_empty() {
            debug!(url, "no label cleared threshold, storing uncategorized");
            vec![CategoryScore::uncategorized()]
        } else {
            surviving
        };

        self.store
            .store_category(url, &categories, last_visit_time)
            .map_err(|e| ClassifyError::StoreError(e.to_string()))?;
        Ok(categories)
    }

    /// Runs the session setup protocol once: readiness poll, capability
    /// grant, engine activation. Subsequent calls in the same session
    /// return immediately.
    async fn ensure_session(&self) -> Result<(), ClassifyError> {
        {
            let session = self.session.lock().await;
            if session.activated {
                return Ok(());
            }
            // A refused grant is terminal for the session; never re-prompt.
            if session.capability_granted == Some(false) {
                return Err(ClassifyError::PermissionDenied);
            }
        }

        let deadline = Instant::now() + self.config.availability_timeout;
        while !self.service.is_ready().await {
            if Instant::now() >= deadline {
                return Err(ClassifyError::EngineUnavailable(format!(
                    "engine not ready after {:?}",
                    self.config.availability_timeout
                )));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }

        if !self.service.request_capability().await {
            self.session.lock().await.capability_granted = Some(false);
            warn!("classification capability denied by user");
            return Err(ClassifyError::PermissionDenied);
        }

        self.service
            .activate(&self.config.engine, self.observer.clone())
            .await?;

        let mut session = self.session.lock().await;
        session.capability_granted = Some(true);
        session.activated = true;
        Ok(())
    }
}
