//! App core for webtrail.
//!
//! Central struct holding the store and analytics engine behind the query
//! surface, plus the loaded pipeline configuration.
//!
//! The ingestion side (blocklist filter, classification gateway, ingestion
//! coordinator) is constructed separately by the embedding process, which
//! supplies the history-provider and classification-service handles; the
//! query surface only needs read access.

use std::sync::Arc;

use crate::database::connection::Database;
use crate::managers::history_store::HistoryStore;
use crate::services::analytics::AnalyticsEngine;
use crate::services::config::{ConfigEngine, ConfigEngineTrait, PipelineConfig};

/// Central application struct for the query surface.
pub struct App {
    pub db: Arc<Database>,
    pub store: Arc<HistoryStore>,
    pub analytics: AnalyticsEngine,
    pub config: PipelineConfig,
}

impl App {
    /// Creates a new App: opens the database, loads the config file (or
    /// defaults), and wires the store and analytics engine.
    pub fn new(db_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let db = Arc::new(Database::open(db_path)?);

        let mut config_engine = ConfigEngine::new(None);
        let config = config_engine
            .load()
            .map_err(|e| format!("Config load failed: {}", e))?;

        let store = Arc::new(HistoryStore::new(db.clone()));
        let analytics = AnalyticsEngine::new(store.clone(), config.session_gap_minutes);

        Ok(Self {
            db,
            store,
            analytics,
            config,
        })
    }
}
