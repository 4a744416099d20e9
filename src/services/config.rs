// Webtrail pipeline configuration
// Manages pipeline settings: loading, saving, and resetting to defaults.
// Settings are stored as a JSON file next to the database.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::errors::ConfigError;

/// Tunable pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineConfig {
    /// Ingestion and analytics lookback window in days.
    pub lookback_days: i64,
    /// Maximum inter-visit gap still counted as continuous engagement.
    pub session_gap_minutes: i64,
    /// Minimum confidence a category label must reach to be persisted.
    pub classification_threshold: f64,
    /// Readiness-poll budget for the classification engine, in seconds.
    pub availability_timeout_secs: u64,
    /// Delay between readiness probes, in milliseconds.
    pub poll_interval_ms: u64,
    /// Rule-list source for the blocklist filter.
    pub blocklist_url: String,
    /// Default result count for ranked queries.
    pub top_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 7,
            session_gap_minutes: 30,
            classification_threshold: 0.5,
            availability_timeout_secs: 30,
            poll_interval_ms: 750,
            blocklist_url: "https://blocklistproject.github.io/Lists/ads.txt".to_string(),
            top_limit: 10,
        }
    }
}

/// Trait defining the config engine interface.
pub trait ConfigEngineTrait {
    fn load(&mut self) -> Result<PipelineConfig, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn get(&self) -> &PipelineConfig;
    fn reset(&mut self) -> Result<(), ConfigError>;
    fn get_config_path(&self) -> &str;
}

/// Config engine that persists settings as JSON on disk.
pub struct ConfigEngine {
    config_path: String,
    config: PipelineConfig,
}

impl ConfigEngine {
    /// Creates a new ConfigEngine.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise uses `webtrail.config.json` inside the data directory
    /// (`WEBTRAIL_DATA_DIR`, falling back to the working directory).
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => p,
            None => {
                let dir = std::env::var("WEBTRAIL_DATA_DIR").unwrap_or_else(|_| ".".to_string());
                Path::new(&dir)
                    .join("webtrail.config.json")
                    .to_string_lossy()
                    .to_string()
            }
        };

        Self {
            config_path,
            config: PipelineConfig::default(),
        }
    }
}

impl ConfigEngineTrait for ConfigEngine {
    /// Loads settings from the JSON config file.
    ///
    /// If the file does not exist, returns defaults. A malformed file
    /// surfaces a serialization error rather than silently resetting.
    fn load(&mut self) -> Result<PipelineConfig, ConfigError> {
        let path = Path::new(&self.config_path);

        if !path.exists() {
            self.config = PipelineConfig::default();
            return Ok(self.config.clone());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;

        let config: PipelineConfig = serde_json::from_str(&content).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to parse config file: {}", e))
        })?;

        self.config = config;
        Ok(self.config.clone())
    }

    /// Saves the current settings to the JSON config file, creating parent
    /// directories as needed.
    fn save(&self) -> Result<(), ConfigError> {
        let path = Path::new(&self.config_path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ConfigError::IoError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let json = serde_json::to_string_pretty(&self.config).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, json)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get(&self) -> &PipelineConfig {
        &self.config
    }

    /// Restores defaults and writes them to disk.
    fn reset(&mut self) -> Result<(), ConfigError> {
        self.config = PipelineConfig::default();
        self.save()
    }

    fn get_config_path(&self) -> &str {
        &self.config_path
    }
}
