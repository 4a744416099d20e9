//! Unit tests for the pipeline configuration engine.

use tempfile::TempDir;
use webtrail::services::config::{ConfigEngine, ConfigEngineTrait, PipelineConfig};

fn temp_config_path(dir: &TempDir) -> String {
    dir.path()
        .join("webtrail.config.json")
        .to_string_lossy()
        .to_string()
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = ConfigEngine::new(Some(temp_config_path(&dir)));

    let config = engine.load().unwrap();
    assert_eq!(config, PipelineConfig::default());
    assert_eq!(config.lookback_days, 7);
    assert_eq!(config.session_gap_minutes, 30);
    assert_eq!(config.classification_threshold, 0.5);
    assert_eq!(config.availability_timeout_secs, 30);
}

#[test]
fn test_save_then_load_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = temp_config_path(&dir);

    let mut engine = ConfigEngine::new(Some(path.clone()));
    engine.load().unwrap();
    engine.save().unwrap();

    let mut other = ConfigEngine::new(Some(path));
    let loaded = other.load().unwrap();
    assert_eq!(loaded, PipelineConfig::default());
}

#[test]
fn test_modified_values_survive_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = temp_config_path(&dir);

    let custom = PipelineConfig {
        lookback_days: 30,
        session_gap_minutes: 15,
        classification_threshold: 0.75,
        ..PipelineConfig::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&custom).unwrap()).unwrap();

    let mut engine = ConfigEngine::new(Some(path));
    let loaded = engine.load().unwrap();
    assert_eq!(loaded.lookback_days, 30);
    assert_eq!(loaded.session_gap_minutes, 15);
    assert_eq!(loaded.classification_threshold, 0.75);
}

#[test]
fn test_malformed_file_surfaces_serialization_error() {
    let dir = TempDir::new().unwrap();
    let path = temp_config_path(&dir);
    std::fs::write(&path, "{ not json").unwrap();

    let mut engine = ConfigEngine::new(Some(path));
    let err = engine.load().unwrap_err();
    assert!(err.to_string().contains("Config serialization error"));
}

#[test]
fn test_reset_restores_defaults_on_disk() {
    let dir = TempDir::new().unwrap();
    let path = temp_config_path(&dir);

    let custom = PipelineConfig {
        lookback_days: 90,
        ..PipelineConfig::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&custom).unwrap()).unwrap();

    let mut engine = ConfigEngine::new(Some(path.clone()));
    assert_eq!(engine.load().unwrap().lookback_days, 90);

    engine.reset().unwrap();
    assert_eq!(engine.get().lookback_days, 7);

    let mut reread = ConfigEngine::new(Some(path));
    assert_eq!(reread.load().unwrap().lookback_days, 7);
}

#[test]
fn test_config_path_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = temp_config_path(&dir);
    let engine = ConfigEngine::new(Some(path.clone()));
    assert_eq!(engine.get_config_path(), path);
}
