//! Configuration for motion-sense.

use crate::core::heart_rate::HeartRateConfig;
use crate::core::pipeline::GestureConfig;
use crate::core::tremor::TremorConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Windowing and feature columns for gesture classification
    pub gesture: GestureConfig,

    /// Cardiac band of the heart-rate estimator
    pub heart_rate: HeartRateConfig,

    /// Tremor band and thresholds
    pub tremor: TremorConfig,

    /// Directory for exported session reports
    pub export_path: PathBuf,

    /// Directory for persisted processing statistics
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motion-sense");

        Self {
            gesture: GestureConfig::default(),
            heart_rate: HeartRateConfig::default(),
            tremor: TremorConfig::default(),
            export_path: data_dir.join("reports"),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location, or defaults if absent.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        Ok(config)
    }

    /// Save configuration to an explicit file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("motion-sense")
            .join("config.json")
    }

    /// File holding cumulative processing statistics.
    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Create the export and data directories if they are missing.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.export_path)?;
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(serde_json::Error),

    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{Column, TrackedPoint};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gesture.window_length_secs, 0.1);
        assert_eq!(config.gesture.overlap_secs, 0.0);
        assert_eq!(config.gesture.columns, Column::HEAD_POSE.to_vec());
        assert_eq!(config.heart_rate.sampling_rate, 37.7);
        assert_eq!(config.heart_rate.filter_order, 2);
        assert_eq!(config.tremor.filter_order, 5);
        assert_eq!(config.tremor.source, TrackedPoint::LeftWrist);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"gesture": {"window_length_secs": 0.5, "columns": ["headPosition.y"]},
                "tremor": {"source": "right_wrist"}}"#,
        )
        .unwrap();

        assert_eq!(config.gesture.window_length_secs, 0.5);
        assert_eq!(config.gesture.overlap_secs, 0.0);
        assert_eq!(config.gesture.columns.len(), 1);
        assert_eq!(config.tremor.source, TrackedPoint::RightWrist);
        assert_eq!(config.tremor.high_cut, 8.0);
        assert_eq!(config.heart_rate, HeartRateConfig::default());
    }

    #[test]
    fn test_unknown_column_rejected() {
        let result: Result<Config, _> = serde_json::from_str(r#"{"gesture": {"columns": ["headPose.q"]}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("motion-sense-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");

        let mut config = Config::default();
        config.tremor.peak_ratio = 0.2;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_ensure_directories() {
        let root = std::env::temp_dir().join(format!("motion-sense-dirs-{}", uuid::Uuid::new_v4()));
        let config = Config {
            export_path: root.join("out").join("reports"),
            data_path: root.join("data"),
            ..Config::default()
        };

        config.ensure_directories().unwrap();
        assert!(config.export_path.is_dir());
        assert!(config.data_path.is_dir());
        // Existing directories are fine
        config.ensure_directories().unwrap();
        std::fs::remove_dir_all(root).ok();
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/motion-sense.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
