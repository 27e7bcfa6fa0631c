//! Run configuration
//!
//! Read once when a run starts; the sequencer keeps its own copy, so edits
//! only take effect for the next run.

use crate::adb::BackendKind;
use crate::template_matching::MatchPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// ADB serial or `host:port` of the device
    pub device_id: String,
    /// Highest accepted match score (0.0 to 1.0, inclusive)
    pub threshold: f32,
    /// Captures after the first before a match gives up
    pub retry_attempts: u32,
    /// Inter-action delay, also used between match attempts
    pub click_delay_ms: u64,
    /// Inter-stage delay
    pub process_delay_ms: u64,
    /// Maximum number of rounds per run
    pub round_limit: u32,
    /// Directory holding template PNGs
    pub template_dir: PathBuf,
    pub backend: BackendKind,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            device_id: "127.0.0.1:16384".to_string(),
            threshold: 0.25,
            retry_attempts: 1,
            click_delay_ms: 500,
            process_delay_ms: 5_000,
            round_limit: 999,
            template_dir: PathBuf::from("./ui/"),
            backend: BackendKind::Shell,
        }
    }
}

impl RunConfig {
    /// Load from a YAML file; keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml_ng::from_str(contents)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Invalid {
                field: "threshold",
                reason: format!("{} is outside [0, 1]", self.threshold),
            });
        }
        if self.device_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "device_id",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }

    pub fn process_delay(&self) -> Duration {
        Duration::from_millis(self.process_delay_ms)
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy {
            threshold: self.threshold,
            retry_attempts: self.retry_attempts,
            retry_delay: self.click_delay(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();

        assert_eq!(config.device_id, "127.0.0.1:16384");
        assert_eq!(config.threshold, 0.25);
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.click_delay(), Duration::from_millis(500));
        assert_eq!(config.process_delay(), Duration::from_secs(5));
        assert_eq!(config.round_limit, 999);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RunConfig::from_yaml("threshold: 0.1\nround_limit: 3\nbackend: rust\n").unwrap();

        assert_eq!(config.threshold, 0.1);
        assert_eq!(config.round_limit, 3);
        assert_eq!(config.backend, BackendKind::Rust);
        assert_eq!(config.retry_attempts, 1);
        assert_eq!(config.device_id, "127.0.0.1:16384");
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = RunConfig {
            device_id: "emulator-5554".to_string(),
            click_delay_ms: 250,
            ..RunConfig::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert_eq!(RunConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_threshold_out_of_range() {
        for threshold in [-0.01, 1.5, f32::NAN] {
            let config = RunConfig {
                threshold,
                ..RunConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid {
                    field: "threshold",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_validate_accepts_threshold_bounds() {
        for threshold in [0.0, 1.0] {
            let config = RunConfig {
                threshold,
                ..RunConfig::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_match_policy_uses_click_delay_for_retries() {
        let policy = RunConfig::default().match_policy();
        assert_eq!(policy.threshold, 0.25);
        assert_eq!(policy.retry_attempts, 1);
        assert_eq!(policy.retry_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunConfig::load(&dir.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routine.yaml");
        std::fs::write(&path, "device_id: 192.168.1.20:5555\nretry_attempts: 3\n").unwrap();

        let config = RunConfig::load(&path).unwrap();
        assert_eq!(config.device_id, "192.168.1.20:5555");
        assert_eq!(config.retry_attempts, 3);
    }
}
