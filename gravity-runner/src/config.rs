//! Pipeline configuration.
//!
//! Loaded once from TOML and handed to each component at construction.
//! Every section has defaults, so an empty file is a valid configuration.
//! The encryption key is never part of the file; see [`encryption_key_from_env`].

use gravity_core::data::{RetryPolicy, DEFAULT_BASE_URL};
use gravity_core::domain::CompetitionSeason;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the URL-safe base64 storage key.
pub const ENCRYPTION_KEY_VAR: &str = "GRAVITY_ENCRYPTION_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("GRAVITY_ENCRYPTION_KEY is not set")]
    MissingKey,
}

/// What to do when enrichment or loading fails for one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitFailurePolicy {
    /// Stop the whole run.
    #[default]
    AbortRun,
    /// Record the error and move on to the next unit.
    SkipUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Competition/season pairs to pull listings for.
    pub competitions: Vec<CompetitionSeason>,
    /// Upper bound on units queued per run.
    pub max_units: usize,
    /// Keep only listing entries played on the target date.
    pub filter_by_date: bool,
}

impl Default for PlanningConfig {
    /// FIFA World Cup 2022.
    fn default() -> Self {
        Self {
            competitions: vec![CompetitionSeason {
                competition_id: 43,
                season_id: 106,
            }],
            max_units: 3,
            filter_by_date: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/store"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub path: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs/audit.jsonl"),
        }
    }
}

/// Thresholds for the post-load quality check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Fewer events than this is flagged.
    pub min_events: usize,
    /// Largest tolerated gap between goals scored and accumulated xG, per side.
    pub xg_margin: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_events: 500,
            xg_margin: 4.0,
        }
    }
}

/// Complete, immutable run configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub retry: RetryPolicy,
    pub planning: PlanningConfig,
    pub storage: StorageConfig,
    pub audit: AuditConfig,
    pub quality: QualityConfig,
    pub on_unit_failure: UnitFailurePolicy,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.source.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                field: "source.base_url",
                reason: format!("must be https, got '{}'", self.source.base_url),
            });
        }
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "source.timeout_secs",
                reason: "must be > 0".into(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "retry.max_attempts",
                reason: "must be >= 1".into(),
            });
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigError::Invalid {
                field: "retry.max_delay_ms",
                reason: format!(
                    "{} is below base_delay_ms {}",
                    self.retry.max_delay_ms, self.retry.base_delay_ms
                ),
            });
        }
        if !self.quality.xg_margin.is_finite() || self.quality.xg_margin < 0.0 {
            return Err(ConfigError::Invalid {
                field: "quality.xg_margin",
                reason: "must be a finite value >= 0".into(),
            });
        }
        Ok(())
    }
}

/// Read the storage key from the environment.
pub fn encryption_key_from_env() -> Result<String, ConfigError> {
    match std::env::var(ENCRYPTION_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigError::MissingKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.quality.min_events, 500);
        assert_eq!(config.on_unit_failure, UnitFailurePolicy::AbortRun);
        assert_eq!(config.source.timeout(), Duration::from_secs(15));
    }

    #[test]
    fn parses_all_sections() {
        let toml = r#"
            on_unit_failure = "skip-unit"

            [source]
            base_url = "https://mirror.example.test/data"
            timeout_secs = 5

            [retry]
            max_attempts = 2
            base_delay_ms = 100
            max_delay_ms = 400

            [planning]
            competitions = [{ competition_id = 11, season_id = 90 }]
            max_units = 10
            filter_by_date = true

            [storage]
            data_dir = "/tmp/gravity"

            [quality]
            min_events = 100
            xg_margin = 2.5
        "#;
        let config = PipelineConfig::from_toml(toml).unwrap();
        assert_eq!(config.on_unit_failure, UnitFailurePolicy::SkipUnit);
        assert_eq!(config.source.timeout_secs, 5);
        assert_eq!(config.retry.max_attempts, 2);
        assert_eq!(config.planning.competitions[0].competition_id, 11);
        assert!(config.planning.filter_by_date);
        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/gravity"));
        assert_eq!(config.audit, AuditConfig::default());
        assert_eq!(config.quality.xg_margin, 2.5);
    }

    #[test]
    fn rejects_plain_http() {
        let err = PipelineConfig::from_toml("[source]\nbase_url = \"http://x.test\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "source.base_url", .. }));
    }

    #[test]
    fn rejects_zero_timeout_and_attempts() {
        assert!(PipelineConfig::from_toml("[source]\ntimeout_secs = 0").is_err());
        assert!(PipelineConfig::from_toml("[retry]\nmax_attempts = 0").is_err());
    }

    #[test]
    fn rejects_inverted_delays() {
        let err =
            PipelineConfig::from_toml("[retry]\nbase_delay_ms = 5000\nmax_delay_ms = 1000").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "retry.max_delay_ms", .. }));
    }

    #[test]
    fn rejects_unknown_policy() {
        assert!(matches!(
            PipelineConfig::from_toml("on_unit_failure = \"retry-forever\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
