// src/config.rs - Tunable settings for a gesture session
use crate::classifier::ClassifierThresholds;
use crate::dispatch::DispatchConfig;
use crate::oracle::OracleConfig;
use crate::trajectory::TrackerConfig;
use crate::voting::VoteConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Every section falls back to its defaults when omitted from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub classifier: ClassifierThresholds,
    pub tracker: TrackerConfig,
    pub oracle: OracleConfig,
    pub voting: VoteConfig,
    pub dispatch: DispatchConfig,
    /// Where event logs are written; defaults to `Documents/GestureControl`.
    pub output_directory: Option<PathBuf>,
}

impl GestureConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voting.confirm_frames == 0 {
            return Err(ConfigError::Invalid("voting.confirm_frames must be at least 1".into()));
        }
        if self.tracker.jerk_threshold_px <= 0 {
            return Err(ConfigError::Invalid("tracker.jerk_threshold_px must be positive".into()));
        }
        if self.tracker.exit_radius_px <= 0.0 {
            return Err(ConfigError::Invalid("tracker.exit_radius_px must be positive".into()));
        }
        // The oracle would silently refuse paths the tracker is willing to submit
        if self.tracker.min_points < self.oracle.min_points {
            return Err(ConfigError::Invalid(format!(
                "tracker.min_points ({}) is below oracle.min_points ({})",
                self.tracker.min_points, self.oracle.min_points
            )));
        }
        if self.dispatch.queue_capacity == 0 {
            return Err(ConfigError::Invalid("dispatch.queue_capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn output_directory(&self) -> PathBuf {
        self.output_directory.clone().unwrap_or_else(|| {
            directories::UserDirs::new()
                .and_then(|dirs| dirs.document_dir().map(|p| p.join("GestureControl")))
                .unwrap_or_else(|| PathBuf::from("./output"))
        })
    }
}
