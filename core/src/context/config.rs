//! Scheduler configuration
//!
//! This module re-exports the shared `SchedulerConfig` from hourglass-types
//! and provides platform defaults and persistence for it.

use std::path::PathBuf;

pub use hourglass_types::SchedulerConfig;

use super::ConfigError;
use crate::storage::default_store_dir;

/// Name used for the confy config file and data directories
pub const APP_NAME: &str = "hourglass";

/// Extension trait for SchedulerConfig persistence and validation
pub trait SchedulerConfigExt: Sized {
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;
    fn store_directory(&self) -> PathBuf;
    fn validate(&self) -> Result<(), ConfigError>;
}

impl SchedulerConfigExt for SchedulerConfig {
    /// Load the stored config, falling back to defaults on any error
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "using default configuration");
            Self::default()
        })
    }

    fn try_load() -> Result<Self, ConfigError> {
        let config: Self = confy::load(APP_NAME, "config")?;
        config.validate()?;
        Ok(config)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, "config", self).map_err(ConfigError::Save)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(APP_NAME, "config")?)
    }

    /// Configured snapshot directory, or the platform data directory
    fn store_directory(&self) -> PathBuf {
        if self.store_directory.trim().is_empty() {
            default_store_dir()
        } else {
            PathBuf::from(&self.store_directory)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.snapshot_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "snapshot_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "tick_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::Invalid {
                field: "time_scale",
                reason: format!("{} is not a non-negative number", self.time_scale),
            });
        }
        Ok(())
    }
}
