mod config;
mod error;

pub use config::{APP_NAME, SchedulerConfig, SchedulerConfigExt};
pub use error::ConfigError;
