//! Logging setup
//!
//! Installs a `tracing-subscriber` fmt subscriber. `RUST_LOG`, when set,
//! takes precedence over the configured level.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::error::{MongoCurryError, Result};

/// Build the filter for `config`, honouring `RUST_LOG` first
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
}

/// Initialize the global subscriber
///
/// Fails if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config))
        .with_target(false);

    let installed = if config.timestamps {
        subscriber.try_init()
    } else {
        subscriber.without_time().try_init()
    };

    installed.map_err(|e| MongoCurryError::Generic(format!("Failed to initialize logging: {e}")))
}
