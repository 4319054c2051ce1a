//! Logging setup
//!
//! The library only emits `tracing` events. Binaries and scripts that want
//! console output call [`init_logging`] once at startup; anything that already
//! installs its own subscriber can skip it.

use tracing_subscriber::EnvFilter;

use crate::error::InferenceError;
use crate::settings::Settings;

/// Output format of the console subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// `timestamp level target: message fields`
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Install a global fmt subscriber filtered by `settings.log_level`.
///
/// `RUST_LOG` takes precedence over the settings when set. Fails if the
/// filter does not parse or a global subscriber is already installed.
pub fn init_logging(settings: &Settings, format: LogFormat) -> Result<(), InferenceError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.log_level).map_err(|e| {
            InferenceError::ConfigurationError(format!(
                "invalid log level {:?}: {e}",
                settings.log_level
            ))
        })?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| InferenceError::ConfigurationError(format!("logging: {e}")))
}
