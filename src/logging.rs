//! Tracing subscriber setup
//!
//! - **stdout**: human-readable or JSON lines, per `LoggingConfig.json`
//! - **file**: optional JSON lines under `log_dir`, rotated daily, written
//!   through a non-blocking worker
//! - **level**: `RUST_LOG` when set, otherwise `LoggingConfig.level`

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub const LOG_FILE_PREFIX: &str = "fairplay-oracle.log";

/// Build the level filter, preferring `RUST_LOG`
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level: {}", config.level)),
    }
}

/// Install the global subscriber. Hold the returned guard for the lifetime of
/// the process when file logging is enabled, or buffered lines are lost.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = env_filter(config)?;

    let (json_layer, text_layer) = if config.json {
        (Some(fmt::layer().json().with_target(true)), None)
    } else {
        (None, Some(fmt::layer().with_target(true)))
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_thread_ids(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to set logging subscriber")?;

    tracing::info!(
        level = %config.level,
        json = config.json,
        log_dir = ?config.log_dir,
        "Logging initialized"
    );
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_malformed_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "fairplay_oracle=verbose".to_string(),
            ..LoggingConfig::default()
        };
        assert!(env_filter(&config).is_err());
        assert!(env_filter(&LoggingConfig::default()).is_ok());
    }
}
