//! Structured logging via `tracing`.
//!
//! Events go to stdout and, when `logging.dir` is set, to a daily
//! `generator_YYYYMMDD.log` file in that directory. The `DAILY_VIBES_LOG`
//! environment variable takes precedence over the configured level and accepts
//! full `EnvFilter` directives (`daily_vibes::pipeline=debug,info`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "DAILY_VIBES_LOG";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("invalid log filter {0:?}: {1}")]
    Filter(String, String),
    #[error("cannot open log file {}: {}", .0.display(), .1)]
    File(PathBuf, std::io::Error),
    #[error("logging already initialized: {0}")]
    Init(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error, off
    pub level: String,
    pub format: LogFormat,
    /// Directory for the daily log file; stdout only when absent.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            dir: None,
        }
    }
}

/// Path of today's log file inside `dir`.
pub fn daily_log_path(dir: &Path, today: chrono::NaiveDate) -> PathBuf {
    dir.join(format!("generator_{}.log", today.format("%Y%m%d")))
}

fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    let directives = std::env::var(LOG_ENV).unwrap_or_else(|_| config.level.clone());
    EnvFilter::try_new(&directives).map_err(|e| LoggingError::Filter(directives, e.to_string()))
}

fn open_log_file(dir: &Path) -> Result<std::fs::File, LoggingError> {
    let path = daily_log_path(dir, chrono::Utc::now().date_naive());
    std::fs::create_dir_all(dir).map_err(|e| LoggingError::File(path.clone(), e))?;
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| LoggingError::File(path, e))
}

/// Install the global subscriber. Call once, before any pipeline work.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = build_filter(config)?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let stdout = fmt::layer()
        .with_target(true)
        .with_timer(ChronoUtc::rfc_3339())
        .with_writer(std::io::stdout);
    layers.push(match config.format {
        LogFormat::Json => stdout.json().boxed(),
        LogFormat::Text => stdout.boxed(),
    });

    if let Some(dir) = &config.dir {
        let file = Mutex::new(open_log_file(dir)?);
        let file_layer = fmt::layer()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(false)
            .with_writer(file);
        layers.push(match config.format {
            LogFormat::Json => file_layer.json().boxed(),
            LogFormat::Text => file_layer.boxed(),
        });
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_log_path_uses_compact_date() {
        let day = chrono::NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        assert_eq!(
            daily_log_path(Path::new("logs"), day),
            PathBuf::from("logs/generator_20260307.log")
        );
    }

    #[test]
    fn default_config_is_info_text() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Text);
        assert!(config.dir.is_none());
    }

    #[test]
    fn open_log_file_creates_directory() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("nested/logs");
        open_log_file(&dir).unwrap();
        assert!(dir.is_dir());
    }
}
