//! # kbagent-telemetry
//!
//! Process-wide `tracing` setup for the kbagent binaries.
//!
//! ```rust,ignore
//! kbagent_telemetry::init_telemetry(&TelemetryConfig::default())?;
//! tracing::info!(collection = "knowledgebase", "ready");
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither the config nor `RUST_LOG` names one.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("unknown log format '{0}', expected 'pretty' or 'json'")]
    UnknownFormat(String),

    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// An `EnvFilter` directive; `RUST_LOG`, then [`DEFAULT_FILTER`], when unset.
    pub filter: Option<String>,
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn new(format: LogFormat) -> Self {
        Self { filter: None, format }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// The directive that will be applied.
    pub fn effective_filter(&self) -> String {
        self.filter
            .clone()
            .or_else(|| std::env::var(EnvFilter::DEFAULT_ENV).ok())
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string())
    }

    fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        let filter = self.effective_filter();
        EnvFilter::try_new(&filter)
            .map_err(|e| TelemetryError::InvalidFilter { filter, message: e.to_string() })
    }
}

/// Install the global subscriber. Logs go to stderr.
///
/// # Errors
///
/// Fails on an invalid filter or when a global subscriber is already set.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry
            .with(subscriber_fmt::layer().with_writer(std::io::stderr).with_target(true))
            .try_init(),
        LogFormat::Json => registry
            .with(subscriber_fmt::layer().json().with_writer(std::io::stderr).with_current_span(true))
            .try_init(),
    };
    result.map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::debug!(format = %config.format, "telemetry initialised");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!("xml".parse::<LogFormat>(), Err(TelemetryError::UnknownFormat(f)) if f == "xml"));
    }

    #[test]
    fn explicit_filter_wins() {
        let config = TelemetryConfig::default().with_filter("kbagent=debug");
        assert_eq!(config.effective_filter(), "kbagent=debug");
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let config = TelemetryConfig::default().with_filter("kbagent=loud");
        assert!(matches!(init_telemetry(&config), Err(TelemetryError::InvalidFilter { .. })));
    }

    #[test]
    fn second_init_fails() {
        let config = TelemetryConfig::new(LogFormat::Json).with_filter("warn");
        let first = init_telemetry(&config);
        let second = init_telemetry(&config);
        assert!(first.is_ok() || matches!(first, Err(TelemetryError::Init(_))));
        assert!(matches!(second, Err(TelemetryError::Init(_))));
    }
}
