//! Logging setup for hosts embedding the bridge
//!
//! The bridge only emits `tracing` events under the `bluebridge` and
//! `bridge_registry` targets. Hosts without a subscriber of their own can
//! install one here; the default filter leaves every other target alone.

use std::str::FromStr;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter directives override, e.g. `bluebridge=trace,bridge_registry=debug`
pub const LOG_FILTER_ENV: &str = "BLUEBRIDGE_LOG";
/// Output format selector read by [`init_logging_from_env`]
pub const LOG_FORMAT_ENV: &str = "BLUEBRIDGE_LOG_FORMAT";

/// How bridge events are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber; the host decides where events go
    Silent,
    /// Compact single-line stderr output
    Development,
    /// Bridge targets at debug level with source locations
    Debug,
    /// One JSON object per event, for hosts that ship logs elsewhere
    Json,
}

impl LoggingMode {
    /// Directives used when neither `BLUEBRIDGE_LOG` nor `RUST_LOG` is set.
    pub fn default_directives(self) -> &'static str {
        match self {
            LoggingMode::Debug => "bluebridge=debug,bridge_registry=debug",
            _ => "bluebridge=info,bridge_registry=info",
        }
    }
}

impl FromStr for LoggingMode {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "silent" | "off" => Ok(LoggingMode::Silent),
            "development" | "compact" => Ok(LoggingMode::Development),
            "debug" => Ok(LoggingMode::Debug),
            "json" => Ok(LoggingMode::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Unknown log format '{0}'")]
    UnknownFormat(String),

    #[error("Invalid log filter '{directives}': {reason}")]
    InvalidFilter { directives: String, reason: String },

    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Install a global subscriber for `mode`.
///
/// The filter comes from `BLUEBRIDGE_LOG`, then `RUST_LOG`, then
/// [`LoggingMode::default_directives`].
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    if mode == LoggingMode::Silent {
        return Ok(());
    }

    let directives = filter_directives(mode, |key| std::env::var(key).ok());
    let subscriber = Registry::default().with(build_filter(&directives)?);

    let result = match mode {
        LoggingMode::Silent => return Ok(()),
        LoggingMode::Development => subscriber
            .with(fmt::layer().with_target(false).compact())
            .try_init(),
        LoggingMode::Debug => subscriber
            .with(
                fmt::layer()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init(),
        LoggingMode::Json => subscriber
            .with(fmt::layer().json().flatten_event(true).with_current_span(false))
            .try_init(),
    };

    result.map_err(|e| LoggingError::TracingInit(e.to_string()))
}

/// Install a subscriber chosen by `BLUEBRIDGE_LOG_FORMAT`; unset means silent.
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var(LOG_FORMAT_ENV) {
        Ok(value) => value.parse()?,
        Err(_) => LoggingMode::Silent,
    };
    init_logging(mode)
}

/// Check if a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

fn filter_directives<F>(mode: LoggingMode, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    [LOG_FILTER_ENV, "RUST_LOG"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| mode.default_directives().to_string())
}

fn build_filter(directives: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directives).map_err(|e| LoggingError::InvalidFilter {
        directives: directives.to_string(),
        reason: e.to_string(),
    })
}
