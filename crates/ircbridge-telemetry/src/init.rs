//! Subscriber installation for hook processes.
//!
//! # Design
//! - A hook is a short-lived process: one subscriber, installed once, writing to stderr
//!   (the agent copies hook stderr into the unit log; stdout belongs to hook tools).
//! - `RUST_LOG` wins over the configured level.
//! - The first build identifier recorded is the one every span reports.

use std::io;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{Result, TelemetryError};

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_ID: OnceCell<String> = OnceCell::new();

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn output_layer(format: LogFormat) -> OutputLayer {
    let layer = fmt::layer().with_writer(io::stderr).with_target(false);
    match format {
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
        LogFormat::Pretty => layer.with_ansi(false).compact().boxed(),
    }
}

/// Install the global subscriber for this hook process.
///
/// # Errors
///
/// Returns [`TelemetryError::SubscriberInstall`] if a global subscriber is already set.
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    BUILD_ID.get_or_init(|| config.build_id.to_string());
    tracing_subscriber::registry()
        .with(output_layer(config.format))
        .with(build_env_filter(config.level))
        .try_init()
        .map_err(|source| TelemetryError::SubscriberInstall { source })
}

/// Access the build identifier recorded during logging initialisation.
#[must_use]
pub fn build_id() -> &'static str {
    BUILD_ID
        .get()
        .map_or(env!("CARGO_PKG_VERSION"), String::as_str)
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Build identifier recorded in structured logs.
    pub build_id: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_id: build_id(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(TelemetryError::UnknownFormat {
                value: other.to_string(),
            }),
        }
    }
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
