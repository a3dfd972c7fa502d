//! Tracing subscriber initialisation
//!
//! Filter directives come from `INTELLIGENCE_LOG` (same syntax as
//! `RUST_LOG`), defaulting to `info`.
//!
//! ```rust,no_run
//! use intelligence_infra::logging::{init_tracing, LogFormat};
//!
//! init_tracing(LogFormat::from_env()).ok();
//! tracing::info!("SDK host started");
//! ```

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable holding the filter directives.
pub const LOG_FILTER_ENV: &str = "INTELLIGENCE_LOG";

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "INTELLIGENCE_LOG_FORMAT";

const DEFAULT_FILTER: &str = "info";

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Format named by `INTELLIGENCE_LOG_FORMAT`, or the default.
    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV).ok().and_then(|value| value.parse().ok()).unwrap_or_default()
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Subscriber installation failures
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log format '{0}'")]
    UnknownFormat(String),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global tracing subscriber.
///
/// # Errors
/// `AlreadyInitialized` when another subscriber is already set.
pub fn init_tracing(format: LogFormat) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = match format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init(),
    };

    installed.map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))
}
