//! Structured logging for the `grove` binary.
//!
//! Installs a global `tracing` registry that writes to `stderr`, filtered by
//! `RUST_LOG`, and forwards records from the `log` facade.

use std::{env, sync::OnceLock};

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Environment variable selecting `human` or `json` output.
pub const LOG_FORMAT_ENV: &str = "GROVE_LOG_FORMAT";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Output format of the installed subscriber.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogFormat {
    /// Multi-line text meant for terminals.
    #[default]
    Human,
    /// One JSON object per event, including the span list.
    Json,
}

impl LogFormat {
    /// Parses a format name, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    /// Returns [`LoggingError::UnsupportedFormat`] for anything other than
    /// `human` or `json`.
    pub fn parse(raw: &str) -> Result<Self, LoggingError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(LoggingError::UnsupportedFormat {
                provided: other.to_owned(),
            }),
        }
    }

    fn from_env() -> Result<Self, LoggingError> {
        match env::var(LOG_FORMAT_ENV) {
            Ok(raw) => Self::parse(&raw),
            Err(env::VarError::NotPresent) => Ok(Self::default()),
            Err(source @ env::VarError::NotUnicode(_)) => Err(LoggingError::InvalidUnicode {
                name: LOG_FORMAT_ENV,
                source,
            }),
        }
    }
}

/// Errors raised while installing structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// An environment variable held invalid UTF-8.
    #[error("environment variable `{name}` contained invalid UTF-8: {source}")]
    InvalidUnicode {
        /// Offending variable.
        name: &'static str,
        /// Underlying failure.
        #[source]
        source: env::VarError,
    },
    /// `GROVE_LOG_FORMAT` named an unknown format.
    #[error("unsupported log format `{provided}`; expected `human` or `json`")]
    UnsupportedFormat {
        /// Value supplied by the user.
        provided: String,
    },
}

/// Installs the global subscriber once; later calls are no-ops.
///
/// When another subscriber already owns the global slot the existing one is
/// kept.
///
/// # Errors
/// Returns [`LoggingError`] if `GROVE_LOG_FORMAT` is malformed.
pub fn init_logging() -> Result<(), LoggingError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let format = LogFormat::from_env()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let layer = match format {
        LogFormat::Human => layer.boxed(),
        LogFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed(),
    };

    // Either slot may already be taken by an embedding application.
    let _ = LogTracer::init();
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
    let _ = INSTALLED.set(());
    Ok(())
}
