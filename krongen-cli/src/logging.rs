//! Logging initialisation for the krongen CLI.
//!
//! Installs a global `tracing` subscriber writing to `stderr`, so edge lists
//! streamed to `stdout` stay intact, and bridges the `log` facade.

use std::{env, ffi::OsString, sync::OnceLock};

use thiserror::Error;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

const LOG_FORMAT_ENV: &str = "KRONGEN_LOG_FORMAT";
const VERBOSE_ENV: &str = "VERBOSE";
const DEFAULT_DIRECTIVE: &str = "info";

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Errors raised while initialising structured logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// Environment variable contained invalid UTF-8 data.
    #[error("environment variable `{name}` contained invalid UTF-8")]
    InvalidUnicode {
        /// Name of the offending environment variable.
        name: &'static str,
    },
    /// Unsupported log format requested via `KRONGEN_LOG_FORMAT`.
    #[error("unsupported log format `{provided}`; expected `human` or `json`")]
    UnsupportedFormat {
        /// Raw value supplied by the user.
        provided: String,
    },
    /// `VERBOSE` was not a small unsigned integer.
    #[error("unsupported verbosity `{provided}`; expected an integer from 0 to 255")]
    InvalidVerbosity {
        /// Raw value supplied by the user.
        provided: String,
    },
    /// Failed to install the global tracing subscriber.
    #[error("failed to install tracing subscriber: {source}")]
    InstallFailed {
        /// Error raised by `tracing_subscriber`.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
}

/// Install global structured logging if it has not already been configured.
///
/// `verbosity` (from `--verbose`) takes precedence over the `VERBOSE`
/// environment variable; level 0 logs warnings, 1 info, 2 debug, and 3 or more
/// trace. Without either, `RUST_LOG` applies and defaults to `info`. Setting
/// `KRONGEN_LOG_FORMAT=json` switches to JSON output.
///
/// # Errors
/// Returns [`LoggingError`] if an environment variable is malformed or the
/// subscriber cannot be installed.
pub fn init_logging(verbosity: Option<u8>) -> Result<(), LoggingError> {
    if INITIALISED.get().is_some() {
        return Ok(());
    }

    match install_subscriber(verbosity) {
        Ok(()) => {}
        Err(LoggingError::InstallFailed { source }) => report_existing_subscriber(&source),
        Err(err) => return Err(err),
    }
    let _ = INITIALISED.set(());
    Ok(())
}

#[expect(
    clippy::print_stderr,
    reason = "Another subscriber owns the global slot, so tracing cannot report this"
)]
fn report_existing_subscriber(source: &tracing_subscriber::util::TryInitError) {
    eprintln!("structured logging already configured elsewhere: {source}");
}

fn install_subscriber(verbosity: Option<u8>) -> Result<(), LoggingError> {
    let use_json = match read_env(LOG_FORMAT_ENV)? {
        Some(raw) => parse_log_format(&raw)?,
        None => false,
    };
    let verbosity = match verbosity {
        Some(level) => Some(level),
        None => read_env(VERBOSE_ENV)?
            .as_deref()
            .map(parse_verbosity)
            .transpose()?,
    };

    let env_filter = match verbosity {
        Some(level) => EnvFilter::new(level_directive(level)),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let fmt_layer = if use_json {
        fmt_layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .boxed()
    } else {
        fmt_layer.boxed()
    };

    // Another logger may already own the `log` slot; keep it.
    let _ = LogTracer::init();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|source| LoggingError::InstallFailed { source })
}

fn read_env(name: &'static str) -> Result<Option<String>, LoggingError> {
    env::var_os(name)
        .map(OsString::into_string)
        .transpose()
        .map_err(|_| LoggingError::InvalidUnicode { name })
}

fn parse_log_format(raw: &str) -> Result<bool, LoggingError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "human" => Ok(false),
        "json" => Ok(true),
        other => Err(LoggingError::UnsupportedFormat {
            provided: other.to_owned(),
        }),
    }
}

fn parse_verbosity(raw: &str) -> Result<u8, LoggingError> {
    raw.trim()
        .parse()
        .map_err(|_| LoggingError::InvalidVerbosity {
            provided: raw.to_owned(),
        })
}

const fn level_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
