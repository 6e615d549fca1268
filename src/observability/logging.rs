//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the `tracing` subscriber once, before serving begins
//! - Console output and an optional rolling log file
//! - Flush buffered file output on shutdown via [`LogGuard`]
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level when set
//! - File output goes through a non-blocking worker thread
//! - Request records carry their own `caller` field, so the formatter
//!   does not add the file and line of the macro call site

use std::path::PathBuf;

use thiserror::Error;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{InitError, RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
};

use crate::config::{LoggingConfig, RotationPeriod};

/// Targets the configured level applies to when `RUST_LOG` is unset.
const LOG_TARGETS: [&str; 2] = ["request_recovery", "tower_http"];

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open rolling log file: {0}")]
    Appender(#[from] InitError),

    #[error("a global subscriber is already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Keeps the file writer thread alive.
///
/// Hold it for the lifetime of the process; dropping it flushes pending
/// lines to disk.
#[must_use = "dropping the guard stops the file writer"]
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

fn rotation(period: RotationPeriod) -> Rotation {
    match period {
        RotationPeriod::Minutely => Rotation::MINUTELY,
        RotationPeriod::Hourly => Rotation::HOURLY,
        RotationPeriod::Daily => Rotation::DAILY,
        RotationPeriod::Never => Rotation::NEVER,
    }
}

fn filter_directives(level: &str) -> String {
    let level = level.to_ascii_lowercase();
    LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber described by `config`.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard, LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config.level)));

    let mut layers = Vec::with_capacity(2);

    if config.console {
        let stdout_layer = tracing_subscriber::fmt::layer();

        let stdout_layer = if config.json {
            stdout_layer.json().flatten_event(true).boxed()
        } else {
            stdout_layer.boxed()
        };
        layers.push(stdout_layer);
    }

    let mut file_guard = None;

    if let Some(dir) = &config.file_dir {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir).map_err(|source| LoggingError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let appender = RollingFileAppender::builder()
            .rotation(rotation(config.rotation))
            .filename_prefix(&config.file_prefix)
            .max_log_files(config.max_files)
            .build(&dir)?;

        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        file_guard = Some(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking);

        let file_layer = if config.json {
            file_layer.json().flatten_event(true).boxed()
        } else {
            file_layer.boxed()
        };
        layers.push(file_layer);
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::debug!(
        level = %config.level,
        file_dir = ?config.file_dir,
        json = config.json,
        "Logging initialized"
    );

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}
