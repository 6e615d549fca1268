//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! Returns every problem found, not just the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("logging.level '{0}' is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("logging.max_files must be greater than zero")]
    MaxFiles,

    #[error("logging.file_prefix must not be empty when file logging is enabled")]
    FilePrefix,

    #[error("logging has no output: console is off and file_dir is unset")]
    NoOutput,
}

/// Join errors into one comma-separated line.
pub fn describe_all(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let logging = &config.logging;
    if !LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::LogLevel(logging.level.clone()));
    }

    if logging.file_dir.is_some() {
        if logging.max_files == 0 {
            errors.push(ValidationError::MaxFiles);
        }
        if logging.file_prefix.trim().is_empty() {
            errors.push(ValidationError::FilePrefix);
        }
    } else if !logging.console {
        errors.push(ValidationError::NoOutput);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
