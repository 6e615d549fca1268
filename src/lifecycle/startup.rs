//! Startup orchestration.
//!
//! Order: load config → apply overrides → validate → install logging.
//! Logging comes last so a broken config is reported on stderr instead of
//! into a half-configured subscriber. Any failure is fatal.

use std::path::Path;

use thiserror::Error;

use crate::config::validation::describe_all;
use crate::config::{load_config, validate_config, AppConfig, ConfigError, ValidationError};
use crate::observability::logging::{init_logging, LogGuard, LoggingError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid configuration: {}", describe_all(.0))]
    Invalid(Vec<ValidationError>),

    #[error(transparent)]
    Logging(#[from] LoggingError),
}

/// Command-line overrides applied on top of the file (or default) config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
    pub no_stack: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(bind) = &self.bind_address {
            config.listener.bind_address = bind.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.no_stack {
            config.recovery.stack = false;
        }
    }
}

/// Resolve the effective configuration.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<AppConfig, StartupError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    overrides.apply(&mut config);
    validate_config(&config).map_err(StartupError::Invalid)?;
    Ok(config)
}

/// Resolve the configuration and install the global subscriber.
///
/// Keep the returned guard until the server has stopped.
pub fn prepare(
    path: Option<&Path>,
    overrides: &Overrides,
) -> Result<(AppConfig, LogGuard), StartupError> {
    let config = resolve_config(path, overrides)?;
    let guard = init_logging(&config.logging)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        level = %config.logging.level,
        stack = config.recovery.stack,
        "Configuration loaded"
    );

    Ok((config, guard))
}
