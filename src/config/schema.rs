//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Logger construction: level, format, rolling file.
    pub logging: LoggingConfig,

    /// Panic recovery behaviour.
    pub recovery: RecoveryConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How often the log file rolls over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPeriod {
    Minutely,
    Hourly,
    Daily,
    Never,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    /// Emit JSON lines instead of the human-readable console format.
    pub json: bool,

    /// Also log to stdout.
    pub console: bool,

    /// Directory for log files. `None` disables file logging.
    pub file_dir: Option<String>,

    /// File name prefix inside `file_dir`.
    pub file_prefix: String,

    /// Rotation period for the log file.
    pub rotation: RotationPeriod,

    /// Number of rotated files to keep.
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            json: false,
            console: true,
            file_dir: Some("./log".to_string()),
            file_prefix: "log.txt".to_string(),
            rotation: RotationPeriod::Daily,
            max_files: 30,
        }
    }
}

/// Panic recovery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Attach a backtrace to recovered-panic records.
    pub stack: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { stack: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.rotation, RotationPeriod::Daily);
        assert_eq!(config.logging.max_files, 30);
        assert!(config.recovery.stack);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [logging]
            level = "info"
            rotation = "hourly"

            [recovery]
            stack = false
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.rotation, RotationPeriod::Hourly);
        assert_eq!(config.logging.file_prefix, "log.txt");
        assert!(!config.recovery.stack);
    }
}
