//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request middleware
//!     → sink.rs (LogRecord → LogSink)
//!     → TracingSink forwards to tracing
//!     → logging.rs subscriber (console + rolling file)
//! ```
//!
//! # Design Decisions
//! - Middleware depends on the `LogSink` trait, never on a global logger
//! - The subscriber is installed once at startup and flushed on shutdown

pub mod logging;
pub mod sink;

pub use logging::{init_logging, LogGuard, LoggingError};
pub use sink::{
    Channel, FieldValue, LogRecord, LogSink, MemorySink, Severity, SharedSink, TracingSink,
};
