//! Access logging and panic recovery for Axum services.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use observability::{LogRecord, LogSink, MemorySink, SharedSink, TracingSink};
