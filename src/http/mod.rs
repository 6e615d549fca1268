//! HTTP handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, graceful shutdown)
//!     → pipeline.rs (recovery + access log layering)
//!     → middleware/ (request_logger, recovery)
//!     → demo handlers
//! ```

pub mod fault;
pub mod middleware;
pub mod panic_hook;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use fault::{FaultClass, RecoveredFault};
pub use middleware::{Aborted, RecoveryState};
pub use response::{ErrorKind, RequestError, RequestErrors};
pub use server::{HttpServer, ServerError};
