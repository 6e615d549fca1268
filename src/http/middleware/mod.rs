//! Request-scoped middleware.
//!
//! ```text
//! request → recovery → request_logger → recovery → handler
//! ```
//!
//! See [`crate::http::pipeline`] for why recovery appears on both sides.

pub mod recovery;
pub mod request_logger;

pub use recovery::{recovery, Aborted, RecoveryState, RECOVERED_MESSAGE};
pub use request_logger::request_logger;
