//! Composition of the logging and recovery middleware around a router.
//!
//! ```text
//! recovery (outer)          catches faults raised by request_logger itself
//!   → request_logger        one access record per completed request
//!     → recovery (inner)    turns handler panics into 500 / aborted responses
//!       → router
//! ```
//!
//! The inner recovery layer returns an ordinary response, so the access
//! record for a recovered request still carries its final status and any
//! error annotation. A recovery layer that sees a normal response does
//! nothing, so stacking them never logs a fault twice.

use axum::{middleware, Router};

use crate::http::middleware::{recovery, request_logger, RecoveryState};
use crate::observability::sink::SharedSink;

/// Wrap `router` with access logging and panic recovery.
pub fn layered(router: Router, sink: SharedSink, stack: bool) -> Router {
    let state = RecoveryState::new(sink.clone(), stack);

    // Router::layer wraps what is already there, so the last call is outermost.
    router
        .layer(middleware::from_fn_with_state(state.clone(), recovery))
        .layer(middleware::from_fn_with_state(sink, request_logger))
        .layer(middleware::from_fn_with_state(state, recovery))
}

/// Only the recovery layer, for callers that log access elsewhere.
pub fn recovered(router: Router, sink: SharedSink, stack: bool) -> Router {
    router.layer(middleware::from_fn_with_state(
        RecoveryState::new(sink, stack),
        recovery,
    ))
}

/// Only the access logger.
pub fn logged(router: Router, sink: SharedSink) -> Router {
    router.layer(middleware::from_fn_with_state(sink, request_logger))
}
