//! Panic recovery middleware.
//!
//! Runs the rest of the chain inside `catch_unwind`. A caught panic is
//! logged once, by the innermost recovery layer that sees it, and turned
//! into a response so the fault never reaches hyper.
//!
//! Each poll of the inner chain runs inside a [`RecoveryScope`], so the
//! panic hook records the backtrace at the panic site and keeps the panic
//! off stderr.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::pin;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures_util::{future::poll_fn, FutureExt};

use crate::http::fault::{FaultClass, RecoveredFault};
use crate::http::panic_hook::{self, RecoveryScope};
use crate::http::request::RequestSnapshot;
use crate::http::response::{ErrorKind, RequestErrors};
use crate::observability::sink::{Channel, LogRecord, Severity, SharedSink};

pub const RECOVERED_MESSAGE: &str = "recovered from panic";

/// State for [`recovery`].
#[derive(Clone)]
pub struct RecoveryState {
    pub sink: SharedSink,
    /// Attach a backtrace to generic fault records.
    pub stack: bool,
}

impl RecoveryState {
    /// Also installs the panic hook, once per process.
    pub fn new(sink: SharedSink, stack: bool) -> Self {
        panic_hook::install();
        Self { sink, stack }
    }
}

/// Marker extension on responses for requests aborted because the client
/// connection broke. No status was chosen for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;

pub async fn recovery(
    State(state): State<RecoveryState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let snapshot = RequestSnapshot::capture(&request);

    let mut guarded = pin!(AssertUnwindSafe(next.run(request)).catch_unwind());
    let outcome = poll_fn(|cx| {
        let _scope = RecoveryScope::enter(state.stack);
        guarded.as_mut().poll(cx)
    })
    .await;

    match outcome {
        Ok(response) => response,
        Err(payload) => recover(&state, &snapshot, payload),
    }
}

fn recover(
    state: &RecoveryState,
    snapshot: &RequestSnapshot,
    payload: Box<dyn Any + Send>,
) -> Response {
    let fault = RecoveredFault::capture(payload.as_ref(), state.stack);
    let dump = snapshot.dump();

    match fault.class() {
        FaultClass::BrokenConnection => {
            state.sink.emit(
                LogRecord::new(Severity::Error, snapshot.path())
                    .in_channel(Channel::Recovery)
                    .with_field("error", fault.description())
                    .with_field("request", dump),
            );

            // The peer is gone; leave the status alone and let hyper drop
            // the socket.
            let mut response = Response::new(Body::empty());
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
            response.extensions_mut().insert(Aborted);
            RequestErrors::attach(&mut response, ErrorKind::Private, fault.description());
            response
        }
        FaultClass::Generic => {
            let mut record = LogRecord::new(Severity::Error, RECOVERED_MESSAGE)
                .in_channel(Channel::Recovery)
                .with_field("error", fault.description())
                .with_field("request", dump);
            if let Some(stack) = fault.stack() {
                record = record.with_field("stack", stack);
            }
            state.sink.emit(record);

            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
