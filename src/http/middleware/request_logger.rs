//! Access logging middleware.
//! One `info` record per completed request.

use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::{client_ip, user_agent};
use crate::http::response::{ErrorKind, RequestErrors};
use crate::observability::sink::{LogRecord, Severity, SharedSink};

pub async fn request_logger(
    State(sink): State<SharedSink>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();
    let query = request.uri().query().unwrap_or_default().to_string();
    let method = request.method().to_string();
    let ip = client_ip(&request);
    let user_agent = user_agent(&request);

    let response = next.run(request).await;

    let cost = start.elapsed();
    let errors = response
        .extensions()
        .get::<RequestErrors>()
        .map(|e| e.render(ErrorKind::Private))
        .unwrap_or_default();

    sink.emit(
        LogRecord::new(Severity::Info, path.as_str())
            .with_field("status", response.status().as_u16())
            .with_field("method", method)
            .with_field("path", path)
            .with_field("query", query)
            .with_field("ip", ip)
            .with_field("user-agent", user_agent)
            .with_field("errors", errors)
            .with_field("cost", cost),
    );

    response
}
