//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use tokio::task::JoinHandle;
use tower::ServiceExt;

use request_recovery::config::AppConfig;
use request_recovery::observability::{LogRecord, LogSink, MemorySink, Severity, SharedSink};
use request_recovery::{HttpServer, Shutdown};

pub const TEST_AGENT: &str = "integration-test/1.0";

/// A memory sink plus the same sink as the trait object middleware expects.
pub fn memory_sink() -> (Arc<MemorySink>, SharedSink) {
    let memory = MemorySink::new();
    let shared: SharedSink = memory.clone();
    (memory, shared)
}

/// Drive one GET through `router` without a socket.
pub async fn get(router: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header("user-agent", TEST_AGENT)
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Sink that panics on `info` records and forwards everything else.
///
/// Stands in for a fault inside the access logger's own post-processing.
pub struct PanicOnInfo(pub Arc<MemorySink>);

impl LogSink for PanicOnInfo {
    fn emit(&self, record: LogRecord) {
        if record.severity() == Severity::Info {
            panic!("sink exploded");
        }
        self.0.emit(record);
    }
}

/// Start a real server on an ephemeral port.
pub async fn start_server(
    mut config: AppConfig,
    sink: SharedSink,
) -> (SocketAddr, Shutdown, JoinHandle<()>) {
    config.listener.bind_address = "127.0.0.1:0".to_string();
    let server = HttpServer::new(config, sink);
    let listener = server.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let handle = tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown, handle)
}
