//! Demo service: structured access logs and panic recovery.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ recovery ──▶ request_logger ──▶ recovery ──▶ handler
//!                        │               │                │
//!                        └───────────────┴────────────────┴──▶ LogSink ──▶ tracing
//!                                                                          ├─ stdout
//!                                                                          └─ rolling file
//! ```
//!
//! Routes:
//! - `GET /1` returns a greeting
//! - `GET /2` panics; the client gets a bare 500 and the log gets the details

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use request_recovery::http::HttpServer;
use request_recovery::lifecycle::{self, signals, Overrides, Shutdown};
use request_recovery::observability::TracingSink;

#[derive(Parser)]
#[command(name = "request-recovery")]
#[command(about = "HTTP service with structured access logs and panic recovery", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override logging.level.
    #[arg(long)]
    log_level: Option<String>,

    /// Do not attach backtraces to recovered panics.
    #[arg(long)]
    no_stack: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = Overrides {
        bind_address: cli.bind,
        log_level: cli.log_level,
        no_stack: cli.no_stack,
    };

    let (config, log_guard) = lifecycle::prepare(cli.config.as_deref(), &overrides)?;

    tracing::info!("request-recovery v{} starting", env!("CARGO_PKG_VERSION"));

    let server = HttpServer::new(config, TracingSink::shared());
    let listener = server.bind().await?;

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    signals::forward_to(shutdown.clone());

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    drop(log_guard);
    Ok(())
}
