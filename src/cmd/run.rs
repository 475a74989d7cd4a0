//! Start the relay server.
//!
//! Initializes logging, builds the shared state (config, session jar,
//! HTTP client), binds the listener, and serves until Ctrl+C or SIGTERM,
//! draining in-flight requests before returning.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::cli::Cli;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::logging;
use crate::proxy::session::SessionJar;
use crate::server::{self, AppState};

pub async fn execute(cli: Cli) -> Result<(), RelayError> {
    logging::init(tracing::Level::INFO, logging::resolve_format());

    let config = RelayConfig::default();
    let session = SessionJar::new(config.target_host().unwrap_or_default());

    let addr: SocketAddr = format!("0.0.0.0:{}", cli.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("CORS proxy listening on :{} -> {}", cli.port, config.target);
    tracing::info!(
        addr = %addr,
        target = %config.target,
        session_domain = %session.domain(),
        "relay started"
    );

    let state = Arc::new(AppState::new(config, session));
    let router = server::build_router(Arc::clone(&state));

    axum::serve(listener, router)
        .with_graceful_shutdown(server::shutdown_signal())
        .await?;

    tracing::info!(
        forwarded = state.stats.forwarded.load(Ordering::Relaxed),
        failed = state.stats.failed.load(Ordering::Relaxed),
        "relay stopped"
    );
    println!("\nStopped.");
    Ok(())
}
