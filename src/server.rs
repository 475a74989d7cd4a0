//! Axum server setup, shared application state, and graceful shutdown.
//!
//! Contains [`AppState`] (the `Arc`-shared state holding config, session
//! jar, HTTP client, and stats), [`build_router`] for constructing the
//! Axum router with CORS and middleware layers, [`build_http_client`] for
//! the connection-pooled hyper client, and [`shutdown_signal`] for
//! SIGTERM / Ctrl+C handling.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::proxy;
use crate::proxy::headers::cors_headers;
use crate::proxy::session::SessionJar;

#[derive(Debug)]
pub struct Stats {
    pub forwarded: AtomicU64,
    pub failed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            forwarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;
pub type HttpClient = Client<HttpsConnector, http_body_util::Full<bytes::Bytes>>;

pub struct AppState {
    pub config: RelayConfig,
    /// Shared upstream session. Lives as long as the server does.
    pub session: SessionJar,
    pub http_client: HttpClient,
    pub stats: Stats,
}

impl AppState {
    #[must_use]
    pub fn new(config: RelayConfig, session: SessionJar) -> Self {
        Self {
            config,
            session,
            http_client: build_http_client(),
            stats: Stats::new(),
        }
    }
}

#[must_use]
pub fn build_http_client() -> HttpClient {
    // rustls cannot pick a crypto provider on its own when more than one is
    // compiled in; install `ring` explicitly.
    let _ = rustls::crypto::ring::default_provider().install_default();

    let https = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .build();
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(https)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let max_body = state.config.max_body;
    let [origin, methods, allow_headers, expose_headers] = cors_headers();

    Router::new()
        .fallback(proxy::relay_handler)
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                // Outermost, so locally generated errors (413) carry CORS too.
                .layer(SetResponseHeaderLayer::overriding(origin.0, origin.1))
                .layer(SetResponseHeaderLayer::overriding(methods.0, methods.1))
                .layer(SetResponseHeaderLayer::overriding(
                    allow_headers.0,
                    allow_headers.1,
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    expose_headers.0,
                    expose_headers.1,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body)),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
