//! Shared test fixtures: a scripted mock upstream that records every
//! request it receives, and a relay instance pointed at it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use axum::Router;

use cors_relay::config::RelayConfig;
use cors_relay::proxy::session::SessionJar;
use cors_relay::server::{self, AppState};

pub const CORS: [(&str, &str); 4] = [
    ("access-control-allow-origin", "*"),
    (
        "access-control-allow-methods",
        "GET, POST, PUT, PATCH, DELETE, OPTIONS",
    ),
    (
        "access-control-allow-headers",
        "Content-Type, X-Session-Token, X-CSRF-Token",
    ),
    (
        "access-control-expose-headers",
        "X-Session-Token, X-CSRF-Token",
    ),
];

#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub type CaptureLog = Arc<Mutex<Vec<Captured>>>;

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub log: CaptureLog,
}

impl MockUpstream {
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.log.lock().unwrap().clone()
    }
}

fn reply(status: StatusCode, content_type: Option<&str>, body: &'static str) -> Response {
    let mut builder = Response::builder().status(status);
    if let Some(ct) = content_type {
        builder = builder.header(header::CONTENT_TYPE, ct);
    }
    builder.body(Body::from(body)).unwrap()
}

async fn scripted(
    State(log): State<CaptureLog>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let own_port = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .and_then(|host| host.rsplit(':').next())
        .unwrap_or_default()
        .to_string();

    log.lock().unwrap().push(Captured {
        method,
        uri: uri.to_string(),
        headers,
        body,
    });

    const JSON: Option<&str> = Some("application/json");

    match uri.path() {
        "/session/login" => {
            let mut resp = reply(StatusCode::OK, JSON, r#"{"user":"alice"}"#);
            let h = resp.headers_mut();
            h.append(header::SET_COOKIE, "_t=xyz789; path=/; HttpOnly".parse().unwrap());
            h.append(header::SET_COOKIE, "_forum_session=s1; path=/".parse().unwrap());
            resp
        }
        "/session/logout" => {
            let mut resp = reply(StatusCode::OK, JSON, r#"{"success":"OK"}"#);
            resp.headers_mut().append(
                header::SET_COOKIE,
                "_t=; path=/; max-age=0".parse().unwrap(),
            );
            resp
        }
        "/session/csrf" => {
            let mut resp = reply(StatusCode::OK, JSON, r#"{"csrf":"csrf-from-upstream"}"#);
            resp.headers_mut()
                .insert("x-csrf-token", "csrf-from-upstream".parse().unwrap());
            resp
        }
        "/plain" => reply(StatusCode::OK, None, "no content type"),
        "/html" => reply(StatusCode::OK, Some("text/html; charset=utf-8"), "<p>hi</p>"),
        "/missing" => reply(StatusCode::NOT_FOUND, JSON, r#"{"errors":["not found"]}"#),
        "/old" => {
            let mut resp = reply(StatusCode::FOUND, None, "");
            resp.headers_mut()
                .insert(header::LOCATION, "/new?from=old".parse().unwrap());
            resp
        }
        "/keep-method" => {
            let mut resp = reply(StatusCode::TEMPORARY_REDIRECT, None, "");
            resp.headers_mut()
                .insert(header::LOCATION, "/kept".parse().unwrap());
            resp
        }
        "/loop" => {
            let mut resp = reply(StatusCode::FOUND, None, "");
            resp.headers_mut()
                .insert(header::LOCATION, "/loop".parse().unwrap());
            resp
        }
        "/hop-login" => {
            let mut resp = reply(StatusCode::FOUND, None, "");
            let h = resp.headers_mut();
            h.insert(header::LOCATION, "/home".parse().unwrap());
            h.append(header::SET_COOKIE, "_t=hop1; path=/".parse().unwrap());
            resp
        }
        "/leave" => {
            // Same server, different host name: the jar must not follow.
            let mut resp = reply(StatusCode::FOUND, None, "");
            resp.headers_mut().insert(
                header::LOCATION,
                format!("http://localhost:{own_port}/elsewhere").parse().unwrap(),
            );
            resp
        }
        "/slow" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            reply(StatusCode::OK, JSON, "{}")
        }
        _ => {
            let mut resp = reply(StatusCode::OK, JSON, r#"{"ok":true}"#);
            resp.headers_mut()
                .insert("x-upstream-only", "secret".parse().unwrap());
            resp
        }
    }
}

pub async fn start_upstream() -> MockUpstream {
    let log: CaptureLog = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .fallback(scripted)
        .with_state(Arc::clone(&log));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockUpstream { addr, log }
}

/// An origin nothing listens on.
pub async fn refused_origin() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub struct TestRelay {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    pub shutdown: tokio::sync::oneshot::Sender<()>,
}

impl TestRelay {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

pub async fn start_relay(config: RelayConfig) -> TestRelay {
    let session = SessionJar::new(config.target_host().unwrap());
    let state = Arc::new(AppState::new(config, session));
    let router = server::build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .unwrap();
    });

    TestRelay {
        addr,
        state,
        shutdown: shutdown_tx,
    }
}

pub fn assert_cors(headers: &reqwest::header::HeaderMap) {
    for (name, value) in CORS {
        assert_eq!(
            headers.get(name).and_then(|v| v.to_str().ok()),
            Some(value),
            "missing or wrong {name}"
        );
    }
}
