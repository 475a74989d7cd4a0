//! Header translation in both directions, plus the CORS header literals.
//!
//! Inbound: only `Content-Type` and `X-CSRF-Token` are forwarded; the
//! session token is routed into the jar by the handler instead.
//! Outbound: only `Content-Type`, the session token (re-exposed from the
//! `_t` cookie) and `X-CSRF-Token` are relayed back to the browser.

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use bytes::Bytes;

pub const X_SESSION_TOKEN: HeaderName = HeaderName::from_static("x-session-token");
pub const X_CSRF_TOKEN: HeaderName = HeaderName::from_static("x-csrf-token");

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, X-Session-Token, X-CSRF-Token";
pub const EXPOSE_HEADERS: &str = "X-Session-Token, X-CSRF-Token";

/// The four CORS headers attached to every response.
#[must_use]
pub fn cors_headers() -> [(HeaderName, HeaderValue); 4] {
    [
        (
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(ALLOW_ORIGIN),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ),
        (
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSE_HEADERS),
        ),
    ]
}

const APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");

/// Session token the client wants installed as the `_t` cookie, if any.
#[must_use]
pub fn inbound_session_token(inbound: &HeaderMap) -> Option<&str> {
    inbound
        .get(&X_SESSION_TOKEN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Body to forward: the inbound bytes only when a positive
/// `Content-Length` was declared. Anything else forwards nothing.
#[must_use]
pub fn declared_body(inbound: &HeaderMap, body: Bytes) -> Bytes {
    let declared = inbound
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    if declared > 0 {
        body
    } else {
        Bytes::new()
    }
}

pub fn build_upstream_headers(inbound: &HeaderMap, user_agent: &str, referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, APPLICATION_JSON);

    // Browser identity; Cloudflare hotlink protection expects the target as referer.
    for (name, value) in [(header::USER_AGENT, user_agent), (header::REFERER, referer)] {
        match HeaderValue::from_str(value) {
            Ok(val) => {
                headers.insert(name, val);
            }
            Err(_) => {
                tracing::warn!(target: "proxy", header = %name, "invalid header value, sending none");
            }
        }
    }

    if let Some(ct) = non_empty(inbound, &header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, ct.clone());
    }
    if let Some(csrf) = non_empty(inbound, &X_CSRF_TOKEN) {
        headers.insert(X_CSRF_TOKEN, csrf.clone());
    }

    headers
}

/// Headers relayed back to the client from the final upstream response.
pub fn build_relayed_headers(upstream: &HeaderMap, session_token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(
        header::CONTENT_TYPE,
        upstream
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or(APPLICATION_JSON),
    );

    if let Some(token) = session_token {
        match HeaderValue::from_str(token) {
            Ok(val) => {
                headers.insert(X_SESSION_TOKEN, val);
            }
            Err(_) => {
                tracing::warn!(target: "proxy", "upstream session cookie is not a valid header value");
            }
        }
    }

    if let Some(csrf) = non_empty(upstream, &X_CSRF_TOKEN) {
        headers.insert(X_CSRF_TOKEN, csrf.clone());
    }

    headers
}

fn non_empty<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a HeaderValue> {
    headers.get(name).filter(|v| !v.is_empty())
}
