//! The outbound exchange with the target origin.
//!
//! [`send`] issues the request through the shared hyper client, attaches
//! the session jar's cookies, and follows redirects until a final
//! response arrives. The whole exchange, body included, runs under a
//! single deadline. Every failure comes back as a [`RelayError`]; nothing
//! here retries.

use std::time::Duration;

use axum::http::{header, HeaderMap, Method, StatusCode};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};

use crate::error::RelayError;
use crate::server::HttpClient;

use super::session::{SessionJar, SESSION_COOKIE};

pub struct UpstreamRequest<'a> {
    pub client: &'a HttpClient,
    pub session: &'a SessionJar,
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout: Duration,
    pub max_redirects: usize,
}

#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// `_t` value set by any response in the redirect chain, if still live.
    pub session_token: Option<String>,
    pub redirects: usize,
}

pub async fn send(req: UpstreamRequest<'_>) -> Result<UpstreamResponse, RelayError> {
    let timeout = req.timeout;
    tokio::time::timeout(timeout, exchange(req))
        .await
        .map_err(|_| RelayError::Timeout(timeout))?
}

async fn exchange(req: UpstreamRequest<'_>) -> Result<UpstreamResponse, RelayError> {
    let UpstreamRequest {
        client,
        session,
        mut method,
        url,
        mut headers,
        mut body,
        max_redirects,
        ..
    } = req;

    let mut current = url;
    let mut session_token = None;
    let mut redirects = 0;

    loop {
        // hyper::Uri keeps the path as given; no dot-segment normalization.
        let uri: hyper::Uri = current.parse().map_err(|e| RelayError::InvalidUri {
            url: current.clone(),
            source: Box::new(e),
        })?;
        let host = uri.host().unwrap_or_default().to_ascii_lowercase();

        let mut builder = hyper::Request::builder().method(method.clone()).uri(uri);
        for (key, value) in &headers {
            builder = builder.header(key, value);
        }
        if session.domain_matches(&host) {
            if let Some(cookie) = session.cookie_header().await {
                builder = builder.header(header::COOKIE, cookie);
            }
        }

        let request = builder
            .body(Full::new(body.clone()))
            .map_err(|e| RelayError::InvalidUri {
                url: current.clone(),
                source: Box::new(e),
            })?;

        let response = client
            .request(request)
            .await
            .map_err(|e| RelayError::Upstream {
                source: Box::new(e),
            })?;
        let (parts, incoming) = response.into_parts();

        for cookie in session.store_response(&host, &parts.headers).await {
            if cookie.name == SESSION_COOKIE {
                session_token = (!cookie.expired).then_some(cookie.value);
            }
        }

        if let Some(next) = redirect_target(parts.status, &parts.headers, &current) {
            if redirects >= max_redirects {
                return Err(RelayError::TooManyRedirects(max_redirects));
            }
            redirects += 1;
            tracing::debug!(
                target: "proxy",
                status = parts.status.as_u16(),
                location = %next,
                "following redirect"
            );

            method = rebuild_method(parts.status, &method);
            if !preserves_body(parts.status) {
                body = Bytes::new();
                headers.remove(header::CONTENT_TYPE);
            }
            current = next;
            continue;
        }

        let body = incoming
            .collect()
            .await
            .map_err(|e| RelayError::BodyRead {
                source: Box::new(e),
            })?
            .to_bytes();

        return Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
            session_token,
            redirects,
        });
    }
}

/// Absolute URL to follow, when `status` is a redirect with a usable `Location`.
fn redirect_target(status: StatusCode, headers: &HeaderMap, current: &str) -> Option<String> {
    if !matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    let location = headers.get(header::LOCATION)?.to_str().ok()?;
    let base = url::Url::parse(current).ok()?;
    match base.join(location) {
        Ok(next) => Some(next.to_string()),
        Err(e) => {
            tracing::warn!(target: "proxy", location = %location, error = %e, "unusable redirect location");
            None
        }
    }
}

/// Browser-compatible method rewriting: 303 (and 302) become GET, and a
/// POST answered with 301 becomes GET. HEAD is never rewritten.
fn rebuild_method(status: StatusCode, method: &Method) -> Method {
    match status {
        StatusCode::SEE_OTHER | StatusCode::FOUND if *method != Method::HEAD => Method::GET,
        StatusCode::MOVED_PERMANENTLY if *method == Method::POST => Method::GET,
        _ => method.clone(),
    }
}

const fn preserves_body(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
    )
}
