//! Core relay handler.
//!
//! [`relay_handler`] is the Axum fallback that receives every request.
//! Preflight `OPTIONS` requests are answered locally; everything else is
//! replayed against the target origin through [`upstream::send`] and the
//! result is mirrored back. CORS headers are added by router layers, not
//! here. Submodules handle header translation ([`headers`]), the shared
//! cookie jar ([`session`]), and the outbound exchange ([`upstream`]).

pub mod headers;
pub mod session;
pub mod upstream;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::server::AppState;

use self::session::SESSION_COOKIE;
use self::upstream::UpstreamRequest;

/// Body of the 502 returned when the upstream call fails.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub async fn relay_handler(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    req_headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path_and_query().map_or("/", PathAndQuery::as_str);
    let request_id = uuid::Uuid::new_v4().to_string();

    if method == Method::OPTIONS {
        tracing::info!(
            target: "proxy",
            request_id = %request_id,
            method = %method,
            path = %path,
            status = StatusCode::NO_CONTENT.as_u16(),
            "preflight"
        );
        return StatusCode::NO_CONTENT.into_response();
    }

    // Installed before sending so this request already carries the new token.
    if let Some(token) = headers::inbound_session_token(&req_headers) {
        state.session.set(SESSION_COOKIE, token).await;
    }

    let request = UpstreamRequest {
        client: &state.http_client,
        session: &state.session,
        method: method.clone(),
        url: state.config.upstream_url(path),
        headers: headers::build_upstream_headers(
            &req_headers,
            &state.config.user_agent,
            &state.config.referer(),
        ),
        body: headers::declared_body(&req_headers, body),
        timeout: state.config.timeout,
        max_redirects: state.config.max_redirects,
    };

    let start = Instant::now();
    let result = upstream::send(request).await;
    #[allow(clippy::cast_possible_truncation)]
    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(upstream) => {
            state.stats.forwarded.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                target: "proxy",
                request_id = %request_id,
                method = %method,
                path = %path,
                status = upstream.status.as_u16(),
                redirects = upstream.redirects,
                latency_ms,
                "relayed"
            );

            let mut response = Response::new(Body::from(upstream.body));
            *response.status_mut() = upstream.status;
            *response.headers_mut() = headers::build_relayed_headers(
                &upstream.headers,
                upstream.session_token.as_deref(),
            );
            response
        }
        Err(e) => {
            state.stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                target: "proxy",
                request_id = %request_id,
                method = %method,
                path = %path,
                status = StatusCode::BAD_GATEWAY.as_u16(),
                error = %e,
                latency_ms,
                "upstream call failed"
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
