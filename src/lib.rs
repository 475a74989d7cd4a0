//! cors-relay is a CORS-enabling HTTP relay in front of a single upstream API.
//!
//! Every inbound request is replayed against a fixed target origin with a
//! small set of headers translated, and the upstream response is relayed
//! back with cross-origin headers attached. A process-wide cookie jar keeps
//! the upstream session (`_t` cookie) alive across requests, so browser
//! clients only ever deal in the `X-Session-Token` header.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- The `run` entry point: logging, state, serve, shutdown.
//! - [`config`] -- [`RelayConfig`](config::RelayConfig) with the fixed target
//!   origin and tuning constants.
//! - [`error`] -- Unified error type using `thiserror`.
//! - [`logging`] -- Structured tracing setup writing to stderr.
//! - [`proxy`] -- Core relay: preflight, header translation, session jar,
//!   and the outbound exchange with redirect following.
//! - [`server`] -- Axum server setup, shared application state, HTTP client,
//!   CORS response layers, and graceful shutdown.

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod server;
