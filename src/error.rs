//! Unified error type for the relay.
//!
//! [`RelayError`] covers startup failures (bad address, bind errors) and
//! the single runtime failure category, "upstream call failed", in its
//! various transport-level shapes. Upstream variants never escape the
//! handler: they are rendered as a 502 JSON body.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RelayError {
    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid target URL '{url}': {source}")]
    InvalidUri {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    Upstream {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Upstream request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to read upstream body: {source}")]
    BodyRead {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Exceeded {0} redirects")]
    TooManyRedirects(usize),
}
