//! Relay configuration.
//!
//! There is no config file: the target origin and tuning values are
//! compile-time defaults, and only the listen port comes from the CLI.
//! Tests build a [`RelayConfig`] directly to aim the relay at a local
//! mock upstream.

use std::time::Duration;

pub const DEFAULT_TARGET: &str = "https://forums.jtechforums.org";
pub const DEFAULT_PORT: u16 = 8080;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_REDIRECTS: usize = 30;
const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 14) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Upstream origin (scheme + host, no trailing slash). Inbound paths
    /// are appended to it verbatim.
    pub target: String,
    /// Deadline for the whole outbound exchange, redirects and body included.
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Max inbound request body size in bytes.
    pub max_body: usize,
    pub user_agent: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_body: DEFAULT_MAX_BODY,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Full upstream URL for an inbound path-and-query. No normalization
    /// or escaping is applied.
    #[must_use]
    pub fn upstream_url(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.target)
    }

    /// `Referer` sent upstream: the target's root page.
    #[must_use]
    pub fn referer(&self) -> String {
        format!("{}/", self.target)
    }

    /// Host the session jar is scoped to.
    #[must_use]
    pub fn target_host(&self) -> Option<String> {
        url::Url::parse(&self.target)
            .ok()
            .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    }
}
