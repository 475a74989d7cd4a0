//! Process-lifetime upstream session.
//!
//! [`SessionJar`] is a single cookie jar scoped to the target host. It is
//! written when a client hands us `X-Session-Token` and whenever the
//! upstream answers with `Set-Cookie`, and read on every outbound request.
//! All access goes through an async `RwLock`, so concurrent requests never
//! observe a half-updated jar. Locks are never held across network I/O.

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap};
use tokio::sync::RwLock;

/// Name of the upstream session cookie.
pub const SESSION_COOKIE: &str = "_t";

/// A parsed `Set-Cookie` header, reduced to what the jar needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    /// `Max-Age` <= 0 or an empty value: the cookie is being cleared.
    pub expired: bool,
}

impl SetCookie {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(';');
        let (name, value) = parts.next()?.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        let value = value.trim();

        let mut domain = None;
        let mut expired = value.is_empty() || value == "\"\"";

        for attr in parts {
            let Some((key, attr_value)) = attr.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let attr_value = attr_value.trim();
            if key.eq_ignore_ascii_case("max-age") {
                if attr_value.parse::<i64>().is_ok_and(|secs| secs <= 0) {
                    expired = true;
                }
            } else if key.eq_ignore_ascii_case("domain") {
                let d = attr_value.trim_start_matches('.').to_ascii_lowercase();
                if !d.is_empty() {
                    domain = Some(d);
                }
            }
        }

        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
            domain,
            expired,
        })
    }
}

#[derive(Debug)]
pub struct SessionJar {
    domain: String,
    cookies: RwLock<BTreeMap<String, String>>,
}

impl SessionJar {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into().to_ascii_lowercase(),
            cookies: RwLock::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// True when `host` is the jar's domain or one of its subdomains.
    #[must_use]
    pub fn domain_matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        host == self.domain
            || host
                .strip_suffix(self.domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    pub async fn set(&self, name: &str, value: &str) {
        self.cookies
            .write()
            .await
            .insert(name.to_string(), value.to_string());
    }

    pub async fn get(&self, name: &str) -> Option<String> {
        self.cookies.read().await.get(name).cloned()
    }

    /// `Cookie` header value for a request to this jar's domain, or `None`
    /// when the jar is empty.
    pub async fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.read().await;
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Apply every `Set-Cookie` in an upstream response from `host`.
    ///
    /// Cookies from other hosts, or whose `Domain` attribute does not cover
    /// the jar's domain, are ignored. Returns the cookies that were applied.
    pub async fn store_response(&self, host: &str, headers: &HeaderMap) -> Vec<SetCookie> {
        if !self.domain_matches(host) {
            return Vec::new();
        }

        let parsed: Vec<SetCookie> = headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(SetCookie::parse)
            .filter(|c| c.domain.as_deref().map_or(true, |d| self.domain_matches_cookie(d)))
            .collect();

        if parsed.is_empty() {
            return parsed;
        }

        let mut cookies = self.cookies.write().await;
        for cookie in &parsed {
            if cookie.expired {
                cookies.remove(&cookie.name);
            } else {
                cookies.insert(cookie.name.clone(), cookie.value.clone());
            }
        }
        drop(cookies);

        parsed
    }

    fn domain_matches_cookie(&self, cookie_domain: &str) -> bool {
        self.domain == cookie_domain
            || self
                .domain
                .strip_suffix(cookie_domain)
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}
