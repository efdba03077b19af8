//! Session handoff from browser to HTTP client
//!
//! Downloads are fetched outside the browser; the browser's cookies go along
//! so the request is made as the logged-in user.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::driver::Cookie;

/// Browser cookie (simplified, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    /// Host the cookie belongs to; a leading `.` is ignored
    pub domain: Option<String>,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub expires: Option<i64>,
}

impl From<Cookie> for SessionCookie {
    fn from(c: Cookie) -> Self {
        Self {
            name: c.name,
            value: c.value,
            domain: c.domain,
            path: c.path.unwrap_or_else(|| "/".to_string()),
            secure: c.secure,
            http_only: c.http_only,
            expires: c.expiry,
        }
    }
}

impl SessionCookie {
    /// Whether a request to `url` at time `now` (epoch seconds) should carry this cookie
    fn applies_to(&self, url: &Url, now: i64) -> bool {
        if self.expires.is_some_and(|expires| expires <= now) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        if !path_matches(url.path(), &self.path) {
            return false;
        }
        match (&self.domain, url.host_str()) {
            (None, _) => true,
            (Some(domain), Some(host)) => {
                let domain = domain.trim_start_matches('.');
                host == domain || host.ends_with(&format!(".{domain}"))
            }
            (Some(_), None) => false,
        }
    }
}

/// Cookie path match: `/admin` covers `/admin` and `/admin/x`, not `/administrator`
fn path_matches(request: &str, cookie: &str) -> bool {
    match request.strip_prefix(cookie) {
        Some(rest) => cookie.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Cookies copied from the browser
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CookieJar {
    pub cookies: Vec<SessionCookie>,
}

impl CookieJar {
    pub fn new(cookies: Vec<Cookie>) -> Self {
        Self {
            cookies: cookies.into_iter().map(SessionCookie::from).collect(),
        }
    }

    /// Cookies a request to `url` should carry
    pub fn cookies_for(&self, url: &Url) -> Vec<&SessionCookie> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        self.cookies
            .iter()
            .filter(|c| c.applies_to(url, now))
            .collect()
    }

    /// Format matching cookies as a Cookie header, `None` when there are none
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let cookies = self.cookies_for(url);
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
