//! Cookie storage
//!
//! A small per-client cookie jar shared between the stubber and its caller.
//! The bundled loader delegates real-transport cookies to `reqwest`'s store;
//! this jar exists so stubbed exchanges observe the same `Cookie` /
//! `Set-Cookie` behavior. Updates are serialized behind a mutex.

use crate::headers::HeaderStore;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

/// A stored cookie. Attributes beyond name/value are not modeled; stub
/// exchanges only need the pair on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
}

/// Per-client cookie jar keyed by host.
#[derive(Debug, Default)]
pub struct CookieStorage {
    inner: Mutex<HashMap<String, Vec<Cookie>>>,
}

impl CookieStorage {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cookies stored for the URL's host.
    pub fn cookies_for(&self, url: &Url) -> Vec<Cookie> {
        let Some(host) = url.host_str() else {
            return Vec::new();
        };
        self.inner
            .lock()
            .expect("cookie storage mutex poisoned")
            .get(host)
            .cloned()
            .unwrap_or_default()
    }

    /// Render a `Cookie` request-header value for the URL, if any cookies
    /// are stored.
    pub fn header_value_for(&self, url: &Url) -> Option<String> {
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

    /// Install every `Set-Cookie` header from `headers`, keyed by the URL's
    /// host. A cookie with an existing name is replaced.
    pub fn store_from_headers(&self, url: &Url, headers: &HeaderStore) {
        let Some(host) = url.host_str() else {
            return;
        };
        let mut inner = self.inner.lock().expect("cookie storage mutex poisoned");
        let jar = inner.entry(host.to_string()).or_default();
        for header in headers.iter() {
            if !header.name.eq_ignore_ascii_case("set-cookie") {
                continue;
            }
            let pair = header.value.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let cookie = Cookie {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
            };
            match jar.iter_mut().find(|c| c.name == cookie.name) {
                Some(existing) => *existing = cookie,
                None => jar.push(cookie),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cookie_headers_are_harvested_per_host() {
        let storage = CookieStorage::new();
        let url = Url::parse("https://example.com/login").unwrap();
        let headers: HeaderStore = [("Set-Cookie", "session=abc; Path=/; HttpOnly")]
            .into_iter()
            .collect();
        storage.store_from_headers(&url, &headers);

        assert_eq!(
            storage.header_value_for(&url).as_deref(),
            Some("session=abc")
        );
        let other = Url::parse("https://other.com/").unwrap();
        assert!(storage.header_value_for(&other).is_none());
    }

    #[test]
    fn same_name_cookie_is_replaced() {
        let storage = CookieStorage::new();
        let url = Url::parse("https://example.com/").unwrap();
        let first: HeaderStore = [("Set-Cookie", "tok=1")].into_iter().collect();
        let second: HeaderStore = [("Set-Cookie", "tok=2")].into_iter().collect();
        storage.store_from_headers(&url, &first);
        storage.store_from_headers(&url, &second);
        assert_eq!(storage.header_value_for(&url).as_deref(), Some("tok=2"));
    }
}
