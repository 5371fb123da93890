//! Stub matchers
//!
//! Predicates over a composed wire request, used to select stub and ignore
//! rules. A rule matches only if every one of its matchers accepts (AND).

use crate::error::Error;
use crate::request::WireRequest;
use crate::template::UriTemplate;
use bytes::Bytes;
use regex::Regex;
use std::sync::Arc;
use url::Url;

/// A predicate over a request.
pub trait StubMatcher: Send + Sync {
    /// Whether this matcher accepts the request.
    fn matches(&self, request: &WireRequest) -> bool;
}

/// Full-URL regex match.
pub struct UrlRegexMatcher(Regex);

impl UrlRegexMatcher {
    /// Compile a matcher from a regex pattern.
    pub fn new(pattern: &str) -> Result<Self, Error> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::Internal(format!("invalid stub URL regex '{pattern}': {e}")))?;
        Ok(Self(regex))
    }
}

impl StubMatcher for UrlRegexMatcher {
    fn matches(&self, request: &WireRequest) -> bool {
        self.0.is_match(request.url.as_str())
    }
}

/// RFC 6570 template match; template variables absorb any expansion.
pub struct UriTemplateMatcher(UriTemplate);

impl UriTemplateMatcher {
    /// Parse a matcher from a template string.
    pub fn new(template: &str) -> Result<Self, Error> {
        Ok(Self(UriTemplate::parse(template)?))
    }
}

impl StubMatcher for UriTemplateMatcher {
    fn matches(&self, request: &WireRequest) -> bool {
        self.0.matches(request.url.as_str())
    }
}

/// Flags controlling which URL components [`UrlMatcher`] ignores.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlMatchOptions {
    /// Ignore the query string.
    pub ignore_query: bool,
    /// Ignore the path.
    pub ignore_path: bool,
    /// Ignore the scheme.
    pub ignore_scheme: bool,
    /// Ignore the host.
    pub ignore_host: bool,
    /// Ignore the port.
    pub ignore_port: bool,
    /// Ignore the fragment.
    pub ignore_fragment: bool,
}

/// Exact URL equality after masking the ignored components.
pub struct UrlMatcher {
    url: Url,
    options: UrlMatchOptions,
}

impl UrlMatcher {
    /// Match against `url` with the given component flags.
    pub fn new(url: &str, options: UrlMatchOptions) -> Result<Self, Error> {
        Ok(Self {
            url: Url::parse(url)?,
            options,
        })
    }
}

impl StubMatcher for UrlMatcher {
    fn matches(&self, request: &WireRequest) -> bool {
        let opts = &self.options;
        let candidate = &request.url;
        (opts.ignore_scheme || candidate.scheme() == self.url.scheme())
            && (opts.ignore_host || candidate.host_str() == self.url.host_str())
            && (opts.ignore_port || candidate.port_or_known_default() == self.url.port_or_known_default())
            && (opts.ignore_path || candidate.path() == self.url.path())
            && (opts.ignore_query || candidate.query() == self.url.query())
            && (opts.ignore_fragment || candidate.fragment() == self.url.fragment())
    }
}

/// Deep JSON comparison of the request body against an expected value.
pub struct JsonBodyMatcher(serde_json::Value);

impl JsonBodyMatcher {
    /// Match bodies that deserialize to exactly `expected`.
    pub fn new(expected: serde_json::Value) -> Self {
        Self(expected)
    }
}

impl StubMatcher for JsonBodyMatcher {
    fn matches(&self, request: &WireRequest) -> bool {
        let Some(body) = &request.body else {
            return false;
        };
        match serde_json::from_slice::<serde_json::Value>(body) {
            Ok(value) => value == self.0,
            Err(_) => false,
        }
    }
}

/// Byte equality against an expected buffer.
pub struct BodyMatcher(Bytes);

impl BodyMatcher {
    /// Match bodies byte-equal to `expected`.
    pub fn new(expected: impl Into<Bytes>) -> Self {
        Self(expected.into())
    }
}

impl StubMatcher for BodyMatcher {
    fn matches(&self, request: &WireRequest) -> bool {
        request.body.as_deref() == Some(self.0.as_ref())
    }
}

/// User-supplied predicate.
pub struct FnMatcher(Arc<dyn Fn(&WireRequest) -> bool + Send + Sync>);

impl FnMatcher {
    /// Wrap a predicate function.
    pub fn new(predicate: impl Fn(&WireRequest) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(predicate))
    }
}

impl StubMatcher for FnMatcher {
    fn matches(&self, request: &WireRequest) -> bool {
        (self.0)(request)
    }
}

/// Always matches; pairs with the echo response producer.
pub struct EchoMatcher;

impl StubMatcher for EchoMatcher {
    fn matches(&self, _request: &WireRequest) -> bool {
        true
    }
}
