//! Stub rules and responses
//!
//! A stub rule is an ordered set of AND-combined matchers plus a per-method
//! response table; entries are either a static response or a dynamic
//! producer invoked with the request and its rule (the producer wins when
//! both are bound). An ignore rule is matchers only and always passes the
//! request through to the real transport.

use super::matchers::{
    BodyMatcher, EchoMatcher, FnMatcher, JsonBodyMatcher, StubMatcher, UriTemplateMatcher,
    UrlMatchOptions, UrlMatcher, UrlRegexMatcher,
};
use crate::error::Error;
use crate::headers::HeaderStore;
use crate::request::{Method, WireRequest};
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Cache behavior advertised on a synthesized response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Let protocol headers decide; nothing is added.
    #[default]
    UseProtocol,
    /// Advertise `Cache-Control: no-store`.
    NoStore,
    /// Advertise `Cache-Control: no-cache`.
    NoCache,
}

impl CachePolicy {
    pub(crate) fn header_value(self) -> Option<&'static str> {
        match self {
            Self::UseProtocol => None,
            Self::NoStore => Some("no-store"),
            Self::NoCache => Some("no-cache"),
        }
    }
}

/// A locally synthesized response.
#[derive(Debug, Clone)]
pub struct StubResponse {
    /// Status code.
    pub status: u16,
    /// `Content-Type` for the body.
    pub content_type: Option<String>,
    /// Additional response headers.
    pub headers: HeaderStore,
    /// Body bytes.
    pub body: Bytes,
    /// When set, the shim emits a transport failure carrying this error
    /// instead of a response.
    pub fail_error: Option<Error>,
    /// Delay before the response is finalized.
    pub response_delay: Option<Duration>,
    /// Cache behavior advertised on the response.
    pub cache_policy: CachePolicy,
}

impl StubResponse {
    /// An empty response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            headers: HeaderStore::new(),
            body: Bytes::new(),
            fail_error: None,
            response_delay: None,
            cache_policy: CachePolicy::default(),
        }
    }

    /// 200 with a JSON body.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(200)
            .with_body(body)
            .with_content_type("application/json"))
    }

    /// Set the body bytes.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set the `Content-Type`.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Add a response header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Delay finalization of the response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.response_delay = Some(delay);
        self
    }

    /// Synthesize a transport failure instead of a response.
    pub fn with_failure(mut self, error: Error) -> Self {
        self.fail_error = Some(error);
        self
    }

    /// Set the advertised cache policy.
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }
}

/// Dynamic response producer bound to a method.
pub type ResponseProducer = Arc<dyn Fn(&WireRequest, &StubRule) -> StubResponse + Send + Sync>;

/// Per-method entry in a rule's response table.
#[derive(Clone)]
pub enum StubResponder {
    /// A fixed response.
    Static(StubResponse),
    /// A producer invoked with `(request, rule)`.
    Producer(ResponseProducer),
}

impl fmt::Debug for StubResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(response) => f.debug_tuple("Static").field(response).finish(),
            Self::Producer(_) => f.debug_tuple("Producer").finish_non_exhaustive(),
        }
    }
}

/// A producer that mirrors the request: status 200, the request's body and
/// content type echoed back.
pub fn echo_producer() -> ResponseProducer {
    Arc::new(|request: &WireRequest, _rule: &StubRule| {
        let mut response = StubResponse::new(200);
        if let Some(body) = &request.body {
            response = response.with_body(body.clone());
        }
        if let Some(content_type) = request.headers.value("content-type") {
            response = response.with_content_type(content_type);
        }
        response
    })
}

/// A keyed stub: matchers plus a per-method response table.
#[derive(Clone)]
pub struct StubRule {
    pub(crate) id: Uuid,
    pub(crate) matchers: Vec<Arc<dyn StubMatcher>>,
    pub(crate) responses: HashMap<Method, StubResponder>,
}

impl StubRule {
    /// An empty rule. A rule with no matchers accepts every request.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            matchers: Vec::new(),
            responses: HashMap::new(),
        }
    }

    /// An echo rule: matches everything and mirrors the request for the
    /// given methods.
    pub fn echo(methods: impl IntoIterator<Item = Method>) -> Self {
        let mut rule = Self::new().match_any();
        let producer = echo_producer();
        for method in methods {
            rule.responses
                .insert(method, StubResponder::Producer(producer.clone()));
        }
        rule
    }

    /// Stable identity used by the registry for removal.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Add an arbitrary matcher.
    pub fn match_with(mut self, matcher: impl StubMatcher + 'static) -> Self {
        self.matchers.push(Arc::new(matcher));
        self
    }

    /// Add a full-URL regex matcher.
    pub fn match_url_regex(self, pattern: &str) -> Result<Self, Error> {
        Ok(self.match_with(UrlRegexMatcher::new(pattern)?))
    }

    /// Add an RFC 6570 template matcher.
    pub fn match_uri_template(self, template: &str) -> Result<Self, Error> {
        Ok(self.match_with(UriTemplateMatcher::new(template)?))
    }

    /// Add an exact-URL matcher with component flags.
    pub fn match_url(self, url: &str, options: UrlMatchOptions) -> Result<Self, Error> {
        Ok(self.match_with(UrlMatcher::new(url, options)?))
    }

    /// Add a deep JSON body matcher.
    pub fn match_json(self, expected: serde_json::Value) -> Self {
        self.match_with(JsonBodyMatcher::new(expected))
    }

    /// Add a byte-equality body matcher.
    pub fn match_body(self, expected: impl Into<Bytes>) -> Self {
        self.match_with(BodyMatcher::new(expected))
    }

    /// Add a custom predicate matcher.
    pub fn match_fn(self, predicate: impl Fn(&WireRequest) -> bool + Send + Sync + 'static) -> Self {
        self.match_with(FnMatcher::new(predicate))
    }

    /// Add the always-true matcher.
    pub fn match_any(self) -> Self {
        self.match_with(EchoMatcher)
    }

    /// Bind a static response for a method.
    pub fn on(mut self, method: Method, response: StubResponse) -> Self {
        self.responses.insert(method, StubResponder::Static(response));
        self
    }

    /// Bind a dynamic producer for a method. A producer wins over a static
    /// response bound to the same method.
    pub fn produce(
        mut self,
        method: Method,
        producer: impl Fn(&WireRequest, &StubRule) -> StubResponse + Send + Sync + 'static,
    ) -> Self {
        self.responses
            .insert(method, StubResponder::Producer(Arc::new(producer)));
        self
    }

    /// Whether every matcher accepts the request.
    pub fn matches(&self, request: &WireRequest) -> bool {
        self.matchers.iter().all(|m| m.matches(request))
    }

    /// The responder bound to `method`, if any.
    pub fn responder(&self, method: Method) -> Option<&StubResponder> {
        self.responses.get(&method)
    }
}

impl Default for StubRule {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StubRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubRule")
            .field("id", &self.id)
            .field("matchers", &self.matchers.len())
            .field("responses", &self.responses)
            .finish()
    }
}

/// Matchers only; a matching ignore rule always passes the request through
/// to the real transport.
#[derive(Clone)]
pub struct IgnoreRule {
    pub(crate) id: Uuid,
    pub(crate) matchers: Vec<Arc<dyn StubMatcher>>,
}

impl IgnoreRule {
    /// An empty ignore rule.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            matchers: Vec::new(),
        }
    }

    /// Stable identity used by the registry for removal.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Add an arbitrary matcher.
    pub fn match_with(mut self, matcher: impl StubMatcher + 'static) -> Self {
        self.matchers.push(Arc::new(matcher));
        self
    }

    /// Add a full-URL regex matcher.
    pub fn match_url_regex(self, pattern: &str) -> Result<Self, Error> {
        Ok(self.match_with(UrlRegexMatcher::new(pattern)?))
    }

    /// Add an RFC 6570 template matcher.
    pub fn match_uri_template(self, template: &str) -> Result<Self, Error> {
        Ok(self.match_with(UriTemplateMatcher::new(template)?))
    }

    /// Add a custom predicate matcher.
    pub fn match_fn(self, predicate: impl Fn(&WireRequest) -> bool + Send + Sync + 'static) -> Self {
        self.match_with(FnMatcher::new(predicate))
    }

    /// Whether every matcher accepts the request.
    pub fn matches(&self, request: &WireRequest) -> bool {
        self.matchers.iter().all(|m| m.matches(request))
    }
}

impl Default for IgnoreRule {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IgnoreRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreRule")
            .field("id", &self.id)
            .field("matchers", &self.matchers.len())
            .finish()
    }
}
