//! Request model
//!
//! The structured request description consumed by the executor: semantic
//! fields, body, transfer and redirect behavior, retry budget, and the
//! composed wire-form request handed to transports and stub matchers.
//!
//! A `Request` is mutable until execution begins; the executor snapshots it
//! per attempt, and the `after` retry hook may mutate it between attempts.

use crate::body::Body;
use crate::cancel::CancelHandle;
use crate::error::Error;
use crate::headers::HeaderStore;
use crate::progress::{HttpProgress, ProgressSink};
use crate::template::UriTemplate;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Stable identifier assigned to each request at build time. Responses carry
/// it as their back-reference to the originating request.
pub type RequestId = Uuid;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// TRACE
    Trace,
    /// CONNECT
    Connect,
}

impl Method {
    /// Canonical upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Head => reqwest::Method::HEAD,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
            Self::Options => reqwest::Method::OPTIONS,
            Self::Trace => reqwest::Method::TRACE,
            Self::Connect => reqwest::Method::CONNECT,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How response bytes are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransferMode {
    /// Accumulate the body in memory.
    #[default]
    Buffered,
    /// Spill the body to a file; bytes are never materialized unless the
    /// consumer explicitly reads them.
    LargeData,
}

/// How redirects are handled by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RedirectPolicy {
    /// Chase redirects with standard HTTP semantics (e.g. a 303 switches the
    /// hop to GET and drops the body).
    #[default]
    Follow,
    /// Deliver the redirect response as-is.
    Refuse,
    /// Chase redirects but re-issue each hop with the original method,
    /// headers and body.
    FollowWithOriginalSettings,
}

/// Opaque state permitting a partially completed transfer to be resumed.
///
/// Produced by cancelling with
/// [`CancelHandle::cancel_collecting_resumable`]; feed it back via
/// [`Request::resume_from`] on a reissued request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumableState {
    pub(crate) url: String,
    pub(crate) offset: u64,
    pub(crate) etag: Option<String>,
    pub(crate) partial_file: Option<PathBuf>,
}

impl ResumableState {
    /// Bytes already transferred.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Target URL of a request: absolute, or resolved against the client's base
/// URL with URI-template expansion.
#[derive(Debug, Clone)]
pub enum RequestUrl {
    /// A fully formed URL.
    Absolute(Url),
    /// A path (possibly an RFC 6570 template) joined onto the client base.
    Relative(String),
}

/// Pure function applied to the composed wire request as the last step of
/// composition.
pub type UrlRequestMutator = Arc<dyn Fn(&mut WireRequest) + Send + Sync>;

/// A structured request description.
#[derive(Clone)]
pub struct Request {
    /// Stable request identifier.
    pub id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Target URL.
    pub url: RequestUrl,
    /// Variables for URI-template expansion of a relative path.
    pub template_vars: HashMap<String, String>,
    /// Query parameters, order preserved.
    pub query: Vec<(String, String)>,
    /// Request headers; merged over client defaults (request wins).
    pub headers: HeaderStore,
    /// Request body.
    pub body: Body,
    /// Per-attempt timeout; `None` uses the client default.
    pub timeout: Option<Duration>,
    /// Maximum retries (excludes the initial attempt); `None` uses the
    /// client default.
    pub max_retries: Option<u32>,
    /// Transfer mode for the response body.
    pub transfer_mode: TransferMode,
    /// Redirect policy; `None` uses the client default.
    pub redirect_policy: Option<RedirectPolicy>,
    /// Resumable state from a previously cancelled transfer.
    pub resume_from: Option<ResumableState>,
    /// Mutator applied to the wire request after composition.
    pub mutator: Option<UrlRequestMutator>,
    /// Progress sink for this request.
    pub progress: Option<ProgressSink>,
    /// Cancellation handle; clone it before `fetch` to keep control.
    pub cancel: CancelHandle,
    // Marks a nested alternate request so recovery validators do not recurse.
    pub(crate) is_alt: bool,
}

impl Request {
    /// Create a request. `url` may be absolute or a path (optionally an RFC
    /// 6570 template) resolved against the client's base URL.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        let target = match Url::parse(&url) {
            Ok(parsed) => RequestUrl::Absolute(parsed),
            Err(_) => RequestUrl::Relative(url),
        };
        Self {
            id: Uuid::new_v4(),
            method,
            url: target,
            template_vars: HashMap::new(),
            query: Vec::new(),
            headers: HeaderStore::new(),
            body: Body::Empty,
            timeout: None,
            max_retries: None,
            transfer_mode: TransferMode::Buffered,
            redirect_policy: None,
            resume_from: None,
            mutator: None,
            progress: None,
            cancel: CancelHandle::new(),
            is_alt: false,
        }
    }

    /// GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    /// PUT request.
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// PATCH request.
    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    /// DELETE request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// HEAD request.
    pub fn head(url: impl Into<String>) -> Self {
        Self::new(Method::Head, url)
    }

    /// Set a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Bind a URI-template variable for relative-path expansion.
    pub fn template_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.template_vars.insert(name.into(), value.into());
        self
    }

    /// Set the body.
    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// JSON body from any serializable value.
    pub fn json<T: Serialize + Send + Sync + 'static>(self, value: T) -> Self {
        self.body(Body::json(value))
    }

    /// Form-url-encoded body.
    pub fn form<N: Into<String>, V: Into<String>>(
        self,
        pairs: impl IntoIterator<Item = (N, V)>,
    ) -> Self {
        self.body(Body::form(pairs))
    }

    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retry budget (excludes the initial attempt).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Transfer mode.
    pub fn transfer_mode(mut self, mode: TransferMode) -> Self {
        self.transfer_mode = mode;
        self
    }

    /// Redirect policy override.
    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.redirect_policy = Some(policy);
        self
    }

    /// Resume a previously cancelled transfer.
    pub fn resume_from(mut self, state: ResumableState) -> Self {
        self.resume_from = Some(state);
        self
    }

    /// Install the wire-request mutator, applied last during composition.
    pub fn mutate_url_request(
        mut self,
        mutator: impl Fn(&mut WireRequest) + Send + Sync + 'static,
    ) -> Self {
        self.mutator = Some(Arc::new(mutator));
        self
    }

    /// Install the progress sink.
    pub fn on_progress(mut self, sink: impl Fn(HttpProgress) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(sink));
        self
    }

    /// The cancellation handle for this request.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Resolve the target URL against an optional base, expanding URI
    /// templates and appending query items in order.
    pub(crate) fn resolve_url(&self, base: Option<&Url>) -> Result<Url, Error> {
        let mut url = match &self.url {
            RequestUrl::Absolute(url) => url.clone(),
            RequestUrl::Relative(path) => {
                let base = base.ok_or_else(|| {
                    Error::InvalidUrl(format!(
                        "relative path '{path}' requires a client base URL"
                    ))
                })?;
                let expanded = if path.contains('{') {
                    UriTemplate::parse(path)?.expand(&self.template_vars)
                } else {
                    path.clone()
                };
                base.join(&expanded)?
            }
        };
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("transfer_mode", &self.transfer_mode)
            .field("redirect_policy", &self.redirect_policy)
            .finish_non_exhaustive()
    }
}

/// The composed wire-form request: what the transport actually sends and
/// what stub matchers inspect.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// Identifier of the originating request.
    pub id: RequestId,
    /// HTTP method.
    pub method: Method,
    /// Fully resolved URL.
    pub url: Url,
    /// Effective headers (client defaults merged under request headers).
    pub headers: HeaderStore,
    /// Encoded in-memory body, when the body encodes to bytes.
    pub body: Option<Bytes>,
    /// File path streamed as the body, for file-backed bodies.
    pub body_file: Option<PathBuf>,
    /// Declared body length when known.
    pub content_length: Option<u64>,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Transfer mode for the response body.
    pub transfer_mode: TransferMode,
    /// Effective redirect policy.
    pub redirect_policy: RedirectPolicy,
    /// Resumable state to continue from, if any.
    pub resume: Option<ResumableState>,
}

impl WireRequest {
    /// Render this request as a `curl -v` command line.
    pub fn curl_description(&self) -> String {
        crate::curl::render(self)
    }
}
