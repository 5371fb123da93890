//! Client delegate
//!
//! Lifecycle observation hooks for a client. All hooks have no-op defaults;
//! implement the ones you care about. For a single request the callbacks
//! arrive in order: `did_enqueue` → `task_waiting_for_connectivity?` →
//! (`will_perform_redirect` | `did_receive_auth_challenge`)* →
//! `will_retry?` → `did_collect_metrics` → `did_finish`. No ordering is
//! guaranteed across distinct requests.

use crate::metrics::Metrics;
use crate::request::WireRequest;
use crate::response::Response;
use crate::retry::RetryStrategy;
use url::Url;

/// An authentication challenge surfaced from a 401/407 response.
#[derive(Debug, Clone)]
pub struct AuthChallenge {
    /// Status code that carried the challenge (401 or 407).
    pub status: u16,
    /// Raw `WWW-Authenticate` / `Proxy-Authenticate` header value.
    pub challenge: String,
    /// Whether the challenge came from a proxy.
    pub proxy: bool,
}

/// Client-wide lifecycle observer.
pub trait ClientDelegate: Send + Sync {
    /// A request was composed and handed to the transport.
    fn did_enqueue(&self, _request: &WireRequest) {}

    /// The transport could not reach the network and the request is waiting.
    fn task_waiting_for_connectivity(&self, _request: &WireRequest) {}

    /// A redirect is about to be chased.
    fn will_perform_redirect(&self, _request: &WireRequest, _new_url: &Url) {}

    /// The server answered with an authentication challenge.
    fn did_receive_auth_challenge(&self, _request: &WireRequest, _challenge: &AuthChallenge) {}

    /// A retry is about to be scheduled with the given strategy.
    fn will_retry(&self, _request: &WireRequest, _strategy: &RetryStrategy, _response: &Response) {}

    /// Metrics for the finished task were collected.
    fn did_collect_metrics(&self, _request: &WireRequest, _metrics: &Metrics) {}

    /// The request finished and its response is about to be delivered.
    fn did_finish(&self, _request: &WireRequest, _response: &Response) {}
}

/// The default do-nothing delegate.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDelegate;

impl ClientDelegate for NoopDelegate {}
