//! Transport layer
//!
//! The injectable transport abstraction: a transport performs one
//! underlying transfer and returns a completed [`LoaderResponse`] (transport
//! failures ride in its `error` field rather than an `Err`, so the
//! validator chain can decide their fate). The bundled implementations are
//! [`HttpLoader`] (real network traffic over `reqwest`) and
//! [`StubTransport`], the interceptor shim that consults the stub registry
//! and either synthesizes a response or delegates to the real loader.

mod loader;
mod stub;

pub use loader::HttpLoader;
pub use stub::StubTransport;

use crate::cancel::CancelHandle;
use crate::cookies::CookieStorage;
use crate::delegate::ClientDelegate;
use crate::headers::HeaderStore;
use crate::metrics::Metrics;
use crate::progress::ProgressSink;
use crate::request::{RequestId, ResumableState, WireRequest};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Ambient state for one transfer: progress sink, cancellation, the
/// client's cookie jar (when cookie handling is enabled) and its delegate.
#[derive(Clone)]
pub struct FetchContext {
    /// Progress sink of the originating request.
    pub progress: Option<ProgressSink>,
    /// Cancellation handle of the originating request.
    pub cancel: CancelHandle,
    /// Cookie jar shared with the stub shim; `None` disables cookie merging.
    pub cookies: Option<Arc<CookieStorage>>,
    /// The client delegate, for transport-observed lifecycle events.
    pub delegate: Arc<dyn ClientDelegate>,
}

/// Output of one transfer.
#[derive(Debug, Clone)]
pub struct LoaderResponse {
    /// Status code, `0` when no status line was received.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderStore,
    /// Body bytes (buffered mode).
    pub data: Option<Bytes>,
    /// Spill file holding the body (large-data mode).
    pub data_file: Option<PathBuf>,
    /// Transport failure, if the transfer did not complete.
    pub error: Option<crate::error::Error>,
    /// Per-transfer metrics (one transaction per hop).
    pub metrics: Metrics,
    /// The wire request actually answered, after redirects.
    pub final_request: WireRequest,
    /// Resumable state, when the transfer was cancelled with resumption
    /// requested.
    pub resumable: Option<ResumableState>,
}

impl LoaderResponse {
    /// A response representing a transport failure for `request`.
    pub fn failure(request: &WireRequest, error: crate::error::Error) -> Self {
        Self {
            status: 0,
            headers: HeaderStore::new(),
            data: None,
            data_file: None,
            error: Some(error),
            metrics: Metrics::default(),
            final_request: request.clone(),
            resumable: None,
        }
    }
}

/// A transport performs one underlying network transfer.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Drive `request` to completion.
    async fn fetch(&self, request: &WireRequest, ctx: &FetchContext) -> LoaderResponse;
}

/// Allocate a consumer-owned spill file path for a large-data transfer.
pub(crate) fn spill_path(id: RequestId) -> PathBuf {
    std::env::temp_dir().join(format!("reqflow-{id}-{}.download", Uuid::new_v4()))
}

pub(crate) fn is_redirect_status(status: u16) -> bool {
    // 304 is a cache validation answer and 305 is the deprecated
    // use-proxy status; neither carries a target to follow.
    (300..400).contains(&status) && status != 304 && status != 305
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_statuses_exclude_304_and_305() {
        assert!(is_redirect_status(301));
        assert!(is_redirect_status(302));
        assert!(is_redirect_status(307));
        assert!(!is_redirect_status(304));
        assert!(!is_redirect_status(305));
        assert!(!is_redirect_status(200));
        assert!(!is_redirect_status(404));
    }
}
