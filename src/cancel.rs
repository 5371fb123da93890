//! Cancellation utilities
//!
//! First-class cancellation handles for in-flight requests. A handle is
//! cloneable; all clones share the same token, so cancelling any of them
//! aborts the request at its current wait point (transport I/O, retry
//! delay, stub delay timer, or alternate-request fetch).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation of a request.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    token: CancellationToken,
    collect_resumable: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            collect_resumable: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation. The request observing this handle stops as soon
    /// as possible and its response carries [`Error::Cancelled`].
    ///
    /// [`Error::Cancelled`]: crate::error::Error::Cancelled
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Request cancellation and ask the loader to produce resumable state
    /// describing the bytes transferred so far, so the request can be
    /// reissued later and continue where it left off.
    pub fn cancel_collecting_resumable(&self) {
        self.collect_resumable.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the caller asked for resumable state on cancellation.
    pub fn wants_resumable(&self) -> bool {
        self.collect_resumable.load(Ordering::SeqCst)
    }

    /// A future that resolves when cancellation is requested.
    pub fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
