//! Progress events
//!
//! A small publish–subscribe contract with a single sink per request.
//! The loader may coalesce updates; events for one request are delivered in
//! the order they occur and never interleave between attempts.

use bytes::Bytes;
use std::sync::Arc;

/// Kind of progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Request body bytes written to the wire.
    Upload,
    /// Response body bytes received.
    Download,
    /// First event after a transfer successfully resumed from prior state.
    Resumed,
    /// Final event when the transfer aborted with partial bytes.
    Failed,
}

/// A progress update delivered to the request's sink.
#[derive(Debug, Clone)]
pub struct HttpProgress {
    /// What happened.
    pub event: ProgressEvent,
    /// Bytes transferred so far.
    pub current_length: u64,
    /// Expected total, `0` when unknown.
    pub expected_length: u64,
    /// `current / expected` in percent, `0.0` when the total is unknown.
    pub percentage: f64,
    /// Partial body bytes, populated on [`ProgressEvent::Failed`].
    pub partial_data: Option<Bytes>,
}

impl HttpProgress {
    /// Build an update, deriving the percentage.
    pub fn new(event: ProgressEvent, current_length: u64, expected_length: u64) -> Self {
        let percentage = if expected_length > 0 {
            (current_length as f64 / expected_length as f64) * 100.0
        } else {
            0.0
        };
        Self {
            event,
            current_length,
            expected_length,
            percentage,
            partial_data: None,
        }
    }

    /// Attach partial body bytes (used on [`ProgressEvent::Failed`]).
    pub fn with_partial_data(mut self, data: Bytes) -> Self {
        self.partial_data = Some(data);
        self
    }
}

/// The per-request progress sink.
pub type ProgressSink = Arc<dyn Fn(HttpProgress) + Send + Sync>;

/// Deliver an update to an optional sink.
pub(crate) fn emit(sink: Option<&ProgressSink>, progress: HttpProgress) {
    if let Some(sink) = sink {
        sink(progress);
    }
}
