//! Transfer metrics
//!
//! Per-request timing records: an envelope task interval, a redirect count,
//! and one transaction block per attempt or redirect hop. Stages the
//! transport cannot observe (DNS lookup and connection setup belong to the
//! connection pool) are recorded as empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single timed stage: `(start, end, duration)`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Stage {
    /// When the stage began, if observed.
    pub start: Option<DateTime<Utc>>,
    /// When the stage ended, if observed.
    pub end: Option<DateTime<Utc>>,
}

impl Stage {
    /// A stage spanning `start..end`.
    pub fn span(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Begin a stage now, with no end yet.
    pub fn begin() -> Self {
        Self {
            start: Some(Utc::now()),
            end: None,
        }
    }

    /// Close the stage now.
    pub fn finish(&mut self) {
        self.end = Some(Utc::now());
    }

    /// Elapsed duration, zero when the stage was not observed.
    pub fn duration(&self) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }
}

/// Timing stages for one network transaction (one attempt or redirect hop).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// DNS resolution.
    pub domain_lookup: Stage,
    /// TCP connection establishment.
    pub connect: Stage,
    /// TLS handshake.
    pub secure_connection: Stage,
    /// Writing the request to the wire.
    pub request: Stage,
    /// Server think time (request written → first response byte).
    pub server: Stage,
    /// Reading the response body.
    pub response: Stage,
    /// Whole transaction.
    pub total: Stage,
}

/// Metrics record for a completed request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Envelope interval covering the whole task, retries included.
    pub task_interval: Stage,
    /// Number of redirects chased across all attempts.
    pub redirect_count: u32,
    /// One transaction block per attempt or redirect hop, in order.
    pub transactions: Vec<Transaction>,
}

impl Metrics {
    /// Fold another attempt's metrics into this record.
    pub(crate) fn absorb(&mut self, other: Metrics) {
        self.redirect_count += other.redirect_count;
        self.transactions.extend(other.transactions);
    }
}
