//! Default Configuration Values
//!
//! This module centralizes all default values used throughout reqflow.
//! Having defaults in one place makes them easier to maintain, document,
//! and adjust.

use std::time::Duration;

/// HTTP client default configurations
pub mod http {
    use super::*;

    /// Default wall-clock timeout applied to each attempt of a request.
    ///
    /// Applied per attempt, not to the sum across retries.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    /// Default connection timeout for establishing HTTP connections.
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default `Accept-Encoding` header value.
    pub const ACCEPT_ENCODING: &str = "gzip, deflate";

    /// Default `Accept-Language` header value.
    pub const ACCEPT_LANGUAGE: &str = "en-US;q=1.0";

    /// Maximum number of redirect hops the bundled loader will chase.
    pub const MAX_REDIRECTS: u32 = 10;

    /// Build the default `User-Agent` string from the host crate identifiers.
    pub fn user_agent() -> String {
        format!(
            "{}/{} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS
        )
    }
}

/// Retry default configurations
pub mod retry {
    use super::*;

    /// Default maximum number of retries per request (excludes the initial
    /// attempt).
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for the default validator's exponential backoff.
    pub const DELAY_BASE: Duration = Duration::from_millis(500);

    /// Upper bound on any computed retry delay.
    pub const DELAY_CAP: Duration = Duration::from_secs(30);

    /// HTTP status codes the default validator treats as retriable.
    ///
    /// `0` is the synthetic "no status" code used when the transport failed
    /// before producing a status line.
    pub const RETRIABLE_STATUS_CODES: &[u16] = &[0, 408, 429, 500, 502, 503, 504];
}
