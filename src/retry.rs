//! Retry strategies
//!
//! A tagged value describing how a retry should be scheduled. Delay
//! computation lives here; the executor owns the budget bookkeeping and the
//! actual sleeping.

use crate::request::Request;
use crate::response::Response;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Hook invoked with the alternate request's response to mutate the original
/// request before it is retried (typical use: install an auth header).
pub type AltResponseHook = Arc<dyn Fn(&mut Request, &Response) + Send + Sync>;

/// How a retry should be scheduled.
#[derive(Clone)]
pub enum RetryStrategy {
    /// Retry without delay.
    Immediate,
    /// Retry after a fixed delay.
    Delayed(Duration),
    /// Exponential backoff: `min(cap, base × 2^(retries_used − 1))`.
    Exponential {
        /// First-retry delay.
        base: Duration,
        /// Upper bound on the computed delay.
        cap: Duration,
    },
    /// Fibonacci backoff: `min(cap, fib(retries_used))` seconds.
    Fibonacci {
        /// Upper bound on the computed delay.
        cap: Duration,
    },
    /// Run an alternate request first (not subject to the outer retry
    /// budget), let its response mutate the original request, then retry
    /// after `delay`.
    After {
        /// The alternate request.
        request: Box<Request>,
        /// Delay applied after the alternate request completes.
        delay: Duration,
        /// Mutates the original request using the alternate response.
        on_response: Option<AltResponseHook>,
    },
}

impl RetryStrategy {
    /// Compute the delay for the given retry ordinal (1-based: the first
    /// retry passes `1`).
    pub fn delay_for(&self, retries_used: u32) -> Duration {
        match self {
            Self::Immediate => Duration::ZERO,
            Self::Delayed(delay) => *delay,
            Self::Exponential { base, cap } => {
                let exponent = retries_used.saturating_sub(1).min(31);
                let scaled = base.saturating_mul(1u32 << exponent);
                scaled.min(*cap)
            }
            Self::Fibonacci { cap } => {
                Duration::from_secs(fibonacci(retries_used)).min(*cap)
            }
            Self::After { delay, .. } => *delay,
        }
    }

    /// Short name for logging and delegate reporting.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Delayed(_) => "delayed",
            Self::Exponential { .. } => "exponential",
            Self::Fibonacci { .. } => "fibonacci",
            Self::After { .. } => "after",
        }
    }
}

impl fmt::Debug for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => f.write_str("Immediate"),
            Self::Delayed(delay) => f.debug_tuple("Delayed").field(delay).finish(),
            Self::Exponential { base, cap } => f
                .debug_struct("Exponential")
                .field("base", base)
                .field("cap", cap)
                .finish(),
            Self::Fibonacci { cap } => f.debug_struct("Fibonacci").field("cap", cap).finish(),
            Self::After { delay, .. } => f
                .debug_struct("After")
                .field("delay", delay)
                .finish_non_exhaustive(),
        }
    }
}

fn fibonacci(n: u32) -> u64 {
    let (mut a, mut b) = (0u64, 1u64);
    for _ in 0..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    a
}
