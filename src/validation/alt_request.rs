//! Alternate-request validator
//!
//! Triggered when the response status belongs to a configured trigger set
//! (default {401, 403}). Schedules an `After` retry: a user-derived
//! alternate request runs first (outside the outer retry budget), its
//! response mutates the original request, then the original is retried.
//! The typical use is a silent re-login that installs a fresh token header.

use super::{ResponseValidator, ValidatorOutcome};
use crate::request::Request;
use crate::response::Response;
use crate::retry::{AltResponseHook, RetryStrategy};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Builds the alternate request from the failing exchange.
pub type AltRequestBuilder = Arc<dyn Fn(&Request, &Response) -> Request + Send + Sync>;

/// Validator that recovers trigger statuses through an alternate request.
#[derive(Clone)]
pub struct AltRequestValidator {
    trigger_codes: HashSet<u16>,
    delay: Duration,
    build_request: AltRequestBuilder,
    on_response: Option<AltResponseHook>,
}

impl AltRequestValidator {
    /// Create a validator with the default trigger set {401, 403}.
    pub fn new(
        build_request: impl Fn(&Request, &Response) -> Request + Send + Sync + 'static,
        on_response: impl Fn(&mut Request, &Response) + Send + Sync + 'static,
    ) -> Self {
        Self {
            trigger_codes: [401, 403].into_iter().collect(),
            delay: Duration::ZERO,
            build_request: Arc::new(build_request),
            on_response: Some(Arc::new(on_response)),
        }
    }

    /// Replace the trigger set. Add `0` to also cover transport failures.
    pub fn with_trigger_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.trigger_codes = codes.into_iter().collect();
        self
    }

    /// Delay applied between the alternate request and the retry.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl ResponseValidator for AltRequestValidator {
    fn validate(&self, response: &Response, request: &Request) -> ValidatorOutcome {
        // Never trigger on the alternate request itself.
        if request.is_alt {
            return ValidatorOutcome::Next;
        }
        let code = if response.status == 0 && response.error.is_some() {
            0
        } else {
            response.status
        };
        if !self.trigger_codes.contains(&code) {
            return ValidatorOutcome::Next;
        }

        tracing::debug!(
            target: "reqflow::validation",
            status = code,
            url = %response.current_request.url,
            "scheduling alternate request for recovery"
        );
        let alt = (self.build_request)(request, response);
        ValidatorOutcome::Retry(RetryStrategy::After {
            request: Box::new(alt),
            delay: self.delay,
            on_response: self.on_response.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::response;

    fn validator() -> AltRequestValidator {
        AltRequestValidator::new(
            |_req, _resp| Request::post("https://auth.example.com/token"),
            |req, _resp| req.headers.set("X-Token", "fresh"),
        )
    }

    #[test]
    fn trigger_status_schedules_after_retry() {
        let request = Request::get("https://example.com/private");
        match validator().validate(&response(401, b""), &request) {
            ValidatorOutcome::Retry(RetryStrategy::After { request, .. }) => {
                assert_eq!(request.method, crate::request::Method::Post);
            }
            _ => panic!("expected after-retry"),
        }
    }

    #[test]
    fn non_trigger_status_passes_through() {
        let request = Request::get("https://example.com/private");
        match validator().validate(&response(500, b""), &request) {
            ValidatorOutcome::Next => {}
            _ => panic!("expected pass"),
        }
    }

    #[test]
    fn alternate_requests_are_not_re_triggered() {
        let mut request = Request::get("https://example.com/private");
        request.is_alt = true;
        match validator().validate(&response(401, b""), &request) {
            ValidatorOutcome::Next => {}
            _ => panic!("alt request must not recurse"),
        }
    }

    #[test]
    fn sentinel_zero_covers_transport_failures() {
        let validator = validator().with_trigger_codes([401, 0]);
        let mut resp = response(0, b"");
        resp.error = Some(crate::error::Error::MissingConnection("down".into()));
        let request = Request::get("https://example.com/private");
        match validator.validate(&resp, &request) {
            ValidatorOutcome::Retry(_) => {}
            _ => panic!("expected retry on transport failure"),
        }
    }
}
