//! Default response validator
//!
//! Always present in a client's chain unless explicitly removed. Rejects
//! unexpected empty bodies and converts retriable error statuses (or
//! transport failures) into exponential-backoff retries while the request's
//! budget permits.

use super::{ResponseValidator, ValidatorOutcome};
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::retry::RetryStrategy;
use std::collections::HashSet;
use std::time::Duration;

// Statuses whose body is empty by definition.
const NON_CONTENT_STATUSES: [u16; 3] = [204, 205, 304];

/// The default validator installed by every client.
#[derive(Debug, Clone)]
pub struct DefaultValidator {
    /// Whether a zero-length 2xx body is acceptable.
    pub allows_empty_responses: bool,
    /// Status codes eligible for retry; `0` is the synthetic "no status"
    /// code representing transport failure.
    pub retriable_status_codes: HashSet<u16>,
    /// Base delay of the exponential backoff handed to the executor.
    pub retry_delay_base: Duration,
    /// Cap on the exponential backoff delay.
    pub retry_delay_cap: Duration,
    /// Retry budget used when the request does not set its own.
    pub default_max_retries: u32,
}

impl Default for DefaultValidator {
    fn default() -> Self {
        Self {
            allows_empty_responses: false,
            retriable_status_codes: crate::defaults::retry::RETRIABLE_STATUS_CODES
                .iter()
                .copied()
                .collect(),
            retry_delay_base: crate::defaults::retry::DELAY_BASE,
            retry_delay_cap: crate::defaults::retry::DELAY_CAP,
            default_max_retries: crate::defaults::retry::MAX_RETRIES,
        }
    }
}

impl DefaultValidator {
    /// A validator with the library defaults.
    pub fn new() -> Self {
        Self::default()
    }

    fn effective_code(response: &Response) -> u16 {
        if response.status == 0 && response.error.is_some() {
            0
        } else {
            response.status
        }
    }
}

impl ResponseValidator for DefaultValidator {
    fn validate(&self, response: &Response, request: &Request) -> ValidatorOutcome {
        let status_is_error = response.status_class().is_error();
        let transport_failed = response.error.is_some() || response.status == 0;

        if status_is_error || transport_failed {
            let code = Self::effective_code(response);
            let budget = request.max_retries.unwrap_or(self.default_max_retries);
            // A carried error must itself be retryable (a stub miss or a
            // validator rejection never is). The executor owns the budget:
            // a retry requested at the edge is converted to
            // `RetryAttemptsReached` there.
            let error_retryable = response
                .error
                .as_ref()
                .map(Error::is_retryable)
                .unwrap_or(true);
            if self.retriable_status_codes.contains(&code)
                && error_retryable
                && response.retries_used <= budget
            {
                return ValidatorOutcome::Retry(RetryStrategy::Exponential {
                    base: self.retry_delay_base,
                    cap: self.retry_delay_cap,
                });
            }
            let err = response.error.clone().unwrap_or_else(|| Error::Network {
                status: response.status,
                message: format!("HTTP {}", response.status),
            });
            return ValidatorOutcome::Fail(err);
        }

        if !self.allows_empty_responses
            && response.body_len() == 0
            && !NON_CONTENT_STATUSES.contains(&response.status)
        {
            return ValidatorOutcome::Fail(Error::EmptyResponse);
        }

        ValidatorOutcome::Next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::tests::response;

    fn validator() -> DefaultValidator {
        DefaultValidator::new()
    }

    #[test]
    fn success_with_body_passes() {
        let request = Request::get("https://example.com/");
        match validator().validate(&response(200, b"ok"), &request) {
            ValidatorOutcome::Next => {}
            _ => panic!("expected pass"),
        }
    }

    #[test]
    fn empty_success_body_fails_when_disallowed() {
        let request = Request::get("https://example.com/");
        match validator().validate(&response(200, b""), &request) {
            ValidatorOutcome::Fail(Error::EmptyResponse) => {}
            _ => panic!("expected empty-response failure"),
        }
    }

    #[test]
    fn non_content_statuses_may_be_empty() {
        let request = Request::get("https://example.com/");
        for status in [204, 205, 304] {
            match validator().validate(&response(status, b""), &request) {
                ValidatorOutcome::Next => {}
                _ => panic!("status {status} should pass with an empty body"),
            }
        }
    }

    #[test]
    fn retriable_status_inside_budget_retries_exponentially() {
        let request = Request::get("https://example.com/").max_retries(2);
        match validator().validate(&response(503, b""), &request) {
            ValidatorOutcome::Retry(RetryStrategy::Exponential { .. }) => {}
            _ => panic!("expected exponential retry"),
        }
    }

    #[test]
    fn budget_edge_still_requests_a_retry() {
        // The executor converts this into `RetryAttemptsReached`.
        let request = Request::get("https://example.com/").max_retries(1);
        let mut resp = response(503, b"");
        resp.retries_used = 1;
        match validator().validate(&resp, &request) {
            ValidatorOutcome::Retry(_) => {}
            _ => panic!("expected retry at the budget edge"),
        }
    }

    #[test]
    fn non_retriable_client_error_fails() {
        let request = Request::get("https://example.com/").max_retries(5);
        match validator().validate(&response(404, b"missing"), &request) {
            ValidatorOutcome::Fail(Error::Network { status: 404, .. }) => {}
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn non_retryable_carried_error_fails_outright() {
        let request = Request::get("https://example.com/").max_retries(5);
        let mut resp = response(0, b"");
        resp.error = Some(Error::StubNotFound("http://nowhere/".into()));
        match validator().validate(&resp, &request) {
            ValidatorOutcome::Fail(Error::StubNotFound(_)) => {}
            _ => panic!("stub misses must not be retried"),
        }
    }

    #[test]
    fn transport_failure_uses_synthetic_code_zero() {
        let request = Request::get("https://example.com/").max_retries(1);
        let mut resp = response(0, b"");
        resp.error = Some(Error::MissingConnection("refused".into()));
        match validator().validate(&resp, &request) {
            ValidatorOutcome::Retry(_) => {}
            _ => panic!("code 0 is retriable by default"),
        }
    }
}
