//! Validator Chain
//!
//! Ordered list of validators evaluated against each completed response.
//! Each validator returns one of {next, next-with-replacement, fail, retry};
//! the chain terminates on the first non-`next` outcome, and if every
//! validator passes, the (possibly replaced) response is delivered.

mod alt_request;
mod default;

pub use alt_request::AltRequestValidator;
pub use default::DefaultValidator;

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::retry::RetryStrategy;
use std::sync::Arc;

/// Outcome of a single validator.
pub enum ValidatorOutcome {
    /// Proceed to the next validator.
    Next,
    /// Proceed to the next validator with a replacement response.
    NextWithResponse(Box<Response>),
    /// Terminate the pass and fail the request.
    Fail(Error),
    /// Terminate the pass and schedule a retry.
    Retry(RetryStrategy),
}

/// A function deciding a completed response's fate.
pub trait ResponseValidator: Send + Sync {
    /// Evaluate the response in the context of its originating request.
    fn validate(&self, response: &Response, request: &Request) -> ValidatorOutcome;
}

impl<F> ResponseValidator for F
where
    F: Fn(&Response, &Request) -> ValidatorOutcome + Send + Sync,
{
    fn validate(&self, response: &Response, request: &Request) -> ValidatorOutcome {
        self(response, request)
    }
}

/// Terminal decision of a full chain pass.
pub enum ChainDecision {
    /// Deliver the (possibly replaced) response.
    Deliver(Response),
    /// Fail with the given error attached to the response.
    Fail(Response, Error),
    /// Schedule a retry of the request.
    Retry(Response, RetryStrategy),
}

/// Run the chain strictly in order over `response`.
pub fn evaluate(
    validators: &[Arc<dyn ResponseValidator>],
    mut response: Response,
    request: &Request,
) -> ChainDecision {
    for validator in validators {
        match validator.validate(&response, request) {
            ValidatorOutcome::Next => {}
            ValidatorOutcome::NextWithResponse(replacement) => response = *replacement,
            ValidatorOutcome::Fail(err) => return ChainDecision::Fail(response, err),
            ValidatorOutcome::Retry(strategy) => return ChainDecision::Retry(response, strategy),
        }
    }
    ChainDecision::Deliver(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderStore;
    use crate::metrics::Metrics;
    use crate::request::{Method, RedirectPolicy, TransferMode, WireRequest};
    use std::time::Duration;

    fn wire() -> WireRequest {
        WireRequest {
            id: uuid::Uuid::new_v4(),
            method: Method::Get,
            url: url::Url::parse("https://example.com/").unwrap(),
            headers: HeaderStore::new(),
            body: None,
            body_file: None,
            content_length: None,
            timeout: Duration::from_secs(30),
            transfer_mode: TransferMode::Buffered,
            redirect_policy: RedirectPolicy::Follow,
            resume: None,
        }
    }

    pub(super) fn response(status: u16, body: &'static [u8]) -> Response {
        let wire = wire();
        Response {
            status,
            headers: HeaderStore::new(),
            data: Some(bytes::Bytes::from_static(body)),
            data_file: None,
            error: None,
            metrics: Metrics::default(),
            original_request: wire.clone(),
            current_request: wire,
            retries_used: 0,
            request_id: uuid::Uuid::new_v4(),
            resumable: None,
        }
    }

    #[test]
    fn chain_stops_on_first_non_next_outcome() {
        let fail: Arc<dyn ResponseValidator> = Arc::new(|_: &Response, _: &Request| {
            ValidatorOutcome::Fail(Error::ValidatorFailure("nope".into()))
        });
        let never: Arc<dyn ResponseValidator> =
            Arc::new(|_: &Response, _: &Request| -> ValidatorOutcome {
                panic!("validator after a terminal outcome must not run")
            });

        let request = Request::get("https://example.com/");
        match evaluate(&[fail, never], response(200, b"ok"), &request) {
            ChainDecision::Fail(_, Error::ValidatorFailure(_)) => {}
            _ => panic!("expected failure decision"),
        }
    }

    #[test]
    fn replacement_response_flows_to_later_validators() {
        let replace: Arc<dyn ResponseValidator> = Arc::new(|r: &Response, _: &Request| {
            let mut replacement = r.clone();
            replacement.status = 299;
            ValidatorOutcome::NextWithResponse(Box::new(replacement))
        });
        let check: Arc<dyn ResponseValidator> = Arc::new(|r: &Response, _: &Request| {
            assert_eq!(r.status, 299);
            ValidatorOutcome::Next
        });

        let request = Request::get("https://example.com/");
        match evaluate(&[replace, check], response(200, b"ok"), &request) {
            ChainDecision::Deliver(delivered) => assert_eq!(delivered.status, 299),
            _ => panic!("expected delivery"),
        }
    }
}
