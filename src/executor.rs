//! Request executor
//!
//! The orchestration loop: compose the wire-form request, invoke the
//! transport (through the interceptor shim), run the validator chain, honor
//! retries up to the per-request budget (applying strategy delays and
//! executing alternate requests where asked), and produce the final
//! response.
//!
//! `execute` returns `Err` only for failures that occur before any
//! transport call (URL composition, body encoding). Once a transfer has
//! been attempted, the outcome is always a [`Response`], carrying its error
//! (if any) for the caller to inspect.

use crate::body::Payload;
use crate::client::Client;
use crate::error::Error;
use crate::metrics::{Metrics, Stage};
use crate::request::{Request, WireRequest};
use crate::response::Response;
use crate::retry::RetryStrategy;
use crate::transport::FetchContext;
use crate::validation::{self, ChainDecision};
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;

// Recursion indirection: the `after` strategy runs a nested fetch.
pub(crate) fn execute_boxed(
    client: Client,
    request: Request,
) -> Pin<Box<dyn Future<Output = Result<Response, Error>> + Send>> {
    Box::pin(execute(client, request))
}

pub(crate) async fn execute(client: Client, mut request: Request) -> Result<Response, Error> {
    let task_start = Utc::now();
    let mut metrics = Metrics::default();
    let mut retries_used: u32 = 0;
    let max_retries = request.max_retries.unwrap_or(client.config().max_retries);
    let mut original_wire: Option<WireRequest> = None;

    loop {
        // 1-2. Compose the wire request from a snapshot of the mutable
        // request fields. Construction and encoding errors fail the request
        // before any transport call.
        let wire = compose(&client, &request).await?;
        if original_wire.is_none() {
            original_wire = Some(wire.clone());
            // 3. The request is about to enter the transport.
            client.delegate().did_enqueue(&wire);
            tracing::debug!(
                target: "reqflow::executor",
                method = %wire.method,
                url = %wire.url,
                "request enqueued"
            );
        }

        // 4. One transfer through the interceptor shim. Progress events are
        // delivered straight to the request's sink.
        let ctx = FetchContext {
            progress: request.progress.clone(),
            cancel: request.cancel.clone(),
            cookies: client.cookie_context(),
            delegate: client.delegate(),
        };
        let loaded = client.transport().fetch(&wire, &ctx).await;

        // 5. Build the response for this attempt.
        metrics.absorb(loaded.metrics);
        let response = Response {
            status: loaded.status,
            headers: loaded.headers,
            data: loaded.data,
            data_file: loaded.data_file,
            error: loaded.error,
            metrics: metrics.clone(),
            original_request: original_wire
                .clone()
                .unwrap_or_else(|| wire.clone()),
            current_request: loaded.final_request,
            retries_used,
            request_id: request.id,
            resumable: loaded.resumable,
        };

        // Cancellation is terminal; the validator chain never sees it.
        if matches!(response.error, Some(Error::Cancelled)) {
            return Ok(finalize(&client, &wire, response, task_start));
        }

        // 6. Run the validator chain strictly in order.
        match validation::evaluate(client.validators(), response, &request) {
            ChainDecision::Deliver(response) => {
                return Ok(finalize(&client, &wire, response, task_start));
            }
            ChainDecision::Fail(mut response, error) => {
                tracing::debug!(
                    target: "reqflow::executor",
                    url = %wire.url,
                    err = %error,
                    "validator chain failed the response"
                );
                response.error = Some(error);
                return Ok(finalize(&client, &wire, response, task_start));
            }
            ChainDecision::Retry(prior, strategy) => {
                retries_used += 1;
                if retries_used > max_retries {
                    let mut response = prior;
                    response.error = Some(Error::RetryAttemptsReached);
                    return Ok(finalize(&client, &wire, response, task_start));
                }

                // Compute the delay; the `after` strategy runs its
                // alternate request first, outside this request's budget.
                let delay = match &strategy {
                    RetryStrategy::After {
                        request: alt,
                        delay,
                        on_response,
                    } => {
                        let mut alt = (**alt).clone();
                        alt.is_alt = true;
                        // Parent cancellation reaches into the nested fetch.
                        alt.cancel = request.cancel.clone();
                        match execute_boxed(client.clone(), alt).await {
                            Ok(alt_response) => match &alt_response.error {
                                None => {
                                    if let Some(hook) = on_response {
                                        hook(&mut request, &alt_response);
                                    }
                                    *delay
                                }
                                Some(Error::Cancelled) => {
                                    let mut response = prior;
                                    response.error = Some(Error::Cancelled);
                                    return Ok(finalize(&client, &wire, response, task_start));
                                }
                                Some(err) => {
                                    let mut response = prior;
                                    response.error = Some(Error::SessionError(format!(
                                        "alternate request failed: {err}"
                                    )));
                                    return Ok(finalize(&client, &wire, response, task_start));
                                }
                            },
                            Err(err) => {
                                let mut response = prior;
                                response.error = Some(Error::SessionError(format!(
                                    "alternate request failed: {err}"
                                )));
                                return Ok(finalize(&client, &wire, response, task_start));
                            }
                        }
                    }
                    other => other.delay_for(retries_used),
                };

                client.delegate().will_retry(&wire, &strategy, &prior);
                tracing::debug!(
                    target: "reqflow::executor",
                    url = %wire.url,
                    strategy = strategy.name(),
                    retry = retries_used,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request"
                );

                if !delay.is_zero() {
                    tokio::select! {
                        _ = request.cancel.cancelled() => {
                            let mut response = prior;
                            response.error = Some(Error::Cancelled);
                            return Ok(finalize(&client, &wire, response, task_start));
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                // Back to step 4 with the (possibly mutated) request.
            }
        }
    }
}

// 7. Close the metrics envelope and notify the delegate, in order.
fn finalize(
    client: &Client,
    wire: &WireRequest,
    mut response: Response,
    task_start: chrono::DateTime<Utc>,
) -> Response {
    response.metrics.task_interval = Stage::span(task_start, Utc::now());
    client.delegate().did_collect_metrics(wire, &response.metrics);
    client.delegate().did_finish(wire, &response);
    response
}

async fn compose(client: &Client, request: &Request) -> Result<WireRequest, Error> {
    // Client defaults snapshot merged under the request's headers; the
    // request wins on collisions.
    let mut headers = client.default_headers_snapshot();
    headers.merge(&request.headers);

    let url = request.resolve_url(client.base_url())?;

    let encoded = request.body.encode().await?;
    let (body, body_file, content_length) = match encoded.payload {
        Payload::Empty => (None, None, None),
        Payload::Bytes(bytes) => {
            let length = bytes.len() as u64;
            (Some(bytes), None, Some(length))
        }
        Payload::File(path) => (None, Some(path), encoded.content_length),
    };
    if let Some(content_type) = encoded.content_type {
        if !headers.contains("content-type") {
            headers.set("Content-Type", content_type);
        }
    }

    let mut wire = WireRequest {
        id: request.id,
        method: request.method,
        url,
        headers,
        body,
        body_file,
        content_length,
        timeout: request.timeout.unwrap_or(client.config().timeout),
        transfer_mode: request.transfer_mode,
        redirect_policy: request
            .redirect_policy
            .unwrap_or(client.config().redirect_policy),
        resume: request.resume_from.clone(),
    };

    // The user-supplied mutator runs last.
    if let Some(mutator) = &request.mutator {
        mutator(&mut wire);
    }
    Ok(wire)
}
