//! Interceptor transport shim
//!
//! A [`Transport`] that consults the stub registry before touching the
//! network. When the registry routes a request to a rule, the shim
//! synthesizes the response locally: it resolves the rule's responder for
//! the method (a producer wins over a static response), merges cookies with
//! the client's jar, honors the configured response delay (cancellable),
//! surfaces synthetic transport failures, emits redirect events for
//! redirect statuses, and delivers headers then body through the progress
//! sink. Everything else is delegated to the wrapped real transport.

use super::{FetchContext, LoaderResponse, Transport, is_redirect_status, spill_path};
use crate::error::Error;
use crate::metrics::{Metrics, Stage, Transaction};
use crate::progress::{HttpProgress, ProgressEvent, emit};
use crate::request::{TransferMode, WireRequest};
use crate::stub::{StubDecision, StubRegistry, StubResponder, StubResponse, StubRule, UnhandledMode};
use async_trait::async_trait;
use std::sync::Arc;

/// Transport shim that can short-circuit the real transport with locally
/// synthesized responses.
pub struct StubTransport {
    real: Arc<dyn Transport>,
    registry: Arc<StubRegistry>,
}

impl StubTransport {
    /// Wrap a real transport, consulting the process-wide registry.
    pub fn new(real: Arc<dyn Transport>) -> Self {
        Self {
            real,
            registry: crate::stub::shared(),
        }
    }

    /// Wrap a real transport with an explicit registry (useful in tests).
    pub fn with_registry(real: Arc<dyn Transport>, registry: Arc<StubRegistry>) -> Self {
        Self { real, registry }
    }

    async fn synthesize(
        &self,
        request: &WireRequest,
        ctx: &FetchContext,
        rule: StubRule,
    ) -> LoaderResponse {
        // 1. Pick the responder for this method; a rule without one behaves
        //    like an unmatched request.
        let Some(responder) = rule.responder(request.method) else {
            return match self.registry.unhandled_mode() {
                UnhandledMode::OptIn => self.real.fetch(request, ctx).await,
                UnhandledMode::OptOut => {
                    LoaderResponse::failure(request, Error::StubNotFound(request.url.to_string()))
                }
            };
        };

        // 2. Inject stored cookies so the producer sees the same wire
        //    headers a real server would.
        let mut effective = request.clone();
        if let Some(cookies) = &ctx.cookies {
            if let Some(value) = cookies.header_value_for(&request.url) {
                effective.headers.set("Cookie", value);
            }
        }

        // 3. Resolve the stub response.
        let stub: StubResponse = match responder {
            StubResponder::Static(response) => response.clone(),
            StubResponder::Producer(producer) => producer(&effective, &rule),
        };

        tracing::debug!(
            target: "reqflow::stub",
            url = %request.url,
            method = %request.method,
            status = stub.status,
            "serving stubbed response"
        );

        // 4. Honor the response delay; cancelling the request also cancels
        //    the pending timer.
        if let Some(delay) = stub.response_delay {
            tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    return LoaderResponse::failure(request, Error::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        // 5. Synthetic transport failure.
        if let Some(error) = stub.fail_error.clone() {
            return LoaderResponse::failure(request, error);
        }

        let task = Stage::begin();

        // 6. Build the response headers.
        let mut headers = stub.headers.clone();
        if let Some(content_type) = &stub.content_type {
            headers.set("Content-Type", content_type.clone());
        }
        if let Some(cache) = stub.cache_policy.header_value() {
            headers.set("Cache-Control", cache);
        }
        headers.set("Content-Length", stub.body.len().to_string());

        // Harvest Set-Cookie headers into the jar, keyed by the request URL.
        if let Some(cookies) = &ctx.cookies {
            cookies.store_from_headers(&request.url, &headers);
        }

        // 7. Emit a redirect event for redirect statuses. A `Location`
        //    header is honored first; a textual body target is accepted for
        //    compatibility.
        if is_redirect_status(stub.status) {
            let target = headers
                .value("location")
                .map(str::to_string)
                .or_else(|| {
                    std::str::from_utf8(&stub.body)
                        .ok()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                });
            if let Some(target) = target {
                if let Ok(new_url) = request.url.join(&target) {
                    ctx.delegate.will_perform_redirect(request, &new_url);
                }
            }
        }

        // 8. Deliver the body through the progress sink, respecting the
        //    transfer mode.
        let total = stub.body.len() as u64;
        emit(
            ctx.progress.as_ref(),
            HttpProgress::new(ProgressEvent::Download, total, total),
        );
        let (data, data_file) = match request.transfer_mode {
            TransferMode::Buffered => (Some(stub.body.clone()), None),
            TransferMode::LargeData => {
                let path = spill_path(request.id);
                if let Err(e) = tokio::fs::write(&path, &stub.body).await {
                    return LoaderResponse::failure(
                        request,
                        Error::Other(format!(
                            "failed to write spill file {}: {e}",
                            path.display()
                        )),
                    );
                }
                (None, Some(path))
            }
        };

        let mut task = task;
        task.finish();
        let metrics = Metrics {
            task_interval: task,
            redirect_count: 0,
            transactions: vec![Transaction {
                total: task,
                ..Transaction::default()
            }],
        };

        LoaderResponse {
            status: stub.status,
            headers,
            data,
            data_file,
            error: None,
            metrics,
            final_request: request.clone(),
            resumable: None,
        }
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn fetch(&self, request: &WireRequest, ctx: &FetchContext) -> LoaderResponse {
        match self.registry.decide(request) {
            StubDecision::Passthrough => self.real.fetch(request, ctx).await,
            StubDecision::NotFound => {
                tracing::debug!(
                    target: "reqflow::stub",
                    url = %request.url,
                    "no stub matched in opt-out mode"
                );
                LoaderResponse::failure(request, Error::StubNotFound(request.url.to_string()))
            }
            StubDecision::Stub(rule) => self.synthesize(request, ctx, rule).await,
        }
    }
}
