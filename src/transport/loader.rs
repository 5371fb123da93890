//! Data loader
//!
//! The bundled [`Transport`]: performs one underlying transfer over
//! `reqwest`, streaming the body to memory or to a spill file depending on
//! the transfer mode, collecting per-hop metrics, surfacing progress events
//! and honoring cooperative cancellation (optionally producing resumable
//! state).
//!
//! Redirects are disabled at the `reqwest` level; the loader chases them
//! itself so the redirect policy, the per-hop transaction metrics and the
//! delegate's redirect callback all observe every hop.

use super::{FetchContext, LoaderResponse, Transport, is_redirect_status, spill_path};
use crate::client::ClientConfig;
use crate::delegate::AuthChallenge;
use crate::error::Error;
use crate::headers::HeaderStore;
use crate::metrics::{Metrics, Stage, Transaction};
use crate::progress::{HttpProgress, ProgressEvent, emit};
use crate::request::{Method, RedirectPolicy, ResumableState, TransferMode, WireRequest};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::AsyncWriteExt;

/// The bundled real-network transport.
pub struct HttpLoader {
    client: reqwest::Client,
}

impl HttpLoader {
    /// Build a loader from the client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.connect_timeout)
            .cookie_store(config.http_should_set_cookies)
            .user_agent(crate::defaults::http::user_agent())
            .build()
            .map_err(|e| Error::Internal(format!("failed to build transport client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing `reqwest` client. The client must have redirects
    /// disabled for the loader's redirect policies to apply.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn build_hop(
        &self,
        hop: &WireRequest,
        ctx: &FetchContext,
    ) -> Result<reqwest::RequestBuilder, Error> {
        let mut rb = self
            .client
            .request(hop.method.to_reqwest(), hop.url.clone())
            .headers(hop.headers.to_header_map()?)
            .timeout(hop.timeout);

        if let Some(state) = &hop.resume {
            rb = rb.header(reqwest::header::RANGE, format!("bytes={}-", state.offset));
        }

        if let Some(bytes) = &hop.body {
            rb = rb.body(bytes.clone());
        } else if let Some(path) = &hop.body_file {
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                Error::FailedBuildingUrlRequest(format!(
                    "body file {} unavailable: {e}",
                    path.display()
                ))
            })?;
            let total = hop.content_length.unwrap_or(0);
            let sink = ctx.progress.clone();
            let sent = Arc::new(AtomicU64::new(0));
            let stream = tokio_util::io::ReaderStream::new(file).map(move |chunk| {
                if let Ok(bytes) = &chunk {
                    let current = sent.fetch_add(bytes.len() as u64, Ordering::Relaxed)
                        + bytes.len() as u64;
                    emit(
                        sink.as_ref(),
                        HttpProgress::new(ProgressEvent::Upload, current, total),
                    );
                }
                chunk
            });
            if let Some(length) = hop.content_length {
                rb = rb.header(reqwest::header::CONTENT_LENGTH, length);
            }
            rb = rb.body(reqwest::Body::wrap_stream(stream));
        }
        Ok(rb)
    }
}

#[async_trait]
impl Transport for HttpLoader {
    async fn fetch(&self, request: &WireRequest, ctx: &FetchContext) -> LoaderResponse {
        if ctx.cancel.is_cancelled() {
            return LoaderResponse::failure(request, Error::Cancelled);
        }

        let mut metrics = Metrics::default();
        let mut hop = request.clone();

        loop {
            // 1. Build this hop's wire request.
            let rb = match self.build_hop(&hop, ctx).await {
                Ok(rb) => rb,
                Err(err) => {
                    let mut failure = LoaderResponse::failure(&hop, err);
                    failure.metrics = metrics;
                    return failure;
                }
            };

            // 2. Send, racing cancellation.
            let mut txn = Transaction::default();
            txn.total = Stage::begin();
            txn.request = Stage::begin();
            let sent = tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    let mut failure = LoaderResponse::failure(&hop, Error::Cancelled);
                    failure.metrics = metrics;
                    return failure;
                }
                result = rb.send() => result,
            };
            txn.request.finish();

            let response = match sent {
                Ok(response) => response,
                Err(err) => {
                    let error: Error = err.into();
                    if matches!(error, Error::MissingConnection(_)) {
                        ctx.delegate.task_waiting_for_connectivity(&hop);
                    }
                    tracing::debug!(
                        target: "reqflow::loader",
                        url = %hop.url,
                        err = %error,
                        "transport send failed"
                    );
                    emit(
                        ctx.progress.as_ref(),
                        HttpProgress::new(ProgressEvent::Failed, 0, 0),
                    );
                    txn.total.finish();
                    metrics.transactions.push(txn);
                    let mut failure = LoaderResponse::failure(&hop, error);
                    failure.metrics = metrics;
                    return failure;
                }
            };

            // In-memory bodies are fully written once the response heads
            // back; file bodies report per-chunk while streaming.
            if hop.body.is_some() {
                if let Some(length) = hop.content_length {
                    emit(
                        ctx.progress.as_ref(),
                        HttpProgress::new(ProgressEvent::Upload, length, length),
                    );
                }
            }

            let status = response.status().as_u16();
            let headers = HeaderStore::from_header_map(response.headers());
            txn.server = Stage::span(
                txn.request.end.unwrap_or_else(chrono::Utc::now),
                chrono::Utc::now(),
            );

            // 3. Surface auth challenges to the delegate.
            if status == 401 || status == 407 {
                let proxy = status == 407;
                let header = if proxy { "proxy-authenticate" } else { "www-authenticate" };
                if let Some(value) = headers.value(header) {
                    ctx.delegate.did_receive_auth_challenge(
                        &hop,
                        &AuthChallenge {
                            status,
                            challenge: value.to_string(),
                            proxy,
                        },
                    );
                }
            }

            // 4. Chase redirects unless the policy refuses them.
            if is_redirect_status(status) && hop.redirect_policy != RedirectPolicy::Refuse {
                if let Some(location) = headers.value("location") {
                    if metrics.redirect_count >= crate::defaults::http::MAX_REDIRECTS {
                        let mut failure = LoaderResponse::failure(
                            &hop,
                            Error::Network {
                                status,
                                message: "too many redirects".to_string(),
                            },
                        );
                        failure.metrics = metrics;
                        return failure;
                    }
                    match hop.url.join(location) {
                        Ok(next_url) => {
                            ctx.delegate.will_perform_redirect(&hop, &next_url);
                            tracing::debug!(
                                target: "reqflow::loader",
                                from = %hop.url,
                                to = %next_url,
                                status,
                                "following redirect"
                            );
                            txn.total.finish();
                            metrics.transactions.push(txn);
                            metrics.redirect_count += 1;
                            hop = redirect_hop(hop, next_url, status);
                            continue;
                        }
                        Err(e) => {
                            let mut failure = LoaderResponse::failure(
                                &hop,
                                Error::InvalidResponse(format!(
                                    "redirect target '{location}' is invalid: {e}"
                                )),
                            );
                            failure.metrics = metrics;
                            return failure;
                        }
                    }
                }
            }

            // 5. Stream the body.
            let resumed_from = hop.resume.clone().filter(|_| status == 206);
            txn.response = Stage::begin();
            let outcome = read_body(response, &hop, ctx, &headers, resumed_from).await;
            txn.response.finish();
            txn.total.finish();
            metrics.transactions.push(txn);

            // 6. Assemble the final response.
            return match outcome {
                BodyOutcome::Complete { data, file } => LoaderResponse {
                    status,
                    headers,
                    data,
                    data_file: file,
                    error: None,
                    metrics,
                    final_request: hop,
                    resumable: None,
                },
                BodyOutcome::Cancelled {
                    partial,
                    file,
                    resumable,
                } => LoaderResponse {
                    status,
                    headers,
                    data: partial,
                    data_file: file,
                    error: Some(Error::Cancelled),
                    metrics,
                    final_request: hop,
                    resumable,
                },
                BodyOutcome::Failed {
                    error,
                    partial,
                    file,
                } => LoaderResponse {
                    status,
                    headers,
                    data: partial,
                    data_file: file,
                    error: Some(error),
                    metrics,
                    final_request: hop,
                    resumable: None,
                },
            };
        }
    }
}

fn redirect_hop(mut hop: WireRequest, next_url: url::Url, status: u16) -> WireRequest {
    hop.url = next_url;
    hop.resume = None;
    if hop.redirect_policy == RedirectPolicy::FollowWithOriginalSettings {
        return hop;
    }
    // Standard semantics: 303 always switches to GET; 301/302 do for
    // non-GET/HEAD requests. 307/308 keep the method and body.
    let downgrade = status == 303
        || ((status == 301 || status == 302)
            && !matches!(hop.method, Method::Get | Method::Head));
    if downgrade {
        hop.method = Method::Get;
        hop.body = None;
        hop.body_file = None;
        hop.content_length = None;
        hop.headers.remove("content-type");
        hop.headers.remove("content-length");
    }
    hop
}

enum BodyOutcome {
    Complete {
        data: Option<Bytes>,
        file: Option<PathBuf>,
    },
    Cancelled {
        partial: Option<Bytes>,
        file: Option<PathBuf>,
        resumable: Option<ResumableState>,
    },
    Failed {
        error: Error,
        partial: Option<Bytes>,
        file: Option<PathBuf>,
    },
}

fn expected_total(headers: &HeaderStore, status: u16, offset: u64) -> u64 {
    if status == 206 {
        // Content-Range: bytes <start>-<end>/<total>
        if let Some(total) = headers
            .value("content-range")
            .and_then(|v| v.rsplit('/').next())
            .and_then(|t| t.parse::<u64>().ok())
        {
            return total;
        }
    }
    headers
        .value("content-length")
        .and_then(|v| v.parse::<u64>().ok())
        .map(|len| len + if status == 206 { offset } else { 0 })
        .unwrap_or(0)
}

async fn read_body(
    response: reqwest::Response,
    hop: &WireRequest,
    ctx: &FetchContext,
    headers: &HeaderStore,
    resumed_from: Option<ResumableState>,
) -> BodyOutcome {
    let offset = resumed_from.as_ref().map(|s| s.offset).unwrap_or(0);
    let expected = expected_total(headers, response.status().as_u16(), offset);
    let etag = headers.value("etag").map(str::to_string);
    let mut current = offset;
    let mut first_event = true;

    // Large-data mode spills to a consumer-owned file; a resumed transfer
    // appends to its previous partial file.
    let (mut spill, spill_target) = match hop.transfer_mode {
        TransferMode::Buffered => (None, None),
        TransferMode::LargeData => {
            let path = resumed_from
                .as_ref()
                .and_then(|s| s.partial_file.clone())
                .unwrap_or_else(|| spill_path(hop.id));
            let open = if resumed_from.as_ref().is_some_and(|s| s.partial_file.is_some()) {
                tokio::fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&path)
                    .await
            } else {
                tokio::fs::File::create(&path).await
            };
            match open {
                Ok(file) => (Some(file), Some(path)),
                Err(e) => {
                    return BodyOutcome::Failed {
                        error: Error::Other(format!(
                            "failed to open spill file {}: {e}",
                            path.display()
                        )),
                        partial: None,
                        file: None,
                    };
                }
            }
        }
    };

    let mut buffer = BytesMut::new();
    let mut stream = response.bytes_stream();

    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                let partial = (!buffer.is_empty()).then(|| buffer.clone().freeze());
                emit(
                    ctx.progress.as_ref(),
                    {
                        let mut update = HttpProgress::new(ProgressEvent::Failed, current, expected);
                        if let Some(partial) = &partial {
                            update = update.with_partial_data(partial.clone());
                        }
                        update
                    },
                );
                let resumable = ctx.cancel.wants_resumable().then(|| ResumableState {
                    url: hop.url.to_string(),
                    offset: current,
                    etag: etag.clone(),
                    partial_file: spill_target.clone(),
                });
                if let Some(file) = spill.as_mut() {
                    let _ = file.flush().await;
                }
                return BodyOutcome::Cancelled {
                    partial,
                    file: spill_target,
                    resumable,
                };
            }
            chunk = stream.next() => chunk,
        };

        match next {
            Some(Ok(chunk)) => {
                current += chunk.len() as u64;
                if let Some(file) = spill.as_mut() {
                    if let Err(e) = file.write_all(&chunk).await {
                        return BodyOutcome::Failed {
                            error: Error::Other(format!("spill write failed: {e}")),
                            partial: None,
                            file: spill_target,
                        };
                    }
                } else {
                    buffer.extend_from_slice(&chunk);
                }
                let event = if first_event && resumed_from.is_some() {
                    ProgressEvent::Resumed
                } else {
                    ProgressEvent::Download
                };
                first_event = false;
                emit(
                    ctx.progress.as_ref(),
                    HttpProgress::new(event, current, expected),
                );
            }
            Some(Err(err)) => {
                let error: Error = err.into();
                let partial = (!buffer.is_empty()).then(|| buffer.clone().freeze());
                emit(
                    ctx.progress.as_ref(),
                    {
                        let mut update = HttpProgress::new(ProgressEvent::Failed, current, expected);
                        if let Some(partial) = &partial {
                            update = update.with_partial_data(partial.clone());
                        }
                        update
                    },
                );
                if let Some(file) = spill.as_mut() {
                    let _ = file.flush().await;
                }
                return BodyOutcome::Failed {
                    error,
                    partial,
                    file: spill_target,
                };
            }
            None => break,
        }
    }

    if let Some(file) = spill.as_mut() {
        if let Err(e) = file.flush().await {
            return BodyOutcome::Failed {
                error: Error::Other(format!("spill flush failed: {e}")),
                partial: None,
                file: spill_target,
            };
        }
    }

    match spill_target {
        Some(path) => BodyOutcome::Complete {
            data: None,
            file: Some(path),
        },
        None => BodyOutcome::Complete {
            data: Some(buffer.freeze()),
            file: None,
        },
    }
}
