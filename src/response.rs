//! Response model
//!
//! The completed-response type delivered by the executor: status, headers,
//! in-memory or spilled body, the transport error (if any), metrics, and the
//! back-reference to the originating request.
//!
//! Spill files produced in large-data mode are owned by the consumer:
//! the library never deletes them.

use crate::error::{Error, StatusClass};
use crate::headers::HeaderStore;
use crate::metrics::Metrics;
use crate::request::{RequestId, ResumableState, WireRequest};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// A completed HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code, `0` when no status line was received.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderStore,
    pub(crate) data: Option<Bytes>,
    pub(crate) data_file: Option<PathBuf>,
    /// Transport or validation error carried by this response, if any.
    pub error: Option<Error>,
    /// Timing record for the whole task.
    pub metrics: Metrics,
    /// The wire request as first composed.
    pub original_request: WireRequest,
    /// The wire request actually answered (differs when a redirect was
    /// chased).
    pub current_request: WireRequest,
    /// Retries performed before this response was delivered.
    pub retries_used: u32,
    /// Identifier of the originating request.
    pub request_id: RequestId,
    pub(crate) resumable: Option<ResumableState>,
}

impl Response {
    /// In-memory body bytes.
    ///
    /// In large-data mode the body lives in a spill file and this reads it
    /// from disk on each call; nothing is materialized unless you call this.
    pub fn data(&self) -> Option<Bytes> {
        if let Some(data) = &self.data {
            return Some(data.clone());
        }
        let path = self.data_file.as_deref()?;
        std::fs::read(path).ok().map(Bytes::from)
    }

    /// Path of the spill file holding the body, in large-data mode.
    ///
    /// Deleting the file when done is the caller's responsibility.
    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }

    /// Body length without materializing spilled bytes.
    pub fn body_len(&self) -> u64 {
        if let Some(data) = &self.data {
            return data.len() as u64;
        }
        self.data_file
            .as_deref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Body decoded as UTF-8 text.
    pub fn text(&self) -> Result<String, Error> {
        let data = self
            .data()
            .ok_or_else(|| Error::ObjectDecodeFailed("response has no body".to_string()))?;
        String::from_utf8(data.to_vec())
            .map_err(|e| Error::ObjectDecodeFailed(format!("body is not valid UTF-8: {e}")))
    }

    /// Body decoded as arbitrary JSON.
    pub fn json(&self) -> Result<serde_json::Value, Error> {
        self.decode()
    }

    /// Body decoded into a typed value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let data = self
            .data()
            .ok_or_else(|| Error::ObjectDecodeFailed("response has no body".to_string()))?;
        serde_json::from_slice(&data).map_err(|e| Error::ObjectDecodeFailed(e.to_string()))
    }

    /// Classification of the status code.
    pub fn status_class(&self) -> StatusClass {
        StatusClass::of(self.status)
    }

    /// Whether this response carries an error (transport failure, validator
    /// rejection, or an error status left standing by the chain).
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Resumable state produced when the transfer was cancelled with
    /// [`CancelHandle::cancel_collecting_resumable`].
    ///
    /// [`CancelHandle::cancel_collecting_resumable`]: crate::cancel::CancelHandle::cancel_collecting_resumable
    pub fn resumable_state(&self) -> Option<&ResumableState> {
        self.resumable.as_ref()
    }

    /// Consume the response, returning it or its error.
    pub fn into_result(self) -> Result<Self, Error> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Method, RedirectPolicy, TransferMode};
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

    fn response_with(data: Option<Bytes>, file: Option<PathBuf>) -> Response {
        let wire = wire();
        Response {
            status: 200,
            headers: HeaderStore::new(),
            data,
            data_file: file,
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
    fn decode_typed_body() {
        #[derive(serde::Deserialize)]
        struct Payload {
            a: u32,
        }
        let response = response_with(Some(Bytes::from_static(br#"{"a": 7}"#)), None);
        let payload: Payload = response.decode().unwrap();
        assert_eq!(payload.a, 7);
    }

    #[test]
    fn decode_failure_is_categorized() {
        let response = response_with(Some(Bytes::from_static(b"not json")), None);
        let err = response.decode::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, Error::ObjectDecodeFailed(_)));
    }

    #[test]
    fn spilled_body_is_read_only_on_access() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spill.bin");
        std::fs::write(&path, b"spilled bytes").unwrap();

        let response = response_with(None, Some(path.clone()));
        assert_eq!(response.data_file(), Some(path.as_path()));
        assert_eq!(response.body_len(), 13);
        assert_eq!(response.data().unwrap().as_ref(), b"spilled bytes");
    }

    #[test]
    fn into_result_surfaces_carried_error() {
        let mut response = response_with(None, None);
        response.error = Some(Error::EmptyResponse);
        assert!(matches!(response.into_result(), Err(Error::EmptyResponse)));
    }
}
