//! Request bodies
//!
//! The body variants a request can carry and their encoding into wire form.
//! Encoding a body yields `(bytes or file stream, content type, content
//! length)`; encoding failures fail the request before any transport call.

pub mod form;
pub mod multipart;

pub use multipart::MultipartForm;

use crate::error::Error;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Deferred JSON encoder carried by [`Body::Json`].
///
/// The captured value is serialized when the executor composes the wire
/// request, so encoding failures surface as
/// [`Error::JsonEncodingFailed`] at fetch time rather than at build time.
#[derive(Clone)]
pub struct JsonProducer(Arc<dyn Fn() -> Result<Vec<u8>, Error> + Send + Sync>);

impl JsonProducer {
    /// Capture a serializable value.
    pub fn new<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        Self(Arc::new(move || {
            serde_json::to_vec(&value).map_err(Error::from)
        }))
    }

    /// Run the encoder.
    pub fn produce(&self) -> Result<Vec<u8>, Error> {
        (self.0)()
    }
}

impl fmt::Debug for JsonProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonProducer").finish_non_exhaustive()
    }
}

/// Request body variants.
#[derive(Debug, Clone, Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Raw bytes with an explicit content type.
    Bytes {
        /// Payload.
        data: Bytes,
        /// `Content-Type` to send.
        content_type: String,
    },
    /// A file streamed from disk at send time.
    File {
        /// Path to the file.
        path: PathBuf,
        /// `Content-Type` to send.
        content_type: String,
    },
    /// Form-url-encoded pairs, percent-encoded at compose time.
    Form(Vec<(String, String)>),
    /// JSON from a deferred encoder producer.
    Json(JsonProducer),
    /// `multipart/form-data` with boundary and ordered parts.
    Multipart(MultipartForm),
}

/// Encoded wire payload.
#[derive(Debug, Clone)]
pub enum Payload {
    /// No payload.
    Empty,
    /// In-memory bytes.
    Bytes(Bytes),
    /// Stream the file at this path.
    File(PathBuf),
}

/// Result of encoding a [`Body`].
#[derive(Debug, Clone)]
pub struct EncodedBody {
    /// Bytes or file stream.
    pub payload: Payload,
    /// `Content-Type` for the wire request, if the body dictates one.
    pub content_type: Option<String>,
    /// `Content-Length` when known up front.
    pub content_length: Option<u64>,
}

impl Body {
    /// Raw bytes with a content type.
    pub fn bytes(data: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self::Bytes {
            data: data.into(),
            content_type: content_type.into(),
        }
    }

    /// Plain-text body.
    pub fn text(text: impl Into<String>) -> Self {
        Self::bytes(text.into().into_bytes(), "text/plain; charset=utf-8")
    }

    /// File-streamed body.
    pub fn file(path: impl Into<PathBuf>, content_type: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            content_type: content_type.into(),
        }
    }

    /// Form-url-encoded pairs.
    pub fn form<N: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (N, V)>) -> Self {
        Self::Form(
            pairs
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        )
    }

    /// JSON-encoded body from any serializable value.
    pub fn json<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        Self::Json(JsonProducer::new(value))
    }

    /// Multipart form body.
    pub fn multipart(form: MultipartForm) -> Self {
        Self::Multipart(form)
    }

    /// Whether this is [`Body::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Encode into wire form. File-backed variants read metadata (and
    /// multipart file parts read contents) via `tokio::fs`.
    pub async fn encode(&self) -> Result<EncodedBody, Error> {
        match self {
            Self::Empty => Ok(EncodedBody {
                payload: Payload::Empty,
                content_type: None,
                content_length: None,
            }),
            Self::Bytes { data, content_type } => Ok(EncodedBody {
                payload: Payload::Bytes(data.clone()),
                content_type: Some(content_type.clone()),
                content_length: Some(data.len() as u64),
            }),
            Self::File { path, content_type } => {
                let meta = tokio::fs::metadata(path).await.map_err(|e| {
                    Error::FailedBuildingUrlRequest(format!(
                        "body file {} unavailable: {e}",
                        path.display()
                    ))
                })?;
                Ok(EncodedBody {
                    payload: Payload::File(path.clone()),
                    content_type: Some(content_type.clone()),
                    content_length: Some(meta.len()),
                })
            }
            Self::Form(pairs) => {
                let encoded = form::encode_pairs(pairs);
                Ok(EncodedBody {
                    content_length: Some(encoded.len() as u64),
                    payload: Payload::Bytes(Bytes::from(encoded)),
                    content_type: Some("application/x-www-form-urlencoded".to_string()),
                })
            }
            Self::Json(producer) => {
                let encoded = producer.produce()?;
                Ok(EncodedBody {
                    content_length: Some(encoded.len() as u64),
                    payload: Payload::Bytes(Bytes::from(encoded)),
                    content_type: Some("application/json".to_string()),
                })
            }
            Self::Multipart(form) => {
                let (bytes, content_type) = form.encode().await?;
                Ok(EncodedBody {
                    content_length: Some(bytes.len() as u64),
                    payload: Payload::Bytes(bytes),
                    content_type: Some(content_type),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_body_encodes_to_nothing() {
        let encoded = Body::Empty.encode().await.unwrap();
        assert!(matches!(encoded.payload, Payload::Empty));
        assert!(encoded.content_type.is_none());
    }

    #[tokio::test]
    async fn json_body_defers_encoding() {
        let body = Body::json(serde_json::json!({"a": 1}));
        let encoded = body.encode().await.unwrap();
        let Payload::Bytes(bytes) = encoded.payload else {
            panic!("expected bytes payload");
        };
        assert_eq!(bytes.as_ref(), br#"{"a":1}"#);
        assert_eq!(encoded.content_type.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn missing_body_file_fails_before_transport() {
        let body = Body::file("/definitely/not/here.bin", "application/octet-stream");
        let err = body.encode().await.unwrap_err();
        assert!(matches!(err, Error::FailedBuildingUrlRequest(_)));
    }
}
