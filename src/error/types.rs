//! Core error types for the request pipeline.

use serde::{Deserialize, Serialize};

/// The closed error taxonomy of the library.
///
/// Every failure a request can produce falls into one of these variants.
/// Construction and encoding errors fail a request before any transport
/// call; transport errors and error status codes are carried on the
/// delivered [`Response`](crate::response::Response) where the validator
/// chain may override the outcome.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The request URL could not be composed or parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The wire-form request could not be assembled.
    #[error("Failed building URL request: {0}")]
    FailedBuildingUrlRequest(String),

    /// Form-url-encoding of the body failed.
    #[error("URL encoding failed: {0}")]
    UrlEncodingFailed(String),

    /// JSON encoding of the body failed.
    #[error("JSON encoding failed: {0}")]
    JsonEncodingFailed(String),

    /// A multipart file part does not exist or cannot be read.
    #[error("Multipart part refers to an invalid file: {0}")]
    MultipartInvalidFile(String),

    /// A multipart string part could not be encoded.
    #[error("Multipart string encoding failed: {0}")]
    MultipartFailedStringEncoding(String),

    /// Reading a multipart stream part failed.
    #[error("Multipart stream read failed: {0}")]
    MultipartStreamReadFailed(String),

    /// The transport reported a network-level failure, or an error status
    /// code was not recovered by the validator chain.
    #[error("Network error (status {status}): {message}")]
    Network {
        /// HTTP status code, `0` when no status line was received.
        status: u16,
        /// Underlying transport or server message.
        message: String,
    },

    /// The transport could not establish a connection.
    #[error("Connection unavailable: {0}")]
    MissingConnection(String),

    /// The per-attempt wall-clock timeout elapsed.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The transport produced a response the library could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The response body was empty and the client forbids empty responses.
    #[error("Empty response body")]
    EmptyResponse,

    /// Typed decoding of the response body failed.
    #[error("Object decode failed: {0}")]
    ObjectDecodeFailed(String),

    /// A retry strategy fired after the retry budget was exhausted.
    #[error("Retry attempts reached")]
    RetryAttemptsReached,

    /// The request was cancelled by the caller. Terminal, never retried.
    #[error("Request cancelled")]
    Cancelled,

    /// A validator rejected the response.
    #[error("Validator failure: {0}")]
    ValidatorFailure(String),

    /// An alternate (session recovery) request failed.
    #[error("Session error: {0}")]
    SessionError(String),

    /// The stubber is enabled in opt-out mode and no rule matched.
    #[error("No stub matched request: {0}")]
    StubNotFound(String),

    /// An internal invariant was violated.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Anything that does not fit the categories above.
    #[error("{0}")]
    Other(String),
}

/// Coarse-grained category of an [`Error`], one per taxonomy group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// URL or wire-request construction.
    Construction,
    /// Body encoding (form, JSON, multipart).
    Encoding,
    /// Transport-level failure.
    Network,
    /// Connectivity unavailable.
    MissingConnection,
    /// Per-attempt timeout.
    Timeout,
    /// Malformed or empty response.
    Response,
    /// Typed decoding.
    Decode,
    /// Retry budget exhausted.
    RetryAttemptsReached,
    /// Caller-driven cancellation.
    Cancelled,
    /// Validator rejection.
    Validation,
    /// Alternate request failure.
    Session,
    /// Stubber opt-out miss.
    StubNotFound,
    /// Internal invariant violation.
    Internal,
    /// Uncategorized.
    Other,
}

/// Classification of the numeric HTTP status-code domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusClass {
    /// 1xx
    Informational,
    /// 2xx
    Success,
    /// 3xx
    Redirection,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
    /// Anything outside 100..=599, including the synthetic `0`.
    Unknown,
}

impl StatusClass {
    /// Classify a numeric status code.
    pub fn of(status: u16) -> Self {
        match status {
            100..=199 => Self::Informational,
            200..=299 => Self::Success,
            300..=399 => Self::Redirection,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    /// Whether the code indicates an error (client or server).
    pub fn is_error(self) -> bool {
        matches!(self, Self::ClientError | Self::ServerError)
    }
}

impl Error {
    /// The coarse category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidUrl(_) | Self::FailedBuildingUrlRequest(_) => ErrorCategory::Construction,
            Self::UrlEncodingFailed(_)
            | Self::JsonEncodingFailed(_)
            | Self::MultipartInvalidFile(_)
            | Self::MultipartFailedStringEncoding(_)
            | Self::MultipartStreamReadFailed(_) => ErrorCategory::Encoding,
            Self::Network { .. } => ErrorCategory::Network,
            Self::MissingConnection(_) => ErrorCategory::MissingConnection,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::InvalidResponse(_) | Self::EmptyResponse => ErrorCategory::Response,
            Self::ObjectDecodeFailed(_) => ErrorCategory::Decode,
            Self::RetryAttemptsReached => ErrorCategory::RetryAttemptsReached,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::ValidatorFailure(_) => ErrorCategory::Validation,
            Self::SessionError(_) => ErrorCategory::Session,
            Self::StubNotFound(_) => ErrorCategory::StubNotFound,
            Self::Internal(_) => ErrorCategory::Internal,
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// The HTTP status code carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Network { status, .. } if *status != 0 => Some(*status),
            _ => None,
        }
    }

    /// Whether the default validator may convert this error into a retry.
    ///
    /// `Cancelled` is terminal by contract; construction and encoding errors
    /// fail before any transport call and retrying cannot help them.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::MissingConnection | ErrorCategory::Timeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_class_covers_domain() {
        assert_eq!(StatusClass::of(101), StatusClass::Informational);
        assert_eq!(StatusClass::of(200), StatusClass::Success);
        assert_eq!(StatusClass::of(304), StatusClass::Redirection);
        assert_eq!(StatusClass::of(404), StatusClass::ClientError);
        assert_eq!(StatusClass::of(503), StatusClass::ServerError);
        assert_eq!(StatusClass::of(0), StatusClass::Unknown);
        assert!(StatusClass::of(500).is_error());
        assert!(!StatusClass::of(204).is_error());
    }

    #[test]
    fn cancelled_is_never_retryable() {
        assert!(!Error::Cancelled.is_retryable());
        assert!(
            Error::Network {
                status: 503,
                message: "unavailable".into()
            }
            .is_retryable()
        );
    }

    #[test]
    fn network_error_exposes_status() {
        let err = Error::Network {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(
            Error::Timeout("attempt deadline".into()).status_code(),
            None
        );
    }
}
