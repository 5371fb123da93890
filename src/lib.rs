//! reqflow
//!
//! Async HTTP request execution for Rust: a structured request description
//! driven to completion through a configured transport, a validator chain
//! deciding each response's fate (accept, replace, fail, retry), rich retry
//! strategies (immediate, fixed, exponential, fibonacci, alternate-request
//! recovery), and a built-in request stubber that can short-circuit the
//! transport with locally synthesized responses selected by configurable
//! matchers.
//!
//! ```rust,no_run
//! use reqflow::prelude::*;
//!
//! # async fn run() -> Result<(), reqflow::Error> {
//! let client = Client::builder()
//!     .base_url("https://api.example.com/")
//!     .max_retries(2)
//!     .build()?;
//!
//! let response = client
//!     .fetch(Request::get("users/{id}").template_var("id", "42"))
//!     .await?;
//! let user: serde_json::Value = response.decode()?;
//! # Ok(())
//! # }
//! ```
#![deny(unsafe_code)]

pub mod body;
pub mod cancel;
pub mod client;
pub mod cookies;
pub mod curl;
pub mod defaults;
pub mod delegate;
pub mod error;
mod executor;
pub mod headers;
pub mod metrics;
pub mod progress;
pub mod request;
pub mod response;
pub mod retry;
pub mod stub;
pub mod template;
pub mod transport;
pub mod validation;

pub use error::{Error, ErrorCategory, StatusClass};

/// Commonly used types, importable in one line.
pub mod prelude {
    pub use crate::body::{Body, MultipartForm};
    pub use crate::cancel::CancelHandle;
    pub use crate::client::{Client, ClientBuilder, ClientConfig};
    pub use crate::delegate::{AuthChallenge, ClientDelegate};
    pub use crate::error::{Error, ErrorCategory, StatusClass};
    pub use crate::headers::HeaderStore;
    pub use crate::progress::{HttpProgress, ProgressEvent};
    pub use crate::request::{
        Method, RedirectPolicy, Request, RequestUrl, ResumableState, TransferMode, WireRequest,
    };
    pub use crate::response::Response;
    pub use crate::retry::RetryStrategy;
    pub use crate::stub::{
        IgnoreRule, StubResponse, StubRule, UnhandledMode, UrlMatchOptions,
        shared as stub_registry,
    };
    pub use crate::validation::{
        AltRequestValidator, DefaultValidator, ResponseValidator, ValidatorOutcome,
    };
}
