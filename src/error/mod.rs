//! Error Handling Module
//!
//! This module provides error handling for the request pipeline, including:
//! - The closed error taxonomy (`Error`, `ErrorCategory`)
//! - Status-code domain classification (`StatusClass`)
//! - Type conversions from common error types

mod conversions;
mod types;

pub use types::{Error, ErrorCategory, StatusClass};
