//! Request stubber
//!
//! Matchers, stub/ignore rules, and the process-wide registry that lets the
//! transport shim short-circuit real network traffic with locally
//! synthesized responses.

pub mod matchers;
mod registry;
mod rule;

pub use matchers::{
    BodyMatcher, EchoMatcher, FnMatcher, JsonBodyMatcher, StubMatcher, UriTemplateMatcher,
    UrlMatchOptions, UrlMatcher, UrlRegexMatcher,
};
pub use registry::{StubDecision, StubRegistry, UnhandledMode, shared};
pub use rule::{
    CachePolicy, IgnoreRule, ResponseProducer, StubResponder, StubResponse, StubRule,
    echo_producer,
};
