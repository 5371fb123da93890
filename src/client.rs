//! Client context
//!
//! Holds the base URL, default headers, the default validator chain, the
//! transport configuration, a client-wide delegate for lifecycle
//! observation, and a shared process-wide default instance. Multiple
//! requests may be in flight on one client; their executors are
//! independent.

use crate::cookies::CookieStorage;
use crate::defaults;
use crate::delegate::{ClientDelegate, NoopDelegate};
use crate::error::Error;
use crate::headers::HeaderStore;
use crate::request::{RedirectPolicy, Request};
use crate::response::Response;
use crate::stub::StubRegistry;
use crate::transport::{HttpLoader, StubTransport, Transport};
use crate::validation::{DefaultValidator, ResponseValidator};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use url::Url;

/// Advisory quality-of-service class for transports that can honor it. The
/// bundled loader has no such knob and ignores the hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkServiceType {
    /// Standard traffic.
    #[default]
    Default,
    /// Discretionary background traffic.
    Background,
    /// Latency-sensitive interactive traffic.
    ResponsiveData,
    /// Video streaming.
    Video,
    /// Voice traffic.
    Voice,
}

/// Per-client transport and pipeline configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Wall-clock timeout applied to each attempt.
    pub timeout: Duration,
    /// Connection timeout for the bundled loader.
    pub connect_timeout: Duration,
    /// Default retry budget for requests that do not set their own.
    pub max_retries: u32,
    /// Whether zero-length 2xx bodies are acceptable.
    pub allows_empty_responses: bool,
    /// Status codes the default validator may retry (`0` = transport
    /// failure).
    pub retriable_status_codes: HashSet<u16>,
    /// Base delay for the default validator's exponential backoff.
    pub retry_delay_base: Duration,
    /// Cap on computed retry delays.
    pub retry_delay_cap: Duration,
    /// Default redirect policy.
    pub redirect_policy: RedirectPolicy,
    /// Whether cookies are stored and replayed (real transport and stubs).
    pub http_should_set_cookies: bool,
    /// Advisory: whether cellular interfaces may be used. The bundled
    /// loader cannot select interfaces and ignores the hint.
    pub allows_cellular_access: bool,
    /// Advisory service class for custom transports.
    pub network_service_type: NetworkServiceType,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: defaults::http::REQUEST_TIMEOUT,
            connect_timeout: defaults::http::CONNECT_TIMEOUT,
            max_retries: defaults::retry::MAX_RETRIES,
            allows_empty_responses: false,
            retriable_status_codes: defaults::retry::RETRIABLE_STATUS_CODES
                .iter()
                .copied()
                .collect(),
            retry_delay_base: defaults::retry::DELAY_BASE,
            retry_delay_cap: defaults::retry::DELAY_CAP,
            redirect_policy: RedirectPolicy::Follow,
            http_should_set_cookies: true,
            allows_cellular_access: true,
            network_service_type: NetworkServiceType::Default,
        }
    }
}

struct ClientInner {
    config: ClientConfig,
    base_url: Option<Url>,
    default_headers: Mutex<HeaderStore>,
    validators: Vec<Arc<dyn ResponseValidator>>,
    delegate: Arc<dyn ClientDelegate>,
    transport: Arc<dyn Transport>,
    cookies: Arc<CookieStorage>,
}

/// An HTTP client: configuration, defaults, validator chain, transport.
///
/// Cloning is cheap; clones share the same context.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

static SHARED: OnceLock<Client> = OnceLock::new();

impl Client {
    /// Start building a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// A client with the library defaults and no base URL.
    pub fn new() -> Result<Self, Error> {
        Self::builder().build()
    }

    /// The process-wide default instance.
    pub fn shared() -> &'static Client {
        SHARED.get_or_init(|| {
            Client::new().expect("default client construction cannot fail")
        })
    }

    /// Execute a request to completion.
    ///
    /// Returns `Err` only for failures before any transport call (URL
    /// composition, body encoding); otherwise the delivered [`Response`]
    /// carries its error, if any.
    pub async fn fetch(&self, request: Request) -> Result<Response, Error> {
        crate::executor::execute(self.clone(), request).await
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The base URL relative request paths resolve against.
    pub fn base_url(&self) -> Option<&Url> {
        self.inner.base_url.as_ref()
    }

    /// The lifecycle delegate.
    pub fn delegate(&self) -> Arc<dyn ClientDelegate> {
        self.inner.delegate.clone()
    }

    /// The transport stack (interceptor shim wrapping the real transport).
    pub fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    /// The validator chain, in evaluation order.
    pub fn validators(&self) -> &[Arc<dyn ResponseValidator>] {
        &self.inner.validators
    }

    /// The client's cookie jar.
    pub fn cookie_storage(&self) -> Arc<CookieStorage> {
        self.inner.cookies.clone()
    }

    pub(crate) fn cookie_context(&self) -> Option<Arc<CookieStorage>> {
        self.inner
            .config
            .http_should_set_cookies
            .then(|| self.inner.cookies.clone())
    }

    /// Snapshot of the default headers, taken at wire composition time.
    pub fn default_headers_snapshot(&self) -> HeaderStore {
        self.inner
            .default_headers
            .lock()
            .expect("default headers mutex poisoned")
            .clone()
    }

    /// Set a default header. Effective for subsequently composed requests.
    pub fn set_default_header(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .default_headers
            .lock()
            .expect("default headers mutex poisoned")
            .set(name, value);
    }

    /// Remove a default header.
    pub fn remove_default_header(&self, name: &str) {
        self.inner
            .default_headers
            .lock()
            .expect("default headers mutex poisoned")
            .remove(name);
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    config: ClientConfig,
    base_url: Option<String>,
    headers: HeaderStore,
    front_validators: Vec<Arc<dyn ResponseValidator>>,
    extra_validators: Vec<Arc<dyn ResponseValidator>>,
    with_default_validator: bool,
    delegate: Option<Arc<dyn ClientDelegate>>,
    transport: Option<Arc<dyn Transport>>,
    registry: Option<Arc<StubRegistry>>,
}

impl ClientBuilder {
    /// A builder with the library defaults.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            base_url: None,
            headers: HeaderStore::with_defaults(),
            front_validators: Vec::new(),
            extra_validators: Vec::new(),
            with_default_validator: true,
            delegate: None,
            transport: None,
            registry: None,
        }
    }

    /// Base URL for relative request paths.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Connection timeout for the bundled loader.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Default retry budget.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Accept zero-length 2xx bodies.
    pub fn allows_empty_responses(mut self, allowed: bool) -> Self {
        self.config.allows_empty_responses = allowed;
        self
    }

    /// Replace the retriable status-code set (`0` = transport failure).
    pub fn retriable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.config.retriable_status_codes = codes.into_iter().collect();
        self
    }

    /// Exponential backoff base and cap for the default validator.
    pub fn retry_delay(mut self, base: Duration, cap: Duration) -> Self {
        self.config.retry_delay_base = base;
        self.config.retry_delay_cap = cap;
        self
    }

    /// Default redirect policy.
    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.config.redirect_policy = policy;
        self
    }

    /// Enable or disable cookie storage.
    pub fn http_should_set_cookies(mut self, enabled: bool) -> Self {
        self.config.http_should_set_cookies = enabled;
        self
    }

    /// Advisory cellular-access hint.
    pub fn allows_cellular_access(mut self, allowed: bool) -> Self {
        self.config.allows_cellular_access = allowed;
        self
    }

    /// Advisory service class.
    pub fn network_service_type(mut self, service_type: NetworkServiceType) -> Self {
        self.config.network_service_type = service_type;
        self
    }

    /// Set a default header sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Append a custom validator, evaluated after the default validator.
    pub fn validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.extra_validators.push(Arc::new(validator));
        self
    }

    /// Insert a custom validator ahead of the default validator. Recovery
    /// validators (e.g. [`AltRequestValidator`]) go here, so they see error
    /// statuses before the default validator fails them.
    ///
    /// [`AltRequestValidator`]: crate::validation::AltRequestValidator
    pub fn prepend_validator(mut self, validator: impl ResponseValidator + 'static) -> Self {
        self.front_validators.push(Arc::new(validator));
        self
    }

    /// Drop the default validator from the chain.
    pub fn without_default_validator(mut self) -> Self {
        self.with_default_validator = false;
        self
    }

    /// Install a lifecycle delegate.
    pub fn delegate(mut self, delegate: impl ClientDelegate + 'static) -> Self {
        self.delegate = Some(Arc::new(delegate));
        self
    }

    /// Replace the real transport. The interceptor shim still wraps it, so
    /// the stubber keeps working in front of custom transports.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Use an explicit stub registry instead of the process-wide one.
    pub fn stub_registry(mut self, registry: Arc<StubRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client, Error> {
        let base_url = self
            .base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| Error::InvalidUrl(format!("invalid base URL: {e}")))?;

        let mut validators: Vec<Arc<dyn ResponseValidator>> = self.front_validators;
        if self.with_default_validator {
            validators.push(Arc::new(DefaultValidator {
                allows_empty_responses: self.config.allows_empty_responses,
                retriable_status_codes: self.config.retriable_status_codes.clone(),
                retry_delay_base: self.config.retry_delay_base,
                retry_delay_cap: self.config.retry_delay_cap,
                default_max_retries: self.config.max_retries,
            }));
        }
        validators.extend(self.extra_validators);

        let real: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpLoader::new(&self.config)?),
        };
        let shim = match self.registry {
            Some(registry) => StubTransport::with_registry(real, registry),
            None => StubTransport::new(real),
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url,
                default_headers: Mutex::new(self.headers),
                validators,
                delegate: self.delegate.unwrap_or_else(|| Arc::new(NoopDelegate)),
                transport: Arc::new(shim),
                cookies: Arc::new(CookieStorage::new()),
                config: self.config,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_install_default_validator_and_headers() {
        let client = Client::builder().build().unwrap();
        assert_eq!(client.validators().len(), 1);
        assert!(client.default_headers_snapshot().contains("user-agent"));
        assert_eq!(client.config().max_retries, defaults::retry::MAX_RETRIES);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = Client::builder().base_url("not a url").build().unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn default_header_mutations_are_seen_by_snapshots() {
        let client = Client::builder().build().unwrap();
        client.set_default_header("X-Env", "staging");
        assert_eq!(
            client.default_headers_snapshot().value("x-env"),
            Some("staging")
        );
        client.remove_default_header("X-Env");
        assert!(!client.default_headers_snapshot().contains("X-Env"));
    }

    #[test]
    fn without_default_validator_leaves_chain_empty() {
        let client = Client::builder().without_default_validator().build().unwrap();
        assert!(client.validators().is_empty());
    }

    #[test]
    fn shared_client_is_a_single_instance() {
        let a = Client::shared();
        let b = Client::shared();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }
}
