//! Stub registry
//!
//! Process-wide store of stub and ignore rules with an enabled flag and an
//! unhandled mode. The registry is a module-owned value behind lazy
//! initialization; every read and write is serialized by its internal
//! mutex, and mutations made while requests are in flight take effect on
//! subsequent matchings.

use super::rule::{IgnoreRule, StubRule};
use crate::request::WireRequest;
use std::sync::{Arc, Mutex, OnceLock};

/// What happens to an enabled-but-unmatched request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnhandledMode {
    /// Unmatched requests fail with [`Error::StubNotFound`]. The strict
    /// default for hermetic test suites.
    ///
    /// [`Error::StubNotFound`]: crate::error::Error::StubNotFound
    #[default]
    OptOut,
    /// Unmatched requests pass through to the real transport.
    OptIn,
}

/// Routing decision for one request.
#[derive(Debug, Clone)]
pub enum StubDecision {
    /// Synthesize a response from this rule.
    Stub(StubRule),
    /// Hand the request to the real transport.
    Passthrough,
    /// Fail with `StubNotFound` (opt-out mode, nothing matched).
    NotFound,
}

#[derive(Default)]
struct RegistryState {
    enabled: bool,
    unhandled_mode: UnhandledMode,
    rules: Vec<StubRule>,
    ignores: Vec<IgnoreRule>,
}

/// The process-wide stub registry.
#[derive(Default)]
pub struct StubRegistry {
    state: Mutex<RegistryState>,
}

static REGISTRY: OnceLock<Arc<StubRegistry>> = OnceLock::new();

/// The shared registry instance.
pub fn shared() -> Arc<StubRegistry> {
    REGISTRY
        .get_or_init(|| Arc::new(StubRegistry::default()))
        .clone()
}

impl StubRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().expect("stub registry mutex poisoned")
    }

    /// Start intercepting requests.
    pub fn enable(&self) {
        self.lock().enabled = true;
        tracing::debug!(target: "reqflow::stub", "stubber enabled");
    }

    /// Stop intercepting; every request passes through.
    pub fn disable(&self) {
        self.lock().enabled = false;
        tracing::debug!(target: "reqflow::stub", "stubber disabled");
    }

    /// Whether the registry is intercepting.
    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    /// Set the unhandled mode.
    pub fn set_unhandled_mode(&self, mode: UnhandledMode) {
        self.lock().unhandled_mode = mode;
    }

    /// The current unhandled mode.
    pub fn unhandled_mode(&self) -> UnhandledMode {
        self.lock().unhandled_mode
    }

    /// Register a stub rule. Returns the rule for later removal.
    pub fn add(&self, rule: StubRule) -> StubRule {
        let mut state = self.lock();
        state.rules.push(rule.clone());
        rule
    }

    /// Remove a previously added rule.
    pub fn remove(&self, rule: &StubRule) {
        self.lock().rules.retain(|r| r.id != rule.id);
    }

    /// Remove every stub and ignore rule.
    pub fn remove_all(&self) {
        let mut state = self.lock();
        state.rules.clear();
        state.ignores.clear();
    }

    /// Register an ignore rule. Returns the rule for later removal.
    pub fn add_ignore(&self, rule: IgnoreRule) -> IgnoreRule {
        let mut state = self.lock();
        state.ignores.push(rule.clone());
        rule
    }

    /// Remove a previously added ignore rule.
    pub fn remove_ignore(&self, rule: &IgnoreRule) {
        self.lock().ignores.retain(|r| r.id != rule.id);
    }

    /// First rule (insertion order) whose every matcher accepts the request.
    pub fn find_match(&self, request: &WireRequest) -> Option<StubRule> {
        self.lock()
            .rules
            .iter()
            .find(|rule| rule.matches(request))
            .cloned()
    }

    /// Whether the shim should synthesize the outcome for this request
    /// (either a stubbed response or a `StubNotFound` failure).
    pub fn should_handle(&self, request: &WireRequest) -> bool {
        !matches!(self.decide(request), StubDecision::Passthrough)
    }

    /// Route a request: stub, passthrough, or not-found.
    pub fn decide(&self, request: &WireRequest) -> StubDecision {
        let state = self.lock();
        if !state.enabled {
            return StubDecision::Passthrough;
        }
        if let Some(rule) = state.rules.iter().find(|rule| rule.matches(request)) {
            return StubDecision::Stub(rule.clone());
        }
        if state.ignores.iter().any(|rule| rule.matches(request)) {
            return StubDecision::Passthrough;
        }
        match state.unhandled_mode {
            UnhandledMode::OptIn => StubDecision::Passthrough,
            UnhandledMode::OptOut => StubDecision::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;
    use crate::stub::matchers::tests::wire;
    use crate::stub::rule::StubResponse;

    // The shared registry is process-global; these tests use private
    // instances to stay independent of it.
    fn registry() -> StubRegistry {
        StubRegistry::default()
    }

    #[test]
    fn disabled_registry_passes_everything_through() {
        let registry = registry();
        registry.add(StubRule::new().match_any().on(Method::Get, StubResponse::new(200)));
        assert!(matches!(
            registry.decide(&wire("https://x/", None)),
            StubDecision::Passthrough
        ));
    }

    #[test]
    fn first_matching_rule_wins_in_insertion_order() {
        let registry = registry();
        registry.enable();
        let first = registry.add(
            StubRule::new()
                .match_url_regex("^https://x/.*$")
                .unwrap()
                .on(Method::Post, StubResponse::new(201)),
        );
        registry.add(StubRule::new().match_any().on(Method::Post, StubResponse::new(500)));

        let request = wire("https://x/anything", None);
        // Deterministic: repeated matching always selects the first rule.
        for _ in 0..3 {
            match registry.decide(&request) {
                StubDecision::Stub(rule) => assert_eq!(rule.id(), first.id()),
                other => panic!("expected stub decision, got {other:?}"),
            }
        }
    }

    #[test]
    fn removal_changes_subsequent_matching() {
        let registry = registry();
        registry.enable();
        registry.set_unhandled_mode(UnhandledMode::OptIn);
        let rule = registry.add(StubRule::new().match_any().on(Method::Get, StubResponse::new(200)));

        assert!(matches!(
            registry.decide(&wire("https://x/", None)),
            StubDecision::Stub(_)
        ));
        registry.remove(&rule);
        assert!(matches!(
            registry.decide(&wire("https://x/", None)),
            StubDecision::Passthrough
        ));
    }

    #[test]
    fn unhandled_modes_differ_on_miss() {
        let registry = registry();
        registry.enable();

        registry.set_unhandled_mode(UnhandledMode::OptOut);
        assert!(matches!(
            registry.decide(&wire("https://real/", None)),
            StubDecision::NotFound
        ));

        registry.set_unhandled_mode(UnhandledMode::OptIn);
        assert!(matches!(
            registry.decide(&wire("https://real/", None)),
            StubDecision::Passthrough
        ));
    }

    #[test]
    fn matching_ignore_rule_always_passes_through() {
        let registry = registry();
        registry.enable();
        registry.set_unhandled_mode(UnhandledMode::OptOut);
        registry.add_ignore(
            IgnoreRule::new()
                .match_url_regex("^https://real/.*$")
                .unwrap(),
        );

        assert!(matches!(
            registry.decide(&wire("https://real/health", None)),
            StubDecision::Passthrough
        ));
        assert!(matches!(
            registry.decide(&wire("https://other/", None)),
            StubDecision::NotFound
        ));
    }
}
