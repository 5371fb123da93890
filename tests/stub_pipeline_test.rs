//! End-to-end tests for the stubber pipeline: echo mirroring, rule
//! selection through the full executor, opt-out misses, and delayed stubs
//! racing cancellation.
//!
//! Each test builds its client against a private registry so tests stay
//! independent of the process-wide one.

use reqflow::prelude::*;
use reqflow::stub::StubRegistry;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn stubbed_client(registry: &Arc<StubRegistry>) -> Client {
    Client::builder()
        .stub_registry(registry.clone())
        .build()
        .unwrap()
}

#[tokio::test]
async fn echo_stub_mirrors_the_request_body() {
    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.add(StubRule::echo([Method::Post]));

    let client = stubbed_client(&registry);
    let body = br#"{"a":1}"#;
    let response = client
        .fetch(
            Request::post("http://x/y")
                .body(reqflow::body::Body::bytes(&body[..], "application/json")),
        )
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert!(response.error.is_none());
    assert_eq!(response.data().unwrap().as_ref(), body);
    assert_eq!(
        response.headers.value("content-type"),
        Some("application/json")
    );
}

#[tokio::test]
async fn first_matching_rule_decides_through_the_executor() {
    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.add(
        StubRule::new()
            .match_json(serde_json::json!({"kind": "a"}))
            .on(Method::Post, StubResponse::new(201).with_body(&b"rule-a"[..])),
    );
    registry.add(
        StubRule::new()
            .match_any()
            .on(Method::Post, StubResponse::new(200).with_body(&b"fallback"[..])),
    );

    let client = stubbed_client(&registry);

    let matched = client
        .fetch(Request::post("http://svc/things").json(serde_json::json!({"kind": "a"})))
        .await
        .unwrap();
    assert_eq!(matched.status, 201);
    assert_eq!(matched.data().unwrap().as_ref(), b"rule-a");

    let fallback = client
        .fetch(Request::post("http://svc/things").json(serde_json::json!({"kind": "b"})))
        .await
        .unwrap();
    assert_eq!(fallback.status, 200);
    assert_eq!(fallback.data().unwrap().as_ref(), b"fallback");
}

#[tokio::test]
async fn opt_out_miss_surfaces_stub_not_found() {
    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.set_unhandled_mode(UnhandledMode::OptOut);

    let client = stubbed_client(&registry);
    let response = client
        .fetch(Request::get("http://nowhere/else").max_retries(0))
        .await
        .unwrap();

    assert!(matches!(response.error, Some(Error::StubNotFound(_))));
    assert_eq!(response.status, 0);
}

#[tokio::test]
async fn uri_template_rule_absorbs_expansion_variables() {
    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.add(
        StubRule::new()
            .match_uri_template("http://svc/users/{id}")
            .unwrap()
            .on(Method::Get, StubResponse::json(&serde_json::json!({"ok": true})).unwrap()),
    );

    let client = stubbed_client(&registry);
    let response = client
        .fetch(Request::get("http://svc/users/12345"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.json().unwrap(), serde_json::json!({"ok": true}));
}

#[tokio::test]
async fn cancelling_a_delayed_stub_is_prompt() {
    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.add(StubRule::new().match_any().on(
        Method::Get,
        StubResponse::new(200).with_delay(Duration::from_secs(60)),
    ));

    let client = stubbed_client(&registry);
    let request = Request::get("http://slow/endpoint");
    let cancel = request.cancel_handle();

    let started = Instant::now();
    let task = tokio::spawn(async move { client.fetch(request).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let response = task.await.unwrap().unwrap();
    assert!(matches!(response.error, Some(Error::Cancelled)));
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "cancellation should abort the pending stub timer promptly"
    );
}

#[tokio::test]
async fn stub_failure_error_reaches_the_validator_chain() {
    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.add(StubRule::new().match_any().on(
        Method::Get,
        StubResponse::new(0).with_failure(Error::MissingConnection("stubbed outage".into())),
    ));

    // Code 0 is retriable by default, so cap the budget to observe the
    // terminal error quickly.
    let client = Client::builder()
        .stub_registry(registry.clone())
        .retry_delay(Duration::from_millis(1), Duration::from_millis(5))
        .build()
        .unwrap();
    let response = client
        .fetch(Request::get("http://down/svc").max_retries(1))
        .await
        .unwrap();

    assert!(matches!(response.error, Some(Error::RetryAttemptsReached)));
    assert_eq!(response.retries_used, 1);
}
