//! Opt-in passthrough: an enabled registry without a matching rule hands
//! the request to the real transport, observable as a real server answer.

use reqflow::prelude::*;
use reqflow::stub::StubRegistry;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn opt_in_mode_reaches_the_real_transport() {
    let server = MockServer::start().await;
    // No mocks mounted: wiremock answers 404, proving real traffic.

    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.set_unhandled_mode(UnhandledMode::OptIn);

    let client = Client::builder()
        .base_url(server.uri())
        .stub_registry(registry.clone())
        .build()
        .unwrap();
    let response = client
        .fetch(Request::get("anything").max_retries(0))
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert!(matches!(
        response.error,
        Some(Error::Network { status: 404, .. })
    ));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn ignore_rules_pass_through_in_opt_out_mode() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("live"))
        .mount(&server)
        .await;

    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.set_unhandled_mode(UnhandledMode::OptOut);
    registry.add_ignore(
        IgnoreRule::new()
            .match_fn(|request| request.url.path() == "/health"),
    );

    let client = Client::builder()
        .base_url(server.uri())
        .stub_registry(registry.clone())
        .build()
        .unwrap();

    // The ignored path hits the real server even in opt-out mode.
    let live = client.fetch(Request::get("health")).await.unwrap();
    assert_eq!(live.status, 200);
    assert_eq!(live.text().unwrap(), "live");

    // Everything else is a stub miss.
    let miss = client
        .fetch(Request::get("metrics").max_retries(0))
        .await
        .unwrap();
    assert!(matches!(miss.error, Some(Error::StubNotFound(_))));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn disabling_the_registry_restores_real_traffic() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/real"))
        .respond_with(ResponseTemplate::new(200).set_body_string("network"))
        .mount(&server)
        .await;

    let registry = Arc::new(StubRegistry::default());
    registry.enable();
    registry.add(
        StubRule::new()
            .match_any()
            .on(Method::Get, StubResponse::new(200).with_body(&b"stubbed"[..])),
    );

    let client = Client::builder()
        .base_url(server.uri())
        .stub_registry(registry.clone())
        .build()
        .unwrap();

    let stubbed = client.fetch(Request::get("real")).await.unwrap();
    assert_eq!(stubbed.text().unwrap(), "stubbed");
    assert!(server.received_requests().await.unwrap().is_empty());

    registry.disable();
    let real = client.fetch(Request::get("real")).await.unwrap();
    assert_eq!(real.text().unwrap(), "network");
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
