//! Redirect handling in the bundled loader: chasing with standard
//! semantics, refusing, and re-issuing with the original settings. Also
//! covers the delegate's redirect callback and per-hop metrics.

use reqflow::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use wiremock::matchers::{body_string, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn redirecting_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "/end"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/end"))
        .respond_with(ResponseTemplate::new(200).set_body_string("arrived"))
        .mount(&server)
        .await;
    server
}

struct RedirectSpy(Arc<AtomicU32>);

impl ClientDelegate for RedirectSpy {
    fn will_perform_redirect(&self, _request: &WireRequest, _new_url: &url::Url) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn follow_policy_chases_the_redirect() {
    let server = redirecting_server().await;
    let redirects = Arc::new(AtomicU32::new(0));
    let client = Client::builder()
        .base_url(server.uri())
        .delegate(RedirectSpy(redirects.clone()))
        .build()
        .unwrap();

    let response = client.fetch(Request::get("start")).await.unwrap();

    assert!(response.error.is_none());
    assert_eq!(response.status, 200);
    assert_eq!(response.text().unwrap(), "arrived");
    assert_eq!(response.metrics.redirect_count, 1);
    assert_eq!(response.metrics.transactions.len(), 2);
    assert!(response.original_request.url.path().ends_with("/start"));
    assert!(response.current_request.url.path().ends_with("/end"));
    assert_eq!(redirects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refuse_policy_delivers_the_redirect_response() {
    let server = redirecting_server().await;
    let client = Client::builder()
        .base_url(server.uri())
        .redirect_policy(RedirectPolicy::Refuse)
        .allows_empty_responses(true)
        .build()
        .unwrap();

    let response = client.fetch(Request::get("start")).await.unwrap();

    assert!(response.error.is_none());
    assert_eq!(response.status, 302);
    assert_eq!(response.headers.value("location"), Some("/end"));
    assert_eq!(response.metrics.redirect_count, 0);
}

#[tokio::test]
async fn original_settings_policy_replays_method_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/moved"))
        .mount(&server)
        .await;
    // Standard semantics would downgrade the hop to a bodyless GET.
    Mock::given(method("POST"))
        .and(path("/moved"))
        .and(body_string("payload"))
        .respond_with(ResponseTemplate::new(200).set_body_string("replayed"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(ResponseTemplate::new(200).set_body_string("downgraded"))
        .mount(&server)
        .await;

    let base = server.uri();

    let original = Client::builder()
        .base_url(base.as_str())
        .redirect_policy(RedirectPolicy::FollowWithOriginalSettings)
        .build()
        .unwrap();
    let replayed = original
        .fetch(Request::post("submit").body(Body::text("payload")))
        .await
        .unwrap();
    assert_eq!(replayed.text().unwrap(), "replayed");

    let standard = Client::builder().base_url(base.as_str()).build().unwrap();
    let downgraded = standard
        .fetch(Request::post("submit").body(Body::text("payload")))
        .await
        .unwrap();
    assert_eq!(downgraded.text().unwrap(), "downgraded");
}
