//! Webhook delivery against a live mock receiver.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cgp_core::{
    EventPublisher, InMemoryStore, MemoryStore, OutcomeTracker, ReleaseEvent, WebhookConfig,
    WebhookPublisher, verify_signature,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn header_value(request: &wiremock::Request, name: &str) -> Option<String> {
    request
        .headers
        .iter()
        .find(|(header, _)| header.as_str().eq_ignore_ascii_case(name))
        .map(|(_, values)| values.iter().next().unwrap().as_str().to_string())
}

/// Scenario: a `release.*` filter receives each lifecycle event
/// exactly once.
#[tokio::test]
async fn test_wildcard_filter_delivers_each_event_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(3)
        .mount(&server)
        .await;

    let webhook = WebhookConfig::new("all-releases", format!("{}/hook", server.uri()))
        .with_events(vec!["release.*".to_string()]);
    let publisher = WebhookPublisher::new(vec![webhook]);

    publisher
        .publish(&ReleaseEvent::created("rel-1", "owner/repo"))
        .await;
    publisher
        .publish(&ReleaseEvent::approved("rel-1", "human:alice@example.com"))
        .await;
    publisher
        .publish(&ReleaseEvent::published("rel-1", "1.0.0"))
        .await;
    publisher.shutdown().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);

    let mut seen = HashSet::new();
    for request in &requests {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(body["release_id"], "rel-1");
        let event = body["event"].as_str().unwrap().to_string();
        assert_eq!(header_value(request, "x-cgp-event").unwrap(), event);
        assert!(seen.insert(event), "event delivered more than once");
    }
    assert_eq!(
        seen,
        HashSet::from([
            "release.created".to_string(),
            "release.approved".to_string(),
            "release.published".to_string(),
        ])
    );
}

/// Scenario: two 503s then a 200. Publish returns immediately; the
/// delivery succeeds on the third attempt.
#[tokio::test]
async fn test_retry_on_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let webhook = WebhookConfig::new("flaky", format!("{}/hook", server.uri()))
        .with_retries(5, Duration::from_millis(10));
    let publisher = WebhookPublisher::new(vec![webhook]);

    let started = Instant::now();
    publisher
        .publish(&ReleaseEvent::published("rel-1", "1.0.0"))
        .await;
    assert!(
        started.elapsed() < Duration::from_millis(100),
        "publish must not block on delivery"
    );

    publisher.shutdown().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

/// 4xx responses are terminal: no retries.
#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&server)
        .await;

    let webhook = WebhookConfig::new("strict", format!("{}/hook", server.uri()))
        .with_retries(5, Duration::from_millis(10));
    let publisher = WebhookPublisher::new(vec![webhook]);

    publisher
        .publish(&ReleaseEvent::failed("rel-1", "compile error"))
        .await;
    publisher.shutdown().await;

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// A configured secret produces a verifiable signature over the exact
/// payload bytes.
#[tokio::test]
async fn test_signed_delivery_verifies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let webhook = WebhookConfig::new("signed", format!("{}/hook", server.uri()))
        .with_secret("s3cret")
        .with_header("X-Environment", "staging");
    let publisher = WebhookPublisher::new(vec![webhook]);

    publisher
        .publish(&ReleaseEvent::tag_created("rel-1", "v1.0.0"))
        .await;
    publisher.shutdown().await;

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];

    let signature = header_value(request, "x-cgp-signature").unwrap();
    assert!(signature.starts_with("sha256="));
    assert!(verify_signature(&request.body, &signature, "s3cret"));
    assert!(!verify_signature(&request.body, &signature, "wrong"));

    assert_eq!(
        header_value(request, "content-type").unwrap(),
        "application/json"
    );
    assert_eq!(header_value(request, "x-environment").unwrap(), "staging");
    assert!(header_value(request, "user-agent").unwrap().starts_with("cgp-core/"));
}

/// Cancellation between retry attempts terminates the delivery as
/// failed, silently; shutdown then drains immediately.
#[tokio::test]
async fn test_cancellation_stops_retrying_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let webhook = WebhookConfig::new("stubborn", format!("{}/hook", server.uri()))
        .with_retries(1000, Duration::from_millis(20));
    let publisher = WebhookPublisher::new(vec![webhook]);

    publisher
        .publish(&ReleaseEvent::published("rel-1", "1.0.0"))
        .await;

    // let a few attempts land, then cancel mid-retry
    tokio::time::sleep(Duration::from_millis(100)).await;
    publisher.cancel();

    let started = Instant::now();
    publisher.shutdown().await;
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "cancelled delivery must drain promptly"
    );

    let attempts = server.received_requests().await.unwrap().len();
    assert!(attempts >= 1, "at least one attempt before cancellation");
    assert!(attempts < 50, "cancellation must stop the retry loop");
}

/// An adopted caller-owned token governs deliveries: cancelled before
/// publish, nothing is attempted.
#[tokio::test]
async fn test_adopted_token_cancels_before_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let webhook = WebhookConfig::new("gated", format!("{}/hook", server.uri()));
    let publisher = WebhookPublisher::new(vec![webhook]).with_cancellation(token.clone());

    token.cancel();
    publisher
        .publish(&ReleaseEvent::created("rel-1", "owner/repo"))
        .await;
    publisher.shutdown().await;

    assert!(server.received_requests().await.unwrap().is_empty());
}

/// Non-matching and disabled webhooks receive nothing.
#[tokio::test]
async fn test_filtered_out_events_are_not_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let filtered = WebhookConfig::new("published-only", format!("{}/hook", server.uri()))
        .with_events(vec!["release.published".to_string()]);
    let mut disabled = WebhookConfig::new("disabled", format!("{}/hook", server.uri()));
    disabled.enabled = false;

    let publisher = WebhookPublisher::new(vec![filtered, disabled]);
    publisher
        .publish(&ReleaseEvent::created("rel-1", "owner/repo"))
        .await;
    publisher.shutdown().await;

    assert!(server.received_requests().await.unwrap().is_empty());
}

/// The tracker forwards every event into the webhook chain while
/// recording outcomes, preserving the caller's per-release order.
#[tokio::test]
async fn test_tracker_chains_into_webhooks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let webhook = WebhookConfig::new("bridge", format!("{}/hook", server.uri()));
    let publisher = Arc::new(WebhookPublisher::new(vec![webhook]));
    let store = Arc::new(InMemoryStore::new());
    let tracker = OutcomeTracker::new(store.clone()).with_next(publisher.clone());

    tracker
        .publish(&ReleaseEvent::created("rel-1", "owner/repo"))
        .await;
    tracker
        .publish(&ReleaseEvent::published("rel-1", "1.0.0"))
        .await;
    tracker.shutdown().await;

    // webhooks saw both events
    assert_eq!(server.received_requests().await.unwrap().len(), 2);

    // and the outcome landed in memory
    let history = store.release_history("owner/repo", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].version, "1.0.0");
}
