//! Fan-out webhook dispatch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::tracker::{EventPublisher, ReleaseEvent};

use super::config::WebhookConfig;
use super::signature;

/// Default header namespace: `X-CGP-Event`, `X-CGP-Signature`
pub const DEFAULT_NAMESPACE: &str = "CGP";

const USER_AGENT: &str = concat!("cgp-core/", env!("CARGO_PKG_VERSION"));

/// Webhook request body
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    event: &'a str,
    release_id: &'a str,
    timestamp: DateTime<Utc>,
    data: Value,
}

/// Tracks spawned deliveries so shutdown can drain them
#[derive(Debug, Default)]
struct Inflight {
    count: AtomicUsize,
    notify: Notify,
}

/// Dispatches lifecycle events to configured webhooks. `publish`
/// spawns one task per (webhook, event) pair and returns immediately;
/// the webhook list is read-only after construction, so concurrent
/// publishes are safe. Cancelling the publisher's token terminates
/// in-flight deliveries, including between retry attempts.
pub struct WebhookPublisher {
    webhooks: Vec<WebhookConfig>,
    client: reqwest::Client,
    namespace: String,
    next: Option<Arc<dyn EventPublisher>>,
    inflight: Arc<Inflight>,
    cancel: CancellationToken,
}

impl WebhookPublisher {
    pub fn new(webhooks: Vec<WebhookConfig>) -> Self {
        Self {
            webhooks,
            client: reqwest::Client::new(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            next: None,
            inflight: Arc::new(Inflight::default()),
            cancel: CancellationToken::new(),
        }
    }

    /// Overrides the `X-<Namespace>-*` header namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Chains a downstream publisher
    pub fn with_next(mut self, next: Arc<dyn EventPublisher>) -> Self {
        self.next = Some(next);
        self
    }

    /// Adopts a caller-owned cancellation token; deliveries spawned
    /// afterward stop when it is cancelled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token governing every delivery this publisher spawns
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Terminates in-flight deliveries as failed, without raising
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn webhook_count(&self) -> usize {
        self.webhooks.len()
    }

    fn spawn_delivery(&self, webhook: WebhookConfig, event_name: &'static str, body: Arc<Vec<u8>>) {
        let client = self.client.clone();
        let namespace = self.namespace.clone();
        let inflight = self.inflight.clone();
        let cancel = self.cancel.child_token();

        inflight.count.fetch_add(1, Ordering::AcqRel);
        tokio::spawn(async move {
            deliver(&client, &webhook, &namespace, event_name, &body, &cancel).await;
            inflight.count.fetch_sub(1, Ordering::AcqRel);
            inflight.notify.notify_waiters();
        });
    }
}

/// POSTs one payload to one webhook, retrying transient failures.
/// 2xx succeeds, 4xx is terminal, 5xx and transport errors retry up to
/// the configured count with the configured delay between attempts.
/// Cancellation propagates into the outbound request and the retry
/// sleeps; a cancelled delivery ends as failed, silently.
async fn deliver(
    client: &reqwest::Client,
    webhook: &WebhookConfig,
    namespace: &str,
    event_name: &str,
    body: &[u8],
    cancel: &CancellationToken,
) {
    let max_attempts = webhook.retry_count + 1;

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            debug!(
                webhook = %webhook.name,
                event = %event_name,
                "webhook delivery canceled"
            );
            return;
        }

        let mut request = client
            .post(&webhook.url)
            .timeout(webhook.timeout())
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .header(format!("X-{}-Event", namespace), event_name);

        if let Some(secret) = &webhook.secret {
            request = request.header(
                format!("X-{}-Signature", namespace),
                signature::signature_header(body, secret),
            );
        }

        // custom headers last, so they may override the defaults
        for (key, value) in &webhook.headers {
            request = request.header(key, value);
        }

        let result = tokio::select! {
            result = request.body(body.to_vec()).send() => result,
            _ = cancel.cancelled() => {
                debug!(
                    webhook = %webhook.name,
                    event = %event_name,
                    attempt = attempt,
                    "webhook delivery canceled mid-request"
                );
                return;
            }
        };

        match result {
            Ok(response) if response.status().is_success() => {
                debug!(
                    webhook = %webhook.name,
                    event = %event_name,
                    attempt = attempt,
                    "webhook delivered"
                );
                return;
            }
            Ok(response) if response.status().is_client_error() => {
                warn!(
                    webhook = %webhook.name,
                    event = %event_name,
                    status = %response.status(),
                    "webhook rejected; not retrying"
                );
                return;
            }
            Ok(response) => {
                warn!(
                    webhook = %webhook.name,
                    event = %event_name,
                    status = %response.status(),
                    attempt = attempt,
                    "webhook delivery failed"
                );
            }
            Err(e) => {
                warn!(
                    webhook = %webhook.name,
                    event = %event_name,
                    error = %e,
                    attempt = attempt,
                    "webhook request error"
                );
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                _ = tokio::time::sleep(webhook.retry_delay()) => {}
                _ = cancel.cancelled() => {
                    debug!(
                        webhook = %webhook.name,
                        event = %event_name,
                        attempt = attempt,
                        "webhook delivery canceled between attempts"
                    );
                    return;
                }
            }
        }
    }

    warn!(
        webhook = %webhook.name,
        event = %event_name,
        attempts = max_attempts,
        "webhook delivery exhausted retries"
    );
}

#[async_trait]
impl EventPublisher for WebhookPublisher {
    async fn publish(&self, event: &ReleaseEvent) {
        let event_name = event.name();

        let targets: Vec<&WebhookConfig> = self
            .webhooks
            .iter()
            .filter(|w| w.enabled && w.matches_event(event_name))
            .collect();

        if !targets.is_empty() {
            let payload = WebhookPayload {
                event: event_name,
                release_id: event.release_id(),
                timestamp: event.timestamp(),
                data: event.payload(),
            };
            match serde_json::to_vec(&payload) {
                Ok(bytes) => {
                    let body = Arc::new(bytes);
                    for webhook in targets {
                        self.spawn_delivery(webhook.clone(), event_name, body.clone());
                    }
                }
                Err(e) => warn!(event = %event_name, error = %e, "failed to serialize webhook payload"),
            }
        }

        if let Some(next) = &self.next {
            next.publish(event).await;
        }
    }

    /// Drains in-flight deliveries before returning
    async fn shutdown(&self) {
        loop {
            let notified = self.inflight.notify.notified();
            if self.inflight.count.load(Ordering::Acquire) == 0 {
                break;
            }
            notified.await;
        }
        if let Some(next) = &self.next {
            next.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_webhooks_are_skipped() {
        let mut disabled = WebhookConfig::new("off", "https://example.com/hook");
        disabled.enabled = false;
        let publisher = WebhookPublisher::new(vec![disabled]);
        assert_eq!(publisher.webhook_count(), 1);

        let event = ReleaseEvent::created("rel-1", "a/b");
        let targets: Vec<_> = publisher
            .webhooks
            .iter()
            .filter(|w| w.enabled && w.matches_event(event.name()))
            .collect();
        assert!(targets.is_empty());
    }

    #[test]
    fn test_payload_shape() {
        let event = ReleaseEvent::published("rel-1", "2.0.0");
        let payload = WebhookPayload {
            event: event.name(),
            release_id: event.release_id(),
            timestamp: event.timestamp(),
            data: event.payload(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event"], "release.published");
        assert_eq!(json["release_id"], "rel-1");
        assert_eq!(json["data"]["version"], "2.0.0");
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[tokio::test]
    async fn test_shutdown_with_nothing_inflight_returns() {
        let publisher = WebhookPublisher::new(vec![]);
        publisher.shutdown().await;
    }
}
