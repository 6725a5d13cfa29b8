//! Per-webhook delivery configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

fn default_enabled() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

/// One webhook destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,

    pub url: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Event filter: literal names and `*`-wildcard patterns
    /// (`release.*`). Empty means all events.
    #[serde(default)]
    pub events: Vec<String>,

    /// Shared secret for HMAC-SHA256 signatures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Custom headers; may override the defaults
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl WebhookConfig {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
            events: Vec::new(),
            secret: None,
            headers: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            retry_count: default_retry_count(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }

    pub fn with_events(mut self, events: Vec<String>) -> Self {
        self.events = events;
        self
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_retries(mut self, count: u32, delay: Duration) -> Self {
        self.retry_count = count;
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether this webhook wants the named event. `*` matches all,
    /// `foo.bar` matches exactly, `foo.*` matches the prefix.
    pub fn matches_event(&self, event_name: &str) -> bool {
        if self.events.is_empty() {
            return true;
        }
        self.events.iter().any(|pattern| {
            if pattern == "*" {
                true
            } else if let Some(prefix) = pattern.strip_suffix(".*") {
                event_name == prefix
                    || event_name
                        .strip_prefix(prefix)
                        .map(|rest| rest.starts_with('.'))
                        .unwrap_or(false)
            } else {
                pattern == event_name
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_matches_all() {
        let config = WebhookConfig::new("all", "https://example.com/hook");
        assert!(config.matches_event("release.created"));
        assert!(config.matches_event("anything.else"));
    }

    #[test]
    fn test_star_matches_all() {
        let config = WebhookConfig::new("all", "https://example.com/hook")
            .with_events(vec!["*".to_string()]);
        assert!(config.matches_event("release.created"));
    }

    #[test]
    fn test_exact_filter() {
        let config = WebhookConfig::new("one", "https://example.com/hook")
            .with_events(vec!["release.published".to_string()]);
        assert!(config.matches_event("release.published"));
        assert!(!config.matches_event("release.created"));
    }

    #[test]
    fn test_prefix_wildcard() {
        let config = WebhookConfig::new("rel", "https://example.com/hook")
            .with_events(vec!["release.*".to_string()]);
        assert!(config.matches_event("release.created"));
        assert!(config.matches_event("release.tag_created"));
        assert!(!config.matches_event("deploy.started"));
        // prefix must be segment-aligned
        assert!(!config.matches_event("releases.created"));
    }

    #[test]
    fn test_serde_defaults() {
        let raw = r#"{ "name": "minimal", "url": "https://example.com/hook" }"#;
        let config: WebhookConfig = serde_json::from_str(raw).unwrap();
        assert!(config.enabled);
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert!(config.events.is_empty());
    }
}
