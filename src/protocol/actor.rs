//! Actors: the originators of proposals and approvals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CgpError, Result};

/// Kind of entity behind a proposal or approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    /// AI agent (coding assistant, autonomous service)
    Agent,
    /// Continuous-integration system
    Ci,
    /// Human operator
    Human,
    /// Internal automated service
    System,
    /// Unrecognized origin; scored as the least trusted kind
    Unknown,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Ci => "ci",
            Self::Human => "human",
            Self::System => "system",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ActorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered autonomy tier granted to an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Untrusted,
    Limited,
    Trusted,
    Full,
}

impl TrustLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Untrusted => "untrusted",
            Self::Limited => "limited",
            Self::Trusted => "trusted",
            Self::Full => "full",
        }
    }
}

/// Opaque credentials descriptor. Raw secrets are never retained;
/// only a hash and its expiry travel with the actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsDescriptor {
    /// Credential type (e.g. `api_key`, `oidc`)
    pub kind: String,

    /// Opaque hash of the credential material
    pub hash: String,

    /// Optional expiry for the credential
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Identity of a proposal or approval originator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Actor kind
    pub kind: ActorKind,

    /// Stable identifier, conventionally namespaced:
    /// `agent:cursor`, `ci:github-actions`, `human:<email>`, `system:<name>`
    pub id: String,

    /// Optional display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Optional trust level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trust_level: Option<TrustLevel>,

    /// Free-form attributes (model, workflow id, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,

    /// Optional credentials descriptor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<CredentialsDescriptor>,
}

impl Actor {
    pub fn new(kind: ActorKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: None,
            trust_level: None,
            attributes: HashMap::new(),
            credentials: None,
        }
    }

    /// Agent actor with the conventional `agent:` namespace
    pub fn agent(name: impl AsRef<str>) -> Self {
        Self::new(ActorKind::Agent, format!("agent:{}", name.as_ref()))
    }

    /// CI actor with the conventional `ci:` namespace
    pub fn ci(name: impl AsRef<str>) -> Self {
        Self::new(ActorKind::Ci, format!("ci:{}", name.as_ref()))
    }

    /// Human actor identified by email
    pub fn human(email: impl AsRef<str>) -> Self {
        Self::new(ActorKind::Human, format!("human:{}", email.as_ref()))
    }

    /// Internal system actor
    pub fn system(name: impl AsRef<str>) -> Self {
        Self::new(ActorKind::System, format!("system:{}", name.as_ref()))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_trust(mut self, trust: TrustLevel) -> Self {
        self.trust_level = Some(trust);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialsDescriptor) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(CgpError::validation("actor id must not be empty"));
        }
        Ok(())
    }

    /// Actors at trust level `trusted` or above may be auto-approved
    pub fn can_auto_approve(&self) -> bool {
        self.trust_level
            .map(|t| t >= TrustLevel::Trusted)
            .unwrap_or(false)
    }

    /// Actors at trust level `limited` or above may submit proposals
    pub fn can_propose(&self) -> bool {
        self.trust_level
            .map(|t| t >= TrustLevel::Limited)
            .unwrap_or(false)
    }

    /// Agents and automated systems always require a human in the loop
    pub fn requires_human_review(&self) -> bool {
        matches!(self.kind, ActorKind::Agent | ActorKind::System)
    }

    /// True when the actor is a human
    pub fn is_human(&self) -> bool {
        self.kind == ActorKind::Human
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trust_level_ordering() {
        assert!(TrustLevel::Untrusted < TrustLevel::Limited);
        assert!(TrustLevel::Limited < TrustLevel::Trusted);
        assert!(TrustLevel::Trusted < TrustLevel::Full);
    }

    #[test]
    fn test_namespaced_constructors() {
        assert_eq!(Actor::agent("cursor").id, "agent:cursor");
        assert_eq!(Actor::ci("github-actions").id, "ci:github-actions");
        assert_eq!(Actor::human("alice@example.com").id, "human:alice@example.com");
        assert_eq!(Actor::system("scheduler").id, "system:scheduler");
    }

    #[test]
    fn test_auto_approve_requires_trusted() {
        let actor = Actor::human("alice@example.com").with_trust(TrustLevel::Trusted);
        assert!(actor.can_auto_approve());
        assert!(actor.can_propose());

        let limited = Actor::human("bob@example.com").with_trust(TrustLevel::Limited);
        assert!(!limited.can_auto_approve());
        assert!(limited.can_propose());

        let unknown = Actor::human("carol@example.com");
        assert!(!unknown.can_auto_approve());
        assert!(!unknown.can_propose());
    }

    #[test]
    fn test_human_review_predicate() {
        assert!(Actor::agent("cursor").requires_human_review());
        assert!(Actor::system("cron").requires_human_review());
        assert!(!Actor::ci("jenkins").requires_human_review());
        assert!(!Actor::human("alice@example.com").requires_human_review());
    }

    #[test]
    fn test_unknown_kind_round_trips() {
        let actor = Actor::new(ActorKind::Unknown, "mystery-caller");
        let json = serde_json::to_string(&actor).unwrap();
        assert!(json.contains("\"kind\":\"unknown\""));

        let back: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, ActorKind::Unknown);
        assert!(!back.requires_human_review());
    }

    #[test]
    fn test_empty_id_rejected() {
        let actor = Actor::new(ActorKind::Human, "");
        assert!(actor.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let actor = Actor::agent("cursor")
            .with_trust(TrustLevel::Limited)
            .with_attribute("model", "gpt-4");

        let json = serde_json::to_string(&actor).unwrap();
        assert!(json.contains("\"kind\":\"agent\""));
        assert!(json.contains("\"trustLevel\":\"limited\""));

        let back: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, actor.id);
        assert_eq!(back.trust_level, Some(TrustLevel::Limited));
    }
}
