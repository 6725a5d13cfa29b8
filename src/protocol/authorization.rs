//! Execution authorizations: signed permission to run an approved release.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::actor::Actor;
use super::id;
use super::{PROTOCOL_VERSION, TYPE_AUTHORIZATION};
use crate::error::{CgpError, Result};

/// Release steps an authorization may permit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStep {
    Tag,
    Changelog,
    ReleaseNotes,
    Publish,
    Notify,
}

impl ReleaseStep {
    /// Every step, in release order
    pub fn all() -> Vec<ReleaseStep> {
        vec![
            Self::Tag,
            Self::Changelog,
            Self::ReleaseNotes,
            Self::Publish,
            Self::Notify,
        ]
    }
}

/// Action recorded in an approval chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalAction {
    Approve,
    Reject,
    RequestChanges,
    Comment,
}

/// One entry in the ordered approval chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub actor: Actor,
    pub action: ApprovalAction,
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// Optional cryptographic signature over the record
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl ApprovalRecord {
    pub fn new(actor: Actor, action: ApprovalAction) -> Self {
        Self {
            actor,
            action,
            timestamp: Utc::now(),
            comment: None,
            signature: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// Optional knobs for issuing an authorization
#[derive(Debug, Clone, Default)]
pub struct AuthorizationOptions {
    /// Validity window; defaults to 24 hours from approval
    pub valid_for: Option<Duration>,

    /// Allowed steps; defaults to all steps
    pub allowed_steps: Option<Vec<ReleaseStep>>,

    pub restrictions: Vec<String>,
    pub release_notes: Option<String>,
    pub changelog: Option<String>,
}

/// Default validity window for authorizations
pub const DEFAULT_VALIDITY_HOURS: i64 = 24;

/// Permission to execute an approved release
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    pub cgp_version: String,

    /// Always `change.execution_authorized`
    #[serde(rename = "type")]
    pub message_type: String,

    /// Unique id, `auth_` prefixed
    pub id: String,

    pub decision_id: String,
    pub proposal_id: String,

    pub timestamp: DateTime<Utc>,

    pub approved_by: Actor,
    pub approved_at: DateTime<Utc>,

    /// Version being released
    pub version: String,

    /// Derived tag, `v<version>`
    pub tag: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_notes: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub changelog: Option<String>,

    pub valid_until: DateTime<Utc>,

    /// Non-empty subset of release steps
    pub allowed_steps: Vec<ReleaseStep>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<String>,

    /// Ordered chain of approval records
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approval_chain: Vec<ApprovalRecord>,
}

impl Authorization {
    pub fn new(
        decision_id: impl Into<String>,
        proposal_id: impl Into<String>,
        approved_by: Actor,
        version: impl Into<String>,
        options: AuthorizationOptions,
    ) -> Self {
        let version = version.into();
        let approved_at = Utc::now();
        let valid_for = options
            .valid_for
            .unwrap_or_else(|| Duration::hours(DEFAULT_VALIDITY_HOURS));
        let allowed_steps = options.allowed_steps.unwrap_or_else(ReleaseStep::all);
        let initial_record = ApprovalRecord::new(approved_by.clone(), ApprovalAction::Approve);

        Self {
            cgp_version: PROTOCOL_VERSION.to_string(),
            message_type: TYPE_AUTHORIZATION.to_string(),
            id: id::authorization_id(),
            decision_id: decision_id.into(),
            proposal_id: proposal_id.into(),
            timestamp: approved_at,
            approved_by,
            approved_at,
            tag: format!("v{}", version),
            version,
            release_notes: options.release_notes,
            changelog: options.changelog,
            valid_until: approved_at + valid_for,
            allowed_steps,
            restrictions: options.restrictions,
            approval_chain: vec![initial_record],
        }
    }

    /// Appends a record to the approval chain, returning the extended
    /// authorization. The chain is ordered by insertion.
    pub fn with_approval(mut self, record: ApprovalRecord) -> Self {
        self.approval_chain.push(record);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.message_type != TYPE_AUTHORIZATION {
            return Err(CgpError::validation(format!(
                "unexpected message type {:?}, want {:?}",
                self.message_type, TYPE_AUTHORIZATION
            )));
        }
        if self.id.is_empty() {
            return Err(CgpError::validation("authorization id must not be empty"));
        }
        if self.decision_id.is_empty() {
            return Err(CgpError::validation("authorization decision id must not be empty"));
        }
        if self.proposal_id.is_empty() {
            return Err(CgpError::validation("authorization proposal id must not be empty"));
        }
        if self.version.is_empty() {
            return Err(CgpError::validation("authorization version must not be empty"));
        }
        if self.allowed_steps.is_empty() {
            return Err(CgpError::validation("authorization requires at least one allowed step"));
        }
        self.approved_by.validate()?;
        Ok(())
    }

    /// True while the validity window is open
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.valid_until
    }

    /// True when any chain entry is an approval by a human actor
    pub fn has_human_approval(&self) -> bool {
        self.approval_chain
            .iter()
            .any(|r| r.action == ApprovalAction::Approve && r.actor.is_human())
    }

    /// Number of approve entries in the chain
    pub fn approval_count(&self) -> usize {
        self.approval_chain
            .iter()
            .filter(|r| r.action == ApprovalAction::Approve)
            .count()
    }

    /// Whether a given step is allowed by this authorization
    pub fn allows_step(&self, step: ReleaseStep) -> bool {
        self.allowed_steps.contains(&step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorization() -> Authorization {
        Authorization::new(
            "dec_abc",
            "prop_abc",
            Actor::human("alice@example.com"),
            "1.4.0",
            AuthorizationOptions::default(),
        )
    }

    #[test]
    fn test_defaults() {
        let auth = authorization();
        assert_eq!(auth.tag, "v1.4.0");
        assert_eq!(auth.allowed_steps.len(), 5);
        assert_eq!(auth.valid_until, auth.approved_at + Duration::hours(24));
        assert_eq!(auth.approval_chain.len(), 1);
        assert!(auth.validate().is_ok());
    }

    #[test]
    fn test_validity_window() {
        let auth = authorization();
        assert!(auth.is_valid(Utc::now()));
        assert!(!auth.is_valid(auth.valid_until + Duration::seconds(1)));
    }

    #[test]
    fn test_approval_count_matches_chain() {
        let auth = authorization()
            .with_approval(ApprovalRecord::new(
                Actor::human("bob@example.com"),
                ApprovalAction::Approve,
            ))
            .with_approval(
                ApprovalRecord::new(Actor::human("carol@example.com"), ApprovalAction::Comment)
                    .with_comment("looks fine"),
            )
            .with_approval(ApprovalRecord::new(
                Actor::ci("github-actions"),
                ApprovalAction::Approve,
            ));

        assert_eq!(auth.approval_count(), 3);
        assert!(auth.has_human_approval());
    }

    #[test]
    fn test_human_approval_ignores_machine_approvals() {
        let mut auth = authorization();
        auth.approval_chain = vec![ApprovalRecord::new(
            Actor::ci("github-actions"),
            ApprovalAction::Approve,
        )];
        assert!(!auth.has_human_approval());
        assert_eq!(auth.approval_count(), 1);
    }

    #[test]
    fn test_steps_must_not_be_empty() {
        let mut auth = authorization();
        auth.allowed_steps.clear();
        assert!(auth.validate().is_err());
    }

    #[test]
    fn test_wire_keys() {
        let auth = authorization();
        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["type"], "change.execution_authorized");
        assert_eq!(json["decisionId"], "dec_abc");
        assert_eq!(json["tag"], "v1.4.0");
        assert_eq!(json["allowedSteps"][0], "tag");
        assert_eq!(json["approvalChain"][0]["action"], "approve");
    }
}
