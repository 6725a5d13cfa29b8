//! Release proposals: a request to release a set of changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::actor::Actor;
use super::id;
use super::{PROTOCOL_VERSION, TYPE_PROPOSAL};
use crate::error::{CgpError, Result};

/// Suggested semantic-version bump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bump {
    Major,
    Minor,
    Patch,
}

impl Bump {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
        }
    }
}

impl std::fmt::Display for Bump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target of a proposed release
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    /// Target repository, `owner/repo` convention
    pub repository: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Commit range in `from..to` notation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_range: Option<String>,

    /// Explicit commit list; at least one of range/list is required
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

impl Scope {
    pub fn new(repository: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            branch: None,
            commit_range: None,
            commits: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_commit_range(mut self, range: impl Into<String>) -> Self {
        self.commit_range = Some(range.into());
        self
    }

    pub fn with_commits(mut self, commits: Vec<String>) -> Self {
        self.commits = commits;
        self
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files = files;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.repository.is_empty() {
            return Err(CgpError::validation("scope repository must not be empty"));
        }
        if self.commit_range.is_none() && self.commits.is_empty() {
            return Err(CgpError::validation(
                "scope requires a commit range or an explicit commit list",
            ));
        }
        Ok(())
    }
}

/// What the proposer intends to ship
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Human-readable summary of the release
    pub summary: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_bump: Option<Bump>,

    /// Proposer confidence in the change set, 0.0-1.0
    pub confidence: f64,

    /// Category tags (feature, fix, refactor, ...)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    /// Explicit breaking-change descriptions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breaking_changes: Vec<String>,
}

impl Intent {
    pub fn new(summary: impl Into<String>, confidence: f64) -> Self {
        Self {
            summary: summary.into(),
            suggested_bump: None,
            confidence,
            categories: Vec::new(),
            breaking_changes: Vec::new(),
        }
    }

    pub fn with_bump(mut self, bump: Bump) -> Self {
        self.suggested_bump = Some(bump);
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_breaking_changes(mut self, breaking: Vec<String>) -> Self {
        self.breaking_changes = breaking;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.summary.is_empty() {
            return Err(CgpError::validation("intent summary must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(CgpError::validation(format!(
                "intent confidence {} out of range [0, 1]",
                self.confidence
            )));
        }
        Ok(())
    }

    /// True when the proposer declared breaking changes
    pub fn has_breaking(&self) -> bool {
        !self.breaking_changes.is_empty()
    }
}

/// Optional linkage to the world outside the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalContext {
    /// External issue references
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issue_refs: Vec<String>,

    /// Agent session id, when the proposer is an agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    /// Earlier proposals this one supersedes or follows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prior_proposals: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// A request to release a set of changes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub cgp_version: String,

    /// Always `change.proposal`
    #[serde(rename = "type")]
    pub message_type: String,

    /// Unique id, `prop_` prefixed
    pub id: String,

    pub timestamp: DateTime<Utc>,

    pub actor: Actor,

    pub scope: Scope,

    pub intent: Intent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ProposalContext>,
}

impl Proposal {
    pub fn new(actor: Actor, scope: Scope, intent: Intent) -> Self {
        Self {
            cgp_version: PROTOCOL_VERSION.to_string(),
            message_type: TYPE_PROPOSAL.to_string(),
            id: id::proposal_id(),
            timestamp: Utc::now(),
            actor,
            scope,
            intent,
            context: None,
        }
    }

    pub fn with_context(mut self, context: ProposalContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Validates every invariant of the message. Succeeds iff all
    /// required fields are set, confidence is in range, and enum-typed
    /// fields carry known values.
    pub fn validate(&self) -> Result<()> {
        if self.message_type != TYPE_PROPOSAL {
            return Err(CgpError::validation(format!(
                "unexpected message type {:?}, want {:?}",
                self.message_type, TYPE_PROPOSAL
            )));
        }
        if self.id.is_empty() {
            return Err(CgpError::validation("proposal id must not be empty"));
        }
        self.actor.validate()?;
        self.scope.validate()?;
        self.intent.validate()?;
        Ok(())
    }
}
