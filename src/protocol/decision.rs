//! Governance decisions emitted by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::analysis::ChangeAnalysis;
use super::id;
use super::{PROTOCOL_VERSION, TYPE_DECISION};
use crate::error::{CgpError, Result};

/// Governance outcome for a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approved,
    ApprovalRequired,
    Rejected,
    Deferred,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ApprovalRequired => "approval_required",
            Self::Rejected => "rejected",
            Self::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity band for risk factors and assessments
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Classification from a normalized score:
    /// <0.4 low, <0.6 medium, <0.8 high, otherwise critical
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            Self::Critical
        } else if score >= 0.6 {
            Self::High
        } else if score >= 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One explanatory factor behind a risk score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFactor {
    /// Factor category (`api_change`, `blast_radius`, ...)
    pub category: String,

    pub description: String,

    /// Normalized factor score, 0.0-1.0
    pub score: f64,

    pub severity: Severity,
}

impl RiskFactor {
    pub fn new(
        category: impl Into<String>,
        description: impl Into<String>,
        score: f64,
        severity: Severity,
    ) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            score,
            severity,
        }
    }
}

/// Action a decision requires before execution may proceed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RequiredAction {
    HumanApproval { count: u32 },
    SecurityReview,
    TeamReview { team: String },
    RoleReview { role: String },
    TeamLeadApproval { team: String },
}

/// Governance outcome for a proposal, with the evidence behind it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub cgp_version: String,

    /// Always `change.decision`
    #[serde(rename = "type")]
    pub message_type: String,

    /// Unique id, `dec_` prefixed
    pub id: String,

    pub proposal_id: String,

    pub timestamp: DateTime<Utc>,

    pub decision: DecisionKind,

    /// Recommended bump or version label, when derivable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_version: Option<String>,

    /// Normalized risk score, 0.0-1.0
    pub risk_score: f64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_factors: Vec<RiskFactor>,

    /// Ordered rationale strings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rationale: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_actions: Vec<RequiredAction>,

    /// Conditions attached to the decision (e.g. `time_window=business_hours`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ChangeAnalysis>,
}

impl Decision {
    pub fn new(proposal_id: impl Into<String>, decision: DecisionKind, risk_score: f64) -> Self {
        Self {
            cgp_version: PROTOCOL_VERSION.to_string(),
            message_type: TYPE_DECISION.to_string(),
            id: id::decision_id(),
            proposal_id: proposal_id.into(),
            timestamp: Utc::now(),
            decision,
            recommended_version: None,
            risk_score,
            risk_factors: Vec::new(),
            rationale: Vec::new(),
            required_actions: Vec::new(),
            conditions: Vec::new(),
            analysis: None,
        }
    }

    pub fn with_recommended_version(mut self, version: impl Into<String>) -> Self {
        self.recommended_version = Some(version.into());
        self
    }

    pub fn with_risk_factors(mut self, factors: Vec<RiskFactor>) -> Self {
        self.risk_factors = factors;
        self
    }

    pub fn with_rationale(mut self, rationale: Vec<String>) -> Self {
        self.rationale = rationale;
        self
    }

    pub fn with_required_actions(mut self, actions: Vec<RequiredAction>) -> Self {
        self.required_actions = actions;
        self
    }

    pub fn with_conditions(mut self, conditions: Vec<String>) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_analysis(mut self, analysis: ChangeAnalysis) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.message_type != TYPE_DECISION {
            return Err(CgpError::validation(format!(
                "unexpected message type {:?}, want {:?}",
                self.message_type, TYPE_DECISION
            )));
        }
        if self.id.is_empty() {
            return Err(CgpError::validation("decision id must not be empty"));
        }
        if self.proposal_id.is_empty() {
            return Err(CgpError::validation("decision proposal id must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.risk_score) {
            return Err(CgpError::validation(format!(
                "risk score {} out of range [0, 1]",
                self.risk_score
            )));
        }
        Ok(())
    }

    /// Execution may proceed only on an approved decision
    pub fn allows_execution(&self) -> bool {
        self.decision == DecisionKind::Approved
    }

    /// Somebody must act before this decision resolves
    pub fn requires_human_action(&self) -> bool {
        matches!(
            self.decision,
            DecisionKind::ApprovalRequired | DecisionKind::Deferred
        )
    }

    /// Approved and rejected decisions are final
    pub fn is_terminal(&self) -> bool {
        matches!(self.decision, DecisionKind::Approved | DecisionKind::Rejected)
    }
}
