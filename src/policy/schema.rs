//! Policy document schema.
//!
//! Policies load from TOML or JSON. Malformed documents fail at load
//! time; the evaluator never sees them.

use serde::{Deserialize, Serialize};

use crate::error::{CgpError, Result};
use crate::protocol::DecisionKind;

/// Comparison operator for rule conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Contains,
    Matches,
}

/// A single predicate over the evaluation context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// Dotted field path (`risk.score`, `time.freezeActive`, ...)
    pub field: String,

    pub operator: Operator,

    /// Comparison value
    pub value: serde_json::Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: serde_json::Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Action applied when a rule matches. The string-to-variant mapping
/// lives in deserialization; the engine only sees typed actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Set the decision outcome; later actions may strengthen but
    /// never weaken it
    SetDecision { decision: DecisionKind },

    /// Require human approval; the approver count only ever rises
    RequireApproval {
        count: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },

    AddReviewer { reviewer: String },

    /// Terminal: rejects the proposal and is not reversed by later rules
    Block { reason: String },

    AddRationale { text: String },

    /// Attach a condition string to the decision
    AddCondition { condition: String },

    RequireTeamReview {
        team: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },

    RequireRoleReview {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<u32>,
    },

    RequireTeamLead { team: String },
}

/// One declarative rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Higher priority evaluates first
    #[serde(default)]
    pub priority: i32,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// All conditions must hold (AND)
    pub conditions: Vec<Condition>,

    pub actions: Vec<Action>,
}

fn default_enabled() -> bool {
    true
}

/// Fallback decision when no rule matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultDecision {
    Approve,
    RequireReview,
    Reject,
}

impl DefaultDecision {
    pub fn to_decision_kind(self) -> DecisionKind {
        match self {
            Self::Approve => DecisionKind::Approved,
            Self::RequireReview => DecisionKind::ApprovalRequired,
            Self::Reject => DecisionKind::Rejected,
        }
    }
}

/// Applied when no rule matches and nothing blocked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    pub decision: DefaultDecision,

    #[serde(default)]
    pub required_approvers: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            decision: DefaultDecision::Approve,
            required_approvers: 0,
        }
    }
}

/// A named, ordered set of rules with defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub defaults: Defaults,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            rules: Vec::new(),
            defaults: Defaults::default(),
        }
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Parses a policy from TOML, failing fast on malformed documents
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let policy: Policy =
            toml::from_str(raw).map_err(|e| CgpError::PolicyLoad(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    /// Parses a policy from JSON
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let policy: Policy =
            serde_json::from_str(raw).map_err(|e| CgpError::PolicyLoad(e.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CgpError::PolicyLoad("policy name must not be empty".into()));
        }
        for rule in &self.rules {
            if rule.id.is_empty() {
                return Err(CgpError::PolicyLoad(format!(
                    "rule in policy {:?} is missing an id",
                    self.name
                )));
            }
            if rule.conditions.is_empty() {
                return Err(CgpError::PolicyLoad(format!(
                    "rule {:?} has no conditions",
                    rule.id
                )));
            }
            if rule.actions.is_empty() {
                return Err(CgpError::PolicyLoad(format!(
                    "rule {:?} has no actions",
                    rule.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_toml() {
        let raw = r#"
            name = "release-gates"
            description = "standard release gates"

            [defaults]
            decision = "require_review"
            required_approvers = 1

            [[rules]]
            id = "high-risk"
            name = "High risk requires two approvers"
            priority = 50
            conditions = [{ field = "risk.score", operator = "gte", value = 0.6 }]
            actions = [{ type = "require_approval", count = 2 }]
        "#;

        let policy = Policy::from_toml_str(raw).unwrap();
        assert_eq!(policy.name, "release-gates");
        assert_eq!(policy.rules.len(), 1);
        assert!(policy.rules[0].enabled);
        assert_eq!(policy.rules[0].priority, 50);
        assert_eq!(
            policy.defaults.decision,
            DefaultDecision::RequireReview
        );
        assert_eq!(
            policy.rules[0].actions[0],
            Action::RequireApproval {
                count: 2,
                description: None
            }
        );
    }

    #[test]
    fn test_policy_from_json() {
        let raw = r#"{
            "name": "freeze",
            "rules": [{
                "id": "freeze-block",
                "name": "Freeze blocks releases",
                "priority": 100,
                "conditions": [{ "field": "time.freezeActive", "operator": "eq", "value": true }],
                "actions": [{ "type": "block", "reason": "freeze period" }]
            }],
            "defaults": { "decision": "approve" }
        }"#;

        let policy = Policy::from_json_str(raw).unwrap();
        assert_eq!(
            policy.rules[0].actions[0],
            Action::Block {
                reason: "freeze period".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_policy_fails_at_load() {
        // unknown operator
        let raw = r#"{
            "name": "bad",
            "rules": [{
                "id": "r1",
                "name": "bad op",
                "conditions": [{ "field": "risk.score", "operator": "resembles", "value": 1 }],
                "actions": [{ "type": "block", "reason": "x" }]
            }]
        }"#;
        assert!(Policy::from_json_str(raw).is_err());
    }

    #[test]
    fn test_rule_without_actions_rejected() {
        let policy = Policy::new("p").with_rule(Rule {
            id: "r1".into(),
            name: "no actions".into(),
            description: String::new(),
            priority: 0,
            enabled: true,
            conditions: vec![Condition::new("risk.score", Operator::Gt, 0.5.into())],
            actions: vec![],
        });
        assert!(policy.validate().is_err());
    }
}
