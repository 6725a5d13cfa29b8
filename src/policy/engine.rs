//! Rule evaluation and action application.

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::protocol::{DecisionKind, RequiredAction};

use super::context::EvaluationContext;
use super::schema::{Action, Condition, Operator, Policy, Rule};
use super::team::TeamDirectory;

/// Outcome of one evaluation pass
#[derive(Debug, Clone)]
pub struct PolicyOutcome {
    pub decision: DecisionKind,

    /// Set by a `block` action; terminal
    pub blocked: bool,
    pub block_reason: Option<String>,

    pub required_approvers: u32,
    pub reviewers: Vec<String>,

    /// Ordered rationale strings
    pub rationale: Vec<String>,

    /// Conditions attached to the decision
    pub conditions: Vec<String>,

    pub required_actions: Vec<RequiredAction>,

    /// Ids of the rules that matched, in application order
    pub matched_rules: Vec<String>,
}

impl PolicyOutcome {
    fn approved() -> Self {
        Self {
            decision: DecisionKind::Approved,
            blocked: false,
            block_reason: None,
            required_approvers: 0,
            reviewers: Vec::new(),
            rationale: Vec::new(),
            conditions: Vec::new(),
            required_actions: Vec::new(),
            matched_rules: Vec::new(),
        }
    }
}

/// Strictness ordering used to ensure later actions strengthen but
/// never weaken the decision.
fn strictness(kind: DecisionKind) -> u8 {
    match kind {
        DecisionKind::Approved => 0,
        DecisionKind::ApprovalRequired => 1,
        DecisionKind::Deferred => 2,
        DecisionKind::Rejected => 3,
    }
}

/// Evaluates declarative policies against a structured context.
/// Stateless per call aside from its loaded rules; safe for concurrent
/// reads.
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    policies: Vec<Policy>,
    teams: TeamDirectory,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_teams(mut self, teams: TeamDirectory) -> Self {
        self.teams = teams;
        self
    }

    /// Loads a validated policy. Declaration order is preserved and
    /// breaks priority ties.
    pub fn load_policy(&mut self, policy: Policy) {
        self.policies.push(policy);
    }

    pub fn policy_count(&self) -> usize {
        self.policies.len()
    }

    /// Evaluates every enabled rule in descending priority order and
    /// applies the actions of matching rules. Never fails: bad rules
    /// are logged and skipped; an empty engine approves by default.
    pub fn evaluate(&self, ctx: &EvaluationContext) -> PolicyOutcome {
        let mut outcome = PolicyOutcome::approved();

        // Stable sort keeps declaration order among equal priorities.
        let mut rules: Vec<&Rule> = self
            .policies
            .iter()
            .flat_map(|p| p.rules.iter())
            .filter(|r| r.enabled)
            .collect();
        rules.sort_by_key(|r| std::cmp::Reverse(r.priority));

        let mut any_match = false;
        for rule in rules {
            match rule_matches(rule, ctx) {
                Ok(true) => {
                    debug!(rule = %rule.id, priority = rule.priority, "policy rule matched");
                    any_match = true;
                    outcome.matched_rules.push(rule.id.clone());
                    for action in &rule.actions {
                        self.apply_action(action, &mut outcome);
                    }
                }
                Ok(false) => {}
                Err(reason) => {
                    warn!(rule = %rule.id, reason = %reason, "skipping unevaluable policy rule");
                }
            }
        }

        if !any_match && !outcome.blocked {
            self.apply_defaults(&mut outcome);
        }

        if outcome.blocked {
            outcome.decision = DecisionKind::Rejected;
        }

        outcome
    }

    fn apply_defaults(&self, outcome: &mut PolicyOutcome) {
        match self.policies.first() {
            Some(policy) => {
                let defaults = &policy.defaults;
                outcome.decision = defaults.decision.to_decision_kind();
                outcome.required_approvers = defaults.required_approvers;
                if outcome.required_approvers > 0 {
                    outcome.required_actions.push(RequiredAction::HumanApproval {
                        count: outcome.required_approvers,
                    });
                }
                outcome
                    .rationale
                    .push(format!("default policy ({})", policy.name));
            }
            None => {
                outcome.decision = DecisionKind::Approved;
                outcome
                    .rationale
                    .push("no policies loaded; default approval".to_string());
            }
        }
    }

    fn apply_action(&self, action: &Action, outcome: &mut PolicyOutcome) {
        match action {
            Action::SetDecision { decision } => {
                if strictness(*decision) > strictness(outcome.decision) {
                    outcome.decision = *decision;
                }
            }
            Action::RequireApproval { count, description } => {
                outcome.required_approvers = outcome.required_approvers.max(*count);
                self.strengthen_to_review(outcome);
                upsert_human_approval(outcome);
                if let Some(text) = description {
                    outcome.rationale.push(text.clone());
                }
            }
            Action::AddReviewer { reviewer } => {
                push_unique(&mut outcome.reviewers, reviewer.clone());
            }
            Action::Block { reason } => {
                // first block wins; never reversed by later rules
                if !outcome.blocked {
                    outcome.blocked = true;
                    outcome.block_reason = Some(reason.clone());
                    outcome.rationale.push(format!("blocked: {}", reason));
                }
            }
            Action::AddRationale { text } => {
                outcome.rationale.push(text.clone());
            }
            Action::AddCondition { condition } => {
                push_unique(&mut outcome.conditions, condition.clone());
            }
            Action::RequireTeamReview { team, count } => {
                let members = self.teams.members_of(team);
                for member in members {
                    push_unique(&mut outcome.reviewers, member);
                }
                outcome.required_approvers = outcome.required_approvers.max(count.unwrap_or(1));
                self.strengthen_to_review(outcome);
                upsert_human_approval(outcome);
                let required = RequiredAction::TeamReview { team: team.clone() };
                if !outcome.required_actions.contains(&required) {
                    outcome.required_actions.push(required);
                }
            }
            Action::RequireRoleReview { role, count } => {
                let members = self.teams.members_with_role(role);
                for member in members {
                    push_unique(&mut outcome.reviewers, member);
                }
                outcome.required_approvers = outcome.required_approvers.max(count.unwrap_or(1));
                self.strengthen_to_review(outcome);
                upsert_human_approval(outcome);
                let required = RequiredAction::RoleReview { role: role.clone() };
                if !outcome.required_actions.contains(&required) {
                    outcome.required_actions.push(required);
                }
            }
            Action::RequireTeamLead { team } => {
                let leads = self.teams.leads_of(team);
                for lead in leads {
                    push_unique(&mut outcome.reviewers, lead);
                }
                outcome.required_approvers = outcome.required_approvers.max(1);
                self.strengthen_to_review(outcome);
                upsert_human_approval(outcome);
                let required = RequiredAction::TeamLeadApproval { team: team.clone() };
                if !outcome.required_actions.contains(&required) {
                    outcome.required_actions.push(required);
                }
            }
        }
    }

    fn strengthen_to_review(&self, outcome: &mut PolicyOutcome) {
        if strictness(outcome.decision) < strictness(DecisionKind::ApprovalRequired) {
            outcome.decision = DecisionKind::ApprovalRequired;
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}

/// Keeps a single `human_approval` entry carrying the current maximum
fn upsert_human_approval(outcome: &mut PolicyOutcome) {
    let count = outcome.required_approvers.max(1);
    for action in outcome.required_actions.iter_mut() {
        if let RequiredAction::HumanApproval { count: existing } = action {
            *existing = (*existing).max(count);
            return;
        }
    }
    outcome
        .required_actions
        .push(RequiredAction::HumanApproval { count });
}

/// All conditions must hold. An unevaluable condition (bad regex)
/// surfaces as Err so the caller can skip the rule with a warning.
fn rule_matches(rule: &Rule, ctx: &EvaluationContext) -> Result<bool, String> {
    for condition in &rule.conditions {
        if !condition_matches(condition, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn condition_matches(condition: &Condition, ctx: &EvaluationContext) -> Result<bool, String> {
    // Absent path: non-match, not an error.
    let actual = match ctx.get(&condition.field) {
        Some(value) => value,
        None => return Ok(false),
    };
    let expected = &condition.value;

    let result = match condition.operator {
        Operator::Eq => values_equal(actual, expected),
        Operator::Ne => !values_equal(actual, expected),
        Operator::Gt => compare_numeric(actual, expected, |a, b| a > b),
        Operator::Lt => compare_numeric(actual, expected, |a, b| a < b),
        Operator::Gte => compare_numeric(actual, expected, |a, b| a >= b),
        Operator::Lte => compare_numeric(actual, expected, |a, b| a <= b),
        Operator::In => match expected.as_array() {
            Some(list) => list.iter().any(|candidate| values_equal(actual, candidate)),
            None => false,
        },
        Operator::Contains => contains(actual, expected),
        Operator::Matches => {
            let pattern = expected
                .as_str()
                .ok_or_else(|| "matches operator requires a string pattern".to_string())?;
            // compiled lazily per evaluation; a bad pattern skips the rule
            let regex = Regex::new(pattern).map_err(|e| format!("invalid regex: {}", e))?;
            actual.as_str().map(|s| regex.is_match(s)).unwrap_or(false)
        }
    };

    Ok(result)
}

/// Equality with numeric widening, so `5` and `5.0` compare equal
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_numeric(a: &Value, b: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => op(x, y),
        _ => false,
    }
}

/// Substring for strings, membership for arrays
fn contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::String(haystack) => expected
            .as_str()
            .map(|needle| haystack.contains(needle))
            .unwrap_or(false),
        Value::Array(items) => items.iter().any(|item| values_equal(item, expected)),
        _ => false,
    }
}
