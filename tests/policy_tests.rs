//! Policy engine behavior over loaded documents.

use cgp_core::{
    Action, DecisionKind, EvaluationContext, Operator, Policy, PolicyEngine, Team, TeamDirectory,
    TeamMember, TimeRules,
};
use pretty_assertions::assert_eq;
use serde_json::json;

fn ctx(pairs: &[(&str, serde_json::Value)]) -> EvaluationContext {
    let mut ctx = EvaluationContext::new();
    for (path, value) in pairs {
        ctx.set(*path, value.clone());
    }
    ctx
}

#[test]
fn test_default_path_with_no_rules() {
    let mut engine = PolicyEngine::new();
    engine.load_policy(Policy::from_toml_str(
        r#"
        name = "defaults-only"

        [defaults]
        decision = "require_review"
        required_approvers = 2
        "#,
    )
    .unwrap());

    let outcome = engine.evaluate(&ctx(&[("risk.score", json!(0.3))]));
    assert_eq!(outcome.decision, DecisionKind::ApprovalRequired);
    assert_eq!(outcome.required_approvers, 2);
    assert!(outcome.rationale.iter().any(|r| r.contains("default")));
}

#[test]
fn test_freeze_rule_blocks() {
    let mut engine = PolicyEngine::new();
    engine.load_policy(Policy::from_toml_str(
        r#"
        name = "freeze"

        [defaults]
        decision = "approve"

        [[rules]]
        id = "freeze-block"
        name = "Freeze blocks releases"
        priority = 100
        conditions = [{ field = "time.freezeActive", operator = "eq", value = true }]
        actions = [{ type = "block", reason = "freeze period" }]
        "#,
    )
    .unwrap());

    let outcome = engine.evaluate(&ctx(&[("time.freezeActive", json!(true))]));
    assert!(outcome.blocked);
    assert_eq!(outcome.decision, DecisionKind::Rejected);
    assert_eq!(outcome.block_reason.as_deref(), Some("freeze period"));

    // outside the freeze the default applies
    let outcome = engine.evaluate(&ctx(&[("time.freezeActive", json!(false))]));
    assert_eq!(outcome.decision, DecisionKind::Approved);
}

#[test]
fn test_priority_spans_policies() {
    let mut engine = PolicyEngine::new();
    engine.load_policy(Policy::from_json_str(
        r#"{
            "name": "first-policy",
            "rules": [{
                "id": "low-priority",
                "name": "runs last",
                "priority": 1,
                "conditions": [{ "field": "risk.score", "operator": "gte", "value": 0 }],
                "actions": [{ "type": "add_rationale", "text": "last" }]
            }],
            "defaults": { "decision": "approve" }
        }"#,
    )
    .unwrap());
    engine.load_policy(Policy::from_json_str(
        r#"{
            "name": "second-policy",
            "rules": [{
                "id": "high-priority",
                "name": "runs first",
                "priority": 90,
                "conditions": [{ "field": "risk.score", "operator": "gte", "value": 0 }],
                "actions": [{ "type": "add_rationale", "text": "first" }]
            }],
            "defaults": { "decision": "reject" }
        }"#,
    )
    .unwrap());

    let outcome = engine.evaluate(&ctx(&[("risk.score", json!(0.5))]));
    assert_eq!(outcome.matched_rules, vec!["high-priority", "low-priority"]);
    // rules matched, so neither policy's defaults apply
    assert_eq!(outcome.decision, DecisionKind::Approved);
}

#[test]
fn test_conditions_with_team_context() {
    let teams = TeamDirectory::new(vec![Team {
        name: "release-eng".to_string(),
        members: vec![TeamMember {
            actor_id: "human:alice@example.com".to_string(),
            roles: vec!["approver".to_string()],
            lead: true,
        }],
    }]);

    let mut engine = PolicyEngine::new().with_teams(teams.clone());
    engine.load_policy(Policy::from_toml_str(
        r#"
        name = "team-gates"

        [defaults]
        decision = "approve"

        [[rules]]
        id = "outsider-review"
        name = "Actors outside release-eng get reviewed by the team"
        priority = 10
        conditions = [{ field = "team.canApprove", operator = "eq", value = false }]
        actions = [{ type = "require_team_review", team = "release-eng" }]
        "#,
    )
    .unwrap());

    // outsider: team review required, reviewers resolved from directory
    let mut outsider = EvaluationContext::new();
    outsider.apply_teams(&teams, "agent:cursor");
    let outcome = engine.evaluate(&outsider);
    assert_eq!(outcome.decision, DecisionKind::ApprovalRequired);
    assert_eq!(outcome.reviewers, vec!["human:alice@example.com"]);

    // the lead herself approves straight through
    let mut lead = EvaluationContext::new();
    lead.apply_teams(&teams, "human:alice@example.com");
    let outcome = engine.evaluate(&lead);
    assert_eq!(outcome.decision, DecisionKind::Approved);
}

#[test]
fn test_business_hours_condition_gate() {
    use chrono::TimeZone;

    let mut engine = PolicyEngine::new();
    engine.load_policy(Policy::from_toml_str(
        r#"
        name = "after-hours"

        [defaults]
        decision = "approve"

        [[rules]]
        id = "after-hours-review"
        name = "Off-hours releases need a reviewer"
        priority = 20
        conditions = [{ field = "time.businessHours", operator = "eq", value = false }]
        actions = [
            { type = "require_approval", count = 1 },
            { type = "add_condition", condition = "time_window=business_hours" },
        ]
        "#,
    )
    .unwrap());

    let rules = TimeRules::default();

    let mut night = EvaluationContext::new();
    night.apply_time(
        &rules,
        chrono::Utc.with_ymd_and_hms(2025, 6, 4, 23, 0, 0).unwrap(),
    );
    let outcome = engine.evaluate(&night);
    assert_eq!(outcome.decision, DecisionKind::ApprovalRequired);
    assert!(outcome
        .conditions
        .contains(&"time_window=business_hours".to_string()));

    let mut day = EvaluationContext::new();
    day.apply_time(
        &rules,
        chrono::Utc.with_ymd_and_hms(2025, 6, 4, 11, 0, 0).unwrap(),
    );
    let outcome = engine.evaluate(&day);
    assert_eq!(outcome.decision, DecisionKind::Approved);
}

#[test]
fn test_operator_coverage_through_documents() {
    let mut engine = PolicyEngine::new();
    engine.load_policy(Policy::from_json_str(
        r#"{
            "name": "operators",
            "rules": [
                {
                    "id": "repo-pattern",
                    "name": "payment services are sensitive",
                    "priority": 30,
                    "conditions": [{ "field": "scope.repository", "operator": "matches", "value": "^acme/payments-" }],
                    "actions": [{ "type": "add_rationale", "text": "payments service" }]
                },
                {
                    "id": "kind-list",
                    "name": "machine actors",
                    "priority": 20,
                    "conditions": [{ "field": "actor.kind", "operator": "in", "value": ["agent", "ci", "system"] }],
                    "actions": [{ "type": "add_rationale", "text": "machine actor" }]
                },
                {
                    "id": "summary-keyword",
                    "name": "hotfixes stand out",
                    "priority": 10,
                    "conditions": [{ "field": "intent.summary", "operator": "contains", "value": "hotfix" }],
                    "actions": [{ "type": "add_rationale", "text": "hotfix" }]
                }
            ],
            "defaults": { "decision": "approve" }
        }"#,
    )
    .unwrap());

    let outcome = engine.evaluate(&ctx(&[
        ("scope.repository", json!("acme/payments-gateway")),
        ("actor.kind", json!("ci")),
        ("intent.summary", json!("hotfix for settlement rounding")),
    ]));
    assert_eq!(
        outcome.rationale,
        vec!["payments service", "machine actor", "hotfix"]
    );
}

#[test]
fn test_set_decision_document_round_trip() {
    let policy = Policy::from_toml_str(
        r#"
        name = "explicit-decision"

        [defaults]
        decision = "approve"

        [[rules]]
        id = "defer-weekends"
        name = "Defer weekend releases"
        priority = 5
        conditions = [{ field = "time.weekday", operator = "in", value = ["saturday", "sunday"] }]
        actions = [{ type = "set_decision", decision = "deferred" }]
        "#,
    )
    .unwrap();

    assert_eq!(
        policy.rules[0].actions[0],
        Action::SetDecision {
            decision: DecisionKind::Deferred
        }
    );

    let mut engine = PolicyEngine::new();
    engine.load_policy(policy);
    let outcome = engine.evaluate(&ctx(&[("time.weekday", json!("saturday"))]));
    assert_eq!(outcome.decision, DecisionKind::Deferred);
}

#[test]
fn test_condition_value_shapes() {
    // numeric widening between integers and floats
    let c = cgp_core::Condition::new("n", Operator::Gte, json!(3));
    let mut context = EvaluationContext::new();
    context.set("n", json!(3.0));
    let mut engine_policy = Policy::new("shape");
    engine_policy = engine_policy.with_rule(cgp_core::Rule {
        id: "num".to_string(),
        name: "numeric".to_string(),
        description: String::new(),
        priority: 0,
        enabled: true,
        conditions: vec![c],
        actions: vec![Action::AddRationale {
            text: "matched".to_string(),
        }],
    });
    let mut engine = PolicyEngine::new();
    engine.load_policy(engine_policy);
    let outcome = engine.evaluate(&context);
    assert_eq!(outcome.matched_rules, vec!["num"]);
}
