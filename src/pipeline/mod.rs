//! The governance pipeline: proposal in, decision out, authorization
//! on approval.
//!
//! Glues the risk calculator, policy engine, and release memory
//! together; every decision and authorization is recorded before it is
//! returned.

use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::error::{CgpError, Result};
use crate::memory::MemoryStore;
use crate::policy::{EvaluationContext, PolicyEngine, TeamDirectory, TimeRules};
use crate::protocol::{
    Actor, Authorization, AuthorizationOptions, ChangeAnalysis, Decision, Proposal,
};
use crate::risk::RiskCalculator;

/// Orchestrates proposal evaluation and authorization issuance
pub struct GovernancePipeline {
    risk: RiskCalculator,
    policy: PolicyEngine,
    memory: Arc<dyn MemoryStore>,
    time: Option<TimeRules>,
    teams: Option<TeamDirectory>,
}

impl GovernancePipeline {
    pub fn new(risk: RiskCalculator, policy: PolicyEngine, memory: Arc<dyn MemoryStore>) -> Self {
        Self {
            risk,
            policy,
            memory,
            time: None,
            teams: None,
        }
    }

    /// Enables the `time.*` context paths
    pub fn with_time_rules(mut self, time: TimeRules) -> Self {
        self.time = Some(time);
        self
    }

    /// Enables the `team.*` context paths and reviewer resolution
    pub fn with_teams(mut self, teams: TeamDirectory) -> Self {
        self.policy = self.policy.with_teams(teams.clone());
        self.teams = Some(teams);
        self
    }

    /// Evaluates a proposal: validate, score risk, apply policies,
    /// assemble the decision, and record it.
    pub async fn decide(&self, proposal: &Proposal, analysis: &ChangeAnalysis) -> Result<Decision> {
        proposal.validate()?;

        let rollback_rate = self
            .memory
            .rollback_rate(&proposal.scope.repository)
            .await?;
        let assessment = self
            .risk
            .calculate_with_rollback_rate(proposal, analysis, rollback_rate);

        let mut ctx = EvaluationContext::from_inputs(proposal, analysis, assessment.score);
        if let Some(time) = &self.time {
            ctx.apply_time(time, Utc::now());
        }
        if let Some(teams) = &self.teams {
            ctx.apply_teams(teams, &proposal.actor.id);
        }

        let outcome = self.policy.evaluate(&ctx);

        let mut rationale = vec![assessment.summary.clone()];
        rationale.extend(outcome.rationale.clone());

        let decision = Decision::new(proposal.id.clone(), outcome.decision, assessment.score)
            .with_recommended_version(recommend_bump(proposal, analysis))
            .with_risk_factors(assessment.factors)
            .with_rationale(rationale)
            .with_required_actions(outcome.required_actions)
            .with_conditions(outcome.conditions)
            .with_analysis(analysis.clone());

        self.memory.record_decision(&decision).await?;

        info!(
            proposal_id = %proposal.id,
            decision_id = %decision.id,
            decision = %decision.decision,
            risk_score = decision.risk_score,
            "governance decision recorded"
        );

        Ok(decision)
    }

    /// Issues and records an authorization for an approved decision.
    /// Refuses decisions that do not permit execution.
    pub async fn authorize(
        &self,
        decision: &Decision,
        approver: Actor,
        version: impl Into<String>,
        options: AuthorizationOptions,
    ) -> Result<Authorization> {
        if !decision.allows_execution() {
            return Err(CgpError::NotAuthorized(format!(
                "decision {} is {}, not approved",
                decision.id, decision.decision
            )));
        }

        let authorization = Authorization::new(
            decision.id.clone(),
            decision.proposal_id.clone(),
            approver,
            version,
            options,
        );
        authorization.validate()?;

        self.memory.record_authorization(&authorization).await?;

        info!(
            authorization_id = %authorization.id,
            decision_id = %decision.id,
            version = %authorization.version,
            valid_until = %authorization.valid_until,
            "execution authorized"
        );

        Ok(authorization)
    }
}

/// Recommended bump label for the decision. The scaffolding that knows
/// the current version resolves it to a concrete version string.
fn recommend_bump(proposal: &Proposal, analysis: &ChangeAnalysis) -> &'static str {
    if analysis.has_breaking_api_change()
        || analysis.commits.breaking > 0
        || proposal.intent.has_breaking()
    {
        "major"
    } else if analysis.commits.features > 0 {
        "minor"
    } else {
        "patch"
    }
}
