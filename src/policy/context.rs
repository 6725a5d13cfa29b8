//! Evaluation context: the structured view rules are matched against.
//!
//! A flat map keyed by dotted paths. The path set is closed, but the
//! map keeps rule authoring flexible: a rule referencing an absent
//! path simply does not match.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::protocol::{Actor, ChangeAnalysis, Proposal};

use super::team::TeamDirectory;
use super::time::TimeRules;

/// Context for one policy evaluation pass
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    values: HashMap<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: impl Into<String>, value: Value) {
        self.values.insert(path.into(), value);
    }

    /// Resolves a dotted path; `None` when absent
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Derives the full context from pipeline inputs
    pub fn from_inputs(proposal: &Proposal, analysis: &ChangeAnalysis, risk_score: f64) -> Self {
        let mut ctx = Self::new();
        ctx.set("risk.score", json!(risk_score));
        ctx.apply_actor(&proposal.actor);
        ctx.apply_intent(proposal);
        ctx.apply_scope(proposal);
        ctx.apply_change(analysis);
        ctx
    }

    fn apply_actor(&mut self, actor: &Actor) {
        self.set("actor.kind", json!(actor.kind.as_str()));
        self.set("actor.id", json!(actor.id));
        if let Some(name) = &actor.name {
            self.set("actor.name", json!(name));
        }
    }

    fn apply_intent(&mut self, proposal: &Proposal) {
        let intent = &proposal.intent;
        self.set("intent.summary", json!(intent.summary));
        if let Some(bump) = intent.suggested_bump {
            self.set("intent.suggestedBump", json!(bump.as_str()));
        }
        self.set("intent.confidence", json!(intent.confidence));
        self.set("intent.hasBreaking", json!(intent.has_breaking()));
    }

    fn apply_scope(&mut self, proposal: &Proposal) {
        let scope = &proposal.scope;
        self.set("scope.repository", json!(scope.repository));
        if let Some(branch) = &scope.branch {
            self.set("scope.branch", json!(branch));
        }
        if let Some(range) = &scope.commit_range {
            self.set("scope.commitRange", json!(range));
        }
        self.set("scope.fileCount", json!(scope.files.len()));
    }

    fn apply_change(&mut self, analysis: &ChangeAnalysis) {
        let commits = &analysis.commits;
        self.set("change.features", json!(commits.features));
        self.set("change.fixes", json!(commits.fixes));
        self.set("change.breaking", json!(commits.breaking));
        self.set("change.security", json!(commits.security));
        self.set("change.dependencies", json!(commits.dependencies));
        self.set("change.other", json!(commits.other));
        self.set("change.total", json!(commits.total()));
        self.set("change.hasAPIChange", json!(analysis.has_api_change()));

        if let Some(radius) = &analysis.blast_radius {
            if let Some(score) = radius.score {
                self.set("blastRadius.score", json!(score));
            }
            self.set("blastRadius.filesChanged", json!(radius.files_changed));
            self.set("blastRadius.linesChanged", json!(radius.lines_changed));
        }
    }

    /// Adds the `time.*` paths for the given instant
    pub fn apply_time(&mut self, rules: &TimeRules, now: DateTime<Utc>) {
        let flags = rules.evaluate(now);
        self.set("time.businessHours", json!(flags.business_hours));
        self.set("time.hour", json!(flags.hour));
        self.set("time.weekday", json!(flags.weekday));
        self.set("time.freezeActive", json!(flags.freeze_active));
        if let Some(name) = flags.freeze_name {
            self.set("time.freezeName", json!(name));
        }
    }

    /// Adds the `team.*` paths (and the team/role actor fields) for the
    /// proposing actor
    pub fn apply_teams(&mut self, directory: &TeamDirectory, actor_id: &str) {
        let teams = directory.teams_for(actor_id);
        let roles = directory.roles_for(actor_id);
        self.set("team.teams", json!(teams));
        self.set("team.roles", json!(roles));
        self.set("team.canApprove", json!(directory.can_approve(actor_id)));
        self.set("team.canPublish", json!(directory.can_publish(actor_id)));
        self.set("team.isTeamLead", json!(directory.is_team_lead(actor_id)));
        self.set("actor.teams", json!(teams));
        self.set("actor.roles", json!(roles));
    }
}
