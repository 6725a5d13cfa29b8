//! Weighted multi-factor risk scoring.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::protocol::{
    ActorKind, ApiChangeKind, ChangeAnalysis, Proposal, RiskFactor, Severity,
};

use super::weights::RiskWeights;

/// Supplies observed history for the historical-risk factor.
/// Wired optionally; without a provider the factor never fires.
pub trait ReleaseHistoryProvider: Send + Sync {
    /// Observed rollback rate for the repository, 0.0-1.0.
    /// `None` when there is no history to report.
    fn rollback_rate(&self, repository: &str) -> Option<f64>;
}

/// Result of a risk calculation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Normalized combined score, 0.0-1.0
    pub score: f64,

    /// Factors that fired, in evaluation order
    pub factors: Vec<RiskFactor>,

    pub severity: Severity,

    /// Short deterministic explanation
    pub summary: String,
}

/// Computes a normalized risk score and explanatory factors for a
/// proposal. Construction fails only on an invalid weight
/// configuration; `calculate` itself is infallible.
pub struct RiskCalculator {
    weights: RiskWeights,
    history: Option<Arc<dyn ReleaseHistoryProvider>>,
}

impl RiskCalculator {
    pub fn new(weights: RiskWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self {
            weights,
            history: None,
        })
    }

    /// Calculator with the default weight profile
    pub fn with_defaults() -> Self {
        Self {
            weights: RiskWeights::default(),
            history: None,
        }
    }

    pub fn with_history(mut self, provider: Arc<dyn ReleaseHistoryProvider>) -> Self {
        self.history = Some(provider);
        self
    }

    /// Scores the proposal against its change analysis. Factors that do
    /// not fire contribute neither score nor weight.
    pub fn calculate(&self, proposal: &Proposal, analysis: &ChangeAnalysis) -> RiskAssessment {
        self.calculate_with_rollback_rate(proposal, analysis, None)
    }

    /// Variant taking an explicit observed rollback rate, for callers
    /// that query history asynchronously. Falls back to the wired
    /// provider when no rate is supplied.
    pub fn calculate_with_rollback_rate(
        &self,
        proposal: &Proposal,
        analysis: &ChangeAnalysis,
        rollback_rate: Option<f64>,
    ) -> RiskAssessment {
        let mut fired: Vec<(RiskFactor, f64)> = Vec::new();

        if let Some(factor) = api_change_factor(analysis) {
            fired.push((factor, self.weights.api_changes));
        }
        if let Some(factor) = dependency_factor(analysis) {
            fired.push((factor, self.weights.dependency_impact));
        }
        if let Some(factor) = blast_radius_factor(analysis) {
            fired.push((factor, self.weights.blast_radius));
        }
        fired.push((actor_trust_factor(proposal), self.weights.actor_trust));
        if let Some(factor) = security_factor(analysis) {
            fired.push((factor, self.weights.security_impact));
        }
        if let Some(factor) = self.historical_factor(proposal, rollback_rate) {
            fired.push((factor, self.weights.historical_risk));
        }

        let weight_sum: f64 = fired.iter().map(|(_, w)| w).sum();
        let score = if weight_sum > 0.0 {
            let weighted: f64 = fired.iter().map(|(f, w)| f.score * w).sum();
            (weighted / weight_sum).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let factors: Vec<RiskFactor> = fired.into_iter().map(|(f, _)| f).collect();
        let severity = Severity::from_score(score);
        let summary = summarize(score, severity, &factors);

        debug!(
            repository = %proposal.scope.repository,
            score = score,
            severity = %severity,
            factor_count = factors.len(),
            "risk assessment complete"
        );

        RiskAssessment {
            score,
            factors,
            severity,
            summary,
        }
    }

    fn historical_factor(
        &self,
        proposal: &Proposal,
        explicit_rate: Option<f64>,
    ) -> Option<RiskFactor> {
        let rate = explicit_rate.or_else(|| {
            self.history
                .as_ref()
                .and_then(|provider| provider.rollback_rate(&proposal.scope.repository))
        })?;
        let score = rate.clamp(0.0, 1.0);
        let severity = if score >= 0.2 {
            Severity::High
        } else if score >= 0.1 {
            Severity::Medium
        } else {
            Severity::Low
        };
        Some(RiskFactor::new(
            "historical_risk",
            format!(
                "{:.0}% of recent releases in {} were rolled back",
                score * 100.0,
                proposal.scope.repository
            ),
            score,
            severity,
        ))
    }
}

/// Per-change contribution, normalized by change count.
fn api_change_factor(analysis: &ChangeAnalysis) -> Option<RiskFactor> {
    if analysis.api_changes.is_empty() {
        return None;
    }

    let raw: f64 = analysis
        .api_changes
        .iter()
        .map(|c| match (c.kind, c.breaking) {
            (ApiChangeKind::Removed, _) => 1.0,
            (ApiChangeKind::Modified, true) => 0.8,
            (ApiChangeKind::Modified, false) => 0.3,
            (ApiChangeKind::Deprecated, _) => 0.2,
            (ApiChangeKind::Added, _) => 0.1,
        })
        .sum();
    let score = (raw / analysis.api_changes.len() as f64).clamp(0.0, 1.0);

    let breaking = analysis.api_changes.iter().filter(|c| c.breaking).count();
    let severity = if breaking > 0 {
        Severity::High
    } else if score > 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    };

    Some(RiskFactor::new(
        "api_change",
        format!(
            "{} API change(s), {} breaking",
            analysis.api_changes.len(),
            breaking
        ),
        score,
        severity,
    ))
}

/// Step function over direct dependents, bumped when the transitive
/// fan-out dwarfs the direct one.
fn dependency_factor(analysis: &ChangeAnalysis) -> Option<RiskFactor> {
    let impact = analysis.dependency_impact.as_ref()?;

    let mut score = match impact.direct_dependents {
        d if d > 100 => 1.0,
        d if d > 50 => 0.8,
        d if d > 10 => 0.5,
        d if d > 0 => 0.3,
        _ => 0.0,
    };
    if impact.transitive_dependents > impact.direct_dependents.saturating_mul(10) {
        score = (score + 0.2_f64).min(1.0);
    }

    Some(RiskFactor::new(
        "dependency_impact",
        format!(
            "{} direct and {} transitive dependents",
            impact.direct_dependents, impact.transitive_dependents
        ),
        score,
        Severity::from_score(score),
    ))
}

fn blast_radius_factor(analysis: &ChangeAnalysis) -> Option<RiskFactor> {
    let radius = analysis.blast_radius.as_ref()?;

    let score = match radius.score {
        Some(precomputed) => precomputed.clamp(0.0, 1.0),
        None => {
            let files_score = match radius.files_changed {
                f if f > 50 => 1.0,
                f if f > 20 => 0.7,
                f if f > 10 => 0.5,
                f if f > 5 => 0.3,
                _ => 0.1,
            };
            let lines_score = match radius.lines_changed {
                l if l > 1000 => 1.0,
                l if l > 500 => 0.7,
                l if l > 100 => 0.4,
                _ => 0.1,
            };
            (files_score + lines_score) / 2.0
        }
    };

    Some(RiskFactor::new(
        "blast_radius",
        format!(
            "{} files and {} lines changed",
            radius.files_changed, radius.lines_changed
        ),
        score,
        Severity::from_score(score),
    ))
}

/// Baseline risk by actor kind; always fires.
fn actor_trust_factor(proposal: &Proposal) -> RiskFactor {
    let (score, severity) = match proposal.actor.kind {
        ActorKind::Human => (0.1, Severity::Low),
        ActorKind::Ci => (0.2, Severity::Low),
        ActorKind::System => (0.4, Severity::Medium),
        ActorKind::Agent => (0.6, Severity::Medium),
        ActorKind::Unknown => (0.8, Severity::High),
    };
    RiskFactor::new(
        "actor_trust",
        format!("proposal originated from a {} actor", proposal.actor.kind),
        score,
        severity,
    )
}

fn security_factor(analysis: &ChangeAnalysis) -> Option<RiskFactor> {
    let count = analysis.commits.security;
    if count == 0 {
        return None;
    }

    let (score, severity) = match count {
        1 => (0.5, Severity::Medium),
        2..=3 => (0.7, Severity::High),
        _ => (0.9, Severity::High),
    };

    Some(RiskFactor::new(
        "security_impact",
        format!("{} security-relevant commit(s)", count),
        score,
        severity,
    ))
}

fn summarize(score: f64, severity: Severity, factors: &[RiskFactor]) -> String {
    let elevated = factors
        .iter()
        .filter(|f| f.severity >= Severity::High)
        .count();
    if elevated > 0 {
        format!(
            "{} of {} risk factors are high or critical (score {:.2})",
            elevated,
            factors.len(),
            score
        )
    } else {
        format!(
            "{} risk across {} factor(s) (score {:.2})",
            severity,
            factors.len(),
            score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Actor, ApiChange, BlastRadius, CommitStats, DependencyImpact, Intent, Scope};

    fn proposal(actor: Actor) -> Proposal {
        Proposal::new(
            actor,
            Scope::new("owner/repo").with_commit_range("abc..def"),
            Intent::new("test release", 0.9),
        )
    }

    struct FixedHistory(f64);

    impl ReleaseHistoryProvider for FixedHistory {
        fn rollback_rate(&self, _repository: &str) -> Option<f64> {
            Some(self.0)
        }
    }

    #[test]
    fn test_low_risk_human_release() {
        let calc = RiskCalculator::with_defaults();
        let analysis = ChangeAnalysis::new()
            .with_commits(CommitStats {
                features: 1,
                fixes: 2,
                ..Default::default()
            })
            .with_blast_radius(BlastRadius {
                score: None,
                files_changed: 3,
                lines_changed: 50,
            });

        let assessment = calc.calculate(&proposal(Actor::human("alice@example.com")), &analysis);
        assert!(assessment.score <= 0.4, "score was {}", assessment.score);
        assert_eq!(assessment.severity, Severity::Low);
    }

    #[test]
    fn test_agent_breaking_changes_score_high() {
        let calc = RiskCalculator::with_defaults();
        let analysis = ChangeAnalysis::new().with_api_changes(vec![
            ApiChange::new(ApiChangeKind::Removed, "foo").breaking(),
            ApiChange::new(ApiChangeKind::Removed, "bar").breaking(),
            ApiChange::new(ApiChangeKind::Removed, "baz").breaking(),
        ]);

        let assessment = calc.calculate(&proposal(Actor::agent("cursor")), &analysis);
        assert!(assessment.score >= 0.6, "score was {}", assessment.score);
        let api = assessment
            .factors
            .iter()
            .find(|f| f.category == "api_change")
            .unwrap();
        assert_eq!(api.severity, Severity::High);
        assert!((api.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_api_scores_normalized_by_count() {
        let analysis = ChangeAnalysis::new().with_api_changes(vec![
            ApiChange::new(ApiChangeKind::Added, "a"),
            ApiChange::new(ApiChangeKind::Added, "b"),
            ApiChange::new(ApiChangeKind::Removed, "c"),
        ]);
        let factor = api_change_factor(&analysis).unwrap();
        assert!((factor.score - 0.4).abs() < 1e-9);
        assert_eq!(factor.severity, Severity::Low);
    }

    #[test]
    fn test_dependency_step_function() {
        let mk = |direct, transitive| {
            ChangeAnalysis::new().with_dependency_impact(DependencyImpact {
                direct_dependents: direct,
                transitive_dependents: transitive,
                ..Default::default()
            })
        };

        assert!((dependency_factor(&mk(150, 0)).unwrap().score - 1.0).abs() < 1e-9);
        assert!((dependency_factor(&mk(60, 0)).unwrap().score - 0.8).abs() < 1e-9);
        assert!((dependency_factor(&mk(20, 0)).unwrap().score - 0.5).abs() < 1e-9);
        assert!((dependency_factor(&mk(5, 0)).unwrap().score - 0.3).abs() < 1e-9);
        assert!((dependency_factor(&mk(0, 0)).unwrap().score - 0.0).abs() < 1e-9);

        // transitive blow-up adds 0.2
        assert!((dependency_factor(&mk(5, 51)).unwrap().score - 0.5).abs() < 1e-9);
        // and clamps
        assert!((dependency_factor(&mk(150, 2000)).unwrap().score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_blast_radius_prefers_precomputed_score() {
        let analysis = ChangeAnalysis::new().with_blast_radius(BlastRadius {
            score: Some(0.9),
            files_changed: 1,
            lines_changed: 1,
        });
        let factor = blast_radius_factor(&analysis).unwrap();
        assert!((factor.score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_blast_radius_averages_steps() {
        let analysis = ChangeAnalysis::new().with_blast_radius(BlastRadius {
            score: None,
            files_changed: 60,
            lines_changed: 1500,
        });
        let factor = blast_radius_factor(&analysis).unwrap();
        assert!((factor.score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_security_bands() {
        let mk = |security| {
            ChangeAnalysis::new().with_commits(CommitStats {
                security,
                ..Default::default()
            })
        };
        assert!(security_factor(&mk(0)).is_none());
        assert!((security_factor(&mk(1)).unwrap().score - 0.5).abs() < 1e-9);
        assert!((security_factor(&mk(3)).unwrap().score - 0.7).abs() < 1e-9);
        assert!((security_factor(&mk(4)).unwrap().score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_actor_trust_bands() {
        let factor = |actor: Actor| actor_trust_factor(&proposal(actor));

        let human = factor(Actor::human("alice@example.com"));
        assert!((human.score - 0.1).abs() < 1e-9);
        assert_eq!(human.severity, Severity::Low);

        let agent = factor(Actor::agent("cursor"));
        assert!((agent.score - 0.6).abs() < 1e-9);
        assert_eq!(agent.severity, Severity::Medium);

        let unknown = factor(Actor::new(ActorKind::Unknown, "mystery-caller"));
        assert!((unknown.score - 0.8).abs() < 1e-9);
        assert_eq!(unknown.severity, Severity::High);
    }

    #[test]
    fn test_history_provider_drives_historical_factor() {
        let calc = RiskCalculator::with_defaults().with_history(Arc::new(FixedHistory(0.25)));
        let assessment = calc.calculate(
            &proposal(Actor::human("alice@example.com")),
            &ChangeAnalysis::new(),
        );
        let hist = assessment
            .factors
            .iter()
            .find(|f| f.category == "historical_risk")
            .unwrap();
        assert!((hist.score - 0.25).abs() < 1e-9);
        assert_eq!(hist.severity, Severity::High);
    }

    #[test]
    fn test_invalid_weights_rejected_at_construction() {
        let weights = RiskWeights {
            api_changes: 2.0,
            ..RiskWeights::default()
        };
        assert!(RiskCalculator::new(weights).is_err());
    }

    #[test]
    fn test_score_always_in_range() {
        let calc = RiskCalculator::with_defaults();
        let analysis = ChangeAnalysis::new()
            .with_api_changes(vec![
                ApiChange::new(ApiChangeKind::Removed, "x").breaking(),
            ])
            .with_dependency_impact(DependencyImpact {
                direct_dependents: 500,
                transitive_dependents: 100_000,
                ..Default::default()
            })
            .with_blast_radius(BlastRadius {
                score: Some(1.0),
                files_changed: 400,
                lines_changed: 90_000,
            })
            .with_commits(CommitStats {
                security: 10,
                ..Default::default()
            });

        let assessment = calc.calculate(&proposal(Actor::agent("cursor")), &analysis);
        assert!(assessment.score <= 1.0);
        assert_eq!(assessment.severity, Severity::Critical);
        assert!(assessment.summary.contains("high or critical"));
    }
}
