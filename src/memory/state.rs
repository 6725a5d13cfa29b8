//! The single state document shared by both store implementations.
//!
//! All mutation and query logic lives here so the file-backed store
//! mirrors the in-memory store exactly; the stores only add locking
//! and persistence around it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CgpError, Result};
use crate::protocol::{Authorization, Decision};

use super::records::{
    ActorMetrics, AuditTrail, IncidentRecord, ReleaseOutcome, ReleaseRecord, RiskPatterns,
    RiskTrend, StoreStats, TagFrequency,
};

/// Metadata key linking a release record back to its proposal
pub const META_PROPOSAL_ID: &str = "proposal_id";

/// Trend detection needs at least this many samples
const TREND_MIN_SAMPLES: usize = 4;

/// Half-to-half mean shift below this band reads as stable
const TREND_BAND: f64 = 0.1;

/// Persisted memory state: one JSON document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDocument {
    /// Release records keyed by repository
    #[serde(default)]
    pub releases: HashMap<String, Vec<ReleaseRecord>>,

    /// Incident records keyed by repository
    #[serde(default)]
    pub incidents: HashMap<String, Vec<IncidentRecord>>,

    /// Actor metrics keyed by actor id
    #[serde(default)]
    pub actors: HashMap<String, ActorMetrics>,

    /// Decisions keyed by decision id
    #[serde(default)]
    pub decisions: HashMap<String, Decision>,

    /// Authorizations keyed by authorization id
    #[serde(default)]
    pub authorizations: HashMap<String, Authorization>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl MemoryDocument {
    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    pub fn record_release(&mut self, record: &ReleaseRecord) -> Result<()> {
        record.validate()?;

        self.releases
            .entry(record.repository.clone())
            .or_default()
            .push(record.clone());

        let metrics = self
            .actors
            .entry(record.actor.id.clone())
            .or_insert_with(|| ActorMetrics::unknown(record.actor.id.clone()));

        metrics.total_releases += 1;
        match record.outcome {
            ReleaseOutcome::Success => metrics.successful_releases += 1,
            ReleaseOutcome::Failed => metrics.failed_releases += 1,
            ReleaseOutcome::Rollback => {
                metrics.rollback_count += 1;
                metrics.failed_releases += 1;
            }
            ReleaseOutcome::Partial => metrics.partial_releases += 1,
        }
        if record.risk_score > 0.7 {
            metrics.high_risk_count += 1;
        }
        if record.breaking_changes > 0 {
            metrics.breaking_change_count += 1;
        }

        // running average over release count
        let n = metrics.total_releases as f64;
        metrics.average_risk = ((n - 1.0) * metrics.average_risk + record.risk_score) / n;

        if metrics.first_release.is_none() {
            metrics.first_release = Some(record.released_at);
        }
        metrics.last_release = Some(record.released_at);
        metrics.recompute();

        self.touch();
        Ok(())
    }

    pub fn record_incident(&mut self, incident: &IncidentRecord) -> Result<()> {
        incident.validate()?;

        self.incidents
            .entry(incident.repository.clone())
            .or_default()
            .push(incident.clone());

        if let Some(metrics) = self.actors.get_mut(&incident.actor_id) {
            metrics.incident_count += 1;
            metrics.recompute();
        }

        self.touch();
        Ok(())
    }

    pub fn record_decision(&mut self, decision: &Decision) -> Result<()> {
        decision.validate()?;
        self.decisions
            .insert(decision.id.clone(), decision.clone());
        self.touch();
        Ok(())
    }

    pub fn record_authorization(&mut self, authorization: &Authorization) -> Result<()> {
        authorization.validate()?;
        self.authorizations
            .insert(authorization.id.clone(), authorization.clone());
        self.touch();
        Ok(())
    }

    /// Compensating update for a release whose outcome was revised
    /// after the fact. Counters saturate so a misdirected call cannot
    /// underflow.
    pub fn update_actor_metrics(&mut self, actor_id: &str, outcome: ReleaseOutcome) -> Result<()> {
        let metrics = self
            .actors
            .get_mut(actor_id)
            .ok_or_else(|| CgpError::NotFound(format!("actor {:?}", actor_id)))?;

        match outcome {
            ReleaseOutcome::Rollback => {
                metrics.rollback_count += 1;
                metrics.failed_releases += 1;
                metrics.successful_releases = metrics.successful_releases.saturating_sub(1);
            }
            ReleaseOutcome::Failed => {
                metrics.failed_releases += 1;
                metrics.successful_releases = metrics.successful_releases.saturating_sub(1);
            }
            ReleaseOutcome::Success | ReleaseOutcome::Partial => {}
        }
        metrics.recompute();

        self.touch();
        Ok(())
    }

    pub fn release_history(&self, repository: &str, limit: usize) -> Vec<ReleaseRecord> {
        let mut records = self
            .releases
            .get(repository)
            .cloned()
            .unwrap_or_default();
        records.sort_by(|a, b| b.released_at.cmp(&a.released_at));
        records.truncate(limit);
        records
    }

    pub fn incident_history(&self, repository: &str, limit: usize) -> Vec<IncidentRecord> {
        let mut records = self
            .incidents
            .get(repository)
            .cloned()
            .unwrap_or_default();
        records.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        records.truncate(limit);
        records
    }

    pub fn decision(&self, id: &str) -> Option<Decision> {
        self.decisions.get(id).cloned()
    }

    pub fn decisions_by_proposal(&self, proposal_id: &str) -> Vec<Decision> {
        let mut out: Vec<Decision> = self
            .decisions
            .values()
            .filter(|d| d.proposal_id == proposal_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        out
    }

    pub fn authorization(&self, id: &str) -> Option<Authorization> {
        self.authorizations.get(id).cloned()
    }

    pub fn authorizations_by_decision(&self, decision_id: &str) -> Vec<Authorization> {
        let mut out: Vec<Authorization> = self
            .authorizations
            .values()
            .filter(|a| a.decision_id == decision_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        out
    }

    /// Defensive copy; unknown actors report neutral metrics
    pub fn actor_metrics(&self, actor_id: &str) -> ActorMetrics {
        self.actors
            .get(actor_id)
            .cloned()
            .unwrap_or_else(|| ActorMetrics::unknown(actor_id))
    }

    /// Repository rollback rate for the historical-risk factor
    pub fn rollback_rate(&self, repository: &str) -> Option<f64> {
        let records = self.releases.get(repository)?;
        if records.is_empty() {
            return None;
        }
        let rollbacks = records
            .iter()
            .filter(|r| r.outcome == ReleaseOutcome::Rollback)
            .count();
        Some(rollbacks as f64 / records.len() as f64)
    }

    pub fn risk_patterns(&self, repository: &str) -> RiskPatterns {
        let mut records = self
            .releases
            .get(repository)
            .cloned()
            .unwrap_or_default();
        records.sort_by(|a, b| a.released_at.cmp(&b.released_at));

        if records.is_empty() {
            return RiskPatterns {
                repository: repository.to_string(),
                average_risk: 0.0,
                trend: RiskTrend::Stable,
                period_start: None,
                period_end: None,
                common_factors: Vec::new(),
            };
        }

        let average_risk =
            records.iter().map(|r| r.risk_score).sum::<f64>() / records.len() as f64;

        let trend = if records.len() >= TREND_MIN_SAMPLES {
            let mid = records.len() / 2;
            let first: f64 =
                records[..mid].iter().map(|r| r.risk_score).sum::<f64>() / mid as f64;
            let second: f64 = records[mid..].iter().map(|r| r.risk_score).sum::<f64>()
                / (records.len() - mid) as f64;
            if second > first + TREND_BAND {
                RiskTrend::Increasing
            } else if second < first - TREND_BAND {
                RiskTrend::Decreasing
            } else {
                RiskTrend::Stable
            }
        } else {
            RiskTrend::Stable
        };

        let mut counts: HashMap<String, u64> = HashMap::new();
        for record in &records {
            for tag in &record.tags {
                *counts.entry(tag.clone()).or_default() += 1;
            }
        }
        let mut common_factors: Vec<TagFrequency> = counts
            .into_iter()
            .map(|(tag, count)| TagFrequency { tag, count })
            .collect();
        common_factors.sort_by(|a, b| b.count.cmp(&a.count).then(a.tag.cmp(&b.tag)));

        RiskPatterns {
            repository: repository.to_string(),
            average_risk,
            trend,
            period_start: records.first().map(|r| r.released_at),
            period_end: records.last().map(|r| r.released_at),
            common_factors,
        }
    }

    pub fn audit_trail(&self, proposal_id: &str) -> AuditTrail {
        let decisions = self.decisions_by_proposal(proposal_id);

        let decision_ids: Vec<&str> = decisions.iter().map(|d| d.id.as_str()).collect();
        let mut authorizations: Vec<Authorization> = self
            .authorizations
            .values()
            .filter(|a| decision_ids.contains(&a.decision_id.as_str()))
            .cloned()
            .collect();
        authorizations.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let release = self
            .releases
            .values()
            .flat_map(|records| records.iter())
            .find(|r| {
                r.metadata
                    .get(META_PROPOSAL_ID)
                    .map(|p| p == proposal_id)
                    .unwrap_or(false)
            })
            .cloned();

        let incidents = match &release {
            Some(release) => self
                .incidents
                .get(&release.repository)
                .map(|records| {
                    records
                        .iter()
                        .filter(|i| i.release_id == release.id)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            None => Vec::new(),
        };

        let created_at = decisions.first().map(|d| d.timestamp);
        let updated_at = decisions
            .iter()
            .map(|d| d.timestamp)
            .chain(authorizations.iter().map(|a| a.timestamp))
            .max();

        AuditTrail {
            proposal_id: proposal_id.to_string(),
            decisions,
            authorizations,
            release,
            incidents,
            created_at,
            updated_at,
        }
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            releases: self.releases.values().map(Vec::len).sum(),
            incidents: self.incidents.values().map(Vec::len).sum(),
            decisions: self.decisions.len(),
            authorizations: self.authorizations.len(),
            actors: self.actors.len(),
        }
    }
}
