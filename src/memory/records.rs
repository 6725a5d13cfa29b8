//! Records held by the release memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CgpError, Result};
use crate::protocol::{Actor, Authorization, Decision, DecisionKind, Severity};

/// Terminal state of a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseOutcome {
    Success,
    Rollback,
    Failed,
    Partial,
}

impl ReleaseOutcome {
    /// Rollbacks, failures, and partials all count against an actor
    pub fn is_negative(&self) -> bool {
        !matches!(self, Self::Success)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rollback => "rollback",
            Self::Failed => "failed",
            Self::Partial => "partial",
        }
    }
}

/// Outcome of one release, tied to an actor and repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub id: String,
    pub repository: String,
    pub version: String,
    pub actor: Actor,

    /// Risk score at decision time
    pub risk_score: f64,

    pub decision: DecisionKind,

    pub breaking_changes: u64,
    pub security_changes: u64,
    pub files_changed: u64,
    pub lines_changed: u64,

    pub outcome: ReleaseOutcome,

    pub released_at: DateTime<Utc>,

    /// Wall-clock duration of the release in milliseconds
    pub duration_ms: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl ReleaseRecord {
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(CgpError::validation("release record id must not be empty"));
        }
        if self.repository.is_empty() {
            return Err(CgpError::validation(
                "release record repository must not be empty",
            ));
        }
        Ok(())
    }
}

/// Post-release incident classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    Rollback,
    BugIntro,
    Performance,
    Security,
    Availability,
    DataIssue,
    Breaking,
    Other,
}

/// Post-release event tied to a release
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncidentRecord {
    pub id: String,
    pub repository: String,
    pub release_id: String,
    pub version: String,

    pub incident_type: IncidentType,
    pub severity: Severity,
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,

    pub detected_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,

    /// Time from release to detection, milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_detect_ms: Option<i64>,

    /// Time from detection to resolution, milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_resolve_ms: Option<i64>,

    /// Actor whose release originated the incident
    pub actor_id: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl IncidentRecord {
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(CgpError::validation("incident record id must not be empty"));
        }
        if self.repository.is_empty() {
            return Err(CgpError::validation(
                "incident record repository must not be empty",
            ));
        }
        Ok(())
    }
}

/// Running aggregate of an actor's release history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorMetrics {
    pub actor_id: String,

    pub total_releases: u64,
    pub successful_releases: u64,
    pub failed_releases: u64,
    pub partial_releases: u64,
    pub rollback_count: u64,
    pub incident_count: u64,

    pub average_risk: f64,

    /// Releases with risk score above 0.7
    pub high_risk_count: u64,

    pub breaking_change_count: u64,

    pub success_rate: f64,

    /// Composite reputation, 0.0-1.0
    pub reliability_score: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_release: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_release: Option<DateTime<Utc>>,
}

impl ActorMetrics {
    /// Metrics for an actor with no observed history.
    /// Unknown actors start from a neutral reliability of 0.5.
    pub fn unknown(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            total_releases: 0,
            successful_releases: 0,
            failed_releases: 0,
            partial_releases: 0,
            rollback_count: 0,
            incident_count: 0,
            average_risk: 0.0,
            high_risk_count: 0,
            breaking_change_count: 0,
            success_rate: 0.0,
            reliability_score: 0.5,
            first_release: None,
            last_release: None,
        }
    }

    /// Recomputes the derived rates from the underlying counters.
    /// Idempotent: calling it twice yields the same result.
    pub fn recompute(&mut self) {
        if self.total_releases == 0 {
            self.success_rate = 0.0;
            self.reliability_score = 0.5;
            return;
        }

        let total = self.total_releases as f64;
        self.success_rate = self.successful_releases as f64 / total;

        let rollback_rate = self.rollback_count as f64 / total;
        let incident_rate = (self.incident_count as f64 / total).min(1.0);

        self.reliability_score = 0.4 * self.success_rate
            + 0.3 * (1.0 - rollback_rate)
            + 0.2 * (1.0 - incident_rate)
            + 0.1 * (1.0 - self.average_risk);
    }

    /// Reliable actors have earned a track record
    pub fn is_reliable(&self) -> bool {
        self.reliability_score >= 0.7 && self.total_releases >= 5
    }
}

/// Direction of a repository's risk over the analysis period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTrend {
    Increasing,
    Stable,
    Decreasing,
}

/// Frequency of one tag across a repository's releases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagFrequency {
    pub tag: String,
    pub count: u64,
}

/// Derived risk profile of a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskPatterns {
    pub repository: String,
    pub average_risk: f64,
    pub trend: RiskTrend,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_start: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<DateTime<Utc>>,

    /// Tag frequencies across the period, most common first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_factors: Vec<TagFrequency>,
}

/// Joined governance history for one proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub proposal_id: String,

    /// All decisions for the proposal, earliest first
    pub decisions: Vec<Decision>,

    /// Authorizations whose decision belongs to the proposal
    pub authorizations: Vec<Authorization>,

    /// Terminal release record, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<ReleaseRecord>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub incidents: Vec<IncidentRecord>,

    /// Earliest decision timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    /// Latest decision or authorization timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Counts of stored records
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub releases: usize,
    pub incidents: usize,
    pub decisions: usize,
    pub authorizations: usize,
    pub actors: usize,
}
