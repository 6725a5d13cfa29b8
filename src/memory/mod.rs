//! Release memory: the durable, thread-safe repository of governance
//! history.
//!
//! Two implementations share identical semantics: [`InMemoryStore`]
//! for tests and embedded use, and [`FileStore`] which persists the
//! full state atomically after every mutation.

pub mod file;
pub mod in_memory;
pub mod records;
mod state;

pub use file::FileStore;
pub use in_memory::InMemoryStore;
pub use records::{
    ActorMetrics, AuditTrail, IncidentRecord, IncidentType, ReleaseOutcome, ReleaseRecord,
    RiskPatterns, RiskTrend, StoreStats, TagFrequency,
};
pub use state::META_PROPOSAL_ID;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Authorization, Decision};

/// Repository of release records, incidents, decisions, authorizations,
/// and derived actor metrics. Implementations are safe for concurrent
/// use; read methods return defensive copies.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn record_release(&self, record: &ReleaseRecord) -> Result<()>;
    async fn record_incident(&self, incident: &IncidentRecord) -> Result<()>;
    async fn record_decision(&self, decision: &Decision) -> Result<()>;
    async fn record_authorization(&self, authorization: &Authorization) -> Result<()>;

    /// Most recent releases first, at most `limit` items
    async fn release_history(&self, repository: &str, limit: usize) -> Result<Vec<ReleaseRecord>>;

    /// Most recent incidents first, at most `limit` items
    async fn incident_history(
        &self,
        repository: &str,
        limit: usize,
    ) -> Result<Vec<IncidentRecord>>;

    async fn decision(&self, id: &str) -> Result<Option<Decision>>;
    async fn decisions_by_proposal(&self, proposal_id: &str) -> Result<Vec<Decision>>;
    async fn authorization(&self, id: &str) -> Result<Option<Authorization>>;
    async fn authorizations_by_decision(&self, decision_id: &str) -> Result<Vec<Authorization>>;

    /// Defensive copy; unknown actors report neutral metrics
    async fn actor_metrics(&self, actor_id: &str) -> Result<ActorMetrics>;

    async fn risk_patterns(&self, repository: &str) -> Result<RiskPatterns>;
    async fn audit_trail(&self, proposal_id: &str) -> Result<AuditTrail>;

    /// Observed rollback rate for a repository; `None` without history
    async fn rollback_rate(&self, repository: &str) -> Result<Option<f64>>;

    /// Compensating update for a release whose outcome was revised
    async fn update_actor_metrics(&self, actor_id: &str, outcome: ReleaseOutcome) -> Result<()>;

    async fn flush(&self) -> Result<()>;
    async fn stats(&self) -> Result<StoreStats>;
}
