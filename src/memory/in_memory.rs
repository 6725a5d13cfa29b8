//! In-memory release memory (development, tests, embedded use).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::protocol::{Authorization, Decision};

use super::records::{
    ActorMetrics, AuditTrail, IncidentRecord, ReleaseOutcome, ReleaseRecord, RiskPatterns,
    StoreStats,
};
use super::state::MemoryDocument;
use super::MemoryStore;

/// Stores everything behind a single reader-writer lock
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryDocument>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn record_release(&self, record: &ReleaseRecord) -> Result<()> {
        self.state.write().await.record_release(record)
    }

    async fn record_incident(&self, incident: &IncidentRecord) -> Result<()> {
        self.state.write().await.record_incident(incident)
    }

    async fn record_decision(&self, decision: &Decision) -> Result<()> {
        self.state.write().await.record_decision(decision)
    }

    async fn record_authorization(&self, authorization: &Authorization) -> Result<()> {
        self.state.write().await.record_authorization(authorization)
    }

    async fn release_history(&self, repository: &str, limit: usize) -> Result<Vec<ReleaseRecord>> {
        Ok(self.state.read().await.release_history(repository, limit))
    }

    async fn incident_history(
        &self,
        repository: &str,
        limit: usize,
    ) -> Result<Vec<IncidentRecord>> {
        Ok(self.state.read().await.incident_history(repository, limit))
    }

    async fn decision(&self, id: &str) -> Result<Option<Decision>> {
        Ok(self.state.read().await.decision(id))
    }

    async fn decisions_by_proposal(&self, proposal_id: &str) -> Result<Vec<Decision>> {
        Ok(self.state.read().await.decisions_by_proposal(proposal_id))
    }

    async fn authorization(&self, id: &str) -> Result<Option<Authorization>> {
        Ok(self.state.read().await.authorization(id))
    }

    async fn authorizations_by_decision(&self, decision_id: &str) -> Result<Vec<Authorization>> {
        Ok(self
            .state
            .read()
            .await
            .authorizations_by_decision(decision_id))
    }

    async fn actor_metrics(&self, actor_id: &str) -> Result<ActorMetrics> {
        Ok(self.state.read().await.actor_metrics(actor_id))
    }

    async fn risk_patterns(&self, repository: &str) -> Result<RiskPatterns> {
        Ok(self.state.read().await.risk_patterns(repository))
    }

    async fn audit_trail(&self, proposal_id: &str) -> Result<AuditTrail> {
        Ok(self.state.read().await.audit_trail(proposal_id))
    }

    async fn rollback_rate(&self, repository: &str) -> Result<Option<f64>> {
        Ok(self.state.read().await.rollback_rate(repository))
    }

    async fn update_actor_metrics(&self, actor_id: &str, outcome: ReleaseOutcome) -> Result<()> {
        self.state
            .write()
            .await
            .update_actor_metrics(actor_id, outcome)
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(self.state.read().await.stats())
    }
}
