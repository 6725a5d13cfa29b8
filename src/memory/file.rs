//! File-backed release memory.
//!
//! Mirrors the in-memory structure and persists the full state to a
//! single JSON document after every mutation. Writes go to a temporary
//! sibling and are renamed over the target, so readers never observe a
//! torn file; a failed persist leaves the previous state in place.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{CgpError, Result};
use crate::protocol::{Authorization, Decision};

use super::records::{
    ActorMetrics, AuditTrail, IncidentRecord, ReleaseOutcome, ReleaseRecord, RiskPatterns,
    StoreStats,
};
use super::state::MemoryDocument;
use super::MemoryStore;

/// Persisted state file name
pub const MEMORY_FILE: &str = "memory.json";

/// Loading refuses files above this size to cap deserialization cost
pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Release memory persisted to `<dir>/memory.json`
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    state: Arc<RwLock<MemoryDocument>>,
}

impl FileStore {
    /// Opens (or initializes) the store in the given directory.
    /// A missing file is a valid empty state.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(MEMORY_FILE);

        let document = match tokio::fs::metadata(&path).await {
            Ok(meta) => {
                if meta.len() > MAX_FILE_SIZE {
                    return Err(CgpError::Persistence(format!(
                        "{} is {} bytes, exceeding the {} byte limit",
                        path.display(),
                        meta.len(),
                        MAX_FILE_SIZE
                    )));
                }
                let raw = tokio::fs::read(&path).await?;
                serde_json::from_slice(&raw)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryDocument::default(),
            Err(e) => return Err(e.into()),
        };

        info!(path = %path.display(), "release memory opened");
        Ok(Self {
            path,
            state: Arc::new(RwLock::new(document)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies a mutation to a working copy, persists it, and only then
    /// publishes it. A failed persist commits nothing.
    async fn mutate<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut MemoryDocument) -> Result<()>,
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        apply(&mut next)?;
        persist(&self.path, &next).await?;
        *guard = next;
        Ok(())
    }
}

async fn persist(path: &Path, document: &MemoryDocument) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(document)?;
    let tmp = path.with_extension("json.tmp");

    tokio::fs::write(&tmp, &bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600)).await?;
    }

    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "release memory persisted");
    Ok(())
}

#[async_trait]
impl MemoryStore for FileStore {
    async fn record_release(&self, record: &ReleaseRecord) -> Result<()> {
        self.mutate(|doc| doc.record_release(record)).await
    }

    async fn record_incident(&self, incident: &IncidentRecord) -> Result<()> {
        self.mutate(|doc| doc.record_incident(incident)).await
    }

    async fn record_decision(&self, decision: &Decision) -> Result<()> {
        self.mutate(|doc| doc.record_decision(decision)).await
    }

    async fn record_authorization(&self, authorization: &Authorization) -> Result<()> {
        self.mutate(|doc| doc.record_authorization(authorization))
            .await
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
        self.mutate(|doc| doc.update_actor_metrics(actor_id, outcome))
            .await
    }

    async fn flush(&self) -> Result<()> {
        let guard = self.state.read().await;
        persist(&self.path, &guard).await
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(self.state.read().await.stats())
    }
}
