//! Correlates lifecycle events into release records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::memory::{MemoryStore, ReleaseOutcome, ReleaseRecord, META_PROPOSAL_ID};
use crate::protocol::{Actor, DecisionKind};

use super::events::ReleaseEvent;
use super::EventPublisher;

/// Per-release context accumulated between `created` and the terminal
/// event. Risk, decision, and change metrics arrive out-of-band from
/// the decision pipeline via the injection APIs.
#[derive(Debug, Clone, Default)]
struct ReleaseContext {
    repository: String,
    version: Option<String>,
    actor: Option<Actor>,
    risk_score: Option<f64>,
    decision: Option<DecisionKind>,
    breaking_changes: u64,
    security_changes: u64,
    files_changed: u64,
    lines_changed: u64,
    tags: Vec<String>,
    metadata: HashMap<String, String>,
    started_at: Option<DateTime<Utc>>,
}

/// Consumes release lifecycle events, writes at most one release
/// record per release at the terminal event, and forwards every event
/// downstream regardless of its own processing outcome.
pub struct OutcomeTracker {
    memory: Arc<dyn MemoryStore>,
    contexts: RwLock<HashMap<String, ReleaseContext>>,
    next: Option<Arc<dyn EventPublisher>>,
}

impl OutcomeTracker {
    pub fn new(memory: Arc<dyn MemoryStore>) -> Self {
        Self {
            memory,
            contexts: RwLock::new(HashMap::new()),
            next: None,
        }
    }

    /// Chains a downstream publisher (typically the webhook publisher)
    pub fn with_next(mut self, next: Arc<dyn EventPublisher>) -> Self {
        self.next = Some(next);
        self
    }

    /// Injects decision-time context for a future outcome record
    pub async fn set_release_context(
        &self,
        release_id: &str,
        actor: Actor,
        risk_score: f64,
        decision: DecisionKind,
        proposal_id: Option<String>,
    ) {
        let mut contexts = self.contexts.write().await;
        let ctx = contexts.entry(release_id.to_string()).or_default();
        ctx.actor = Some(actor);
        ctx.risk_score = Some(risk_score);
        ctx.decision = Some(decision);
        if let Some(proposal_id) = proposal_id {
            ctx.metadata
                .insert(META_PROPOSAL_ID.to_string(), proposal_id);
        }
    }

    /// Injects change metrics for a future outcome record
    pub async fn set_change_metrics(
        &self,
        release_id: &str,
        breaking: u64,
        security: u64,
        files: u64,
        lines: u64,
    ) {
        let mut contexts = self.contexts.write().await;
        let ctx = contexts.entry(release_id.to_string()).or_default();
        ctx.breaking_changes = breaking;
        ctx.security_changes = security;
        ctx.files_changed = files;
        ctx.lines_changed = lines;
    }

    /// Appends tags for a future outcome record
    pub async fn add_tags(&self, release_id: &str, tags: Vec<String>) {
        let mut contexts = self.contexts.write().await;
        let ctx = contexts.entry(release_id.to_string()).or_default();
        for tag in tags {
            if !ctx.tags.contains(&tag) {
                ctx.tags.push(tag);
            }
        }
    }

    /// Processes one event. Failures are logged, never propagated; the
    /// context lock is held for the whole call so events are consumed
    /// sequentially.
    async fn track(&self, event: &ReleaseEvent) {
        let mut contexts = self.contexts.write().await;

        match event {
            ReleaseEvent::Created {
                release_id,
                repository,
                timestamp,
            } => {
                let ctx = contexts.entry(release_id.clone()).or_default();
                ctx.repository = repository.clone();
                ctx.started_at = Some(*timestamp);
                debug!(release_id = %release_id, repository = %repository, "tracking release");
            }
            ReleaseEvent::Planned {
                release_id,
                version,
                ..
            } => match contexts.get_mut(release_id) {
                Some(ctx) => ctx.version = Some(version.clone()),
                None => warn!(release_id = %release_id, "planned event without release context"),
            },
            ReleaseEvent::Approved {
                release_id,
                approved_by,
                ..
            } => match contexts.get_mut(release_id) {
                Some(ctx) => {
                    ctx.metadata
                        .insert("approved_by".to_string(), approved_by.clone());
                }
                None => warn!(release_id = %release_id, "approved event without release context"),
            },
            ReleaseEvent::Published {
                release_id,
                version,
                timestamp,
            } => {
                self.finish(
                    &mut contexts,
                    release_id,
                    ReleaseOutcome::Success,
                    Some(version.clone()),
                    *timestamp,
                    Vec::new(),
                    Vec::new(),
                )
                .await;
            }
            ReleaseEvent::Failed {
                release_id,
                reason,
                timestamp,
            } => {
                self.finish(
                    &mut contexts,
                    release_id,
                    ReleaseOutcome::Failed,
                    None,
                    *timestamp,
                    vec![("failure_reason".to_string(), reason.clone())],
                    Vec::new(),
                )
                .await;
            }
            ReleaseEvent::Canceled {
                release_id,
                canceled_by,
                reason,
                timestamp,
            } => {
                self.finish(
                    &mut contexts,
                    release_id,
                    ReleaseOutcome::Partial,
                    None,
                    *timestamp,
                    vec![
                        ("canceled_by".to_string(), canceled_by.clone()),
                        ("cancel_reason".to_string(), reason.clone()),
                    ],
                    vec!["canceled".to_string()],
                )
                .await;
            }
            // not outcome-relevant; forwarded only
            ReleaseEvent::TagCreated { .. }
            | ReleaseEvent::ChangelogGenerated { .. }
            | ReleaseEvent::NotesGenerated { .. } => {}
        }
    }

    /// Builds and persists the terminal record, then evicts the cache
    /// entry.
    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        contexts: &mut HashMap<String, ReleaseContext>,
        release_id: &str,
        outcome: ReleaseOutcome,
        version: Option<String>,
        finished_at: DateTime<Utc>,
        extra_metadata: Vec<(String, String)>,
        extra_tags: Vec<String>,
    ) {
        let Some(mut ctx) = contexts.remove(release_id) else {
            warn!(release_id = %release_id, "terminal event without release context");
            return;
        };

        for (key, value) in extra_metadata {
            ctx.metadata.insert(key, value);
        }
        for tag in extra_tags {
            if !ctx.tags.contains(&tag) {
                ctx.tags.push(tag);
            }
        }

        let duration_ms = ctx
            .started_at
            .map(|start| (finished_at - start).num_milliseconds().max(0))
            .unwrap_or(0);

        let record = ReleaseRecord {
            id: release_id.to_string(),
            repository: ctx.repository,
            version: version.or(ctx.version).unwrap_or_default(),
            actor: ctx.actor.unwrap_or_else(|| Actor::system("unknown")),
            risk_score: ctx.risk_score.unwrap_or(0.0),
            decision: ctx.decision.unwrap_or(DecisionKind::Approved),
            breaking_changes: ctx.breaking_changes,
            security_changes: ctx.security_changes,
            files_changed: ctx.files_changed,
            lines_changed: ctx.lines_changed,
            outcome,
            released_at: finished_at,
            duration_ms,
            tags: ctx.tags,
            metadata: ctx.metadata,
        };

        if let Err(e) = self.memory.record_release(&record).await {
            warn!(release_id = %release_id, error = %e, "failed to record release outcome");
        } else {
            debug!(
                release_id = %release_id,
                outcome = %record.outcome.as_str(),
                duration_ms = duration_ms,
                "release outcome recorded"
            );
        }
    }
}

#[async_trait]
impl EventPublisher for OutcomeTracker {
    async fn publish(&self, event: &ReleaseEvent) {
        self.track(event).await;

        // forwarded unconditionally, even when tracking failed
        if let Some(next) = &self.next {
            next.publish(event).await;
        }
    }

    async fn shutdown(&self) {
        if let Some(next) = &self.next {
            next.shutdown().await;
        }
    }
}
