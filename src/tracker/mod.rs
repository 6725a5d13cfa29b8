//! Outcome tracking over the release lifecycle event stream.

pub mod events;
pub mod tracker;

pub use events::ReleaseEvent;
pub use tracker::OutcomeTracker;

use async_trait::async_trait;

/// Consumer of lifecycle events. Publishers are best-effort by
/// contract: they never fail the event producer. Chaining a `next`
/// publisher preserves the caller's event order per release id.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &ReleaseEvent);

    /// Drains any in-flight work. Default: nothing to drain.
    async fn shutdown(&self) {}
}
