//! Release lifecycle events.
//!
//! A closed set of variants, each carrying its own payload. The
//! `event` field is the serialization discriminator and doubles as the
//! webhook event name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One release lifecycle event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReleaseEvent {
    #[serde(rename = "release.created")]
    Created {
        release_id: String,
        repository: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "release.planned")]
    Planned {
        release_id: String,
        version: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "release.approved")]
    Approved {
        release_id: String,
        approved_by: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "release.tag_created")]
    TagCreated {
        release_id: String,
        tag: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "release.changelog_generated")]
    ChangelogGenerated {
        release_id: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "release.notes_generated")]
    NotesGenerated {
        release_id: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "release.published")]
    Published {
        release_id: String,
        version: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "release.failed")]
    Failed {
        release_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    #[serde(rename = "release.canceled")]
    Canceled {
        release_id: String,
        canceled_by: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl ReleaseEvent {
    pub fn created(release_id: impl Into<String>, repository: impl Into<String>) -> Self {
        Self::Created {
            release_id: release_id.into(),
            repository: repository.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn planned(release_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self::Planned {
            release_id: release_id.into(),
            version: version.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn approved(release_id: impl Into<String>, approved_by: impl Into<String>) -> Self {
        Self::Approved {
            release_id: release_id.into(),
            approved_by: approved_by.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn tag_created(release_id: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::TagCreated {
            release_id: release_id.into(),
            tag: tag.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn changelog_generated(release_id: impl Into<String>) -> Self {
        Self::ChangelogGenerated {
            release_id: release_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn notes_generated(release_id: impl Into<String>) -> Self {
        Self::NotesGenerated {
            release_id: release_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn published(release_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self::Published {
            release_id: release_id.into(),
            version: version.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn failed(release_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            release_id: release_id.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn canceled(
        release_id: impl Into<String>,
        canceled_by: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Canceled {
            release_id: release_id.into(),
            canceled_by: canceled_by.into(),
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Dotted event name; also the webhook filter subject
    pub fn name(&self) -> &'static str {
        match self {
            Self::Created { .. } => "release.created",
            Self::Planned { .. } => "release.planned",
            Self::Approved { .. } => "release.approved",
            Self::TagCreated { .. } => "release.tag_created",
            Self::ChangelogGenerated { .. } => "release.changelog_generated",
            Self::NotesGenerated { .. } => "release.notes_generated",
            Self::Published { .. } => "release.published",
            Self::Failed { .. } => "release.failed",
            Self::Canceled { .. } => "release.canceled",
        }
    }

    pub fn release_id(&self) -> &str {
        match self {
            Self::Created { release_id, .. }
            | Self::Planned { release_id, .. }
            | Self::Approved { release_id, .. }
            | Self::TagCreated { release_id, .. }
            | Self::ChangelogGenerated { release_id, .. }
            | Self::NotesGenerated { release_id, .. }
            | Self::Published { release_id, .. }
            | Self::Failed { release_id, .. }
            | Self::Canceled { release_id, .. } => release_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Created { timestamp, .. }
            | Self::Planned { timestamp, .. }
            | Self::Approved { timestamp, .. }
            | Self::TagCreated { timestamp, .. }
            | Self::ChangelogGenerated { timestamp, .. }
            | Self::NotesGenerated { timestamp, .. }
            | Self::Published { timestamp, .. }
            | Self::Failed { timestamp, .. }
            | Self::Canceled { timestamp, .. } => *timestamp,
        }
    }

    /// Event-specific fields for the webhook `data` object
    pub fn payload(&self) -> Value {
        match self {
            Self::Created { repository, .. } => json!({ "repository": repository }),
            Self::Planned { version, .. } => json!({ "version": version }),
            Self::Approved { approved_by, .. } => json!({ "approved_by": approved_by }),
            Self::TagCreated { tag, .. } => json!({ "tag": tag }),
            Self::ChangelogGenerated { .. } | Self::NotesGenerated { .. } => json!({}),
            Self::Published { version, .. } => json!({ "version": version }),
            Self::Failed { reason, .. } => json!({ "reason": reason }),
            Self::Canceled {
                canceled_by,
                reason,
                ..
            } => json!({ "canceled_by": canceled_by, "reason": reason }),
        }
    }

    /// Terminal events settle the release outcome
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Published { .. } | Self::Failed { .. } | Self::Canceled { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(ReleaseEvent::created("rel-1", "a/b").name(), "release.created");
        assert_eq!(
            ReleaseEvent::published("rel-1", "1.0.0").name(),
            "release.published"
        );
        assert_eq!(
            ReleaseEvent::canceled("rel-1", "alice", "scope change").name(),
            "release.canceled"
        );
    }

    #[test]
    fn test_discriminator_round_trip() {
        let event = ReleaseEvent::failed("rel-9", "tests failed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "release.failed");
        assert_eq!(json["release_id"], "rel-9");

        let back: ReleaseEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.name(), "release.failed");
        assert_eq!(back.release_id(), "rel-9");
    }

    #[test]
    fn test_payload_carries_event_fields() {
        let event = ReleaseEvent::canceled("rel-1", "human:alice@example.com", "freeze");
        let data = event.payload();
        assert_eq!(data["canceled_by"], "human:alice@example.com");
        assert_eq!(data["reason"], "freeze");

        assert_eq!(ReleaseEvent::changelog_generated("rel-1").payload(), json!({}));
    }

    #[test]
    fn test_terminal_classification() {
        assert!(ReleaseEvent::published("r", "1").is_terminal());
        assert!(ReleaseEvent::failed("r", "x").is_terminal());
        assert!(ReleaseEvent::canceled("r", "a", "b").is_terminal());
        assert!(!ReleaseEvent::created("r", "a/b").is_terminal());
        assert!(!ReleaseEvent::approved("r", "alice").is_terminal());
    }
}
