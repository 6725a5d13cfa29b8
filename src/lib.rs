//! cgp-core - Change Governance Protocol decision core
//!
//! A vendor-neutral pipeline for software release decisions: proposals
//! are risk-scored, evaluated against declarative policies, recorded,
//! optionally authorized for execution, and their outcomes feed a
//! learning memory that refines future assessments.

pub mod config;
pub mod error;
pub mod memory;
pub mod observability;
pub mod pipeline;
pub mod policy;
pub mod protocol;
pub mod risk;
pub mod tracker;
pub mod webhook;

// Re-export commonly used types
pub use error::{CgpError, Result};

pub use protocol::{
    Actor, ActorKind, ApiChange, ApiChangeKind, ApprovalAction, ApprovalRecord, Authorization,
    AuthorizationOptions, BlastRadius, Bump, ChangeAnalysis, CommitStats, Decision, DecisionKind,
    DependencyImpact, Intent, Proposal, ProposalContext, ReleaseStep, RequiredAction, RiskFactor,
    Scope, Severity, TrustLevel, PROTOCOL_VERSION,
};

pub use risk::{ReleaseHistoryProvider, RiskAssessment, RiskCalculator, RiskWeights};

pub use policy::{
    Action, Condition, DefaultDecision, Defaults, EvaluationContext, FreezeWindow, Operator,
    Policy, PolicyEngine, PolicyOutcome, Rule, Team, TeamDirectory, TeamMember, TimeRules,
};

pub use memory::{
    ActorMetrics, AuditTrail, FileStore, IncidentRecord, IncidentType, InMemoryStore, MemoryStore,
    ReleaseOutcome, ReleaseRecord, RiskPatterns, RiskTrend, StoreStats,
};

pub use tracker::{EventPublisher, OutcomeTracker, ReleaseEvent};

pub use webhook::{sign_payload, signature_header, verify_signature, WebhookConfig, WebhookPublisher};

pub use pipeline::GovernancePipeline;

pub use config::CgpConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
