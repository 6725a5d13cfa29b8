//! Change Governance Protocol message model.
//!
//! Immutable value types exchanged across the governance pipeline:
//! Proposal -> Decision -> Authorization. Records are constructed once
//! (via `new` plus consuming `with_*` builders) and never mutated after
//! they are stored.

pub mod actor;
pub mod analysis;
pub mod authorization;
pub mod decision;
pub mod id;
pub mod proposal;

pub use actor::{Actor, ActorKind, CredentialsDescriptor, TrustLevel};
pub use analysis::{
    ApiChange, ApiChangeKind, BlastRadius, ChangeAnalysis, CommitStats, DependencyImpact,
};
pub use authorization::{
    Authorization, AuthorizationOptions, ApprovalAction, ApprovalRecord, ReleaseStep,
};
pub use decision::{Decision, DecisionKind, RequiredAction, RiskFactor, Severity};
pub use id::{authorization_id, decision_id, proposal_id};
pub use proposal::{Bump, Proposal, ProposalContext, Scope, Intent};

/// Protocol version carried by every message.
pub const PROTOCOL_VERSION: &str = "0.1";

/// Type discriminator for proposals. The `type` field is the
/// authoritative routing tag.
pub const TYPE_PROPOSAL: &str = "change.proposal";

/// Type discriminator for decisions.
pub const TYPE_DECISION: &str = "change.decision";

/// Type discriminator for execution authorizations.
pub const TYPE_AUTHORIZATION: &str = "change.execution_authorized";
