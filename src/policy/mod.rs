//! Declarative policy evaluation over a structured context.
//!
//! Policies are ordered rule lists with typed actions. The engine
//! gathers enabled rules across all loaded policies, evaluates them in
//! priority order against a dotted-path context, and applies the
//! actions of matching rules. Evaluation is best-effort: a bad rule is
//! logged and skipped, never fatal.

pub mod context;
pub mod engine;
pub mod schema;
pub mod team;
pub mod time;

pub use context::EvaluationContext;
pub use engine::{PolicyEngine, PolicyOutcome};
pub use schema::{Action, Condition, DefaultDecision, Defaults, Operator, Policy, Rule};
pub use team::{Team, TeamDirectory, TeamMember};
pub use time::{FreezeWindow, TimeFlags, TimeRules};
