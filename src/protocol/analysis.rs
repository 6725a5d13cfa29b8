//! Change analysis consumed by the risk calculator and policy engine.
//!
//! Produced by an upstream analyzer; the core only reads it.

use serde::{Deserialize, Serialize};

/// Kind of API surface change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiChangeKind {
    Added,
    Removed,
    Modified,
    Deprecated,
}

/// A single API surface change
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiChange {
    pub kind: ApiChangeKind,

    /// Affected symbol
    pub symbol: String,

    /// Location of the change (file, module path)
    #[serde(default)]
    pub location: String,

    /// Whether the change breaks consumers
    #[serde(default)]
    pub breaking: bool,

    #[serde(default)]
    pub description: String,
}

impl ApiChange {
    pub fn new(kind: ApiChangeKind, symbol: impl Into<String>) -> Self {
        Self {
            kind,
            symbol: symbol.into(),
            location: String::new(),
            breaking: false,
            description: String::new(),
        }
    }

    pub fn breaking(mut self) -> Self {
        self.breaking = true;
        self
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}

/// Downstream dependency exposure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyImpact {
    pub direct_dependents: u64,
    pub transitive_dependents: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_packages: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affected_services: Vec<String>,
}

/// Quantified scope of the change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlastRadius {
    /// Precomputed normalized score, when the analyzer provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    pub files_changed: u64,
    pub lines_changed: u64,
}

/// Commit categorization counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitStats {
    pub features: u64,
    pub fixes: u64,
    pub breaking: u64,
    pub security: u64,
    pub dependencies: u64,
    pub other: u64,
}

impl CommitStats {
    pub fn total(&self) -> u64 {
        self.features + self.fixes + self.breaking + self.security + self.dependencies + self.other
    }
}

/// Externally-produced analysis of a proposed change set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAnalysis {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_changes: Vec<ApiChange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_impact: Option<DependencyImpact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub blast_radius: Option<BlastRadius>,

    #[serde(default)]
    pub commits: CommitStats,
}

impl ChangeAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_changes(mut self, changes: Vec<ApiChange>) -> Self {
        self.api_changes = changes;
        self
    }

    pub fn with_dependency_impact(mut self, impact: DependencyImpact) -> Self {
        self.dependency_impact = Some(impact);
        self
    }

    pub fn with_blast_radius(mut self, radius: BlastRadius) -> Self {
        self.blast_radius = Some(radius);
        self
    }

    pub fn with_commits(mut self, commits: CommitStats) -> Self {
        self.commits = commits;
        self
    }

    /// True when any API change is flagged breaking
    pub fn has_breaking_api_change(&self) -> bool {
        self.api_changes.iter().any(|c| c.breaking)
    }

    /// True when the analysis observed any API surface change
    pub fn has_api_change(&self) -> bool {
        !self.api_changes.is_empty()
    }
}
