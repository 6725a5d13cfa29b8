//! Factor weight configuration for the risk calculator.

use serde::{Deserialize, Serialize};

use crate::error::{CgpError, Result};

/// Relative weight of each risk factor. The eight fields sum to
/// approximately 1.0; `validate` accepts sums within [0.9, 1.1] so
/// operators can nudge individual weights without rebalancing all of
/// them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RiskWeights {
    pub api_changes: f64,
    pub dependency_impact: f64,
    pub blast_radius: f64,
    pub code_complexity: f64,
    pub test_coverage: f64,
    pub actor_trust: f64,
    pub historical_risk: f64,
    pub security_impact: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            api_changes: 0.25,
            dependency_impact: 0.20,
            blast_radius: 0.15,
            code_complexity: 0.10,
            test_coverage: 0.10,
            actor_trust: 0.05,
            historical_risk: 0.10,
            security_impact: 0.05,
        }
    }
}

impl RiskWeights {
    pub fn sum(&self) -> f64 {
        self.api_changes
            + self.dependency_impact
            + self.blast_radius
            + self.code_complexity
            + self.test_coverage
            + self.actor_trust
            + self.historical_risk
            + self.security_impact
    }

    pub fn validate(&self) -> Result<()> {
        let sum = self.sum();
        if !(0.9..=1.1).contains(&sum) {
            return Err(CgpError::InvalidWeights(format!(
                "weights sum to {:.3}, expected within [0.9, 1.1]",
                sum
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_sum_to_one() {
        let weights = RiskWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn test_unbalanced_weights_rejected() {
        let weights = RiskWeights {
            api_changes: 0.9,
            ..RiskWeights::default()
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_slightly_off_sum_accepted() {
        let weights = RiskWeights {
            actor_trust: 0.10,
            ..RiskWeights::default()
        };
        assert!(weights.validate().is_ok());
    }
}
