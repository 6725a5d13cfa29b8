//! Risk assessment for proposed releases.
//!
//! A weighted multi-factor scorer: each factor inspects the proposal and
//! its change analysis, and the calculator combines the factors that
//! fired into a normalized 0..1 score with an explanation.

pub mod calculator;
pub mod weights;

pub use calculator::{ReleaseHistoryProvider, RiskAssessment, RiskCalculator};
pub use weights::RiskWeights;
