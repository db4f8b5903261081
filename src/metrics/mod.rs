//! Scoring metrics for held-out edge predictions
//!
//! - `pairs`: scored (predicted, actual) pairs and per-layer score sets
//! - `weighted_auc`: directed, multiplicity-weighted AUC over integer weights
//! - `binary_auc`: Mann–Whitney fast path for presence/absence labels

pub mod pairs;
pub mod weighted_auc;
pub mod binary_auc;

pub use pairs::{LayerScoreSet, ScoredPair};
pub use weighted_auc::{weighted_auc, weighted_auc_breakdown, AucBreakdown};
pub use binary_auc::binary_auc;
