//! Scored pairs and per-layer score sets
//!
//! A `ScoredPair` couples the model's expected edge weight with the observed
//! (held-out) integer weight of the same pollinator → plant edge. A
//! `LayerScoreSet` collects the pairs belonging to one layer.

use crate::error::{ScoringError, ScoringResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// (predicted score, actual weight) for one held-out edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredPair {
    /// Expected edge weight from the reconstructed tensor (0 for untrained nodes)
    pub predicted: f64,
    /// Observed interaction count in the holdout set
    pub actual: u32,
}

impl ScoredPair {
    pub fn new(predicted: f64, actual: u32) -> Self {
        Self { predicted, actual }
    }
}

impl From<(f64, u32)> for ScoredPair {
    fn from((predicted, actual): (f64, u32)) -> Self {
        Self { predicted, actual }
    }
}

/// Ordered pairs of a single layer (or a single train → test site pair)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerScoreSet {
    /// 0-based layer index in the holdout file
    pub layer: usize,
    pairs: Vec<ScoredPair>,
}

impl LayerScoreSet {
    pub fn new(layer: usize) -> Self {
        Self { layer, pairs: Vec::new() }
    }

    pub fn with_pairs(layer: usize, pairs: Vec<ScoredPair>) -> Self {
        Self { layer, pairs }
    }

    pub fn push(&mut self, pair: ScoredPair) {
        self.pairs.push(pair);
    }

    pub fn pairs(&self) -> &[ScoredPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Largest observed weight (W_max), `None` for an empty set
    pub fn max_weight(&self) -> Option<u32> {
        self.pairs.iter().map(|p| p.actual).max()
    }

    /// True when every actual weight is 0 or 1
    pub fn is_binary(&self) -> bool {
        self.pairs.iter().all(|p| p.actual <= 1)
    }
}

/// Copy of `pairs` sorted ascending by predicted score.
///
/// Uses a stable sort: pairs with equal predicted scores keep their input
/// order, so results are reproducible for a fixed input sequence.
///
/// # Errors
/// `NonFiniteScore` for the first NaN prediction.
pub(crate) fn sort_by_prediction(pairs: &[ScoredPair]) -> ScoringResult<Vec<ScoredPair>> {
    if let Some(position) = pairs.iter().position(|p| p.predicted.is_nan()) {
        return Err(ScoringError::NonFiniteScore { position });
    }

    let mut sorted = pairs.to_vec();
    sorted.sort_by(|a, b| {
        a.predicted
            .partial_cmp(&b.predicted)
            .unwrap_or(Ordering::Equal)
    });
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_is_stable_on_ties() {
        let pairs: Vec<ScoredPair> = vec![
            (0.5, 3).into(),
            (0.1, 0).into(),
            (0.5, 1).into(),
            (0.5, 2).into(),
        ];

        let sorted = sort_by_prediction(&pairs).unwrap();
        let actuals: Vec<u32> = sorted.iter().map(|p| p.actual).collect();
        assert_eq!(actuals, vec![0, 3, 1, 2]);
    }

    #[test]
    fn test_negative_zero_ties_with_zero() {
        let pairs: Vec<ScoredPair> = vec![(0.0, 1).into(), (-0.0, 0).into()];
        let sorted = sort_by_prediction(&pairs).unwrap();
        assert_eq!(sorted[0].actual, 1);
    }

    #[test]
    fn test_nan_rejected() {
        let pairs: Vec<ScoredPair> = vec![(0.2, 1).into(), (f64::NAN, 0).into()];
        assert_eq!(
            sort_by_prediction(&pairs).unwrap_err(),
            ScoringError::NonFiniteScore { position: 1 }
        );
    }

    #[test]
    fn test_layer_score_set_accessors() {
        let mut set = LayerScoreSet::new(3);
        assert!(set.is_empty());
        assert_eq!(set.max_weight(), None);

        set.push(ScoredPair::new(0.4, 1));
        set.push(ScoredPair::new(0.9, 0));
        assert_eq!(set.len(), 2);
        assert_eq!(set.max_weight(), Some(1));
        assert!(set.is_binary());

        set.push(ScoredPair::new(1.2, 4));
        assert!(!set.is_binary());
    }
}
