//! Directed, multiplicity-weighted AUC
//!
//! Generalises the Mann–Whitney AUC to integer edge weights. A comparison
//! between two held-out edges counts only when their actual weights differ;
//! it is discordant when the edge with the larger actual weight received the
//! smaller (or earlier-sorted) predicted score.
//!
//! Algorithm, O(N·W) for N pairs and maximum weight W:
//! 1. Sort pairs ascending by predicted score (stable).
//! 2. Walk the sorted pairs keeping `count[k]` = pairs with weight k seen so
//!    far. Before counting a pair with weight a, add Σ_{q>a} count[q] to the
//!    penalty: every heavier edge already seen was ranked below it.
//! 3. Z = Σ_k count[k] · Σ_{q>k} count[q], the number of cross-class pairs.
//! 4. AUC = 1 − penalty / Z.
//!
//! Penalty and Z are exact integer counts; the only rounding is the final
//! division.

use super::pairs::{sort_by_prediction, LayerScoreSet, ScoredPair};
use crate::error::{ScoringError, ScoringResult};
use serde::Serialize;

/// AUC together with the counts it was derived from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AucBreakdown {
    /// 1 − penalty / normalizer
    pub auc: f64,
    /// Number of discordant cross-class comparisons
    pub penalty: u64,
    /// Total number of cross-class comparisons (Z)
    pub normalizer: u64,
    /// Largest actual weight in the set (W_max)
    pub max_weight: u32,
    pub n_pairs: usize,
    /// class_counts[k] = number of pairs with actual weight k
    pub class_counts: Vec<u64>,
}

/// Weighted AUC of an unsorted pair list.
///
/// # Errors
/// - `DegenerateInput` when all actual weights are equal (or the list is empty)
/// - `NonFiniteScore` when a predicted score is NaN
pub fn weighted_auc(pairs: &[ScoredPair]) -> ScoringResult<f64> {
    weighted_auc_breakdown(pairs).map(|b| b.auc)
}

/// Weighted AUC with penalty, normaliser and class multiplicities.
pub fn weighted_auc_breakdown(pairs: &[ScoredPair]) -> ScoringResult<AucBreakdown> {
    let sorted = sort_by_prediction(pairs)?;

    let Some(max_weight) = sorted.iter().map(|p| p.actual).max() else {
        return Err(ScoringError::DegenerateInput { n_pairs: 0, weight: None });
    };

    let mut counts = vec![0u64; max_weight as usize + 1];
    let mut penalty = 0u64;

    for pair in &sorted {
        let actual = pair.actual as usize;
        // Heavier edges already encountered were ranked lower than this one
        penalty += counts[actual + 1..].iter().sum::<u64>();
        counts[actual] += 1;
    }

    let normalizer = cross_class_pairs(&counts);
    if normalizer == 0 {
        return Err(ScoringError::DegenerateInput {
            n_pairs: sorted.len(),
            weight: Some(max_weight),
        });
    }

    Ok(AucBreakdown {
        auc: 1.0 - penalty as f64 / normalizer as f64,
        penalty,
        normalizer,
        max_weight,
        n_pairs: sorted.len(),
        class_counts: counts,
    })
}

/// Z = Σ_k count[k] · Σ_{q>k} count[q]
fn cross_class_pairs(counts: &[u64]) -> u64 {
    let mut heavier = 0u64;
    let mut total = 0u64;
    for &count in counts.iter().rev() {
        total += count * heavier;
        heavier += count;
    }
    total
}

impl LayerScoreSet {
    /// Weighted AUC of this layer.
    pub fn auc(&self) -> ScoringResult<f64> {
        weighted_auc(self.pairs())
    }

    pub fn auc_breakdown(&self) -> ScoringResult<AucBreakdown> {
        weighted_auc_breakdown(self.pairs())
    }
}
