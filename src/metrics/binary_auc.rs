//! Binary AUC fast path
//!
//! Classic Mann–Whitney AUC for presence/absence labels: an edge with
//! actual weight ≥ 1 is a positive, weight 0 a negative.
//!
//!   AUC = 1 − (# negatives ranked above a positive) / (Pos × Neg)
//!
//! On {0, 1} data this is exactly the weighted AUC with W_max = 1; it skips
//! the class-count vector.

use super::pairs::{sort_by_prediction, ScoredPair};
use crate::error::{ScoringError, ScoringResult};

/// Binary AUC of an unsorted pair list.
///
/// # Errors
/// - `DegenerateInput` when there are no positives or no negatives
/// - `NonFiniteScore` when a predicted score is NaN
pub fn binary_auc(pairs: &[ScoredPair]) -> ScoringResult<f64> {
    let sorted = sort_by_prediction(pairs)?;

    let mut positives_seen = 0u64;
    let mut discordant = 0u64;
    for pair in &sorted {
        if pair.actual >= 1 {
            positives_seen += 1;
        } else {
            discordant += positives_seen;
        }
    }

    let positives = positives_seen;
    let negatives = sorted.len() as u64 - positives;
    if positives == 0 || negatives == 0 {
        return Err(ScoringError::DegenerateInput {
            n_pairs: sorted.len(),
            weight: sorted.first().map(|p| p.actual.min(1)),
        });
    }

    Ok(1.0 - discordant as f64 / (positives * negatives) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::weighted_auc::weighted_auc;
    use approx::assert_relative_eq;

    fn pairs(raw: &[(f64, u32)]) -> Vec<ScoredPair> {
        raw.iter().copied().map(ScoredPair::from).collect()
    }

    #[test]
    fn test_binary_matches_weighted() {
        let input = pairs(&[
            (0.05, 0),
            (0.30, 1),
            (0.12, 0),
            (0.90, 1),
            (0.45, 0),
            (0.20, 1),
            (0.60, 0),
            (0.75, 1),
        ]);

        let fast = binary_auc(&input).unwrap();
        let general = weighted_auc(&input).unwrap();
        assert_relative_eq!(fast, general, epsilon = 1e-15);

        // Sorted labels: 0 0 1 1 0 0 1 1 → discordant = 2 + 2 = 4, Pos·Neg = 16
        assert_relative_eq!(fast, 1.0 - 4.0 / 16.0);
    }

    #[test]
    fn test_weights_above_one_are_positive() {
        let input = pairs(&[(0.1, 0), (0.2, 3), (0.3, 0)]);
        // One positive ranked below one negative
        assert_relative_eq!(binary_auc(&input).unwrap(), 0.5);
    }

    #[test]
    fn test_no_negatives_is_degenerate() {
        let input = pairs(&[(0.1, 1), (0.2, 2)]);
        assert!(binary_auc(&input).unwrap_err().is_degenerate());
    }

    #[test]
    fn test_no_positives_is_degenerate() {
        let input = pairs(&[(0.1, 0), (0.2, 0)]);
        assert_eq!(
            binary_auc(&input).unwrap_err(),
            ScoringError::DegenerateInput { n_pairs: 2, weight: Some(0) }
        );
    }
}
