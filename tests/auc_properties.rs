//! AUC Property Tests
//!
//! Behavioural checks of the weighted AUC against brute-force pair counting
//! and randomly permuted inputs. Random data uses fixed seeds.

use approx::assert_relative_eq;
use multilayer_auc_rust::{
    binary_auc, reconstruct, weighted_auc, weighted_auc_breakdown, LayerScoreSet, ScoredPair,
    ScoringError,
};
use ndarray::{array, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

fn pairs(raw: &[(f64, u32)]) -> Vec<ScoredPair> {
    raw.iter().copied().map(ScoredPair::from).collect()
}

/// Distinct predictions with random integer weights in 0..=max_weight
fn random_pairs(rng: &mut StdRng, n: usize, max_weight: u32) -> Vec<ScoredPair> {
    let mut scores: Vec<f64> = (0..n).map(|i| i as f64 * 0.37 + 0.01).collect();
    scores.shuffle(rng);
    scores
        .into_iter()
        .map(|s| ScoredPair::new(s, rng.gen_range(0..=max_weight)))
        .collect()
}

/// O(n²) reference: discordant = ranked below a pair with a smaller weight,
/// normalizer = pairs with different weights.
fn brute_force(pairs: &[ScoredPair]) -> (u64, u64) {
    let mut penalty = 0;
    let mut normalizer = 0;
    for a in pairs {
        for b in pairs {
            if a.actual < b.actual {
                normalizer += 1;
                if a.predicted > b.predicted {
                    penalty += 1;
                }
            }
        }
    }
    (penalty, normalizer)
}

#[test]
fn perfect_ranking_scores_one() {
    let set = pairs(&[(0.05, 0), (0.2, 1), (0.21, 1), (0.6, 4), (1.5, 9)]);
    assert_eq!(weighted_auc(&set).unwrap(), 1.0);
}

#[test]
fn inverted_ranking_scores_zero() {
    let set = pairs(&[(1.5, 0), (0.6, 1), (0.2, 4), (0.05, 9)]);
    assert_eq!(weighted_auc(&set).unwrap(), 0.0);
}

#[test]
fn worked_example() {
    let set = pairs(&[(0.1, 0), (0.4, 1), (0.3, 2), (0.9, 3)]);

    let breakdown = weighted_auc_breakdown(&set).unwrap();

    assert_eq!(breakdown.penalty, 1);
    assert_eq!(breakdown.normalizer, 6);
    assert_eq!(breakdown.class_counts, vec![1, 1, 1, 1]);
    assert_relative_eq!(breakdown.auc, 1.0 - 1.0 / 6.0, epsilon = 1e-12);
}

#[test]
fn equal_weights_are_degenerate() {
    let set = LayerScoreSet::with_pairs(3, pairs(&[(0.1, 5), (0.7, 5), (0.3, 5)]));

    match set.auc() {
        Err(ScoringError::DegenerateInput { n_pairs, weight }) => {
            assert_eq!(n_pairs, 3);
            assert_eq!(weight, Some(5));
        }
        other => panic!("expected DegenerateInput, got {:?}", other),
    }
}

#[test]
fn matches_brute_force_counts() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..50 {
        let set = random_pairs(&mut rng, 60, 6);
        let (penalty, normalizer) = brute_force(&set);

        match weighted_auc_breakdown(&set) {
            Ok(b) => {
                assert_eq!(b.penalty, penalty);
                assert_eq!(b.normalizer, normalizer);
                assert_relative_eq!(
                    b.auc,
                    1.0 - penalty as f64 / normalizer as f64,
                    epsilon = 1e-12
                );
            }
            Err(e) => {
                assert!(e.is_degenerate());
                assert_eq!(normalizer, 0);
            }
        }
    }
}

#[test]
fn binary_formula_matches_weighted() {
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..50 {
        let set = random_pairs(&mut rng, 40, 1);
        match (weighted_auc(&set), binary_auc(&set)) {
            (Ok(weighted), Ok(binary)) => assert_relative_eq!(weighted, binary, epsilon = 1e-12),
            (Err(a), Err(b)) => {
                assert!(a.is_degenerate());
                assert!(b.is_degenerate());
            }
            (a, b) => panic!("formulas disagree: {:?} vs {:?}", a, b),
        }
    }
}

#[test]
fn order_independent_without_ties() {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut set = random_pairs(&mut rng, 80, 4);
    let expected = weighted_auc_breakdown(&set).unwrap();

    for _ in 0..20 {
        set.shuffle(&mut rng);
        assert_eq!(weighted_auc_breakdown(&set).unwrap(), expected);
    }
}

#[test]
fn tied_scores_keep_input_order() {
    // All predictions 0: penalty counts earlier pairs with larger weight
    let set = pairs(&[(0.0, 2), (0.0, 0), (0.0, 1)]);
    let breakdown = weighted_auc_breakdown(&set).unwrap();
    assert_eq!(breakdown.penalty, 2);
    assert_eq!(breakdown.normalizer, 3);

    let repeated: Vec<f64> = (0..10).map(|_| weighted_auc(&set).unwrap()).collect();
    assert!(repeated.iter().all(|&auc| auc == repeated[0]));
}

#[test]
fn non_finite_prediction_rejected() {
    let set = pairs(&[(0.2, 0), (f64::NAN, 1)]);
    assert_eq!(
        weighted_auc(&set).unwrap_err(),
        ScoringError::NonFiniteScore { position: 1 }
    );
}

#[test]
fn reconstruction_identity_example() {
    let eye = array![[1.0, 0.0], [0.0, 1.0]];
    let mut w = Array3::<f64>::zeros((2, 2, 1));
    w.index_axis_mut(Axis(2), 0)
        .assign(&array![[2.0, 3.0], [4.0, 5.0]]);

    let p = reconstruct(&eye, &w, &eye).unwrap();

    assert_eq!(p.layer(0).unwrap(), array![[2.0, 3.0], [4.0, 5.0]]);
}
