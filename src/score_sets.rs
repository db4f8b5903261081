//! Score-set construction
//!
//! Joins held-out edges against the reconstructed prediction tensor. Each
//! holdout record (pollinator, plant, weight per layer) becomes one
//! `ScoredPair` per layer, with the expected weight read at
//! P[pollinator, plant, layer].
//!
//! A node the factorization never saw has no row in U/V. Such edges still
//! enter the score set with an expected weight of 0 and are counted in
//! `LookupStats`; they are not errors.

use crate::data::{HoldoutSet, NodeIndex, NodeSlot};
use crate::error::{ScoringError, ScoringResult};
use crate::metrics::{LayerScoreSet, ScoredPair};
use crate::tensor::PredictionTensor;
use serde::Serialize;
use std::collections::BTreeSet;

/// Expected weight assigned when either endpoint is untrained
pub const UNTRAINED_SCORE: f64 = 0.0;

/// Lookup-miss bookkeeping for one score-set build
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LookupStats {
    /// Holdout records processed
    pub records: usize,
    /// Records with at least one untrained endpoint
    pub untrained_records: usize,
    pub missing_pollinators: BTreeSet<String>,
    pub missing_plants: BTreeSet<String>,
}

/// Per-layer score sets plus lookup statistics
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSets {
    pub layers: Vec<LayerScoreSet>,
    pub lookups: LookupStats,
}

/// Build one score set per layer; holdout layer l is scored against
/// prediction layer l.
///
/// # Errors
/// `ShapeMismatch` when the node list or the layer counts disagree with the tensor.
pub fn build_layer_score_sets(
    holdout: &HoldoutSet,
    prediction: &PredictionTensor,
    nodes: &NodeIndex,
) -> ScoringResult<ScoreSets> {
    if holdout.n_layers() != prediction.n_layers() {
        return Err(ScoringError::shape_mismatch(
            "holdout layers (L)",
            prediction.n_layers(),
            holdout.n_layers(),
        ));
    }

    let resolved = resolve_endpoints(holdout, prediction, nodes)?;
    let layers = (0..holdout.n_layers())
        .map(|layer| collect_layer(holdout, &resolved.endpoints, layer, prediction, layer))
        .collect();

    Ok(ScoreSets {
        layers,
        lookups: resolved.stats,
    })
}

/// Build the score set of a single holdout layer against a chosen prediction
/// layer.
///
/// Used by the pairwise transfer run, where the holdout carries only the test
/// site (holdout layer 0) and the test site is prediction layer 1 of the
/// two-layer train/test factorization.
pub fn build_score_set(
    holdout: &HoldoutSet,
    holdout_layer: usize,
    prediction: &PredictionTensor,
    prediction_layer: usize,
    nodes: &NodeIndex,
) -> ScoringResult<(LayerScoreSet, LookupStats)> {
    if holdout_layer >= holdout.n_layers() {
        return Err(ScoringError::LayerOutOfRange {
            layer: holdout_layer,
            n_layers: holdout.n_layers(),
        });
    }
    if prediction_layer >= prediction.n_layers() {
        return Err(ScoringError::LayerOutOfRange {
            layer: prediction_layer,
            n_layers: prediction.n_layers(),
        });
    }

    let resolved = resolve_endpoints(holdout, prediction, nodes)?;
    let set = collect_layer(
        holdout,
        &resolved.endpoints,
        holdout_layer,
        prediction,
        prediction_layer,
    );
    Ok((set, resolved.stats))
}

struct ResolvedEndpoints {
    /// (source row, target row) per record, `None` when either is untrained
    endpoints: Vec<Option<(usize, usize)>>,
    stats: LookupStats,
}

fn resolve_endpoints(
    holdout: &HoldoutSet,
    prediction: &PredictionTensor,
    nodes: &NodeIndex,
) -> ScoringResult<ResolvedEndpoints> {
    if nodes.len() != prediction.n_nodes() {
        return Err(ScoringError::shape_mismatch(
            "node list (N)",
            prediction.n_nodes(),
            nodes.len(),
        ));
    }

    let mut stats = LookupStats {
        records: holdout.len(),
        ..LookupStats::default()
    };

    let endpoints = holdout
        .records()
        .iter()
        .map(|record| {
            let source = nodes.lookup(&record.pollinator);
            let target = nodes.lookup(&record.plant);

            if source == NodeSlot::Untrained {
                stats.missing_pollinators.insert(record.pollinator.clone());
            }
            if target == NodeSlot::Untrained {
                stats.missing_plants.insert(record.plant.clone());
            }

            match (source, target) {
                (NodeSlot::Trained(i), NodeSlot::Trained(j)) => Some((i, j)),
                _ => {
                    stats.untrained_records += 1;
                    None
                }
            }
        })
        .collect();

    if stats.untrained_records > 0 {
        tracing::warn!(
            "{} of {} holdout edges have untrained endpoints ({} pollinators, {} plants); scored as {}",
            stats.untrained_records,
            stats.records,
            stats.missing_pollinators.len(),
            stats.missing_plants.len(),
            UNTRAINED_SCORE
        );
    }

    Ok(ResolvedEndpoints { endpoints, stats })
}

fn collect_layer(
    holdout: &HoldoutSet,
    endpoints: &[Option<(usize, usize)>],
    holdout_layer: usize,
    prediction: &PredictionTensor,
    prediction_layer: usize,
) -> LayerScoreSet {
    let pairs = holdout
        .records()
        .iter()
        .zip(endpoints)
        .map(|(record, endpoint)| {
            let predicted = endpoint
                .and_then(|(i, j)| prediction.get(i, j, prediction_layer))
                .unwrap_or(UNTRAINED_SCORE);
            ScoredPair::new(predicted, record.weights[holdout_layer])
        })
        .collect();

    LayerScoreSet::with_pairs(holdout_layer, pairs)
}
