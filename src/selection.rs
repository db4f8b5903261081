//! Model selection - coordinates factorization, reconstruction and scoring
//!
//! Two aggregation modes over the weighted AUC:
//! - Per-K selection: score every layer of the all-sites holdout, sum the
//!   layer AUCs, keep the K with the largest sum.
//! - Pairwise transfer: for every ordered (train, test) site pair, score the
//!   test layer of the two-layer factorization; results fill a site × site
//!   matrix whose diagonal is never evaluated.
//!
//! A failing layer or configuration is recorded in the report and the run
//! moves on. Both modes have sequential and parallel (Rayon) variants that
//! return identical reports.

use crate::config::TransferConfig;
use crate::data::HoldoutSet;
use crate::metrics::LayerScoreSet;
use crate::provider::{FactorizationJob, FactorizationProvider};
use crate::score_sets::{build_layer_score_sets, build_score_set, LookupStats};
use anyhow::{Context, Result};
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

/// Layer index of the test site in a two-layer (train, test) factorization
pub const TRANSFER_TEST_LAYER: usize = 1;

/// Score of one layer, or why it was skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LayerOutcome {
    Scored {
        auc: f64,
        penalty: u64,
        normalizer: u64,
        n_pairs: usize,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerAuc {
    pub layer: usize,
    #[serde(flatten)]
    pub outcome: LayerOutcome,
}

/// Per-layer AUCs and their sum over scored layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerAucSummary {
    pub layers: Vec<LayerAuc>,
    pub auc_sum: f64,
    pub scored_layers: usize,
}

impl LayerAucSummary {
    fn from_layers(layers: Vec<LayerAuc>) -> Self {
        let mut auc_sum = 0.0;
        let mut scored_layers = 0;
        for layer in &layers {
            if let LayerOutcome::Scored { auc, .. } = layer.outcome {
                auc_sum += auc;
                scored_layers += 1;
            }
        }
        Self {
            layers,
            auc_sum,
            scored_layers,
        }
    }

    /// Layers that could not be scored
    pub fn skipped_layers(&self) -> Vec<usize> {
        self.layers
            .iter()
            .filter(|l| matches!(l.outcome, LayerOutcome::Skipped { .. }))
            .map(|l| l.layer)
            .collect()
    }
}

fn score_layer(set: &LayerScoreSet) -> LayerAuc {
    let outcome = match set.auc_breakdown() {
        Ok(b) => {
            tracing::debug!(
                "Layer {}: AUC {:.6} (penalty {}, Z {}, W_max {})",
                set.layer,
                b.auc,
                b.penalty,
                b.normalizer,
                b.max_weight
            );
            LayerOutcome::Scored {
                auc: b.auc,
                penalty: b.penalty,
                normalizer: b.normalizer,
                n_pairs: b.n_pairs,
            }
        }
        Err(e) => {
            tracing::warn!("Layer {} skipped: {}", set.layer, e);
            LayerOutcome::Skipped {
                reason: e.to_string(),
            }
        }
    };

    LayerAuc {
        layer: set.layer,
        outcome,
    }
}

/// Score every layer in order.
pub fn evaluate_layers(sets: &[LayerScoreSet]) -> LayerAucSummary {
    LayerAucSummary::from_layers(sets.iter().map(score_layer).collect())
}

/// Score layers with Rayon; same result as `evaluate_layers`.
pub fn evaluate_layers_parallel(sets: &[LayerScoreSet]) -> LayerAucSummary {
    LayerAucSummary::from_layers(sets.par_iter().map(score_layer).collect())
}

/// Outcome of one candidate K
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Evaluated {
        summary: LayerAucSummary,
        lookups: LookupStats,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KCandidate {
    pub k: usize,
    #[serde(flatten)]
    pub outcome: CandidateOutcome,
}

impl KCandidate {
    /// Summed AUC when at least one layer was scored
    pub fn auc_sum(&self) -> Option<f64> {
        match &self.outcome {
            CandidateOutcome::Evaluated { summary, .. } if summary.scored_layers > 0 => {
                Some(summary.auc_sum)
            }
            _ => None,
        }
    }
}

/// Per-K selection result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KSelectionReport {
    pub candidates: Vec<KCandidate>,
    pub best_k: Option<usize>,
    pub best_auc_sum: Option<f64>,
}

impl KSelectionReport {
    fn from_candidates(candidates: Vec<KCandidate>) -> Self {
        let mut best: Option<(usize, f64)> = None;
        for candidate in &candidates {
            if let Some(sum) = candidate.auc_sum() {
                // Strict comparison: on ties the earlier (listed) K wins
                if best.map_or(true, |(_, best_sum)| sum > best_sum) {
                    best = Some((candidate.k, sum));
                }
            }
        }

        Self {
            candidates,
            best_k: best.map(|(k, _)| k),
            best_auc_sum: best.map(|(_, sum)| sum),
        }
    }

    /// (K, summed AUC) of evaluated candidates, best first
    pub fn ranking(&self) -> Vec<(usize, f64)> {
        let mut ranked: Vec<(usize, f64)> = self
            .candidates
            .iter()
            .filter_map(|c| c.auc_sum().map(|sum| (c.k, sum)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    pub fn failures(&self) -> Vec<(usize, &str)> {
        self.candidates
            .iter()
            .filter_map(|c| match &c.outcome {
                CandidateOutcome::Failed { reason } => Some((c.k, reason.as_str())),
                _ => None,
            })
            .collect()
    }
}

/// Failed cell of the transfer matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferFailure {
    pub train: String,
    pub test: String,
    pub reason: String,
}

/// Site × site AUC matrix; `scores[train][test]`, diagonal always `None`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferMatrix {
    pub sites: Vec<String>,
    pub scores: Vec<Vec<Option<f64>>>,
    pub failures: Vec<TransferFailure>,
}

impl TransferMatrix {
    pub fn get(&self, train: &str, test: &str) -> Option<f64> {
        let i = self.sites.iter().position(|s| s == train)?;
        let j = self.sites.iter().position(|s| s == test)?;
        self.scores[i][j]
    }

    /// Highest-scoring ordered pair (train, test, AUC)
    pub fn best_pair(&self) -> Option<(&str, &str, f64)> {
        let mut best: Option<(&str, &str, f64)> = None;
        for (i, row) in self.scores.iter().enumerate() {
            for (j, score) in row.iter().enumerate() {
                if let Some(auc) = *score {
                    if best.map_or(true, |(_, _, b)| auc > b) {
                        best = Some((self.sites[i].as_str(), self.sites[j].as_str(), auc));
                    }
                }
            }
        }
        best
    }

    /// One row per training site, one column per test site
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.sites.len() + 1);
        columns.push(Series::new("train_site".into(), self.sites.clone()).into());
        for (j, test) in self.sites.iter().enumerate() {
            let values: Vec<Option<f64>> = self.scores.iter().map(|row| row[j]).collect();
            columns.push(Series::new(test.as_str().into(), values).into());
        }
        DataFrame::new(columns)
    }
}

/// Runs configurations through a factorization provider and scores them
pub struct ModelSelector<P> {
    provider: P,
    parallel_layers: bool,
}

impl<P: FactorizationProvider> ModelSelector<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            parallel_layers: false,
        }
    }

    /// Score the layers of each configuration with Rayon
    pub fn with_parallel_layers(mut self, parallel_layers: bool) -> Self {
        self.parallel_layers = parallel_layers;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Factorize, reconstruct and score every layer of one configuration.
    pub fn evaluate_configuration(
        &self,
        job: &FactorizationJob,
        holdout: &HoldoutSet,
    ) -> Result<(LayerAucSummary, LookupStats)> {
        let factors = self.provider.factorize(job)?;
        let prediction = factors
            .reconstruct()
            .with_context(|| format!("{}: reconstruction failed", job.label))?;
        let sets = build_layer_score_sets(holdout, &prediction, &factors.nodes)
            .with_context(|| format!("{}: cannot join holdout to predictions", job.label))?;

        let summary = if self.parallel_layers {
            evaluate_layers_parallel(&sets.layers)
        } else {
            evaluate_layers(&sets.layers)
        };
        Ok((summary, sets.lookups))
    }

    fn evaluate_candidate(&self, job: &FactorizationJob, holdout: &HoldoutSet) -> KCandidate {
        let outcome = match self.evaluate_configuration(job, holdout) {
            Ok((summary, lookups)) => {
                tracing::info!(
                    "{}: summed AUC {:.6} over {}/{} layers",
                    job.label,
                    summary.auc_sum,
                    summary.scored_layers,
                    summary.layers.len()
                );
                CandidateOutcome::Evaluated { summary, lookups }
            }
            Err(e) => {
                tracing::warn!("{} failed: {:#}", job.label, e);
                CandidateOutcome::Failed {
                    reason: format!("{:#}", e),
                }
            }
        };

        KCandidate { k: job.k, outcome }
    }

    /// Evaluate each candidate job and pick the K with the largest summed AUC.
    pub fn select_k(&self, jobs: &[FactorizationJob], holdout: &HoldoutSet) -> KSelectionReport {
        let candidates = jobs
            .iter()
            .map(|job| self.evaluate_candidate(job, holdout))
            .collect();
        KSelectionReport::from_candidates(candidates)
    }

    /// Score one ordered site pair: test layer of the pair factorization
    /// against the pair's single-layer holdout.
    pub fn evaluate_transfer_pair(
        &self,
        transfer: &TransferConfig,
        train: &str,
        test: &str,
    ) -> Result<f64> {
        let job = transfer.pair_job(train, test);
        let holdout = HoldoutSet::load(&transfer.pair_holdout(train, test), Some(1))?;

        let factors = self.provider.factorize(&job)?;
        if factors.n_layers() != job.n_layers {
            anyhow::bail!(
                "{}: expected a {}-layer factorization, got {}",
                job.label,
                job.n_layers,
                factors.n_layers()
            );
        }
        let prediction = factors
            .reconstruct()
            .with_context(|| format!("{}: reconstruction failed", job.label))?;
        let (set, _lookups) =
            build_score_set(&holdout, 0, &prediction, TRANSFER_TEST_LAYER, &factors.nodes)?;

        let auc = set.auc().with_context(|| format!("{}: AUC undefined", job.label))?;
        tracing::info!("{}: AUC {:.6}", job.label, auc);
        Ok(auc)
    }

    /// AUC for every ordered (train, test) pair of distinct sites.
    pub fn transfer_matrix(&self, transfer: &TransferConfig) -> TransferMatrix {
        let cells: Vec<(usize, usize, Result<f64>)> = ordered_pairs(transfer.sites.len())
            .into_iter()
            .map(|(i, j)| {
                let result =
                    self.evaluate_transfer_pair(transfer, &transfer.sites[i], &transfer.sites[j]);
                (i, j, result)
            })
            .collect();
        assemble_matrix(&transfer.sites, cells)
    }
}

impl<P: FactorizationProvider + Sync> ModelSelector<P> {
    /// `select_k` with candidates evaluated concurrently.
    pub fn select_k_parallel(
        &self,
        jobs: &[FactorizationJob],
        holdout: &HoldoutSet,
    ) -> KSelectionReport {
        let candidates = jobs
            .par_iter()
            .map(|job| self.evaluate_candidate(job, holdout))
            .collect();
        KSelectionReport::from_candidates(candidates)
    }

    /// `transfer_matrix` with site pairs evaluated concurrently.
    pub fn transfer_matrix_parallel(&self, transfer: &TransferConfig) -> TransferMatrix {
        let cells: Vec<(usize, usize, Result<f64>)> = ordered_pairs(transfer.sites.len())
            .into_par_iter()
            .map(|(i, j)| {
                let result =
                    self.evaluate_transfer_pair(transfer, &transfer.sites[i], &transfer.sites[j]);
                (i, j, result)
            })
            .collect();
        assemble_matrix(&transfer.sites, cells)
    }
}

fn ordered_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| (0..n).filter(move |&j| j != i).map(move |j| (i, j)))
        .collect()
}

fn assemble_matrix(sites: &[String], cells: Vec<(usize, usize, Result<f64>)>) -> TransferMatrix {
    let n = sites.len();
    let mut scores = vec![vec![None; n]; n];
    let mut failures = Vec::new();

    for (i, j, result) in cells {
        match result {
            Ok(auc) => scores[i][j] = Some(auc),
            Err(e) => {
                tracing::warn!("Sites {} → {} failed: {:#}", sites[i], sites[j], e);
                failures.push(TransferFailure {
                    train: sites[i].clone(),
                    test: sites[j].clone(),
                    reason: format!("{:#}", e),
                });
            }
        }
    }

    TransferMatrix {
        sites: sites.to_vec(),
        scores,
        failures,
    }
}
