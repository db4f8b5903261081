//! Tensor Reconstruction
//!
//! Rebuilds the expected edge-weight tensor from MultiTensor factors:
//!
//!   P[:, :, l] = U · W[:, :, l] · Vᵗ   for every layer l
//!
//! U and V are N×K (row i = node i of the ordered node list), W is K×K×L.
//! The number of layers is a parameter: 14 for the all-sites network, 2 for a
//! train/test site pair.

use crate::error::{ScoringError, ScoringResult};
use ndarray::{Array2, Array3, ArrayView2, Axis};

/// Dense N×N×L tensor of expected interaction strengths.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTensor {
    values: Array3<f64>,
}

impl PredictionTensor {
    /// Number of nodes N.
    pub fn n_nodes(&self) -> usize {
        self.values.dim().0
    }

    /// Number of layers L.
    pub fn n_layers(&self) -> usize {
        self.values.dim().2
    }

    /// Expected weight of edge (source → target) in `layer`.
    pub fn get(&self, source: usize, target: usize, layer: usize) -> Option<f64> {
        self.values.get((source, target, layer)).copied()
    }

    /// N×N slice for one layer.
    pub fn layer(&self, layer: usize) -> ScoringResult<ArrayView2<'_, f64>> {
        if layer >= self.n_layers() {
            return Err(ScoringError::LayerOutOfRange {
                layer,
                n_layers: self.n_layers(),
            });
        }
        Ok(self.values.index_axis(Axis(2), layer))
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.values
    }
}

/// Reconstruct P from U (N×K), W (K×K×L) and V (N×K).
///
/// # Errors
/// `ShapeMismatch` when K differs between U, V and either leading axis of W,
/// or when U and V disagree on N.
pub fn reconstruct(
    u: &Array2<f64>,
    w: &Array3<f64>,
    v: &Array2<f64>,
) -> ScoringResult<PredictionTensor> {
    let (n_nodes, k) = u.dim();
    let (w_rows, w_cols, n_layers) = w.dim();

    if w_rows != k {
        return Err(ScoringError::shape_mismatch("W dim 0 (K)", k, w_rows));
    }
    if w_cols != k {
        return Err(ScoringError::shape_mismatch("W dim 1 (K)", k, w_cols));
    }
    if v.ncols() != k {
        return Err(ScoringError::shape_mismatch("V columns (K)", k, v.ncols()));
    }
    if v.nrows() != n_nodes {
        return Err(ScoringError::shape_mismatch("V rows (N)", n_nodes, v.nrows()));
    }

    let v_t = v.t();
    let mut values = Array3::<f64>::zeros((n_nodes, n_nodes, n_layers));

    for layer in 0..n_layers {
        let w_layer = w.index_axis(Axis(2), layer);
        let product = u.dot(&w_layer).dot(&v_t);
        values.index_axis_mut(Axis(2), layer).assign(&product);
    }

    Ok(PredictionTensor { values })
}
