//! Error types for reconstruction and AUC scoring.
//!
//! Loading and provider code works in `anyhow::Result`; the numeric core
//! returns `ScoringError` so callers can match on the failure kind and keep
//! going with the next layer or configuration.

use thiserror::Error;

/// Failures of the numeric core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// Factor matrix/tensor dimensions disagree.
    #[error("Shape mismatch in {what}: expected {expected}, actual {actual}")]
    ShapeMismatch {
        /// Which dimension was checked (e.g. "V columns (K)")
        what: String,
        expected: usize,
        actual: usize,
    },

    /// Every actual weight in the set is identical, so the normaliser Z is 0.
    #[error("Degenerate input: {n_pairs} pairs share a single actual weight class (AUC undefined)")]
    DegenerateInput {
        n_pairs: usize,
        /// The shared weight, `None` for an empty set
        weight: Option<u32>,
    },

    /// A predicted score is NaN and cannot be ranked.
    #[error("Predicted score at position {position} is NaN")]
    NonFiniteScore { position: usize },

    /// A requested layer does not exist.
    #[error("Layer {layer} out of range (tensor has {n_layers} layers)")]
    LayerOutOfRange { layer: usize, n_layers: usize },
}

impl ScoringError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }

    /// True for the Z = 0 case.
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::DegenerateInput { .. })
    }
}

pub type ScoringResult<T> = std::result::Result<T, ScoringError>;
