//! Multilayer AUC Rust Implementation
//!
//! Link-prediction evaluation for multilayer plant–pollinator networks
//! (one layer per field site) factorized with MultiTensor.
//!
//! - `tensor`: reconstruction of expected weights P = U·W·Vᵗ per layer
//! - `metrics/`: weighted directed AUC and the binary AUC
//! - `data`: holdout edge tables (Polars) and node lists
//! - `score_sets`: joining holdout edges to predictions
//! - `provider`: factor files and the MultiTensor subprocess
//! - `selection`: per-K selection and the site × site transfer matrix
//! - `config`: JSON run configuration

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod score_sets;
pub mod selection;
pub mod tensor;
pub mod utils;

// Re-export commonly used types
pub use config::{PipelineConfig, TransferConfig};
pub use data::{HoldoutRecord, HoldoutSet, NodeIndex, NodeSlot};
pub use error::{ScoringError, ScoringResult};
pub use metrics::*;
pub use provider::{
    read_factor_files, FactorSet, FactorizationJob, FactorizationProvider, MultiTensorCommand,
    PrecomputedFactors,
};
pub use score_sets::{build_layer_score_sets, build_score_set, LookupStats, ScoreSets};
pub use selection::{
    evaluate_layers, evaluate_layers_parallel, KSelectionReport, LayerAucSummary, ModelSelector,
    TransferMatrix,
};
pub use tensor::{reconstruct, PredictionTensor};

/// Install the fmt subscriber used by the binaries; `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "multilayer_auc_rust=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
