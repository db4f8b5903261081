//! Pipeline configuration
//!
//! All paths and run parameters live in one JSON file passed to the binaries;
//! nothing is read from module-level state.
//!
//! ```json
//! {
//!   "factor_dir": "data/all_layer_adjacency",
//!   "holdout_file": "data/all_layer_adjacency/AllSites_holdout.dat",
//!   "adjacency_file": "data/all_layer_adjacency/AllSites_adjacency.dat",
//!   "candidate_ks": [2, 3, 4, 5],
//!   "transfer": {
//!     "sites": ["1", "2", "3"],
//!     "k": 2,
//!     "adjacency_dir": "data/two_layer_adjacency",
//!     "holdout_dir": "data/two_layer_holdout",
//!     "output_dir": "data/two_layer_output"
//!   }
//! }
//! ```

use crate::provider::{FactorizationJob, MultiTensorCommand};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of field sites (one layer each) in the full network
pub const DEFAULT_LAYERS: usize = 14;

fn default_layers() -> usize {
    DEFAULT_LAYERS
}

/// Settings for the K-selection and transfer runs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Directory holding `u_K*.dat`, `v_K*.dat`, `w_K*.dat` of the all-sites runs
    pub factor_dir: PathBuf,

    /// All-sites holdout edges
    pub holdout_file: PathBuf,

    /// All-sites adjacency given to the factorization tool
    #[serde(default)]
    pub adjacency_file: Option<PathBuf>,

    #[serde(default = "default_layers")]
    pub n_layers: usize,

    /// Community counts to compare
    #[serde(default)]
    pub candidate_ks: Vec<usize>,

    /// Score layers/configurations with Rayon
    #[serde(default)]
    pub parallel: bool,

    /// Run the tool instead of reading precomputed factors
    #[serde(default)]
    pub multitensor: Option<MultiTensorConfig>,

    #[serde(default)]
    pub transfer: Option<TransferConfig>,
}

/// How to invoke MultiTensor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MultiTensorConfig {
    pub program: PathBuf,
    #[serde(default)]
    pub script: Option<PathBuf>,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

/// Pairwise train → test site evaluation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    /// Site identifiers as they appear in file names (`Sites_{train}_{test}_...`)
    pub sites: Vec<String>,
    pub k: usize,
    pub adjacency_dir: PathBuf,
    pub holdout_dir: PathBuf,
    /// Parent of the per-pair factor directories (`Sites_{train}_{test}/`)
    pub output_dir: PathBuf,
}

impl PipelineConfig {
    /// Load configuration from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: PipelineConfig = serde_json::from_str(&contents)
            .with_context(|| "Failed to parse pipeline config JSON")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.n_layers == 0 {
            anyhow::bail!("n_layers must be at least 1");
        }
        if let Some(k) = self.candidate_ks.iter().find(|&&k| k == 0) {
            anyhow::bail!("Candidate K must be positive, got {}", k);
        }
        if let Some(transfer) = &self.transfer {
            if transfer.sites.len() < 2 {
                anyhow::bail!("Transfer evaluation needs at least 2 sites");
            }
            if transfer.k == 0 {
                anyhow::bail!("Transfer K must be positive");
            }
        }
        Ok(())
    }

    /// Factorization job for candidate `k` on the all-sites network
    pub fn k_job(&self, k: usize) -> FactorizationJob {
        FactorizationJob {
            label: format!("K={}", k),
            adjacency: self
                .adjacency_file
                .clone()
                .unwrap_or_else(|| self.factor_dir.join("AllSites_adjacency.dat")),
            output_dir: self.factor_dir.clone(),
            k,
            n_layers: self.n_layers,
        }
    }

    pub fn multitensor_command(&self) -> Option<MultiTensorCommand> {
        self.multitensor.as_ref().map(|mt| {
            let mut command = MultiTensorCommand::new(mt.program.clone())
                .with_extra_args(mt.extra_args.clone());
            if let Some(script) = &mt.script {
                command = command.with_script(script.clone());
            }
            command
        })
    }
}

impl TransferConfig {
    /// Two-layer job (train layer 0, test layer 1) for an ordered site pair
    pub fn pair_job(&self, train: &str, test: &str) -> FactorizationJob {
        let stem = format!("Sites_{}_{}", train, test);
        FactorizationJob {
            label: format!("Sites {} → {}", train, test),
            adjacency: self.adjacency_dir.join(format!("{}_adjacency.dat", stem)),
            output_dir: self.output_dir.join(&stem),
            k: self.k,
            n_layers: 2,
        }
    }

    pub fn pair_holdout(&self, train: &str, test: &str) -> PathBuf {
        self.holdout_dir
            .join(format!("Sites_{}_{}_holdout.dat", train, test))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{
            "factor_dir": "data/all_layer_adjacency",
            "holdout_file": "data/all_layer_adjacency/AllSites_holdout.dat",
            "candidate_ks": [2, 3]
        }"#;

        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.n_layers, 14);
        assert!(!config.parallel);
        assert!(config.multitensor_command().is_none());

        let job = config.k_job(3);
        assert_eq!(job.label, "K=3");
        assert_eq!(
            job.adjacency,
            PathBuf::from("data/all_layer_adjacency/AllSites_adjacency.dat")
        );
        assert_eq!(job.n_layers, 14);
    }

    #[test]
    fn test_transfer_paths() {
        let transfer = TransferConfig {
            sites: vec!["1".into(), "2".into()],
            k: 2,
            adjacency_dir: PathBuf::from("adj"),
            holdout_dir: PathBuf::from("hold"),
            output_dir: PathBuf::from("out"),
        };

        let job = transfer.pair_job("1", "2");
        assert_eq!(job.adjacency, PathBuf::from("adj/Sites_1_2_adjacency.dat"));
        assert_eq!(job.output_dir, PathBuf::from("out/Sites_1_2"));
        assert_eq!(job.n_layers, 2);
        assert_eq!(
            transfer.pair_holdout("1", "2"),
            PathBuf::from("hold/Sites_1_2_holdout.dat")
        );
    }

    #[test]
    fn test_validation_rejects_zero_k() {
        let json = r#"{
            "factor_dir": "f",
            "holdout_file": "h",
            "candidate_ks": [2, 0]
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_multitensor_section() {
        let json = r#"{
            "factor_dir": "f",
            "holdout_file": "h",
            "multitensor": { "program": "python", "script": "main.py" }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        let command = config.multitensor_command().unwrap();
        assert_eq!(command.script, Some(PathBuf::from("main.py")));
        assert!(command.extra_args.is_empty());
    }
}
