//! Data Loading and Management
//!
//! Handles the holdout edge tables (loaded with Polars) and the ordered node
//! list that maps node names to factor-matrix rows.
//!
//! Holdout files are whitespace-separated without a header:
//!
//! ```text
//! E <pollinator> <plant> <w_layer1> ... <w_layerL>
//! ```
//!
//! The all-sites holdout carries 14 weight columns; a pairwise holdout carries
//! only the test-site column.

use crate::utils::lookup_or_default;
use anyhow::{Context, Result};
use polars::prelude::*;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::path::Path;

/// Leading columns before the per-layer weights: edge tag, pollinator, plant
const KEY_COLUMNS: usize = 3;

/// One held-out pollinator → plant edge with its observed weight per layer
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutRecord {
    pub pollinator: String,
    pub plant: String,
    /// Observed interaction counts, one per layer (14 sites fit inline)
    pub weights: SmallVec<[u32; 16]>,
}

impl HoldoutRecord {
    pub fn new(pollinator: impl Into<String>, plant: impl Into<String>, weights: &[u32]) -> Self {
        Self {
            pollinator: pollinator.into(),
            plant: plant.into(),
            weights: SmallVec::from_slice(weights),
        }
    }
}

/// All held-out edges of one evaluation run
#[derive(Debug, Clone, PartialEq)]
pub struct HoldoutSet {
    records: Vec<HoldoutRecord>,
    n_layers: usize,
}

impl HoldoutSet {
    /// Build from in-memory records; every record must carry `n_layers` weights.
    pub fn from_records(records: Vec<HoldoutRecord>, n_layers: usize) -> Result<Self> {
        if let Some((idx, bad)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.weights.len() != n_layers)
        {
            anyhow::bail!(
                "Holdout record {} ({} → {}) has {} layer weights, expected {}",
                idx,
                bad.pollinator,
                bad.plant,
                bad.weights.len(),
                n_layers
            );
        }

        Ok(Self { records, n_layers })
    }

    /// Load a holdout `.dat` file.
    ///
    /// The layer count is inferred from the column count; when
    /// `expected_layers` is given it must match.
    pub fn load(path: &Path, expected_layers: Option<usize>) -> Result<Self> {
        let df = LazyCsvReader::new(path)
            .with_has_header(false)
            .with_separator(b' ')
            .finish()
            .with_context(|| format!("Failed to scan holdout file: {:?}", path))?
            .collect()
            .with_context(|| format!("Failed to load holdout file: {:?}", path))?;

        let columns = df.get_columns();
        if columns.len() <= KEY_COLUMNS {
            anyhow::bail!(
                "Holdout file {:?} has {} columns; need edge tag, pollinator, plant and at least one layer",
                path,
                columns.len()
            );
        }
        let n_layers = columns.len() - KEY_COLUMNS;
        if let Some(expected) = expected_layers {
            if expected != n_layers {
                anyhow::bail!(
                    "Holdout file {:?} has {} layers, expected {}",
                    path,
                    n_layers,
                    expected
                );
            }
        }

        let pollinators = columns[1]
            .cast(&DataType::String)
            .with_context(|| "Pollinator column is not castable to string")?;
        let pollinators = pollinators.str()?;
        let plants = columns[2]
            .cast(&DataType::String)
            .with_context(|| "Plant column is not castable to string")?;
        let plants = plants.str()?;

        let weight_columns = columns[KEY_COLUMNS..]
            .iter()
            .map(|c| c.cast(&DataType::Float64))
            .collect::<PolarsResult<Vec<_>>>()
            .with_context(|| format!("Non-numeric layer weights in {:?}", path))?;
        let weight_columns = weight_columns
            .iter()
            .map(|c| c.f64())
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut records = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let (Some(pollinator), Some(plant)) = (pollinators.get(idx), plants.get(idx)) else {
                anyhow::bail!("Holdout row {} in {:?} is missing a node name", idx, path);
            };

            let mut weights = SmallVec::with_capacity(n_layers);
            for (layer, column) in weight_columns.iter().enumerate() {
                let raw = column.get(idx).with_context(|| {
                    format!("Holdout row {} layer {} in {:?} has no weight", idx, layer, path)
                })?;
                weights.push(parse_weight(raw).with_context(|| {
                    format!("Holdout row {} layer {} in {:?}", idx, layer, path)
                })?);
            }

            records.push(HoldoutRecord {
                pollinator: pollinator.to_string(),
                plant: plant.to_string(),
                weights,
            });
        }

        tracing::info!(
            "Loaded {} holdout edges across {} layers from {:?}",
            records.len(),
            n_layers,
            path
        );

        Ok(Self { records, n_layers })
    }

    pub fn records(&self) -> &[HoldoutRecord] {
        &self.records
    }

    pub fn n_layers(&self) -> usize {
        self.n_layers
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Round a parsed weight to the nearest integer count.
fn parse_weight(raw: f64) -> Result<u32> {
    if !raw.is_finite() || raw < 0.0 {
        anyhow::bail!("Invalid edge weight {}: must be a finite non-negative count", raw);
    }
    let rounded = raw.round();
    if rounded > u32::MAX as f64 {
        anyhow::bail!("Edge weight {} exceeds u32 range", raw);
    }
    Ok(rounded as u32)
}

/// Result of resolving a node name against the trained node list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSlot {
    /// Row index in U and V
    Trained(usize),
    /// Name absent from the factorization input
    Untrained,
}

/// Ordered node names of a factorization; position = factor-matrix row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeIndex {
    names: Vec<String>,
    slots: FxHashMap<String, NodeSlot>,
}

impl NodeIndex {
    /// Build from the ordered names. A repeated name resolves to its first row.
    pub fn from_names(names: Vec<String>) -> Self {
        let mut slots = FxHashMap::default();
        for (row, name) in names.iter().enumerate() {
            slots.entry(name.clone()).or_insert(NodeSlot::Trained(row));
        }
        Self { names, slots }
    }

    pub fn lookup(&self, name: &str) -> NodeSlot {
        lookup_or_default(&self.slots, name, NodeSlot::Untrained)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_fixture(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("multilayer_auc_rust_data_tests");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_holdout_three_layers() {
        let path = write_fixture(
            "three_layers.dat",
            "E Apis_mellifera Echium_plantagineum 3 0 1\n\
             E Bom_terrestris Lotus_sessilifolius 0 0 2\n",
        );

        let holdout = HoldoutSet::load(&path, Some(3)).unwrap();

        assert_eq!(holdout.len(), 2);
        assert_eq!(holdout.n_layers(), 3);
        assert_eq!(
            holdout.records()[0],
            HoldoutRecord::new("Apis_mellifera", "Echium_plantagineum", &[3, 0, 1])
        );
        assert_eq!(holdout.records()[1].weights.as_slice(), &[0, 0, 2]);
    }

    #[test]
    fn test_load_holdout_rounds_real_weights() {
        let path = write_fixture(
            "real_weights.dat",
            "E Apis Echium 2.0\nE Bombus Lotus 0.6\n",
        );

        let holdout = HoldoutSet::load(&path, None).unwrap();
        assert_eq!(holdout.n_layers(), 1);
        assert_eq!(holdout.records()[0].weights[0], 2);
        assert_eq!(holdout.records()[1].weights[0], 1);
    }

    #[test]
    fn test_load_holdout_layer_mismatch() {
        let path = write_fixture("two_layers.dat", "E Apis Echium 1 0\n");
        let err = HoldoutSet::load(&path, Some(14)).unwrap_err();
        assert!(err.to_string().contains("expected 14"));
    }

    #[test]
    fn test_parse_weight_rejects_negative() {
        assert!(parse_weight(-1.0).is_err());
        assert!(parse_weight(f64::NAN).is_err());
        assert_eq!(parse_weight(4.4).unwrap(), 4);
    }

    #[test]
    fn test_from_records_validates_layers() {
        let records = vec![
            HoldoutRecord::new("a", "b", &[1, 0]),
            HoldoutRecord::new("c", "d", &[1]),
        ];
        let err = HoldoutSet::from_records(records, 2).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn test_node_index_lookup() {
        let nodes = NodeIndex::from_names(vec![
            "Apis".to_string(),
            "Echium".to_string(),
            "Apis".to_string(),
        ]);

        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes.lookup("Apis"), NodeSlot::Trained(0));
        assert_eq!(nodes.lookup("Echium"), NodeSlot::Trained(1));
        assert_eq!(nodes.lookup("Lotus"), NodeSlot::Untrained);
    }
}
