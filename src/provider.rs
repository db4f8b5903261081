//! Factorization providers
//!
//! The community-detection factorization (MultiTensor) runs out of process.
//! The scoring core only needs its results: the ordered node list and the
//! factors U (N×K), V (N×K) and W (K×K×L). `FactorizationProvider` is that
//! boundary; reconstruction and scoring never touch the tool directly.
//!
//! Output files read from a MultiTensor output directory:
//! - `u_K{k}.dat`, `v_K{k}.dat`: comment line, then `node x_1 ... x_K` per node
//! - `w_K{k}.dat`: comment line, then per layer a `layer <l>` line (0-based)
//!   followed by K rows of K affinities

use crate::data::NodeIndex;
use crate::error::ScoringResult;
use crate::tensor::{reconstruct, PredictionTensor};
use anyhow::{Context, Result};
use ndarray::{Array2, Array3};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Factors of one fitted configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FactorSet {
    /// Row order of U and V
    pub nodes: NodeIndex,
    /// Outgoing memberships (N×K)
    pub u: Array2<f64>,
    /// Incoming memberships (N×K)
    pub v: Array2<f64>,
    /// Community affinities per layer (K×K×L)
    pub w: Array3<f64>,
}

impl FactorSet {
    pub fn k(&self) -> usize {
        self.u.ncols()
    }

    pub fn n_layers(&self) -> usize {
        self.w.dim().2
    }

    /// P[:, :, l] = U · W[:, :, l] · Vᵗ
    pub fn reconstruct(&self) -> ScoringResult<PredictionTensor> {
        reconstruct(&self.u, &self.w, &self.v)
    }
}

/// One factorization request
#[derive(Debug, Clone, PartialEq)]
pub struct FactorizationJob {
    /// Human-readable name used in logs ("K=4", "Sites 3 → 7")
    pub label: String,
    /// Adjacency file given to the tool
    pub adjacency: PathBuf,
    /// Directory holding (or receiving) the factor files
    pub output_dir: PathBuf,
    /// Number of communities
    pub k: usize,
    pub n_layers: usize,
}

/// Source of fitted factors for a configuration
pub trait FactorizationProvider {
    fn factorize(&self, job: &FactorizationJob) -> Result<FactorSet>;
}

/// Token in `extra_args` replaced by the job's output directory
pub const OUTPUT_DIR_PLACEHOLDER: &str = "{output_dir}";

/// Reads factor files that an earlier MultiTensor run already wrote.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedFactors;

impl FactorizationProvider for PrecomputedFactors {
    fn factorize(&self, job: &FactorizationJob) -> Result<FactorSet> {
        read_factor_files(&job.output_dir, job.k, job.n_layers)
            .with_context(|| format!("{}: failed to read precomputed factors", job.label))
    }
}

/// Runs the MultiTensor tool as a subprocess, then reads its output files.
///
/// Invocation: `<program> [script] -a=<adjacency file> -f=<adjacency dir>
/// -l=<layers> -k=<K> [extra args]`. The tool must be configured (through
/// `extra_args`) to write into the job's `output_dir`; `{output_dir}` inside
/// an extra argument is replaced with that directory.
#[derive(Debug, Clone)]
pub struct MultiTensorCommand {
    pub program: PathBuf,
    pub script: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl MultiTensorCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            script: None,
            extra_args: Vec::new(),
        }
    }

    pub fn with_script(mut self, script: impl Into<PathBuf>) -> Self {
        self.script = Some(script.into());
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    fn arguments(&self, job: &FactorizationJob) -> Result<Vec<String>> {
        let file_name = job
            .adjacency
            .file_name()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Adjacency path has no file name: {:?}", job.adjacency))?;
        let folder = job
            .adjacency
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut args = Vec::new();
        if let Some(script) = &self.script {
            args.push(script.to_string_lossy().into_owned());
        }
        args.push(format!("-a={}", file_name));
        args.push(format!("-f={}", folder));
        args.push(format!("-l={}", job.n_layers));
        args.push(format!("-k={}", job.k));
        let output_dir = job.output_dir.to_string_lossy();
        args.extend(
            self.extra_args
                .iter()
                .map(|arg| arg.replace(OUTPUT_DIR_PLACEHOLDER, &output_dir)),
        );
        Ok(args)
    }
}

impl FactorizationProvider for MultiTensorCommand {
    fn factorize(&self, job: &FactorizationJob) -> Result<FactorSet> {
        let args = self.arguments(job)?;
        tracing::info!("{}: running {:?} {}", job.label, self.program, args.join(" "));

        fs::create_dir_all(&job.output_dir)
            .with_context(|| format!("Failed to create output dir: {:?}", job.output_dir))?;

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .with_context(|| format!("Failed to execute factorization tool: {:?}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("{}: factorization stderr: {}", job.label, stderr);
            anyhow::bail!(
                "{}: factorization tool failed with status {}: {}",
                job.label,
                output.status,
                stderr.lines().last().unwrap_or("")
            );
        }

        read_factor_files(&job.output_dir, job.k, job.n_layers)
            .with_context(|| format!("{}: failed to read factorization output", job.label))
    }
}

/// Read `u_K{k}.dat`, `v_K{k}.dat` and `w_K{k}.dat` from `dir`.
///
/// The node order is taken from V; U must list the same nodes in the same
/// order.
pub fn read_factor_files(dir: &Path, k: usize, n_layers: usize) -> Result<FactorSet> {
    let (u_names, u) = read_membership(&dir.join(format!("u_K{}.dat", k)), k)?;
    let (v_names, v) = read_membership(&dir.join(format!("v_K{}.dat", k)), k)?;

    if u_names != v_names {
        let first_diff = u_names
            .iter()
            .zip(&v_names)
            .position(|(a, b)| a != b)
            .unwrap_or(u_names.len().min(v_names.len()));
        anyhow::bail!(
            "u_K{k} and v_K{k} node lists differ ({} vs {} nodes, first difference at row {})",
            u_names.len(),
            v_names.len(),
            first_diff
        );
    }

    let w = read_affinity(&dir.join(format!("w_K{}.dat", k)), k, n_layers)?;

    tracing::debug!(
        "Read factors from {:?}: N={}, K={}, L={}",
        dir,
        v_names.len(),
        k,
        n_layers
    );

    Ok(FactorSet {
        nodes: NodeIndex::from_names(v_names),
        u,
        v,
        w,
    })
}

/// Parse a membership file into (node names, N×K matrix).
fn read_membership(path: &Path, k: usize) -> Result<(Vec<String>, Array2<f64>)> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read membership file: {:?}", path))?;

    let mut names = Vec::new();
    let mut values = Vec::new();
    // First line is the tool's comment header
    for (line_no, line) in contents.lines().enumerate().skip(1) {
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else {
            continue;
        };

        let row = fields
            .map(|f| f.parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .with_context(|| format!("{:?} line {}: non-numeric membership", path, line_no + 1))?;
        if row.len() != k {
            anyhow::bail!(
                "{:?} line {}: expected {} memberships, found {}",
                path,
                line_no + 1,
                k,
                row.len()
            );
        }

        names.push(name.to_string());
        values.extend(row);
    }

    let matrix = Array2::from_shape_vec((names.len(), k), values)
        .with_context(|| format!("{:?}: inconsistent membership matrix", path))?;
    Ok((names, matrix))
}

/// Parse an affinity file into a K×K×L tensor. Layers absent from the file
/// stay zero.
fn read_affinity(path: &Path, k: usize, n_layers: usize) -> Result<Array3<f64>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read affinity file: {:?}", path))?;

    let mut w = Array3::<f64>::zeros((k, k, n_layers));
    let mut lines = contents
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, l)| !l.trim().is_empty());

    while let Some((line_no, line)) = lines.next() {
        if !line.contains("layer") {
            anyhow::bail!("{:?} line {}: expected a layer header", path, line_no + 1);
        }
        let layer = first_integer(line)
            .with_context(|| format!("{:?} line {}: layer header without index", path, line_no + 1))?;
        if layer >= n_layers {
            anyhow::bail!(
                "{:?} line {}: layer {} out of range for {} layers",
                path,
                line_no + 1,
                layer,
                n_layers
            );
        }

        for row in 0..k {
            let (row_no, row_line) = lines
                .next()
                .with_context(|| format!("{:?}: layer {} has fewer than {} rows", path, layer, k))?;
            let values = row_line
                .split_whitespace()
                .map(|f| f.parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("{:?} line {}: non-numeric affinity", path, row_no + 1))?;
            if values.len() != k {
                anyhow::bail!(
                    "{:?} line {}: expected {} affinities, found {}",
                    path,
                    row_no + 1,
                    k,
                    values.len()
                );
            }
            for (col, value) in values.into_iter().enumerate() {
                w[[row, col, layer]] = value;
            }
        }
    }

    Ok(w)
}

fn first_integer(line: &str) -> Option<usize> {
    line.split(|c: char| !c.is_ascii_digit())
        .find(|s| !s.is_empty())
        .and_then(|s| s.parse().ok())
}
