//! Pairwise site transfer: train on one site, predict another
//!
//! Usage: transfer_matrix [config.json]
//!
//! Reads the `transfer` section of the pipeline config (default location
//! `$DATA_DIR/pipeline_config.json`). For every ordered pair of distinct
//! sites, the test layer of the two-layer factorization is scored against the
//! pair's holdout. Writes `transfer_matrix.csv` (rows = training site,
//! columns = test site, empty diagonal) and `transfer_matrix.json`.

use anyhow::{Context, Result};
use multilayer_auc_rust::{
    init_logging, FactorizationProvider, ModelSelector, PipelineConfig, PrecomputedFactors,
    TransferConfig, TransferMatrix,
};
use polars::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

fn config_path() -> PathBuf {
    std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| {
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
        PathBuf::from(data_dir).join("pipeline_config.json")
    })
}

fn run<P: FactorizationProvider + Sync>(
    provider: P,
    transfer: &TransferConfig,
    parallel: bool,
) -> TransferMatrix {
    let selector = ModelSelector::new(provider);
    if parallel {
        selector.transfer_matrix_parallel(transfer)
    } else {
        selector.transfer_matrix(transfer)
    }
}

fn main() -> Result<()> {
    init_logging();

    let path = config_path();
    tracing::info!("Loading config from {:?}", path);
    let config = PipelineConfig::load(&path)?;
    let transfer = config
        .transfer
        .as_ref()
        .with_context(|| format!("No transfer section in {:?}", path))?;

    let n_sites = transfer.sites.len();
    println!("\n{}", "=".repeat(70));
    println!(
        "SITE TRANSFER: {} sites, {} ordered pairs, K = {}",
        n_sites,
        n_sites * (n_sites - 1),
        transfer.k
    );
    println!("{}", "=".repeat(70));

    let start = Instant::now();
    let matrix = match config.multitensor_command() {
        Some(tool) => run(tool, transfer, config.parallel),
        None => run(PrecomputedFactors, transfer, config.parallel),
    };
    let elapsed = start.elapsed();

    let mut df = matrix.to_dataframe()?;
    println!("\n{}", df);

    if !matrix.failures.is_empty() {
        println!("\n{} pairs failed:", matrix.failures.len());
        for failure in &matrix.failures {
            println!("  {} → {}: {}", failure.train, failure.test, failure.reason);
        }
    }

    println!("\n{}", "=".repeat(70));
    match matrix.best_pair() {
        Some((train, test, auc)) => {
            println!("Best pair: train {} → test {} (AUC {:.6})", train, test, auc)
        }
        None => println!("No site pair could be scored"),
    }
    println!("Elapsed: {:.2?}", elapsed);
    println!("{}", "=".repeat(70));

    fs::create_dir_all(&transfer.output_dir)
        .with_context(|| format!("Failed to create output dir: {:?}", transfer.output_dir))?;

    let csv_path = transfer.output_dir.join("transfer_matrix.csv");
    let mut file = File::create(&csv_path)
        .with_context(|| format!("Failed to create {:?}", csv_path))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| "Failed to write transfer matrix CSV")?;

    let json_path = transfer.output_dir.join("transfer_matrix.json");
    let file = File::create(&json_path)
        .with_context(|| format!("Failed to create {:?}", json_path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &matrix)
        .with_context(|| "Failed to write transfer matrix JSON")?;

    println!("Matrix written to {:?} and {:?}", csv_path, json_path);
    Ok(())
}
