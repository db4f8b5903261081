//! Select the number of communities K for the all-sites network
//!
//! Usage: select_k [config.json]
//!
//! Without an argument the config is read from `$DATA_DIR/pipeline_config.json`
//! (DATA_DIR defaults to `data`). Every candidate K is factorized (or its
//! precomputed factors read), all 14 site layers are scored against the
//! holdout, and the K with the largest summed AUC is reported. The full
//! report is written to `k_selection_report.json` in the factor directory.

use anyhow::{Context, Result};
use multilayer_auc_rust::selection::{CandidateOutcome, LayerOutcome};
use multilayer_auc_rust::{
    init_logging, FactorizationJob, FactorizationProvider, HoldoutSet, KSelectionReport,
    ModelSelector, PipelineConfig, PrecomputedFactors,
};
use std::fs::File;
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
    config: &PipelineConfig,
    jobs: &[FactorizationJob],
    holdout: &HoldoutSet,
) -> KSelectionReport {
    let selector = ModelSelector::new(provider);
    if config.parallel {
        selector.select_k_parallel(jobs, holdout)
    } else {
        selector.select_k(jobs, holdout)
    }
}

fn main() -> Result<()> {
    init_logging();

    let path = config_path();
    tracing::info!("Loading config from {:?}", path);
    let config = PipelineConfig::load(&path)?;
    if config.candidate_ks.is_empty() {
        anyhow::bail!("No candidate_ks in {:?}", path);
    }

    let holdout = HoldoutSet::load(&config.holdout_file, Some(config.n_layers))?;
    let jobs: Vec<FactorizationJob> = config.candidate_ks.iter().map(|&k| config.k_job(k)).collect();

    println!("\n{}", "=".repeat(70));
    println!("K SELECTION: {} candidates, {} layers", jobs.len(), config.n_layers);
    println!("{}", "=".repeat(70));
    println!("Holdout edges: {}", holdout.len());
    println!("Mode: {}", if config.parallel { "parallel" } else { "sequential" });

    let start = Instant::now();
    let report = match config.multitensor_command() {
        Some(tool) => run(tool, &config, &jobs, &holdout),
        None => run(PrecomputedFactors, &config, &jobs, &holdout),
    };
    let elapsed = start.elapsed();

    println!("\n{}", "-".repeat(70));
    println!("{:>4}  {:>12}  {:>8}  {}", "K", "AUC sum", "layers", "skipped");
    println!("{}", "-".repeat(70));
    for candidate in &report.candidates {
        match &candidate.outcome {
            CandidateOutcome::Evaluated { summary, .. } => {
                let skipped: Vec<String> = summary
                    .layers
                    .iter()
                    .filter(|l| matches!(l.outcome, LayerOutcome::Skipped { .. }))
                    .map(|l| (l.layer + 1).to_string())
                    .collect();
                println!(
                    "{:>4}  {:>12.6}  {:>8}  {}",
                    candidate.k,
                    summary.auc_sum,
                    format!("{}/{}", summary.scored_layers, summary.layers.len()),
                    skipped.join(",")
                );
            }
            CandidateOutcome::Failed { reason } => {
                println!("{:>4}  {:>12}  {:>8}  {}", candidate.k, "FAILED", "-", reason);
            }
        }
    }

    println!("\n{}", "=".repeat(70));
    match (report.best_k, report.best_auc_sum) {
        (Some(k), Some(sum)) => println!("Best K = {} (summed AUC {:.6})", k, sum),
        _ => println!("No candidate K could be scored"),
    }
    println!("Elapsed: {:.2?}", elapsed);
    println!("{}", "=".repeat(70));

    let report_path = config.factor_dir.join("k_selection_report.json");
    let file = File::create(&report_path)
        .with_context(|| format!("Failed to create report: {:?}", report_path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &report)
        .with_context(|| "Failed to write K selection report")?;
    println!("Report written to {:?}", report_path);

    Ok(())
}
