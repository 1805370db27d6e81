use std::fs;
use std::path::Path;
use std::process::Command;

use log::info;

use crate::config::Config;
use crate::error::{GenError, Result};

/// Invoke the external retraining program over the shape corpus, then
/// rewrite its label vocabulary for the downstream consumer.
pub fn run_training(cfg: &Config) -> Result<()> {
    if let Some(parent) = cfg.graph_output.parent() {
        fs::create_dir_all(parent)?;
    }

    info!(
        "running {} for {} steps",
        cfg.retrain_program.display(),
        cfg.training_steps
    );
    let status = Command::new(&cfg.retrain_program)
        .arg("--output_graph")
        .arg(&cfg.graph_output)
        .arg("--output_labels")
        .arg(&cfg.labels_output)
        .arg("--bottleneck_dir")
        .arg(&cfg.bottleneck_dir)
        .arg("--image_dir")
        .arg(&cfg.shapes_dir)
        .arg("--how_many_training_steps")
        .arg(cfg.training_steps.to_string())
        .status()?;
    if !status.success() {
        return Err(GenError::TrainerFailed(status));
    }

    rewrite_labels(&cfg.labels_output)
}

/// Uppercase every label and replace spaces with underscores, in place.
fn rewrite_labels(path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path)?;
    let rewritten: String = raw
        .lines()
        .map(|line| format!("{}\n", line.replace(' ', "_").to_uppercase()))
        .collect();
    fs::write(path, rewritten)?;
    Ok(())
}
