use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

mod args;

use args::Args;
use gaze_follow::config::AppConfig;
use gaze_follow::dataset::GooDataset;
use gaze_follow::evaluation::{evaluate, save_summary};
use gaze_follow::heatmap::HeatmapDecoder;
use gaze_follow::model::resume_checkpoint;
use gaze_follow::pipeline::{run_visualization, sample_indices};
use gaze_follow::visualize::Visualizer;

fn required(path: Option<PathBuf>, flag: &str) -> Result<PathBuf> {
    path.ok_or_else(|| anyhow!("--{} is required", flag))
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();

    // 0. Config, CLI wins
    let mut config = AppConfig::load_from(&args.config)?;
    if let Some(n) = args.samples {
        config.run.num_samples = n;
    }
    if args.seed.is_some() {
        config.run.seed = args.seed;
    }
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&config.run.output_dir));

    // 1. Model
    let resume_path = required(args.resume_path, "resume_path")?;
    let (mut net, resume) = resume_checkpoint(&resume_path, &config.model)?;
    log::info!("Model ready, trained for {} epochs", resume.start_epoch);

    // 2. Dataset
    let test_dir = required(args.test_dir, "test_dir")?;
    let test_annotation = required(args.test_annotation, "test_annotation")?;
    let val_set = GooDataset::new(&test_dir, &test_annotation, config.dataset.clone())?;

    let decoder = HeatmapDecoder::from_config(&config.decoder)?;

    if args.evaluate {
        let summary = evaluate(&mut net, &val_set, &decoder)?;
        save_summary(&summary, &output_dir)?;
        return Ok(());
    }

    // 3. Random samples through infer -> decode -> draw
    let indices = sample_indices(
        config.run.num_samples,
        config.run.index_range,
        val_set.len(),
        config.run.seed,
    )?;
    let visualizer = Visualizer::new(&output_dir, config.visual.clone());
    let written = run_visualization(&mut net, &val_set, &decoder, &visualizer, &indices)?;
    log::info!("Wrote {} images to {}", written.len(), output_dir.display());

    Ok(())
}
