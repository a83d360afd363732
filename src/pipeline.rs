use anyhow::{bail, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

use crate::dataset::GooDataset;
use crate::heatmap::HeatmapDecoder;
use crate::types::{DecodedHeatmap, RawPrediction, Sample};
use crate::visualize::Visualizer;

pub trait GazeModel {
    fn name(&self) -> String;
    fn forward(&mut self, sample: &Sample) -> Result<RawPrediction>;
}

/// Returns the same heatmap for every sample. Stands in for the network
/// when no checkpoint is at hand.
pub struct FixedHeatmapModel {
    heatmap: Array2<f32>,
    inout_logit: f32,
    calls: usize,
}

impl FixedHeatmapModel {
    pub fn new(heatmap: Array2<f32>, inout_logit: f32) -> Self {
        Self { heatmap, inout_logit, calls: 0 }
    }

    /// 64x64 map (the spatial model's output size) peaking at a normalized point.
    pub fn peaked_at(x: f32, y: f32) -> Self {
        let mut heatmap = Array2::<f32>::zeros((64, 64));
        let col = ((x * 64.0) as usize).min(63);
        let row = ((y * 64.0) as usize).min(63);
        heatmap[[row, col]] = 1.0;
        Self::new(heatmap, 5.0)
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl GazeModel for FixedHeatmapModel {
    fn name(&self) -> String {
        "Fixed Heatmap".to_string()
    }

    fn forward(&mut self, _sample: &Sample) -> Result<RawPrediction> {
        self.calls += 1;
        Ok(RawPrediction {
            heatmap: self.heatmap.clone(),
            inout_logit: self.inout_logit,
        })
    }
}

/// One forward pass plus heatmap decoding.
pub fn test_on_sample(
    model: &mut dyn GazeModel,
    decoder: &HeatmapDecoder,
    sample: &Sample,
) -> Result<DecodedHeatmap> {
    let raw = model.forward(sample)?;
    decoder.decode(&raw.heatmap, raw.inout_logit)
}

/// `count` indices drawn uniformly (with replacement) from `0..min(range, len)`.
pub fn sample_indices(count: usize, range: usize, len: usize, seed: Option<u64>) -> Result<Vec<usize>> {
    let upper = range.min(len);
    if upper == 0 {
        bail!("no samples to draw from (range {}, dataset length {})", range, len);
    }
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    Ok((0..count).map(|_| rng.gen_range(0..upper)).collect())
}

/// Random-sample demo loop: infer, decode, draw. Returns the written files.
pub fn run_visualization(
    model: &mut dyn GazeModel,
    dataset: &GooDataset,
    decoder: &HeatmapDecoder,
    visualizer: &Visualizer,
    indices: &[usize],
) -> Result<Vec<PathBuf>> {
    log::info!("Running {} on {} samples", model.name(), indices.len());
    let mut written = Vec::with_capacity(indices.len());
    for &idx in indices {
        let sample = dataset.get(idx)?;
        log::info!("{}", sample.path.display());

        let decoded = test_on_sample(model, decoder, &sample)?;
        let boxes = if sample.boxes.is_empty() {
            None
        } else {
            Some(sample.boxes.as_slice())
        };
        let out = visualizer.draw_results(&sample.path, sample.eye, decoded.point, idx, boxes)?;
        log::info!("Done: {}", out.display());
        written.push(out);
    }
    Ok(written)
}
