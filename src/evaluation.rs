use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::boxes::select_nearest_box;
use crate::dataset::GooDataset;
use crate::heatmap::HeatmapDecoder;
use crate::pipeline::{test_on_sample, GazeModel};
use crate::types::{BoundingBox, GazePoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub samples: usize,
    pub mean_l2: f32,
    pub min_l2: f32,
    /// Samples that had boxes to compare against
    pub box_samples: usize,
    pub box_hit_rate: f32,
}

/// Running totals over a test set
#[derive(Debug, Default)]
pub struct Evaluator {
    distances: Vec<f32>,
    box_samples: usize,
    box_hits: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, predicted: GazePoint, truth: GazePoint, boxes: &[BoundingBox]) -> Result<()> {
        self.distances.push(predicted.distance(&truth));
        if !boxes.is_empty() {
            let hit = select_nearest_box(predicted, boxes, None)?.index
                == select_nearest_box(truth, boxes, None)?.index;
            self.box_samples += 1;
            if hit {
                self.box_hits += 1;
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> Result<EvaluationSummary> {
        if self.distances.is_empty() {
            bail!("no samples evaluated");
        }
        let n = self.distances.len();
        let mean_l2 = self.distances.iter().sum::<f32>() / n as f32;
        let min_l2 = self.distances.iter().copied().fold(f32::INFINITY, f32::min);
        let box_hit_rate = if self.box_samples > 0 {
            self.box_hits as f32 / self.box_samples as f32
        } else {
            0.0
        };
        Ok(EvaluationSummary {
            samples: n,
            mean_l2,
            min_l2,
            box_samples: self.box_samples,
            box_hit_rate,
        })
    }
}

/// Runs the model over every sample and aggregates gaze error.
pub fn evaluate(
    model: &mut dyn GazeModel,
    dataset: &GooDataset,
    decoder: &HeatmapDecoder,
) -> Result<EvaluationSummary> {
    let mut evaluator = Evaluator::new();
    for idx in 0..dataset.len() {
        let sample = dataset.get(idx)?;
        let decoded = test_on_sample(model, decoder, &sample)?;
        evaluator.add(decoded.point, sample.gaze, &sample.boxes)?;
        if (idx + 1) % 100 == 0 {
            log::info!("Evaluated {}/{}", idx + 1, dataset.len());
        }
    }
    let summary = evaluator.summary()?;
    log::info!(
        "Evaluation: {} samples, mean L2 {:.4}, min L2 {:.4}, box hit rate {:.3} over {}",
        summary.samples,
        summary.mean_l2,
        summary.min_l2,
        summary.box_hit_rate,
        summary.box_samples
    );
    Ok(summary)
}

pub fn save_summary(summary: &EvaluationSummary, dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let path = dir.join("evaluation.json");
    let file = fs::File::create(&path).with_context(|| format!("writing {}", path.display()))?;
    serde_json::to_writer_pretty(file, summary)?;
    log::info!("Saved evaluation to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_metrics() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 0.2, 0.2),
            BoundingBox::new(0.8, 0.8, 1.0, 1.0),
        ];
        let mut ev = Evaluator::new();
        // hit: both nearest to box 0
        ev.add(GazePoint::new(0.0, 0.0), GazePoint::new(0.1, 0.1), &boxes).unwrap();
        // miss
        ev.add(GazePoint::new(0.9, 0.9), GazePoint::new(0.1, 0.1), &boxes).unwrap();
        // no boxes, counted for distance only
        ev.add(GazePoint::new(0.5, 0.5), GazePoint::new(0.5, 0.5), &[]).unwrap();

        let s = ev.summary().unwrap();
        assert_eq!(s.samples, 3);
        assert_eq!(s.box_samples, 2);
        assert!((s.box_hit_rate - 0.5).abs() < 1e-6);
        assert!(s.min_l2.abs() < 1e-6);
        let expected_mean = (0.02f32.sqrt() + 1.28f32.sqrt()) / 3.0;
        assert!((s.mean_l2 - expected_mean).abs() < 1e-4);
    }

    #[test]
    fn test_empty_summary_fails() {
        assert!(Evaluator::new().summary().is_err());
    }
}
