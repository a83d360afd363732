use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array3;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ModelConfig;
use crate::heatmap::heatmap_from_flat;
use crate::pipeline::GazeModel;
use crate::types::{RawPrediction, Sample};

/// Number of inputs the spatial model takes: image, head channel, face.
pub const MODEL_INPUTS: usize = 3;

/// Training state stored next to an exported checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeInfo {
    pub start_epoch: u32,
    pub best_metric: Option<f32>,
}

impl ResumeInfo {
    pub fn sidecar_path(checkpoint: &Path) -> PathBuf {
        checkpoint.with_extension("json")
    }

    pub fn load_for(checkpoint: &Path) -> Result<Self> {
        let path = Self::sidecar_path(checkpoint);
        if !path.exists() {
            log::warn!("No resume metadata at {}, starting from epoch 0", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }
}

/// Verifies a session's arity against the gaze model contract.
pub fn check_contract(n_inputs: usize, n_outputs: usize, config: &ModelConfig) -> Result<()> {
    if n_inputs != MODEL_INPUTS {
        bail!("expected {} model inputs, found {}", MODEL_INPUTS, n_inputs);
    }
    let needed = config.heatmap_output.max(config.inout_output) + 1;
    if n_outputs < needed {
        bail!("expected at least {} model outputs, found {}", needed, n_outputs);
    }
    if config.heatmap_output == config.inout_output {
        bail!("heatmap and in/out outputs share slot {}", config.heatmap_output);
    }
    Ok(())
}

pub fn build_session(path: &Path, intra_threads: usize) -> Result<Session> {
    Ok(Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers([
            ort::execution_providers::CUDAExecutionProvider::default().build(),
            ort::execution_providers::CoreMLExecutionProvider::default().build(),
            ort::execution_providers::CPUExecutionProvider::default().build(),
        ])?
        .commit_from_file(path)?)
}

/// Spatial gaze-following network behind an ONNX Runtime session
pub struct SpatialGazeModel {
    session: Session,
    heatmap_output: usize,
    inout_output: usize,
}

/// Loads the checkpoint and its resume metadata.
pub fn resume_checkpoint<P: AsRef<Path>>(
    path: P,
    config: &ModelConfig,
) -> Result<(SpatialGazeModel, ResumeInfo)> {
    let path = path.as_ref();
    if !path.exists() {
        bail!("checkpoint not found at {}", path.display());
    }
    log::info!("Loading model from {}...", path.display());
    let session = build_session(path, config.intra_threads)
        .with_context(|| format!("building session for {}", path.display()))?;
    check_contract(session.inputs.len(), session.outputs.len(), config)?;

    let resume = ResumeInfo::load_for(path)?;
    log::info!("Restored checkpoint (epoch {})", resume.start_epoch);

    Ok((
        SpatialGazeModel {
            session,
            heatmap_output: config.heatmap_output,
            inout_output: config.inout_output,
        },
        resume,
    ))
}

fn to_batch_tensor(t: &Array3<f32>) -> Result<Tensor<f32>> {
    let (c, h, w) = t.dim();
    let data: Vec<f32> = t.iter().copied().collect();
    Ok(Tensor::from_array((
        vec![1i64, c as i64, h as i64, w as i64],
        data,
    ))?)
}

impl GazeModel for SpatialGazeModel {
    fn name(&self) -> String {
        "Spatial Gaze (ONNX)".to_string()
    }

    fn forward(&mut self, sample: &Sample) -> Result<RawPrediction> {
        let image = to_batch_tensor(&sample.image)?;
        let head = to_batch_tensor(&sample.head_channel)?;
        let face = to_batch_tensor(&sample.face)?;

        let outputs = self.session.run(ort::inputs![image, head, face])?;

        let (_hm_shape, hm_data) = outputs[self.heatmap_output].try_extract_tensor::<f32>()?;
        let heatmap = heatmap_from_flat(hm_data)?;

        let (_io_shape, io_data) = outputs[self.inout_output].try_extract_tensor::<f32>()?;
        let inout_logit = io_data
            .first()
            .copied()
            .ok_or_else(|| anyhow!("in/out output is empty"))?;

        log::debug!("heatmap {:?}, in/out logit {:.3}", heatmap.dim(), inout_logit);
        Ok(RawPrediction { heatmap, inout_logit })
    }
}
