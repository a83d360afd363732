use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub decoder: DecoderConfig,
    pub dataset: DatasetConfig,
    pub run: RunConfig,
    pub visual: VisualConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub intra_threads: usize,
    /// Output slot holding the gaze heatmap
    pub heatmap_output: usize,
    /// Output slot holding the in/out-of-frame logit
    pub inout_output: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub canonical_size: usize,
    pub coarse_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    pub input_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub use_gt_boxes: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub num_samples: usize,
    /// Random indices are drawn from 0..min(index_range, dataset length)
    pub index_range: usize,
    pub seed: Option<u64>,
    pub output_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualConfig {
    pub point_radius: i32,
    pub line_thickness: i32,
    pub box_thickness: i32,
    pub point_color_hex: String,
    pub line_color_hex: String,
    pub box_color_hex: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            heatmap_output: 0,
            inout_output: 2,
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            canonical_size: 224,
            coarse_size: 56,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            mean: [0.485, 0.456, 0.406],
            std: [0.229, 0.224, 0.225],
            use_gt_boxes: true,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_samples: 10,
            index_range: 100,
            seed: None,
            output_dir: "temp".to_string(),
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            point_radius: 5,
            line_thickness: 2,
            box_thickness: 2,
            point_color_hex: "#FFFFFF".to_string(),
            line_color_hex: "#0000FF".to_string(),
            box_color_hex: "#FFA500".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            // Missing fields fall back to Default via #[serde(default)]
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    log::info!("Loaded configuration from {}", path.display());
                    c
                }
                Err(e) => {
                    log::warn!("Error parsing config: {}. Loading defaults.", e);
                    Self::default()
                }
            }
        } else {
            log::info!("Configuration file not found. Creating default at {}", path.display());
            Self::default()
        };

        // Write back so new fields show up in the file
        config.save_to(path)?;

        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("writing {}", path.as_ref().display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_model_contract() {
        let c = AppConfig::default();
        assert_eq!(c.decoder.canonical_size, 224);
        assert_eq!(c.decoder.coarse_size, 56);
        assert_eq!(c.dataset.input_size, 224);
        assert_eq!(c.run.num_samples, 10);
        assert_eq!(c.run.index_range, 100);
        assert_eq!(c.run.output_dir, "temp");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let c: AppConfig =
            serde_json::from_str(r#"{ "run": { "num_samples": 3, "seed": 42 } }"#).unwrap();
        assert_eq!(c.run.num_samples, 3);
        assert_eq!(c.run.seed, Some(42));
        assert_eq!(c.run.index_range, 100);
        assert_eq!(c.visual.point_radius, 5);
        assert_eq!(c.model.inout_output, 2);
    }

    #[test]
    fn test_load_creates_file() {
        let dir = std::env::temp_dir().join(format!("gaze_follow_cfg_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        let _ = fs::remove_file(&path);

        let c = AppConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(c.decoder.coarse_size, 56);

        fs::remove_dir_all(&dir).unwrap();
    }
}
