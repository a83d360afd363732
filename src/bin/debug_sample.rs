use anyhow::{Context, Result};
use gaze_follow::config::DatasetConfig;
use gaze_follow::dataset::{channel_to_image, tensor_to_image, GooDataset};
use std::env;

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        println!("Usage: debug_sample <test_dir> <annotation.json> <index>");
        return Ok(());
    }
    let idx: usize = args[3].parse().context("index must be a number")?;

    let config = DatasetConfig::default();
    let dataset = GooDataset::new(&args[1], &args[2], config.clone())?;
    let sample = dataset.get(idx)?;

    println!("Image: {} ({}x{})", sample.path.display(), sample.width, sample.height);
    println!("Eye: ({:.3}, {:.3})  Gaze: ({:.3}, {:.3})", sample.eye.x, sample.eye.y, sample.gaze.x, sample.gaze.y);
    println!("Boxes: {}", sample.boxes.len());
    for (i, b) in sample.boxes.iter().enumerate() {
        let label = sample.labels.get(i);
        println!("  [{:.3}, {:.3}, {:.3}, {:.3}] label {:?}", b.x1, b.y1, b.x2, b.y2, label);
    }

    let face_path = format!("debug_face_{}.png", idx);
    tensor_to_image(&sample.face, &config).save(&face_path)?;
    let head_path = format!("debug_head_{}.png", idx);
    channel_to_image(&sample.head_channel).save(&head_path)?;
    println!("Saved {} and {}", face_path, head_path);

    Ok(())
}
