use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to test set images
    #[arg(long = "test_dir")]
    pub test_dir: Option<PathBuf>,

    /// Test annotations (JSON)
    #[arg(long = "test_annotation")]
    pub test_annotation: Option<PathBuf>,

    /// Model checkpoint (ONNX)
    #[arg(long = "resume_path")]
    pub resume_path: Option<PathBuf>,

    /// Configuration file, created with defaults when missing
    #[arg(long, default_value = "config.json")]
    pub config: PathBuf,

    /// Number of random samples to visualize
    #[arg(long)]
    pub samples: Option<usize>,

    /// Seed for sample selection
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where rendered images are written
    #[arg(long = "output_dir")]
    pub output_dir: Option<PathBuf>,

    /// Score the whole test set instead of drawing samples
    #[arg(long, default_value_t = false)]
    pub evaluate: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_underscore_flags() {
        let args = Args::parse_from([
            "gaze_follow",
            "--test_dir",
            "data/images",
            "--test_annotation",
            "data/test.json",
            "--resume_path",
            "ckpt/model.onnx",
            "--samples",
            "3",
        ]);
        assert_eq!(args.test_dir, Some(PathBuf::from("data/images")));
        assert_eq!(args.test_annotation, Some(PathBuf::from("data/test.json")));
        assert_eq!(args.resume_path, Some(PathBuf::from("ckpt/model.onnx")));
        assert_eq!(args.samples, Some(3));
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert!(!args.evaluate);
    }

    #[test]
    fn test_all_paths_optional() {
        let args = Args::parse_from(["gaze_follow"]);
        assert!(args.test_dir.is_none());
        assert!(args.resume_path.is_none());
        assert!(args.seed.is_none());
    }
}
