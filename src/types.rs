use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A point in normalized image coordinates, both axes in [0, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GazePoint {
    pub x: f32,
    pub y: f32,
}

impl GazePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Scales to pixel coordinates, truncating toward zero.
    pub fn to_pixels(&self, width: u32, height: u32) -> (i32, i32) {
        (
            (width as f32 * self.x) as i32,
            (height as f32 * self.y) as i32,
        )
    }

    pub fn distance(&self, other: &GazePoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Normalized `[x1, y1, x2, y2]` box
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_array(coords: [f32; 4]) -> Self {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }

    pub fn center(&self) -> GazePoint {
        GazePoint::new((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let w = width as f32;
        let h = height as f32;
        PixelRect {
            x1: (self.x1 * w) as i32,
            y1: (self.y1 * h) as i32,
            x2: (self.x2 * w) as i32,
            y2: (self.y2 * h) as i32,
        }
    }
}

/// Corner-form rectangle in pixel space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// Result of the nearest-box search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestBox {
    pub bbox: BoundingBox,
    pub label: Option<i64>,
    pub index: usize,
    pub distance: f32,
}

/// One dataset entry, ready to feed the model
#[derive(Debug, Clone)]
pub struct Sample {
    /// 3 x S x S, normalized
    pub image: Array3<f32>,
    /// 3 x S x S crop of the head box, normalized
    pub face: Array3<f32>,
    /// 1 x S x S, 1.0 inside the head box
    pub head_channel: Array3<f32>,
    pub eye: GazePoint,
    pub gaze: GazePoint,
    pub boxes: Vec<BoundingBox>,
    pub labels: Vec<i64>,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Raw network output for a single sample
#[derive(Debug, Clone)]
pub struct RawPrediction {
    pub heatmap: Array2<f32>,
    pub inout_logit: f32,
}

/// Decoded prediction: coarse heatmap plus the arg-max location
#[derive(Debug, Clone)]
pub struct DecodedHeatmap {
    pub heatmap: Array2<f32>,
    pub point: GazePoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_point_to_pixels() {
        let eye = GazePoint::new(0.5, 0.5);
        assert_eq!(eye.to_pixels(100, 200), (50, 100));
    }

    #[test]
    fn test_box_center_and_scale() {
        let b = BoundingBox::new(0.1, 0.2, 0.3, 0.6);
        let c = b.center();
        assert!((c.x - 0.2).abs() < 1e-6);
        assert!((c.y - 0.4).abs() < 1e-6);

        let px = BoundingBox::new(0.0, 0.0, 0.5, 1.0).to_pixels(100, 200);
        assert_eq!(px, PixelRect { x1: 0, y1: 0, x2: 50, y2: 200 });
    }
}
