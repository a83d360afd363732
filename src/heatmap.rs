use anyhow::{anyhow, bail, Result};
use ndarray::Array2;

use crate::config::DecoderConfig;
use crate::types::{DecodedHeatmap, GazePoint};

/// Heatmap values are brought into the 8-bit range before decoding.
const HEATMAP_SCALE: f32 = 255.0;

pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Uniform penalty subtracted from the heatmap when the target is likely out of frame.
pub fn outside_penalty(inout_logit: f32) -> f32 {
    (1.0 - sigmoid(inout_logit)) * HEATMAP_SCALE
}

/// Reshapes a flat square model output into a grid.
pub fn heatmap_from_flat(data: &[f32]) -> Result<Array2<f32>> {
    if data.is_empty() {
        bail!("heatmap output is empty");
    }
    let side = (data.len() as f64).sqrt().round() as usize;
    if side * side != data.len() {
        bail!("heatmap of {} values is not square", data.len());
    }
    Array2::from_shape_vec((side, side), data.to_vec()).map_err(|e| anyhow!(e))
}

/// Source index pair and weight for one destination coordinate.
fn linear_taps(dst: usize, src_len: usize, scale: f32) -> (usize, usize, f32) {
    let f = (dst as f32 + 0.5) * scale - 0.5;
    let mut i = f.floor();
    let mut frac = f - i;
    if i < 0.0 {
        i = 0.0;
        frac = 0.0;
    }
    let mut i = i as usize;
    if i >= src_len - 1 {
        i = src_len - 1;
        frac = 0.0;
    }
    let j = (i + 1).min(src_len - 1);
    (i, j, frac)
}

/// Bilinear resize with half-pixel centers and replicated edges.
pub fn resize_bilinear(src: &Array2<f32>, out_rows: usize, out_cols: usize) -> Result<Array2<f32>> {
    let (rows, cols) = src.dim();
    if rows == 0 || cols == 0 {
        bail!("cannot resize an empty {}x{} grid", rows, cols);
    }
    if out_rows == 0 || out_cols == 0 {
        bail!("invalid resize target {}x{}", out_rows, out_cols);
    }

    let sy = rows as f32 / out_rows as f32;
    let sx = cols as f32 / out_cols as f32;
    let col_taps: Vec<_> = (0..out_cols).map(|x| linear_taps(x, cols, sx)).collect();

    let mut out = Array2::<f32>::zeros((out_rows, out_cols));
    for y in 0..out_rows {
        let (y0, y1, fy) = linear_taps(y, rows, sy);
        for (x, &(x0, x1, fx)) in col_taps.iter().enumerate() {
            let top = src[[y0, x0]] * (1.0 - fx) + src[[y0, x1]] * fx;
            let bottom = src[[y1, x0]] * (1.0 - fx) + src[[y1, x1]] * fx;
            out[[y, x]] = top * (1.0 - fy) + bottom * fy;
        }
    }
    Ok(out)
}

/// (row, col) of the maximum, first hit in row-major order.
pub fn argmax(grid: &Array2<f32>) -> Option<(usize, usize)> {
    let mut best: Option<((usize, usize), f32)> = None;
    for (idx, &v) in grid.indexed_iter() {
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((idx, v));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Turns a raw heatmap and an in/out logit into a normalized gaze point.
#[derive(Debug, Clone, Copy)]
pub struct HeatmapDecoder {
    canonical_size: usize,
    coarse_size: usize,
}

impl Default for HeatmapDecoder {
    fn default() -> Self {
        Self {
            canonical_size: 224,
            coarse_size: 56,
        }
    }
}

impl HeatmapDecoder {
    pub fn new(canonical_size: usize, coarse_size: usize) -> Result<Self> {
        if canonical_size == 0 || coarse_size == 0 {
            bail!("decoder sizes must be non-zero ({} / {})", canonical_size, coarse_size);
        }
        Ok(Self { canonical_size, coarse_size })
    }

    pub fn from_config(config: &DecoderConfig) -> Result<Self> {
        Self::new(config.canonical_size, config.coarse_size)
    }

    pub fn decode(&self, raw: &Array2<f32>, inout_logit: f32) -> Result<DecodedHeatmap> {
        let scaled = raw.mapv(|v| v * HEATMAP_SCALE);
        let penalty = outside_penalty(inout_logit);

        let mut canonical = resize_bilinear(&scaled, self.canonical_size, self.canonical_size)?;
        canonical -= penalty;

        let heatmap = resize_bilinear(&canonical, self.coarse_size, self.coarse_size)?;
        let (row, col) = argmax(&heatmap).ok_or_else(|| anyhow!("decoded heatmap is empty"))?;
        log::debug!(
            "decoded {:?} heatmap, penalty {:.2}, peak at ({}, {})",
            raw.dim(),
            penalty,
            row,
            col
        );

        let n = self.coarse_size as f32;
        Ok(DecodedHeatmap {
            heatmap,
            point: GazePoint::new(col as f32 / n, row as f32 / n),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaked(size: usize, row: usize, col: usize) -> Array2<f32> {
        let mut hm = Array2::<f32>::from_elem((size, size), 0.1);
        hm[[row, col]] = 0.9;
        hm
    }

    #[test]
    fn test_sigmoid_penalty() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!((outside_penalty(0.0) - 127.5).abs() < 1e-3);
        assert!(outside_penalty(50.0) < 1e-3);
        assert!((outside_penalty(-50.0) - 255.0).abs() < 1e-3);
    }

    #[test]
    fn test_resize_identity_and_constant() {
        let src = Array2::from_shape_fn((5, 7), |(r, c)| (r * 7 + c) as f32);
        assert_eq!(resize_bilinear(&src, 5, 7).unwrap(), src);

        let flat = Array2::<f32>::from_elem((64, 64), 3.0);
        let out = resize_bilinear(&flat, 224, 224).unwrap();
        assert!(out.iter().all(|&v| (v - 3.0).abs() < 1e-5));
    }

    #[test]
    fn test_resize_halves_by_averaging() {
        let src = Array2::from_shape_vec((2, 2), vec![0.0, 2.0, 4.0, 6.0]).unwrap();
        let out = resize_bilinear(&src, 1, 1).unwrap();
        assert!((out[[0, 0]] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_resize_rejects_empty() {
        let empty = Array2::<f32>::zeros((0, 0));
        assert!(resize_bilinear(&empty, 4, 4).is_err());
        assert!(resize_bilinear(&peaked(4, 1, 1), 0, 4).is_err());
    }

    #[test]
    fn test_argmax_first_occurrence() {
        let mut grid = Array2::<f32>::zeros((3, 3));
        grid[[1, 2]] = 5.0;
        grid[[2, 0]] = 5.0;
        assert_eq!(argmax(&grid), Some((1, 2)));
    }

    #[test]
    fn test_decode_peak_location() {
        let decoder = HeatmapDecoder::default();
        let out = decoder.decode(&peaked(56, 10, 20), 5.0).unwrap();
        assert_eq!(out.heatmap.dim(), (56, 56));
        assert!((out.point.x - 20.0 / 56.0).abs() < 1e-6);
        assert!((out.point.y - 10.0 / 56.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_from_model_resolution() {
        // 64x64 is what the spatial model emits
        let mut hm = Array2::<f32>::zeros((64, 64));
        for r in 30..34 {
            for c in 14..18 {
                hm[[r, c]] = 1.0;
            }
        }
        let out = HeatmapDecoder::default().decode(&hm, 0.0).unwrap();
        let (px, py) = (out.point.x * 64.0, out.point.y * 64.0);
        assert!((14.0..18.0).contains(&px), "x = {}", px);
        assert!((30.0..34.0).contains(&py), "y = {}", py);
    }

    #[test]
    fn test_decode_shift_invariant() {
        let decoder = HeatmapDecoder::default();
        let base = peaked(64, 40, 12);
        let shifted = base.mapv(|v| v + 0.3);
        let a = decoder.decode(&base, 0.0).unwrap();
        let b = decoder.decode(&shifted, 0.0).unwrap();
        assert_eq!(a.point, b.point);
    }

    #[test]
    fn test_confident_inside_keeps_peak() {
        let decoder = HeatmapDecoder::default();
        let base = peaked(56, 33, 7);
        let neutral = decoder.decode(&base, 0.0).unwrap();
        let inside = decoder.decode(&base, 30.0).unwrap();
        let outside = decoder.decode(&base, -30.0).unwrap();
        assert_eq!(neutral.point, inside.point);
        assert_eq!(neutral.point, outside.point);
        assert!(inside.heatmap[[33, 7]] > neutral.heatmap[[33, 7]]);
    }

    #[test]
    fn test_heatmap_from_flat() {
        let grid = heatmap_from_flat(&vec![0.0; 64 * 64]).unwrap();
        assert_eq!(grid.dim(), (64, 64));
        assert!(heatmap_from_flat(&[0.0; 10]).is_err());
        assert!(heatmap_from_flat(&[]).is_err());
    }

    #[test]
    fn test_zero_sizes_rejected() {
        assert!(HeatmapDecoder::new(0, 56).is_err());
        assert!(HeatmapDecoder::new(224, 0).is_err());
    }
}
