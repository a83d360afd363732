use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

use crate::boxes::select_nearest_box;
use crate::config::VisualConfig;
use crate::types::{BoundingBox, GazePoint, NearestBox, PixelRect};

pub fn parse_hex(hex: &str) -> (u8, u8, u8) {
    if hex.len() == 7 && hex.starts_with('#') {
        let r = u8::from_str_radix(&hex[1..3], 16).unwrap_or(255);
        let g = u8::from_str_radix(&hex[3..5], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[5..7], 16).unwrap_or(0);
        (r, g, b)
    } else {
        (255, 0, 0) // Default Red
    }
}

fn rgb(hex: &str) -> Rgb<u8> {
    let (r, g, b) = parse_hex(hex);
    Rgb([r, g, b])
}

fn put(img: &mut RgbImage, x: i32, y: i32, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

/// Radius is clamped to the image's larger side; anything bigger covers it anyway.
pub fn fill_circle(img: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: Rgb<u8>) {
    if radius < 0 {
        return;
    }
    let limit = img.width().max(img.height()).min(i32::MAX as u32) as i32;
    let radius = radius.min(limit);
    let r2 = radius as i64 * radius as i64;
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if (dx as i64).pow(2) + (dy as i64).pow(2) <= r2 {
                put(img, cx.saturating_add(dx), cy.saturating_add(dy), color);
            }
        }
    }
}

/// Line with a square brush `thickness` pixels wide.
pub fn draw_line(img: &mut RgbImage, from: (i32, i32), to: (i32, i32), thickness: i32, color: Rgb<u8>) {
    let (x0, y0) = (from.0 as f32, from.1 as f32);
    let (x1, y1) = (to.0 as f32, to.1 as f32);
    let steps = (x1 - x0).abs().max((y1 - y0).abs()).ceil().max(1.0) as i32;
    let lo = -(thickness.max(1) - 1) / 2;
    let hi = lo + thickness.max(1) - 1;

    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let px = (x0 + (x1 - x0) * t).round() as i32;
        let py = (y0 + (y1 - y0) * t).round() as i32;
        for oy in lo..=hi {
            for ox in lo..=hi {
                put(img, px + ox, py + oy, color);
            }
        }
    }
}

pub fn draw_rect(img: &mut RgbImage, rect: &PixelRect, thickness: i32, color: Rgb<u8>) {
    let corners = [
        (rect.x1, rect.y1),
        (rect.x2, rect.y1),
        (rect.x2, rect.y2),
        (rect.x1, rect.y2),
    ];
    for i in 0..4 {
        draw_line(img, corners[i], corners[(i + 1) % 4], thickness, color);
    }
}

/// Draws gaze predictions onto source images and saves them
pub struct Visualizer {
    output_dir: PathBuf,
    style: VisualConfig,
}

impl Visualizer {
    pub fn new<P: AsRef<Path>>(output_dir: P, style: VisualConfig) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            style,
        }
    }

    pub fn output_path(&self, idx: usize) -> PathBuf {
        self.output_dir.join(format!("inference_{}.png", idx))
    }

    /// Eye and gaze dots, the ray between them and the box nearest the gaze.
    pub fn render(
        &self,
        img: &mut RgbImage,
        eye: GazePoint,
        gaze: GazePoint,
        boxes: Option<&[BoundingBox]>,
    ) -> Result<Option<NearestBox>> {
        let (width, height) = img.dimensions();
        let eye_px = eye.to_pixels(width, height);
        let gaze_px = gaze.to_pixels(width, height);

        let point_color = rgb(&self.style.point_color_hex);
        fill_circle(img, eye_px.0, eye_px.1, self.style.point_radius, point_color);
        fill_circle(img, gaze_px.0, gaze_px.1, self.style.point_radius, point_color);
        draw_line(img, eye_px, gaze_px, self.style.line_thickness, rgb(&self.style.line_color_hex));

        let Some(boxes) = boxes else {
            return Ok(None);
        };
        let nearest = select_nearest_box(gaze, boxes, None)?;
        let rect = nearest.bbox.to_pixels(width, height);
        draw_rect(img, &rect, self.style.box_thickness, rgb(&self.style.box_color_hex));
        Ok(Some(nearest))
    }

    pub fn draw_results(
        &self,
        image_path: &Path,
        eye: GazePoint,
        gaze: GazePoint,
        idx: usize,
        boxes: Option<&[BoundingBox]>,
    ) -> Result<PathBuf> {
        let mut img = image::open(image_path)
            .with_context(|| format!("loading image {}", image_path.display()))?
            .to_rgb8();
        self.render(&mut img, eye, gaze, boxes)?;

        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir)
                .with_context(|| format!("creating {}", self.output_dir.display()))?;
        }
        let save_path = self.output_path(idx);
        img.save(&save_path)
            .with_context(|| format!("writing {}", save_path.display()))?;
        Ok(save_path)
    }
}
