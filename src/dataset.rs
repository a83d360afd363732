use anyhow::{anyhow, bail, Context, Result};
use image::{imageops::FilterType, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::config::DatasetConfig;
use crate::types::{BoundingBox, GazePoint, Sample};

/// Object boxes and their class ids, in pixels
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoxAnnotation {
    #[serde(default)]
    pub bboxes: Vec<[f32; 4]>,
    #[serde(default)]
    pub labels: Vec<i64>,
}

/// One line of the annotation file. Coordinates are in pixels of the
/// source image; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub filename: String,
    pub gaze_cx: f32,
    pub gaze_cy: f32,
    /// Eye position
    pub hx: f32,
    pub hy: f32,
    #[serde(default)]
    pub head_box: Option<[f32; 4]>,
    #[serde(default)]
    pub ann: BoxAnnotation,
}

impl AnnotationRecord {
    /// Head box plus the object boxes/labels that remain once it is taken out.
    ///
    /// Without an explicit `head_box` the last annotated box is the head.
    fn split_head(&self, width: f32) -> ([f32; 4], Vec<[f32; 4]>, Vec<i64>) {
        let mut boxes = self.ann.bboxes.clone();
        let mut labels = self.ann.labels.clone();
        if let Some(head) = self.head_box {
            return (head, boxes, labels);
        }
        if let Some(head) = boxes.pop() {
            if labels.len() > boxes.len() {
                labels.truncate(boxes.len());
            }
            return (head, boxes, labels);
        }
        let half = width * 0.05;
        (
            [self.hx - half, self.hy - half, self.hx + half, self.hy + half],
            boxes,
            labels,
        )
    }
}

/// Image directory + annotation list with index-based sample access
pub struct GooDataset {
    image_dir: PathBuf,
    records: Vec<AnnotationRecord>,
    config: DatasetConfig,
}

impl GooDataset {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        image_dir: P,
        annotation_path: Q,
        config: DatasetConfig,
    ) -> Result<Self> {
        let annotation_path = annotation_path.as_ref();
        let file = File::open(annotation_path)
            .with_context(|| format!("opening annotations {}", annotation_path.display()))?;
        let records: Vec<AnnotationRecord> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing annotations {}", annotation_path.display()))?;
        log::info!(
            "Loaded {} annotations from {}",
            records.len(),
            annotation_path.display()
        );
        Ok(Self::from_records(image_dir, records, config))
    }

    pub fn from_records<P: AsRef<Path>>(
        image_dir: P,
        records: Vec<AnnotationRecord>,
        config: DatasetConfig,
    ) -> Self {
        Self {
            image_dir: image_dir.as_ref().to_path_buf(),
            records,
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, idx: usize) -> Result<Sample> {
        let record = self
            .records
            .get(idx)
            .ok_or_else(|| anyhow!("sample {} out of range (len {})", idx, self.records.len()))?;

        let path = self.image_dir.join(&record.filename);
        let img = image::open(&path)
            .with_context(|| format!("loading image {}", path.display()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            bail!("image {} is empty", path.display());
        }
        let (w, h) = (width as f32, height as f32);

        let (head_px, boxes_px, labels) = record.split_head(w);
        let head = normalize_box(head_px, w, h);

        let size = self.config.input_size;
        let image = image_to_tensor(&img, size, &self.config);
        let face = image_to_tensor(&crop_box(&img, &head), size, &self.config);
        let head_channel = head_box_channel(&head, size);

        let (boxes, labels) = if self.config.use_gt_boxes {
            (
                boxes_px.iter().map(|b| normalize_box(*b, w, h)).collect(),
                labels,
            )
        } else {
            (Vec::new(), Vec::new())
        };

        Ok(Sample {
            image,
            face,
            head_channel,
            eye: GazePoint::new(record.hx / w, record.hy / h),
            gaze: GazePoint::new(record.gaze_cx / w, record.gaze_cy / h),
            boxes,
            labels,
            path,
            width,
            height,
        })
    }
}

fn normalize_box(b: [f32; 4], w: f32, h: f32) -> BoundingBox {
    BoundingBox::new(b[0] / w, b[1] / h, b[2] / w, b[3] / h)
}

/// Crops the normalized box out of `img`, at least one pixel in each direction.
fn crop_box(img: &RgbImage, b: &BoundingBox) -> RgbImage {
    let (width, height) = img.dimensions();
    let px = b.to_pixels(width, height);
    let x1 = px.x1.clamp(0, width as i32 - 1) as u32;
    let y1 = px.y1.clamp(0, height as i32 - 1) as u32;
    let x2 = (px.x2.clamp(0, width as i32) as u32).max(x1 + 1);
    let y2 = (px.y2.clamp(0, height as i32) as u32).max(y1 + 1);
    image::imageops::crop_imm(img, x1, y1, x2 - x1, y2 - y1).to_image()
}

/// Resizes to `size` x `size` and lays out as normalized CHW.
pub fn image_to_tensor(img: &RgbImage, size: u32, config: &DatasetConfig) -> Array3<f32> {
    let resized = image::imageops::resize(img, size, size, FilterType::Triangle);
    Array3::from_shape_fn((3, size as usize, size as usize), |(c, y, x)| {
        let p = resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0;
        (p - config.mean[c]) / config.std[c]
    })
}

/// Inverse of `image_to_tensor`, for debugging crops.
pub fn tensor_to_image(tensor: &Array3<f32>, config: &DatasetConfig) -> RgbImage {
    let (_, h, w) = tensor.dim();
    ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
        let mut px = [0u8; 3];
        for (c, v) in px.iter_mut().enumerate() {
            let raw = tensor[[c, y as usize, x as usize]] * config.std[c] + config.mean[c];
            *v = (raw * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        Rgb(px)
    })
}

/// 1 x size x size mask, 1.0 inside the head box.
pub fn head_box_channel(head: &BoundingBox, size: u32) -> Array3<f32> {
    let s = size as usize;
    let px = head.to_pixels(size, size);
    let x1 = px.x1.clamp(0, size as i32) as usize;
    let y1 = px.y1.clamp(0, size as i32) as usize;
    let x2 = px.x2.clamp(0, size as i32) as usize;
    let y2 = px.y2.clamp(0, size as i32) as usize;

    let mut channel = Array3::<f32>::zeros((1, s, s));
    for y in y1..y2 {
        for x in x1..x2 {
            channel[[0, y, x]] = 1.0;
        }
    }
    channel
}

pub fn channel_to_image(channel: &Array3<f32>) -> GrayImage {
    let (_, h, w) = channel.dim();
    ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
        Luma([(channel[[0, y as usize, x as usize]].clamp(0.0, 1.0) * 255.0) as u8])
    })
}
