use anyhow::{bail, Result};

use crate::types::{BoundingBox, GazePoint, NearestBox};

/// Picks the box whose center lies closest to `gaze`.
///
/// Ties resolve to the earliest box. `labels`, when given, must be
/// parallel to `boxes`; the chosen box's label is returned alongside it.
/// A non-finite center distance (NaN coordinates) is an error.
pub fn select_nearest_box(
    gaze: GazePoint,
    boxes: &[BoundingBox],
    labels: Option<&[i64]>,
) -> Result<NearestBox> {
    if boxes.is_empty() {
        bail!("cannot select nearest box from an empty set");
    }
    if let Some(l) = labels {
        if l.len() != boxes.len() {
            bail!("got {} labels for {} boxes", l.len(), boxes.len());
        }
    }

    let mut best_index = 0;
    let mut best_dist = f32::INFINITY;
    for (i, b) in boxes.iter().enumerate() {
        let d = b.center().distance(&gaze);
        if !d.is_finite() {
            bail!("box {} has non-finite distance {} to ({}, {})", i, d, gaze.x, gaze.y);
        }
        if d < best_dist {
            best_dist = d;
            best_index = i;
        }
    }

    Ok(NearestBox {
        bbox: boxes[best_index],
        label: labels.map(|l| l[best_index]),
        index: best_index,
        distance: best_dist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corner_boxes() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(0.0, 0.0, 0.2, 0.2),
            BoundingBox::new(0.8, 0.8, 1.0, 1.0),
        ]
    }

    #[test]
    fn test_picks_box_near_origin() {
        let nearest = select_nearest_box(GazePoint::new(0.01, 0.01), &corner_boxes(), None).unwrap();
        assert_eq!(nearest.index, 0);
        assert_eq!(nearest.label, None);
    }

    #[test]
    fn test_centered_box_has_zero_distance() {
        let boxes = vec![BoundingBox::new(0.4, 0.4, 0.6, 0.6)];
        let nearest = select_nearest_box(GazePoint::new(0.5, 0.5), &boxes, None).unwrap();
        assert_eq!(nearest.index, 0);
        assert!(nearest.distance.abs() < 1e-6);
    }

    #[test]
    fn test_nearest_is_minimal_over_set() {
        let boxes = vec![
            BoundingBox::new(0.1, 0.1, 0.3, 0.2),
            BoundingBox::new(0.5, 0.6, 0.9, 0.9),
            BoundingBox::new(0.2, 0.7, 0.4, 0.95),
            BoundingBox::new(0.6, 0.0, 1.0, 0.3),
        ];
        let queries = [(0.0, 0.0), (0.7, 0.2), (0.35, 0.8), (0.9, 0.9), (0.5, 0.5)];
        for (x, y) in queries {
            let q = GazePoint::new(x, y);
            let nearest = select_nearest_box(q, &boxes, None).unwrap();
            for b in &boxes {
                assert!(nearest.distance <= b.center().distance(&q));
            }
            assert_eq!(nearest.bbox, boxes[nearest.index]);
        }
    }

    #[test]
    fn test_tie_goes_to_first() {
        let boxes = vec![
            BoundingBox::new(0.0, 0.25, 0.5, 0.75),
            BoundingBox::new(0.5, 0.25, 1.0, 0.75),
        ];
        let nearest = select_nearest_box(GazePoint::new(0.5, 0.5), &boxes, None).unwrap();
        assert_eq!(nearest.index, 0);
    }

    #[test]
    fn test_label_follows_index() {
        let labels = [7, 3];
        let nearest =
            select_nearest_box(GazePoint::new(0.95, 0.9), &corner_boxes(), Some(&labels[..])).unwrap();
        assert_eq!(nearest.index, 1);
        assert_eq!(nearest.label, Some(3));
    }

    #[test]
    fn test_empty_and_mismatched_inputs_fail() {
        assert!(select_nearest_box(GazePoint::new(0.5, 0.5), &[], None).is_err());
        assert!(select_nearest_box(GazePoint::new(0.5, 0.5), &corner_boxes(), Some(&[1][..])).is_err());
    }

    #[test]
    fn test_nan_box_fails() {
        let boxes = vec![
            BoundingBox::new(f32::NAN, 0.0, 0.2, 0.2),
            BoundingBox::new(0.4, 0.4, 0.6, 0.6),
        ];
        assert!(select_nearest_box(GazePoint::new(0.5, 0.5), &boxes, None).is_err());
        assert!(select_nearest_box(GazePoint::new(f32::NAN, 0.5), &corner_boxes(), None).is_err());
    }
}
