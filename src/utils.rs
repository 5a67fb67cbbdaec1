// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Utility functions for the decoding library

use std::cmp::Ordering;

use crate::results::BoundingBox;

/// Calculate `IoU` (Intersection over Union) between two bounding boxes
///
/// # Arguments
///
/// * `box1` - First bounding box
/// * `box2` - Second bounding box
///
/// # Returns
///
/// `IoU` value between 0.0 and 1.0. A zero (or degenerate) union yields 0.0.
#[must_use]
pub fn calculate_iou(box1: &BoundingBox, box2: &BoundingBox) -> f32 {
    let [ax1, ay1, ax2, ay2] = box1.xyxy();
    let [bx1, by1, bx2, by2] = box2.xyxy();

    let x1 = ax1.max(bx1);
    let y1 = ay1.max(by1);
    let x2 = ax2.min(bx2);
    let y2 = ay2.min(by2);

    let intersection = ((x2 - x1).max(0.0)) * ((y2 - y1).max(0.0));
    let union = box1.area() + box2.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Indices of `scores` sorted by score descending.
///
/// The sort is stable, so equal scores keep their input order. NaN compares
/// as equal and therefore stays in place relative to its neighbours.
#[must_use]
pub fn argsort_descending(scores: &[f32]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| scores[b].partial_cmp(&scores[a]).unwrap_or(Ordering::Equal));
    indices
}

/// Greedy Non-Maximum Suppression (NMS) for filtering overlapping detections
///
/// Boxes are visited by descending score; each surviving box suppresses every
/// later box whose `IoU` with it is strictly greater than `iou_threshold`.
///
/// # Arguments
///
/// * `boxes` - Vector of bounding boxes with scores [(bbox, score)]
/// * `iou_threshold` - `IoU` threshold for suppression
///
/// # Returns
///
/// Indices of boxes to keep, in selection order
#[must_use]
pub fn nms(boxes: &[(BoundingBox, f32)], iou_threshold: f32) -> Vec<usize> {
    suppress(boxes.len(), |i| boxes[i].1, |i, j| {
        calculate_iou(&boxes[i].0, &boxes[j].0) > iou_threshold
    })
}

/// Per-class Non-Maximum Suppression (NMS) for filtering overlapping detections
///
/// Only suppresses boxes within the same class.
///
/// # Arguments
///
/// * `boxes` - Vector of bounding boxes with scores and class IDs [(bbox, score, `class_id`)]
/// * `iou_threshold` - `IoU` threshold for suppression
///
/// # Returns
///
/// Indices of boxes to keep, in selection order
#[must_use]
pub fn nms_per_class(boxes: &[(BoundingBox, f32, usize)], iou_threshold: f32) -> Vec<usize> {
    suppress(boxes.len(), |i| boxes[i].1, |i, j| {
        boxes[i].2 == boxes[j].2 && calculate_iou(&boxes[i].0, &boxes[j].0) > iou_threshold
    })
}

fn suppress(
    len: usize,
    score: impl Fn(usize) -> f32,
    overlaps: impl Fn(usize, usize) -> bool,
) -> Vec<usize> {
    if len == 0 {
        return vec![];
    }

    let scores: Vec<f32> = (0..len).map(score).collect();
    let indices = argsort_descending(&scores);

    let mut keep = vec![];
    let mut suppressed = vec![false; len];

    for (pos, &i) in indices.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);

        for &j in &indices[pos + 1..] {
            if !suppressed[j] && overlaps(i, j) {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Simple pluralization for common COCO class names.
#[must_use]
pub fn pluralize(word: &str) -> String {
    match word {
        "person" => "persons".to_string(),
        "bus" => "buses".to_string(),
        "knife" => "knives".to_string(),
        "mouse" => "mice".to_string(),
        "sheep" => "sheep".to_string(),
        "skis" => "skis".to_string(),
        _ => {
            if word.ends_with('s') || word.ends_with("ch") || word.ends_with("sh") {
                format!("{word}es")
            } else if word.ends_with('y') && !word.ends_with("ey") && !word.ends_with("ay") {
                format!("{}ies", &word[..word.len() - 1])
            } else {
                format!("{word}s")
            }
        }
    }
}
