// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Result types produced by the decoders.
//!
//! Detections are pixel-space boxes in selection order. Poses hold exactly one
//! keypoint slot per joint type; a slot with `confidence <= 0` is missing.

use std::collections::HashMap;

use crate::skeleton::OPENPOSE_TO_COCO;
use crate::utils::pluralize;

/// Timing information for frame processing (in milliseconds).
#[derive(Debug, Clone, Default)]
pub struct Speed {
    /// Time spent on preprocessing.
    pub preprocess: Option<f64>,
    /// Time spent on model inference.
    pub inference: Option<f64>,
    /// Time spent on postprocessing.
    pub postprocess: Option<f64>,
}

impl Speed {
    /// Create a new Speed instance with all timings.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64, postprocess: f64) -> Self {
        Self {
            preprocess: Some(preprocess),
            inference: Some(inference),
            postprocess: Some(postprocess),
        }
    }

    /// Get total processing time.
    ///
    /// # Returns
    ///
    /// * Sum of preprocess, inference, and postprocess times in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.preprocess.unwrap_or(0.0)
            + self.inference.unwrap_or(0.0)
            + self.postprocess.unwrap_or(0.0)
    }
}

/// Axis-aligned box in pixel coordinates, anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width, never negative.
    pub width: f32,
    /// Height, never negative.
    pub height: f32,
}

impl BoundingBox {
    /// Create a box, clamping negative extents to zero.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Box area in square pixels.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Corner form `[x1, y1, x2, y2]`.
    #[must_use]
    pub fn xyxy(&self) -> [f32; 4] {
        [self.x, self.y, self.x + self.width, self.y + self.height]
    }

    /// Center point `(cx, cy)`.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One decoded object detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Class id as emitted by the network.
    pub label: usize,
    /// Confidence in `[0, 1]`.
    pub score: f32,
    /// Pixel-space box.
    pub bbox: BoundingBox,
}

impl Detection {
    /// Create a new detection.
    #[must_use]
    pub const fn new(label: usize, score: f32, bbox: BoundingBox) -> Self {
        Self { label, score, bbox }
    }

    /// Box area in square pixels.
    #[must_use]
    pub fn area(&self) -> f32 {
        self.bbox.area()
    }

    /// Box center `(cx, cy)`.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        self.bbox.center()
    }
}

/// A single joint position with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position.
    pub y: f32,
    /// Confidence; `<= 0` marks the slot as missing.
    pub confidence: f32,
}

impl Keypoint {
    /// Sentinel for an unfilled joint slot.
    pub const MISSING: Self = Self {
        x: 0.0,
        y: 0.0,
        confidence: 0.0,
    };

    /// Create a new keypoint.
    #[must_use]
    pub const fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Whether this slot holds no joint.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.confidence <= 0.0
    }
}

/// One assembled skeleton: exactly one slot per joint type.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Keypoints in joint-type order.
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    /// Create a pose with `num_joints` missing slots.
    #[must_use]
    pub fn empty(num_joints: usize) -> Self {
        Self {
            keypoints: vec![Keypoint::MISSING; num_joints],
        }
    }

    /// Number of joint slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    /// Whether the pose has no slots at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Keypoint in slot `joint`, `None` when missing or out of range.
    #[must_use]
    pub fn joint(&self, joint: usize) -> Option<&Keypoint> {
        self.keypoints.get(joint).filter(|kp| !kp.is_missing())
    }

    /// Number of filled slots.
    #[must_use]
    pub fn num_visible(&self) -> usize {
        self.keypoints.iter().filter(|kp| !kp.is_missing()).count()
    }

    /// Mean confidence over filled slots, 0 for an empty pose.
    #[must_use]
    pub fn mean_confidence(&self) -> f32 {
        let visible = self.num_visible();
        if visible == 0 {
            return 0.0;
        }
        let sum: f32 = self
            .keypoints
            .iter()
            .filter(|kp| !kp.is_missing())
            .map(|kp| kp.confidence)
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / visible as f32;
        mean
    }

    /// Scale every coordinate in place; confidences are untouched.
    pub fn rescale(&mut self, scale_x: f32, scale_y: f32) {
        for kp in &mut self.keypoints {
            kp.x *= scale_x;
            kp.y *= scale_y;
        }
    }

    /// Reorder an 18-joint OpenPose skeleton into the 17-joint COCO layout.
    ///
    /// The neck slot has no COCO counterpart and is dropped.
    ///
    /// # Returns
    ///
    /// * `None` if the pose does not have exactly 18 slots.
    #[must_use]
    pub fn to_coco17(&self) -> Option<Self> {
        if self.keypoints.len() != OPENPOSE_TO_COCO.len() {
            return None;
        }
        let mut coco = Self::empty(17);
        for (kp, target) in self.keypoints.iter().zip(OPENPOSE_TO_COCO) {
            if let Some(target) = target {
                coco.keypoints[target] = *kp;
            }
        }
        Some(coco)
    }
}

/// Poses and their overall scores, kept as parallel sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseSet {
    /// Assembled poses in creation order.
    pub poses: Vec<Pose>,
    /// Overall score per pose (same length as `poses`).
    pub scores: Vec<f32>,
}

impl PoseSet {
    /// Number of poses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Check if no pose was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Iterate over `(pose, score)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Pose, f32)> {
        self.poses.iter().zip(self.scores.iter().copied())
    }

    /// Keep only poses whose score is at least `threshold`.
    #[must_use]
    pub fn filter_by_score(self, threshold: f32) -> Self {
        let (poses, scores) = self
            .poses
            .into_iter()
            .zip(self.scores)
            .filter(|(_, score)| *score >= threshold)
            .unzip();
        Self { poses, scores }
    }

    /// Convert every 18-joint pose to the COCO 17-joint layout.
    ///
    /// Poses with a different joint count are left unchanged.
    #[must_use]
    pub fn to_coco17(&self) -> Self {
        Self {
            poses: self
                .poses
                .iter()
                .map(|pose| pose.to_coco17().unwrap_or_else(|| pose.clone()))
                .collect(),
            scores: self.scores.clone(),
        }
    }
}

/// Generate a log string describing detections (e.g., "2 persons, 1 car, ").
///
/// Classes appear in the order they are first seen. Labels without a name are
/// printed as their numeric id.
#[must_use]
pub fn summarize_detections(detections: &[Detection], names: &HashMap<usize, String>) -> String {
    if detections.is_empty() {
        return "(no detections), ".to_string();
    }

    let mut order: Vec<usize> = Vec::new();
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for det in detections {
        let count = counts.entry(det.label).or_insert(0);
        if *count == 0 {
            order.push(det.label);
        }
        *count += 1;
    }

    let parts: Vec<String> = order
        .iter()
        .map(|label| {
            let count = counts[label];
            let name = names
                .get(label)
                .map_or_else(|| label.to_string(), std::clone::Clone::clone);
            if count > 1 {
                format!("{count} {}", pluralize(&name))
            } else {
                format!("{count} {name}")
            }
        })
        .collect();
    format!("{}, ", parts.join(", "))
}

/// Generate a log string describing poses (e.g., "3 poses, ").
#[must_use]
pub fn summarize_poses(poses: &PoseSet) -> String {
    match poses.len() {
        0 => "(no poses), ".to_string(),
        1 => "1 pose, ".to_string(),
        n => format!("{n} poses, "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed() {
        let speed = Speed::new(10.0, 20.0, 5.0);
        assert!((speed.total() - 35.0).abs() < 1e-6);
        assert!((Speed::default().total()).abs() < 1e-9);
    }

    #[test]
    fn test_bounding_box_clamps_negative_extent() {
        let bbox = BoundingBox::new(10.0, 20.0, -5.0, 30.0);
        assert!(bbox.width.abs() < f32::EPSILON);
        assert!(bbox.area().abs() < f32::EPSILON);
        assert_eq!(bbox.xyxy(), [10.0, 20.0, 10.0, 50.0]);
    }

    #[test]
    fn test_detection_center_and_area() {
        let det = Detection::new(1, 0.9, BoundingBox::new(10.0, 20.0, 20.0, 20.0));
        assert_eq!(det.center(), (20.0, 30.0));
        assert!((det.area() - 400.0).abs() < 1e-6);
    }

    #[test]
    fn test_pose_visibility() {
        let mut pose = Pose::empty(4);
        pose.keypoints[1] = Keypoint::new(3.0, 4.0, 0.5);
        pose.keypoints[3] = Keypoint::new(1.0, 2.0, 0.7);

        assert_eq!(pose.len(), 4);
        assert_eq!(pose.num_visible(), 2);
        assert!(pose.joint(0).is_none());
        assert!(pose.joint(1).is_some());
        assert!((pose.mean_confidence() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_pose_rescale_keeps_confidence() {
        let mut pose = Pose::empty(2);
        pose.keypoints[0] = Keypoint::new(2.0, 3.0, 0.8);
        pose.rescale(2.0, 10.0);
        assert_eq!(pose.keypoints[0], Keypoint::new(4.0, 30.0, 0.8));
        assert_eq!(pose.keypoints[1], Keypoint::MISSING);
    }

    #[test]
    fn test_to_coco17_drops_neck() {
        let mut pose = Pose::empty(18);
        for (i, kp) in pose.keypoints.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let v = i as f32;
            *kp = Keypoint::new(v, v, 0.5);
        }
        let coco = pose.to_coco17().unwrap();
        assert_eq!(coco.len(), 17);
        // OpenPose nose (0) stays COCO nose (0)
        assert!((coco.keypoints[0].x - 0.0).abs() < f32::EPSILON);
        // OpenPose right shoulder (2) becomes COCO right shoulder (6)
        assert!((coco.keypoints[6].x - 2.0).abs() < f32::EPSILON);
        // OpenPose left ear (17) becomes COCO left ear (3)
        assert!((coco.keypoints[3].x - 17.0).abs() < f32::EPSILON);
        assert!(coco.keypoints.iter().all(|kp| (kp.x - 1.0).abs() > f32::EPSILON));

        assert!(Pose::empty(17).to_coco17().is_none());
    }

    #[test]
    fn test_pose_set_filter() {
        let set = PoseSet {
            poses: vec![Pose::empty(2), Pose::empty(2), Pose::empty(2)],
            scores: vec![0.5, 2.0, 1.0],
        };
        let kept = set.filter_by_score(1.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept.scores, vec![2.0, 1.0]);
    }

    #[test]
    fn test_summaries() {
        let names = HashMap::from([(1, "person".to_string()), (3, "car".to_string())]);
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let dets = vec![
            Detection::new(1, 0.9, bbox),
            Detection::new(3, 0.8, bbox),
            Detection::new(1, 0.7, bbox),
            Detection::new(99, 0.7, bbox),
        ];
        assert_eq!(summarize_detections(&dets, &names), "2 persons, 1 car, 1 99, ");
        assert_eq!(summarize_detections(&[], &names), "(no detections), ");
        assert_eq!(summarize_poses(&PoseSet::default()), "(no poses), ");
    }
}
