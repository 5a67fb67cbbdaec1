// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decoding and session configuration.
//!
//! This module defines the builder-style configuration structs used by the
//! detection decoder ([`DetectionConfig`]), the pose assembler ([`PoseConfig`])
//! and the ONNX Runtime session ([`SessionConfig`]).

use crate::error::{DecodeError, Result};
use crate::preprocessing::ChannelOrder;

/// Configuration for detection decoding and suppression.
///
/// # Example
///
/// ```rust
/// use vision_decode::DetectionConfig;
///
/// let config = DetectionConfig::new()
///     .with_score_threshold(0.5)
///     .with_nms_threshold(0.45)
///     .with_max_detections(100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Minimum score for a row to be kept (0.0 to 1.0).
    /// Rows with scores lower than this value are discarded before NMS.
    pub score_threshold: f32,
    /// Intersection over Union (IoU) threshold for Non-Maximum Suppression (NMS) (0.0 to 1.0).
    /// A box is suppressed when its IoU with an already selected box is strictly greater.
    pub nms_threshold: f32,
    /// Maximum number of detections to return per frame.
    pub max_detections: usize,
    /// Suppress across classes (`true`) or only within the same class (`false`).
    pub class_agnostic: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            score_threshold: 0.6,
            nms_threshold: 0.6,
            max_detections: 300,
            class_agnostic: true,
        }
    }
}

impl DetectionConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the score threshold.
    #[must_use]
    pub const fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Set the IoU threshold for Non-Maximum Suppression (NMS).
    #[must_use]
    pub const fn with_nms_threshold(mut self, threshold: f32) -> Self {
        self.nms_threshold = threshold;
        self
    }

    /// Set the maximum number of detections to return.
    #[must_use]
    pub const fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = max;
        self
    }

    /// Choose between class-agnostic and per-class suppression.
    #[must_use]
    pub const fn with_class_agnostic(mut self, agnostic: bool) -> Self {
        self.class_agnostic = agnostic;
        self
    }

    /// Check that every threshold is a finite value in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConfigError`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        check_unit("score_threshold", self.score_threshold)?;
        check_unit("nms_threshold", self.nms_threshold)
    }
}

/// Configuration for heatmap peak extraction and PAF pose assembly.
///
/// Defaults follow the OpenPose decoder used with `human-pose-estimation`
/// models: peaks above 0.1, ten samples per limb, 0.05 minimum alignment,
/// more than 80% of the samples on support, at least three joints and an
/// average of 0.2 per filled joint.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseConfig {
    /// Heatmap peaks with a value at or below this floor are not joint candidates.
    pub peak_threshold: f32,
    /// Maximum number of candidates kept per joint type (highest scores first).
    pub max_peaks_per_joint: usize,
    /// Apply the quarter-pixel refinement toward the higher neighbouring cell.
    pub refine_peaks: bool,
    /// Constant offset added to candidate coordinates (cell center correction).
    pub position_offset: f32,
    /// Number of evenly spaced samples along a candidate limb.
    pub points_per_limb: usize,
    /// A sample is on support when its PAF alignment is strictly above this value.
    pub min_paf_alignment: f32,
    /// A limb is accepted only if the on-support ratio is strictly above this value.
    pub min_support_ratio: f32,
    /// Poses with fewer filled joint slots are discarded.
    pub min_joints: usize,
    /// Poses whose accumulated (joint + limb) score divided by the number of
    /// filled joints is below this floor are discarded.
    pub min_average_score: f32,
    /// Poses whose mean joint confidence is below this floor are discarded.
    pub min_mean_confidence: f32,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            peak_threshold: 0.1,
            max_peaks_per_joint: 100,
            refine_peaks: true,
            position_offset: 0.5,
            points_per_limb: 10,
            min_paf_alignment: 0.05,
            min_support_ratio: 0.8,
            min_joints: 3,
            min_average_score: 0.2,
            min_mean_confidence: 0.0,
        }
    }
}

impl PoseConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the joint candidate score floor.
    #[must_use]
    pub const fn with_peak_threshold(mut self, threshold: f32) -> Self {
        self.peak_threshold = threshold;
        self
    }

    /// Set the maximum number of candidates per joint type.
    #[must_use]
    pub const fn with_max_peaks(mut self, max: usize) -> Self {
        self.max_peaks_per_joint = max;
        self
    }

    /// Enable or disable quarter-pixel peak refinement.
    #[must_use]
    pub const fn with_refinement(mut self, refine: bool) -> Self {
        self.refine_peaks = refine;
        self
    }

    /// Set the constant coordinate offset applied to candidates.
    #[must_use]
    pub const fn with_position_offset(mut self, offset: f32) -> Self {
        self.position_offset = offset;
        self
    }

    /// Set the number of PAF samples per candidate limb.
    #[must_use]
    pub const fn with_points_per_limb(mut self, points: usize) -> Self {
        self.points_per_limb = points;
        self
    }

    /// Set the minimum per-sample PAF alignment.
    #[must_use]
    pub const fn with_min_paf_alignment(mut self, alignment: f32) -> Self {
        self.min_paf_alignment = alignment;
        self
    }

    /// Set the minimum on-support sample ratio.
    #[must_use]
    pub const fn with_min_support_ratio(mut self, ratio: f32) -> Self {
        self.min_support_ratio = ratio;
        self
    }

    /// Set the minimum number of joints for a valid pose.
    #[must_use]
    pub const fn with_min_joints(mut self, joints: usize) -> Self {
        self.min_joints = joints;
        self
    }

    /// Set the minimum accumulated score per filled joint for a valid pose.
    #[must_use]
    pub const fn with_min_average_score(mut self, score: f32) -> Self {
        self.min_average_score = score;
        self
    }

    /// Set the minimum mean joint confidence for a valid pose.
    #[must_use]
    pub const fn with_min_mean_confidence(mut self, confidence: f32) -> Self {
        self.min_mean_confidence = confidence;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConfigError`] if fewer than two points are sampled per
    /// limb, a threshold is not finite, or the peak threshold is negative.
    pub fn validate(&self) -> Result<()> {
        if self.points_per_limb < 2 {
            return Err(DecodeError::ConfigError(format!(
                "points_per_limb must be at least 2, got {}",
                self.points_per_limb
            )));
        }
        for (name, value) in [
            ("peak_threshold", self.peak_threshold),
            ("position_offset", self.position_offset),
            ("min_paf_alignment", self.min_paf_alignment),
            ("min_average_score", self.min_average_score),
            ("min_mean_confidence", self.min_mean_confidence),
        ] {
            if !value.is_finite() {
                return Err(DecodeError::ConfigError(format!("{name} must be finite, got {value}")));
            }
        }
        // Candidates at or below zero would fill slots that read back as missing
        if self.peak_threshold < 0.0 {
            return Err(DecodeError::ConfigError(format!(
                "peak_threshold must be non-negative, got {}",
                self.peak_threshold
            )));
        }
        check_unit("min_support_ratio", self.min_support_ratio)
    }
}

/// Configuration for an ONNX Runtime inference session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Model input size (height, width). Frames are resized to this size.
    pub input_size: (usize, usize),
    /// Number of intra-op threads for ONNX Runtime.
    /// Setting this to `0` allows ONNX Runtime to choose the optimal number.
    pub num_threads: usize,
    /// Channel order the model expects.
    pub channel_order: ChannelOrder,
    /// Explicit output name for detections (detection models).
    pub detection_output: Option<String>,
    /// Explicit output names for (heatmaps, pafs) (pose models).
    pub pose_outputs: Option<(String, String)>,
}

impl SessionConfig {
    /// Create a configuration for a model with the given input size (height, width).
    #[must_use]
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            input_size: (height, width),
            num_threads: 0,
            channel_order: ChannelOrder::Bgr,
            detection_output: None,
            pose_outputs: None,
        }
    }

    /// Set the number of threads for inference.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Set the channel order of the model input.
    #[must_use]
    pub const fn with_channel_order(mut self, order: ChannelOrder) -> Self {
        self.channel_order = order;
        self
    }

    /// Name the output that carries detection rows.
    #[must_use]
    pub fn with_detection_output(mut self, name: impl Into<String>) -> Self {
        self.detection_output = Some(name.into());
        self
    }

    /// Name the heatmap and PAF outputs of a pose model.
    #[must_use]
    pub fn with_pose_outputs(mut self, heatmaps: impl Into<String>, pafs: impl Into<String>) -> Self {
        self.pose_outputs = Some((heatmaps.into(), pafs.into()));
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConfigError`] if the input size has a zero dimension.
    pub fn validate(&self) -> Result<()> {
        if self.input_size.0 == 0 || self.input_size.1 == 0 {
            return Err(DecodeError::ConfigError(format!(
                "input size must be non-zero, got {:?}",
                self.input_size
            )));
        }
        Ok(())
    }
}

fn check_unit(name: &str, value: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(DecodeError::ConfigError(format!(
            "{name} must be in [0, 1], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_config_default() {
        let config = DetectionConfig::default();
        assert!((config.score_threshold - 0.6).abs() < f32::EPSILON);
        assert!((config.nms_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.max_detections, 300);
        assert!(config.class_agnostic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_detection_config_builder() {
        let config = DetectionConfig::new()
            .with_score_threshold(0.5)
            .with_nms_threshold(0.45)
            .with_max_detections(10)
            .with_class_agnostic(false);

        assert!((config.score_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.nms_threshold - 0.45).abs() < f32::EPSILON);
        assert_eq!(config.max_detections, 10);
        assert!(!config.class_agnostic);
    }

    #[test]
    fn test_detection_config_rejects_out_of_range() {
        let config = DetectionConfig::new().with_score_threshold(1.5);
        assert!(matches!(config.validate(), Err(DecodeError::ConfigError(_))));

        let config = DetectionConfig::new().with_nms_threshold(f32::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pose_config_validate() {
        assert!(PoseConfig::default().validate().is_ok());
        assert!(PoseConfig::new().with_points_per_limb(1).validate().is_err());
        assert!(PoseConfig::new().with_peak_threshold(f32::INFINITY).validate().is_err());
        assert!(PoseConfig::new().with_min_support_ratio(-0.1).validate().is_err());
        assert!(PoseConfig::new().with_min_average_score(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_pose_config_rejects_negative_peak_threshold() {
        let config = PoseConfig::new().with_peak_threshold(-1.0);
        assert!(matches!(config.validate(), Err(DecodeError::ConfigError(_))));
        assert!(PoseConfig::new().with_peak_threshold(0.0).validate().is_ok());
    }

    #[test]
    fn test_pose_config_default_floors() {
        let config = PoseConfig::default();
        assert_eq!(config.min_joints, 3);
        assert!((config.min_average_score - 0.2).abs() < f32::EPSILON);
        assert!(config.min_mean_confidence.abs() < f32::EPSILON);
    }

    #[test]
    fn test_session_config() {
        let config = SessionConfig::new(256, 456)
            .with_threads(4)
            .with_pose_outputs("heat", "paf");
        assert_eq!(config.input_size, (256, 456));
        assert_eq!(config.num_threads, 4);
        assert_eq!(config.channel_order, ChannelOrder::Bgr);
        assert_eq!(config.pose_outputs, Some(("heat".to_string(), "paf".to_string())));
        assert!(config.validate().is_ok());
        assert!(SessionConfig::new(0, 10).validate().is_err());
    }
}
