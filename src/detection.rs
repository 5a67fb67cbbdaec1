// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detection decoding and suppression.
//!
//! SSD-style detection heads emit rows of
//! `(batch, label, score, xmin, ymin, xmax, ymax)` with coordinates normalized
//! to `[0, 1]`. [`DetectionDecoder`] turns those rows into pixel-space
//! [`Detection`]s, drops low-score rows and removes redundant overlapping boxes
//! with greedy NMS.

use std::collections::HashMap;

use ndarray::ArrayView2;

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::labels::{label_map, COCO_LABELS};
use crate::results::{summarize_detections, BoundingBox, Detection};
use crate::tensor::{rows_view, RawTensor};
use crate::utils::{nms, nms_per_class};

/// Number of values per detection row.
pub const DETECTION_ROW_LEN: usize = 7;

/// Decoder for normalized detection rows.
///
/// # Example
///
/// ```rust
/// use vision_decode::{DetectionConfig, DetectionDecoder};
///
/// let decoder = DetectionDecoder::new(DetectionConfig::default())?;
/// let rows = vec![
///     0.0, 1.0, 0.9, 0.1, 0.1, 0.5, 0.5,
///     0.0, 3.0, 0.4, 0.2, 0.2, 0.3, 0.3,
/// ];
/// let detections = decoder.decode(&rows, &[1, 1, 2, 7], (640, 480))?;
/// assert_eq!(detections.len(), 1);
/// assert_eq!(decoder.label_name(detections[0].label), Some("person"));
/// # Ok::<(), vision_decode::DecodeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DetectionDecoder {
    config: DetectionConfig,
    names: HashMap<usize, String>,
}

impl DetectionDecoder {
    /// Create a decoder using the COCO class-name table.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::ConfigError`] if a threshold is outside `[0, 1]`.
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            names: label_map(&COCO_LABELS),
        })
    }

    /// Replace the class-name table.
    #[must_use]
    pub fn with_names(mut self, names: HashMap<usize, String>) -> Self {
        self.names = names;
        self
    }

    /// Decoder configuration.
    #[must_use]
    pub const fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Class id to name mapping.
    #[must_use]
    pub const fn names(&self) -> &HashMap<usize, String> {
        &self.names
    }

    /// Name of a class id, if known.
    #[must_use]
    pub fn label_name(&self, label: usize) -> Option<&str> {
        self.names.get(&label).map(String::as_str)
    }

    /// Short summary of decoded detections, e.g. "2 persons, 1 car, ".
    #[must_use]
    pub fn summarize(&self, detections: &[Detection]) -> String {
        summarize_detections(detections, &self.names)
    }

    /// Decode a flat detection output.
    ///
    /// # Arguments
    ///
    /// * `output` - Flat row-major values.
    /// * `shape` - `[N, 7]` or `[1, .., 1, N, 7]`.
    /// * `frame_size` - Original frame (width, height) in pixels.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::ShapeMismatch`] if the shape breaks the row contract.
    pub fn decode(
        &self,
        output: &[f32],
        shape: &[usize],
        frame_size: (u32, u32),
    ) -> Result<Vec<Detection>> {
        let rows = rows_view(output, shape, DETECTION_ROW_LEN)?;
        Ok(self.decode_rows(rows, frame_size))
    }

    /// Decode a [`RawTensor`] detection output.
    ///
    /// # Errors
    ///
    /// Returns [`crate::DecodeError::ShapeMismatch`] if the shape breaks the row contract.
    pub fn decode_tensor(&self, tensor: &RawTensor, frame_size: (u32, u32)) -> Result<Vec<Detection>> {
        let rows = tensor.view_rows(DETECTION_ROW_LEN)?;
        Ok(self.decode_rows(rows, frame_size))
    }

    /// Decode already shaped `[N, 7]` rows.
    ///
    /// Reading stops at the first row with a negative batch index. Rows with
    /// non-finite values or a score below the threshold are dropped before NMS.
    #[must_use]
    pub fn decode_rows(&self, rows: ArrayView2<f32>, frame_size: (u32, u32)) -> Vec<Detection> {
        #[allow(clippy::cast_precision_loss)]
        let (frame_w, frame_h) = (frame_size.0 as f32, frame_size.1 as f32);

        let mut candidates = Vec::new();
        for row in rows.outer_iter() {
            // Runtimes pad the output with rows whose batch index is -1
            if row[0] < 0.0 {
                break;
            }
            if row.iter().any(|v| !v.is_finite()) {
                continue;
            }

            let score = row[2];
            if score < self.config.score_threshold {
                continue;
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let label = row[1].max(0.0) as usize;
            let (xmin, ymin, xmax, ymax) = (row[3], row[4], row[5], row[6]);
            let bbox = BoundingBox::new(
                xmin * frame_w,
                ymin * frame_h,
                (xmax - xmin) * frame_w,
                (ymax - ymin) * frame_h,
            );
            candidates.push(Detection::new(label, score, bbox));
        }

        self.suppress(&candidates)
    }

    /// Run greedy NMS over already decoded detections.
    ///
    /// Detections below the score threshold are dropped first. The result is
    /// in selection order and truncated to `max_detections`.
    #[must_use]
    pub fn suppress(&self, detections: &[Detection]) -> Vec<Detection> {
        let candidates: Vec<&Detection> = detections
            .iter()
            .filter(|det| det.score >= self.config.score_threshold)
            .collect();
        if candidates.is_empty() {
            return Vec::new();
        }

        let keep = if self.config.class_agnostic {
            let boxes: Vec<_> = candidates.iter().map(|det| (det.bbox, det.score)).collect();
            nms(&boxes, self.config.nms_threshold)
        } else {
            let boxes: Vec<_> = candidates
                .iter()
                .map(|det| (det.bbox, det.score, det.label))
                .collect();
            nms_per_class(&boxes, self.config.nms_threshold)
        };

        keep.into_iter()
            .take(self.config.max_detections)
            .map(|idx| *candidates[idx])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use ndarray::array;

    fn decoder() -> DetectionDecoder {
        DetectionDecoder::new(DetectionConfig::default()).unwrap()
    }

    #[test]
    fn test_pixel_conversion() {
        let rows = array![[0.0, 1.0, 0.9, 0.1, 0.2, 0.5, 0.6]];
        let dets = decoder().decode_rows(rows.view(), (200, 100));
        assert_eq!(dets.len(), 1);
        let bbox = dets[0].bbox;
        assert!((bbox.x - 20.0).abs() < 1e-4);
        assert!((bbox.y - 20.0).abs() < 1e-4);
        assert!((bbox.width - 80.0).abs() < 1e-4);
        assert!((bbox.height - 40.0).abs() < 1e-4);
        assert_eq!(dets[0].label, 1);
    }

    #[test]
    fn test_score_threshold_is_inclusive() {
        let rows = array![
            [0.0, 1.0, 0.6, 0.1, 0.1, 0.2, 0.2],
            [0.0, 1.0, 0.59, 0.5, 0.5, 0.6, 0.6],
        ];
        let dets = decoder().decode_rows(rows.view(), (100, 100));
        assert_eq!(dets.len(), 1);
        assert!((dets[0].score - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_padding_row_terminates() {
        let rows = array![
            [0.0, 1.0, 0.9, 0.1, 0.1, 0.2, 0.2],
            [-1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            [0.0, 2.0, 0.9, 0.5, 0.5, 0.6, 0.6],
        ];
        let dets = decoder().decode_rows(rows.view(), (100, 100));
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, 1);
    }

    #[test]
    fn test_non_finite_rows_are_skipped() {
        let rows = array![
            [0.0, 1.0, f32::NAN, 0.1, 0.1, 0.2, 0.2],
            [0.0, 1.0, 0.9, f32::INFINITY, 0.1, 0.2, 0.2],
            [0.0, 2.0, 0.8, 0.5, 0.5, 0.6, 0.6],
        ];
        let dets = decoder().decode_rows(rows.view(), (100, 100));
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].label, 2);
    }

    #[test]
    fn test_inverted_box_has_zero_extent() {
        let rows = array![[0.0, 1.0, 0.9, 0.5, 0.5, 0.4, 0.4]];
        let dets = decoder().decode_rows(rows.view(), (100, 100));
        assert_eq!(dets.len(), 1);
        assert!(dets[0].bbox.width.abs() < f32::EPSILON);
        assert!(dets[0].bbox.height.abs() < f32::EPSILON);
    }

    #[test]
    fn test_selection_order() {
        // Disjoint boxes come back by descending score
        let rows = array![
            [0.0, 1.0, 0.7, 0.0, 0.0, 0.1, 0.1],
            [0.0, 1.0, 0.95, 0.5, 0.5, 0.6, 0.6],
            [0.0, 1.0, 0.8, 0.8, 0.8, 0.9, 0.9],
        ];
        let dets = decoder().decode_rows(rows.view(), (100, 100));
        let scores: Vec<f32> = dets.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.95, 0.8, 0.7]);
    }

    #[test]
    fn test_class_agnostic_vs_per_class() {
        let rows = array![
            [0.0, 1.0, 0.9, 0.1, 0.1, 0.5, 0.5],
            [0.0, 2.0, 0.8, 0.1, 0.1, 0.5, 0.5],
        ];
        let agnostic = decoder().decode_rows(rows.view(), (100, 100));
        assert_eq!(agnostic.len(), 1);

        let per_class = DetectionDecoder::new(DetectionConfig::new().with_class_agnostic(false))
            .unwrap()
            .decode_rows(rows.view(), (100, 100));
        assert_eq!(per_class.len(), 2);
    }

    #[test]
    fn test_max_detections() {
        let rows = array![
            [0.0, 1.0, 0.9, 0.0, 0.0, 0.1, 0.1],
            [0.0, 1.0, 0.8, 0.5, 0.5, 0.6, 0.6],
        ];
        let decoder = DetectionDecoder::new(DetectionConfig::new().with_max_detections(1)).unwrap();
        assert_eq!(decoder.decode_rows(rows.view(), (100, 100)).len(), 1);
    }

    #[test]
    fn test_decode_rejects_bad_shape() {
        let err = decoder().decode(&[0.0; 12], &[2, 6], (100, 100)).unwrap_err();
        assert!(matches!(err, DecodeError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_decode_empty() {
        let dets = decoder().decode(&[], &[1, 1, 0, 7], (100, 100)).unwrap();
        assert!(dets.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        assert!(DetectionDecoder::new(DetectionConfig::new().with_nms_threshold(2.0)).is_err());
    }

    #[test]
    fn test_names() {
        let decoder = decoder().with_names(HashMap::from([(7, "widget".to_string())]));
        assert_eq!(decoder.label_name(7), Some("widget"));
        assert_eq!(decoder.label_name(1), None);
    }
}
