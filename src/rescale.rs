// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Mapping from heatmap grid coordinates to frame pixels.

use crate::error::{DecodeError, Result};
use crate::results::{Pose, PoseSet};

/// Per-axis scale from a heatmap grid to a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescaler {
    scale_x: f32,
    scale_y: f32,
}

impl Rescaler {
    /// Create a rescaler from grid (width, height) to frame (width, height).
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidInput`] if either grid dimension is zero.
    pub fn new(grid: (usize, usize), frame: (u32, u32)) -> Result<Self> {
        if grid.0 == 0 || grid.1 == 0 {
            return Err(DecodeError::InvalidInput(format!(
                "heatmap grid must be non-empty, got {}x{}",
                grid.0, grid.1
            )));
        }
        #[allow(clippy::cast_precision_loss)]
        let (scale_x, scale_y) = (
            frame.0 as f32 / grid.0 as f32,
            frame.1 as f32 / grid.1 as f32,
        );
        Ok(Self { scale_x, scale_y })
    }

    /// Horizontal and vertical scale factors.
    #[must_use]
    pub const fn scale(&self) -> (f32, f32) {
        (self.scale_x, self.scale_y)
    }

    /// Return rescaled copies of `poses`; the input is left untouched.
    #[must_use]
    pub fn apply(&self, poses: &[Pose]) -> Vec<Pose> {
        poses
            .iter()
            .map(|pose| {
                let mut scaled = pose.clone();
                scaled.rescale(self.scale_x, self.scale_y);
                scaled
            })
            .collect()
    }

    /// Rescale an owned pose set in place. Scores are unchanged.
    #[must_use]
    pub fn apply_set(&self, mut set: PoseSet) -> PoseSet {
        for pose in &mut set.poses {
            pose.rescale(self.scale_x, self.scale_y);
        }
        set
    }
}

/// Rescale poses from a grid of `grid` (width, height) to a frame of `frame` pixels.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidInput`] if either grid dimension is zero.
pub fn rescale_poses(poses: &[Pose], grid: (usize, usize), frame: (u32, u32)) -> Result<Vec<Pose>> {
    Ok(Rescaler::new(grid, frame)?.apply(poses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Keypoint;

    fn sample() -> Pose {
        let mut pose = Pose::empty(3);
        pose.keypoints[0] = Keypoint::new(10.0, 5.0, 0.9);
        pose.keypoints[2] = Keypoint::new(3.5, 7.25, 0.4);
        pose
    }

    #[test]
    fn test_identity() {
        let poses = vec![sample()];
        let scaled = rescale_poses(&poses, (57, 32), (57, 32)).unwrap();
        assert_eq!(scaled, poses);
    }

    #[test]
    fn test_per_axis_scale() {
        let rescaler = Rescaler::new((57, 32), (456, 256)).unwrap();
        assert_eq!(rescaler.scale(), (8.0, 8.0));

        let rescaler = Rescaler::new((10, 20), (40, 10)).unwrap();
        let scaled = rescaler.apply(&[sample()]);
        assert_eq!(scaled[0].keypoints[0], Keypoint::new(40.0, 2.5, 0.9));
        assert_eq!(scaled[0].keypoints[1], Keypoint::MISSING);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let poses = vec![sample()];
        let _ = Rescaler::new((10, 10), (100, 100)).unwrap().apply(&poses);
        assert_eq!(poses[0], sample());
    }

    #[test]
    fn test_apply_set_keeps_scores() {
        let set = PoseSet {
            poses: vec![sample()],
            scores: vec![3.5],
        };
        let scaled = Rescaler::new((10, 10), (20, 30)).unwrap().apply_set(set);
        assert_eq!(scaled.scores, vec![3.5]);
        assert_eq!(scaled.poses[0].keypoints[0], Keypoint::new(20.0, 15.0, 0.9));
    }

    #[test]
    fn test_zero_grid() {
        assert!(matches!(
            Rescaler::new((0, 10), (100, 100)),
            Err(DecodeError::InvalidInput(_))
        ));
        assert!(rescale_poses(&[], (10, 0), (100, 100)).is_err());
    }
}
