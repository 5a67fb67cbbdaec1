// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Heatmap peak extraction.
//!
//! A cell is a peak when it equals the 3×3 max-pooled value at the same
//! position (stride 1, zero padding). Every other cell is zeroed, which leaves
//! a sparse heatmap from which explicit [`JointCandidate`]s are read.

use std::cmp::Ordering;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

use crate::config::PoseConfig;
use crate::error::{DecodeError, Result};

/// A heatmap peak that may become a pose joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointCandidate {
    /// Global discovery index across all joint types of a frame.
    pub id: usize,
    /// Joint type (heatmap channel).
    pub joint_type: usize,
    /// Horizontal position in heatmap grid coordinates.
    pub x: f32,
    /// Vertical position in heatmap grid coordinates.
    pub y: f32,
    /// Heatmap value at the peak.
    pub score: f32,
}

/// 3×3 max pooling with stride 1 and zero padding of 1.
///
/// The output has the same shape as the input. Border cells see the zero
/// padding, so a negative border value is never its own pooled maximum.
#[must_use]
pub fn max_pool_3x3(channel: ArrayView2<f32>) -> Array2<f32> {
    let (h, w) = channel.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let mut pooled = f32::NEG_INFINITY;
        for ny in y.saturating_sub(1)..=(y + 1) {
            for nx in x.saturating_sub(1)..=(x + 1) {
                let value = if ny < h && nx < w { channel[[ny, nx]] } else { 0.0 };
                pooled = pooled.max(value);
            }
        }
        if y == 0 || x == 0 {
            pooled = pooled.max(0.0);
        }
        pooled
    })
}

/// Zero every cell that is not a local maximum of its channel.
///
/// Plateaus of equal values are kept in full. NaN cells become 0.
#[must_use]
pub fn suppress_non_peaks(heatmaps: ArrayView3<f32>) -> Array3<f32> {
    let mut peaks = Array3::zeros(heatmaps.raw_dim());
    for (channel, mut out) in heatmaps.axis_iter(Axis(0)).zip(peaks.axis_iter_mut(Axis(0))) {
        let pooled = max_pool_3x3(channel);
        ndarray::Zip::from(&mut out)
            .and(&channel)
            .and(&pooled)
            .for_each(|o, &value, &max| {
                if value == max {
                    *o = value;
                }
            });
    }
    peaks
}

/// Read joint candidates from a peak mask.
///
/// # Arguments
///
/// * `heatmaps` - Original `[J, H, W]` heatmaps, used for sub-cell refinement.
/// * `peaks` - Output of [`suppress_non_peaks`] for the same heatmaps.
/// * `num_joints` - Joint types to read; extra channels (e.g. background) are ignored.
/// * `config` - Threshold, per-joint cap, refinement and offset settings.
///
/// # Returns
///
/// One list per joint type, highest score first (raster order on ties), with
/// ids assigned in that order across joint types.
///
/// # Errors
///
/// Returns [`DecodeError::ShapeMismatch`] if the two arrays differ in shape or
/// hold fewer than `num_joints` channels.
pub fn extract_candidates(
    heatmaps: ArrayView3<f32>,
    peaks: ArrayView3<f32>,
    num_joints: usize,
    config: &PoseConfig,
) -> Result<Vec<Vec<JointCandidate>>> {
    if heatmaps.shape() != peaks.shape() {
        return Err(DecodeError::shape(
            format!("peak mask with heatmap shape {:?}", heatmaps.shape()),
            peaks.shape(),
        ));
    }
    let (channels, h, w) = heatmaps.dim();
    if channels < num_joints {
        return Err(DecodeError::shape(
            format!("at least {num_joints} heatmap channels"),
            heatmaps.shape(),
        ));
    }

    #[allow(clippy::cast_precision_loss)]
    let (max_x, max_y) = (w.saturating_sub(1) as f32, h.saturating_sub(1) as f32);

    let mut next_id = 0;
    let mut all = Vec::with_capacity(num_joints);
    for joint_type in 0..num_joints {
        let channel = peaks.index_axis(Axis(0), joint_type);
        let source = heatmaps.index_axis(Axis(0), joint_type);

        let mut cells: Vec<(usize, usize, f32)> = channel
            .indexed_iter()
            .filter(|(_, &score)| score > config.peak_threshold)
            .map(|((y, x), &score)| (y, x, score))
            .collect();
        cells.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(Ordering::Equal));
        cells.truncate(config.max_peaks_per_joint);

        let mut joint = Vec::with_capacity(cells.len());
        for (y, x, score) in cells {
            #[allow(clippy::cast_precision_loss)]
            let (mut fx, mut fy) = (x as f32, y as f32);
            if config.refine_peaks {
                if x > 0 && x + 1 < w {
                    fx += 0.25 * step(source[[y, x + 1]] - source[[y, x - 1]]);
                }
                if y > 0 && y + 1 < h {
                    fy += 0.25 * step(source[[y + 1, x]] - source[[y - 1, x]]);
                }
            }
            joint.push(JointCandidate {
                id: next_id,
                joint_type,
                x: (fx + config.position_offset).clamp(0.0, max_x),
                y: (fy + config.position_offset).clamp(0.0, max_y),
                score,
            });
            next_id += 1;
        }
        all.push(joint);
    }

    Ok(all)
}

// Sign of a neighbour difference, 0 for ties and NaN.
fn step(diff: f32) -> f32 {
    if diff > 0.0 {
        1.0
    } else if diff < 0.0 {
        -1.0
    } else {
        0.0
    }
}
