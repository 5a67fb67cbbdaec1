// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Part affinity field limb scoring and per-limb greedy matching.

use std::cmp::Ordering;

use ndarray::ArrayView3;

use crate::config::PoseConfig;
use crate::heatmap::JointCandidate;

const EPS: f32 = 1e-6;

/// An accepted connection between two joint candidates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimbConnection {
    /// Limb index in the skeleton.
    pub limb: usize,
    /// Candidate id of the limb's first joint.
    pub from: usize,
    /// Candidate id of the limb's second joint.
    pub to: usize,
    /// PAF line-integral score.
    pub score: f32,
}

/// Score the limb `a -> b` by sampling the PAF along the segment between them.
///
/// `points_per_limb` evenly spaced samples are taken, each rounded to the
/// nearest grid cell (ties to even) and clamped to the grid. A sample is on
/// support when the field's dot product with the unit vector `a -> b` is
/// strictly above `min_paf_alignment`.
///
/// # Returns
///
/// The mean dot product over on-support samples, or `None` when the limb is
/// rejected (zero length, non-positive score, too few samples on support, or
/// channels outside the PAF tensor).
#[must_use]
pub fn score_limb(
    pafs: ArrayView3<f32>,
    channels: [usize; 2],
    a: &JointCandidate,
    b: &JointCandidate,
    config: &PoseConfig,
) -> Option<f32> {
    let (num_channels, h, w) = pafs.dim();
    let [cx, cy] = channels;
    if cx >= num_channels || cy >= num_channels || h == 0 || w == 0 {
        return None;
    }

    let (vx, vy) = (b.x - a.x, b.y - a.y);
    let norm = vx.hypot(vy);
    if !norm.is_finite() || norm <= 0.0 {
        return None;
    }
    let (ux, uy) = (vx / (norm + EPS), vy / (norm + EPS));

    let points = config.points_per_limb;
    #[allow(clippy::cast_precision_loss)]
    let (last, max_x, max_y) = (points.saturating_sub(1).max(1) as f32, (w - 1) as f32, (h - 1) as f32);

    let mut total = 0.0_f32;
    let mut on_support = 0_usize;
    for i in 0..points {
        #[allow(clippy::cast_precision_loss)]
        let t = i as f32 / last;
        let px = (a.x + vx * t).round_ties_even().clamp(0.0, max_x);
        let py = (a.y + vy * t).round_ties_even().clamp(0.0, max_y);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (px as usize, py as usize);

        let dot = pafs[[cx, y, x]] * ux + pafs[[cy, y, x]] * uy;
        if dot.is_finite() && dot > config.min_paf_alignment {
            total += dot;
            on_support += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let (score, ratio) = (
        total / (on_support as f32 + EPS),
        on_support as f32 / points.max(1) as f32,
    );
    (score > 0.0 && ratio > config.min_support_ratio).then_some(score)
}

/// Greedily match the candidates of one limb type.
///
/// Every `(from, to)` pair is scored with [`score_limb`]; pairs are enumerated
/// source-major and stably sorted by score, so ties keep discovery order. A
/// pair is accepted only if neither endpoint is already used by this limb.
#[must_use]
pub fn match_limb(
    pafs: ArrayView3<f32>,
    limb: usize,
    channels: [usize; 2],
    from: &[JointCandidate],
    to: &[JointCandidate],
    config: &PoseConfig,
) -> Vec<LimbConnection> {
    if from.is_empty() || to.is_empty() {
        return Vec::new();
    }

    let mut scored = Vec::new();
    for (i, a) in from.iter().enumerate() {
        for (j, b) in to.iter().enumerate() {
            if let Some(score) = score_limb(pafs, channels, a, b, config) {
                scored.push((i, j, score));
            }
        }
    }
    scored.sort_by(|x, y| y.2.partial_cmp(&x.2).unwrap_or(Ordering::Equal));

    let mut used_from = vec![false; from.len()];
    let mut used_to = vec![false; to.len()];
    let mut connections = Vec::new();
    for (i, j, score) in scored {
        if used_from[i] || used_to[j] {
            continue;
        }
        used_from[i] = true;
        used_to[j] = true;
        connections.push(LimbConnection {
            limb,
            from: from[i].id,
            to: to[j].id,
            score,
        });
    }
    connections
}
