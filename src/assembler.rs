// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Bottom-up multi-person pose assembly from heatmaps and part affinity fields.
//!
//! Joint candidates are read from the heatmap peaks, every limb type is matched
//! greedily with [`match_limb`], and the accepted connections are merged limb by
//! limb into whole skeletons.
//!
//! # Example
//!
//! ```rust
//! use ndarray::Array3;
//! use vision_decode::{PoseAssembler, PoseConfig, Skeleton};
//!
//! let skeleton = Skeleton::with_default_pafs(3, vec![[0, 1], [1, 2]])?;
//! let assembler = PoseAssembler::new(skeleton, PoseConfig::default())?;
//!
//! let mut heatmaps = Array3::<f32>::zeros((3, 8, 16));
//! heatmaps[[0, 4, 2]] = 0.9;
//! heatmaps[[1, 4, 7]] = 0.8;
//! heatmaps[[2, 4, 12]] = 0.7;
//! let mut pafs = Array3::<f32>::zeros((4, 8, 16));
//! pafs.slice_mut(ndarray::s![0, .., ..]).fill(1.0);
//! pafs.slice_mut(ndarray::s![2, .., ..]).fill(1.0);
//!
//! let poses = assembler.assemble(heatmaps.view(), pafs.view())?;
//! assert_eq!(poses.len(), 1);
//! assert_eq!(poses.poses[0].num_visible(), 3);
//! # Ok::<(), vision_decode::DecodeError>(())
//! ```

use ndarray::ArrayView3;

use crate::config::PoseConfig;
use crate::error::{DecodeError, Result};
use crate::heatmap::{extract_candidates, suppress_non_peaks, JointCandidate};
use crate::paf::{match_limb, LimbConnection};
use crate::results::{Keypoint, Pose, PoseSet};
use crate::skeleton::Skeleton;
use crate::tensor::RawTensor;

/// A skeleton under construction: one candidate id per joint slot.
#[derive(Debug, Clone)]
struct PartialPose {
    slots: Vec<Option<usize>>,
    score: f32,
}

impl PartialPose {
    fn filled(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn is_disjoint(&self, other: &Self) -> bool {
        self.slots
            .iter()
            .zip(&other.slots)
            .all(|(a, b)| a.is_none() || b.is_none())
    }
}

/// Multi-person pose decoder for heatmap + PAF networks.
#[derive(Debug, Clone)]
pub struct PoseAssembler {
    skeleton: Skeleton,
    config: PoseConfig,
}

impl PoseAssembler {
    /// Create an assembler for the given topology.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConfigError`] if the configuration is invalid.
    pub fn new(skeleton: Skeleton, config: PoseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { skeleton, config })
    }

    /// Assembler for the 18-joint OpenPose body model.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConfigError`] if the configuration is invalid.
    pub fn openpose(config: PoseConfig) -> Result<Self> {
        Self::new(Skeleton::openpose(), config)
    }

    /// Skeleton topology.
    #[must_use]
    pub const fn skeleton(&self) -> &Skeleton {
        &self.skeleton
    }

    /// Assembly configuration.
    #[must_use]
    pub const fn config(&self) -> &PoseConfig {
        &self.config
    }

    /// Decode raw `[1, C, H, W]` / `[C, H, W]` runtime outputs.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ShapeMismatch`] if either tensor breaks its shape contract.
    pub fn decode(&self, heatmaps: &RawTensor, pafs: &RawTensor) -> Result<PoseSet> {
        self.assemble(heatmaps.view_chw()?, pafs.view_chw()?)
    }

    /// Assemble poses from raw heatmaps; peak extraction is done internally.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ShapeMismatch`] if the heatmaps have fewer channels
    /// than joint types, the PAFs have fewer channels than the skeleton reads, or
    /// the two grids differ.
    pub fn assemble(&self, heatmaps: ArrayView3<f32>, pafs: ArrayView3<f32>) -> Result<PoseSet> {
        let peaks = suppress_non_peaks(heatmaps);
        self.assemble_with_peaks(heatmaps, peaks.view(), pafs)
    }

    /// Assemble poses from heatmaps whose peak mask is already known.
    ///
    /// # Errors
    ///
    /// See [`PoseAssembler::assemble`].
    pub fn assemble_with_peaks(
        &self,
        heatmaps: ArrayView3<f32>,
        peaks: ArrayView3<f32>,
        pafs: ArrayView3<f32>,
    ) -> Result<PoseSet> {
        self.check_pafs(heatmaps, pafs)?;

        let candidates = extract_candidates(heatmaps, peaks, self.skeleton.num_joints(), &self.config)?;
        let by_id: Vec<JointCandidate> = candidates.iter().flatten().copied().collect();

        let mut poses: Vec<Option<PartialPose>> = Vec::new();
        let mut owner: Vec<Option<usize>> = vec![None; by_id.len()];

        for (limb, (&[ja, jb], &channels)) in self
            .skeleton
            .limbs()
            .iter()
            .zip(self.skeleton.paf_channels())
            .enumerate()
        {
            let connections = match_limb(
                pafs,
                limb,
                channels,
                &candidates[ja],
                &candidates[jb],
                &self.config,
            );
            for connection in connections {
                self.merge(&connection, [ja, jb], &by_id, &mut poses, &mut owner);
            }
        }

        Ok(self.finish(poses.into_iter().flatten(), &by_id))
    }

    fn check_pafs(&self, heatmaps: ArrayView3<f32>, pafs: ArrayView3<f32>) -> Result<()> {
        let (_, h, w) = heatmaps.dim();
        let (channels, ph, pw) = pafs.dim();
        let required = self.skeleton.required_paf_channels();
        if channels < required || (ph, pw) != (h, w) {
            return Err(DecodeError::shape(
                format!("PAFs with at least {required} channels on a {h}x{w} grid"),
                pafs.shape(),
            ));
        }
        Ok(())
    }

    fn merge(
        &self,
        connection: &LimbConnection,
        [ja, jb]: [usize; 2],
        candidates: &[JointCandidate],
        poses: &mut Vec<Option<PartialPose>>,
        owner: &mut [Option<usize>],
    ) {
        let (a, b) = (connection.from, connection.to);
        match (owner[a], owner[b]) {
            (None, None) => {
                let mut slots = vec![None; self.skeleton.num_joints()];
                slots[ja] = Some(a);
                slots[jb] = Some(b);
                owner[a] = Some(poses.len());
                owner[b] = Some(poses.len());
                poses.push(Some(PartialPose {
                    slots,
                    score: candidates[a].score + candidates[b].score + connection.score,
                }));
            }
            (Some(p), Some(q)) if p == q => {
                if let Some(pose) = poses[p].as_mut() {
                    pose.score += connection.score;
                }
            }
            (Some(p), Some(q)) => {
                let disjoint = match (&poses[p], &poses[q]) {
                    (Some(first), Some(second)) => first.is_disjoint(second),
                    _ => false,
                };
                if !disjoint {
                    return;
                }
                let Some(absorbed) = poses[q].take() else {
                    return;
                };
                if let Some(pose) = poses[p].as_mut() {
                    for (slot, other) in pose.slots.iter_mut().zip(absorbed.slots) {
                        if let Some(id) = other {
                            *slot = Some(id);
                            owner[id] = Some(p);
                        }
                    }
                    pose.score += absorbed.score + connection.score;
                }
            }
            (Some(p), None) => attach(poses, owner, p, jb, b, candidates[b].score + connection.score),
            (None, Some(q)) => attach(poses, owner, q, ja, a, candidates[a].score + connection.score),
        }
    }

    fn finish(
        &self,
        partial: impl Iterator<Item = PartialPose>,
        candidates: &[JointCandidate],
    ) -> PoseSet {
        let mut set = PoseSet::default();
        for pose in partial {
            let filled = pose.filled();
            if filled < self.config.min_joints {
                continue;
            }
            #[allow(clippy::cast_precision_loss)]
            let average = pose.score / filled.max(1) as f32;
            if average < self.config.min_average_score {
                continue;
            }

            let mut out = Pose::empty(self.skeleton.num_joints());
            for (keypoint, slot) in out.keypoints.iter_mut().zip(&pose.slots) {
                if let Some(id) = *slot {
                    let candidate = &candidates[id];
                    *keypoint = Keypoint::new(candidate.x, candidate.y, candidate.score);
                }
            }
            if out.mean_confidence() < self.config.min_mean_confidence {
                continue;
            }

            #[allow(clippy::cast_precision_loss)]
            let score = pose.score * filled.saturating_sub(1) as f32;
            set.poses.push(out);
            set.scores.push(score);
        }
        set
    }
}

// Attach a free candidate to an existing pose; an occupied slot rejects it.
fn attach(
    poses: &mut [Option<PartialPose>],
    owner: &mut [Option<usize>],
    pose: usize,
    joint: usize,
    candidate: usize,
    gain: f32,
) {
    let Some(target) = poses[pose].as_mut() else {
        return;
    };
    if target.slots[joint].is_some() {
        return;
    }
    target.slots[joint] = Some(candidate);
    target.score += gain;
    owner[candidate] = Some(pose);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array3};

    /// Three joints in a horizontal chain, PAFs pointing along +x everywhere.
    fn chain() -> (PoseAssembler, Array3<f32>, Array3<f32>) {
        let skeleton = Skeleton::with_default_pafs(3, vec![[0, 1], [1, 2]]).unwrap();
        let assembler = PoseAssembler::new(skeleton, PoseConfig::default()).unwrap();
        let heatmaps = Array3::zeros((3, 12, 20));
        let mut pafs = Array3::zeros((4, 12, 20));
        pafs.slice_mut(s![0, .., ..]).fill(1.0);
        pafs.slice_mut(s![2, .., ..]).fill(1.0);
        (assembler, heatmaps, pafs)
    }

    #[test]
    fn test_single_chain() {
        let (assembler, mut heatmaps, pafs) = chain();
        heatmaps[[0, 3, 2]] = 0.9;
        heatmaps[[1, 3, 9]] = 0.8;
        heatmaps[[2, 3, 16]] = 0.7;

        let poses = assembler.assemble(heatmaps.view(), pafs.view()).unwrap();
        assert_eq!(poses.len(), 1);
        let pose = &poses.poses[0];
        assert_eq!(pose.num_visible(), 3);
        assert!((pose.keypoints[0].x - 2.5).abs() < 1e-6);
        assert!((pose.keypoints[2].confidence - 0.7).abs() < 1e-6);

        // (0.9 + 0.8 + ~1.0 + 0.7 + ~1.0) * (3 - 1)
        assert!((poses.scores[0] - 8.8).abs() < 1e-3);
    }

    #[test]
    fn test_two_people() {
        let (assembler, mut heatmaps, pafs) = chain();
        for y in [2, 9] {
            heatmaps[[0, y, 2]] = 0.9;
            heatmaps[[1, y, 9]] = 0.8;
            heatmaps[[2, y, 16]] = 0.7;
        }

        let poses = assembler.assemble(heatmaps.view(), pafs.view()).unwrap();
        assert_eq!(poses.len(), 2);
        for pose in &poses.poses {
            let ys: Vec<f32> = pose.keypoints.iter().map(|kp| kp.y).collect();
            assert!(ys.iter().all(|&y| (y - ys[0]).abs() < 1e-6));
        }
    }

    #[test]
    fn test_too_few_joints_is_noise() {
        let (assembler, mut heatmaps, pafs) = chain();
        heatmaps[[0, 3, 2]] = 0.9;
        heatmaps[[1, 3, 9]] = 0.8;

        let poses = assembler.assemble(heatmaps.view(), pafs.view()).unwrap();
        assert!(poses.is_empty());

        let lenient = PoseAssembler::new(
            assembler.skeleton().clone(),
            PoseConfig::new().with_min_joints(2),
        )
        .unwrap();
        assert_eq!(lenient.assemble(heatmaps.view(), pafs.view()).unwrap().len(), 1);
    }

    #[test]
    fn test_mean_confidence_floor() {
        let (_, mut heatmaps, pafs) = chain();
        heatmaps[[0, 3, 2]] = 0.3;
        heatmaps[[1, 3, 9]] = 0.3;
        heatmaps[[2, 3, 16]] = 0.3;
        let skeleton = Skeleton::with_default_pafs(3, vec![[0, 1], [1, 2]]).unwrap();
        let strict =
            PoseAssembler::new(skeleton, PoseConfig::new().with_min_mean_confidence(0.5)).unwrap();
        assert!(strict.assemble(heatmaps.view(), pafs.view()).unwrap().is_empty());
    }

    #[test]
    fn test_weak_pose_below_average_score() {
        // Faint joints joined by barely aligned limbs: (3 * 0.11 + 2 * 0.06) / 3 = 0.15
        let (assembler, mut heatmaps, _) = chain();
        heatmaps[[0, 3, 2]] = 0.11;
        heatmaps[[1, 3, 9]] = 0.11;
        heatmaps[[2, 3, 16]] = 0.11;
        let mut pafs = Array3::zeros((4, 12, 20));
        pafs.slice_mut(s![0, .., ..]).fill(0.06);
        pafs.slice_mut(s![2, .., ..]).fill(0.06);

        assert!(assembler.assemble(heatmaps.view(), pafs.view()).unwrap().is_empty());

        let lenient = PoseAssembler::new(
            assembler.skeleton().clone(),
            PoseConfig::new().with_min_average_score(0.1),
        )
        .unwrap();
        let poses = lenient.assemble(heatmaps.view(), pafs.view()).unwrap();
        assert_eq!(poses.len(), 1);
        assert_eq!(poses.poses[0].num_visible(), 3);
    }

    #[test]
    fn test_assembly_is_deterministic_with_near_ties() {
        let (assembler, mut heatmaps, pafs) = chain();
        heatmaps[[0, 2, 2]] = 0.9;
        heatmaps[[0, 8, 2]] = 0.9;
        heatmaps[[1, 2, 9]] = 0.8;
        heatmaps[[1, 8, 9]] = 0.800_001;
        heatmaps[[1, 5, 9]] = 0.799_999;
        heatmaps[[2, 2, 16]] = 0.7;
        heatmaps[[2, 8, 16]] = 0.7;

        let first = assembler.assemble(heatmaps.view(), pafs.view()).unwrap();
        let second = assembler.assemble(heatmaps.view(), pafs.view()).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_negative_peak_threshold_is_rejected() {
        let skeleton = Skeleton::with_default_pafs(3, vec![[0, 1], [1, 2]]).unwrap();
        let result = PoseAssembler::new(skeleton, PoseConfig::new().with_peak_threshold(-1.0));
        assert!(matches!(result, Err(DecodeError::ConfigError(_))));
    }

    #[test]
    fn test_disjoint_fragments_merge() {
        // Limbs (0,1) and (2,3) form separate fragments that limb (1,2) joins
        let skeleton = Skeleton::with_default_pafs(4, vec![[0, 1], [2, 3], [1, 2]]).unwrap();
        let assembler = PoseAssembler::new(skeleton, PoseConfig::default()).unwrap();
        let mut heatmaps = Array3::zeros((4, 6, 24));
        heatmaps[[0, 2, 1]] = 0.9;
        heatmaps[[1, 2, 7]] = 0.9;
        heatmaps[[2, 2, 13]] = 0.9;
        heatmaps[[3, 2, 19]] = 0.9;
        let mut pafs = Array3::zeros((6, 6, 24));
        for c in [0, 2, 4] {
            pafs.slice_mut(s![c, .., ..]).fill(1.0);
        }

        let poses = assembler.assemble(heatmaps.view(), pafs.view()).unwrap();
        assert_eq!(poses.len(), 1);
        assert_eq!(poses.poses[0].num_visible(), 4);
    }

    #[test]
    fn test_conflicting_slot_rejects_connection() {
        // Two limb types over the same joint pair, each pointing at a different partner
        let skeleton = Skeleton::with_default_pafs(2, vec![[0, 1], [0, 1]]).unwrap();
        let assembler =
            PoseAssembler::new(skeleton, PoseConfig::new().with_min_joints(2)).unwrap();
        let mut heatmaps = Array3::zeros((2, 12, 16));
        heatmaps[[0, 2, 1]] = 0.9;
        heatmaps[[1, 2, 10]] = 0.8;
        heatmaps[[1, 8, 1]] = 0.7;
        let mut pafs = Array3::zeros((4, 12, 16));
        pafs.slice_mut(s![0, .., ..]).fill(1.0);
        pafs.slice_mut(s![3, .., ..]).fill(1.0);

        let poses = assembler.assemble(heatmaps.view(), pafs.view()).unwrap();
        assert_eq!(poses.len(), 1);
        let pose = &poses.poses[0];
        assert_eq!(pose.num_visible(), 2);
        assert!((pose.keypoints[1].x - 10.5).abs() < 1e-6);
        assert!((pose.keypoints[1].y - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_no_candidate_in_two_poses() {
        let (assembler, mut heatmaps, pafs) = chain();
        heatmaps[[0, 3, 2]] = 0.9;
        heatmaps[[0, 5, 2]] = 0.6;
        heatmaps[[1, 4, 9]] = 0.8;
        heatmaps[[2, 4, 16]] = 0.7;

        let lenient = PoseAssembler::new(
            assembler.skeleton().clone(),
            PoseConfig::new().with_min_joints(1),
        )
        .unwrap();
        let poses = lenient.assemble(heatmaps.view(), pafs.view()).unwrap();
        let mut seen = Vec::new();
        for pose in &poses.poses {
            for kp in pose.keypoints.iter().filter(|kp| !kp.is_missing()) {
                let key = (kp.x.to_bits(), kp.y.to_bits());
                assert!(!seen.contains(&key));
                seen.push(key);
            }
        }
    }

    #[test]
    fn test_empty_heatmaps() {
        let (assembler, heatmaps, pafs) = chain();
        assert!(assembler.assemble(heatmaps.view(), pafs.view()).unwrap().is_empty());
    }

    #[test]
    fn test_shape_errors() {
        let (assembler, heatmaps, _) = chain();
        let narrow = Array3::<f32>::zeros((2, 12, 20));
        assert!(matches!(
            assembler.assemble(heatmaps.view(), narrow.view()),
            Err(DecodeError::ShapeMismatch { .. })
        ));
        let other_grid = Array3::<f32>::zeros((4, 12, 21));
        assert!(assembler.assemble(heatmaps.view(), other_grid.view()).is_err());
        let few_joints = Array3::<f32>::zeros((2, 12, 20));
        let pafs = Array3::<f32>::zeros((4, 12, 20));
        assert!(assembler.assemble(few_joints.view(), pafs.view()).is_err());
    }

    #[test]
    fn test_decode_raw_tensors() {
        let (assembler, mut heatmaps, pafs) = chain();
        heatmaps[[0, 3, 2]] = 0.9;
        heatmaps[[1, 3, 9]] = 0.8;
        heatmaps[[2, 3, 16]] = 0.7;

        let heat = RawTensor::new(heatmaps.iter().copied().collect(), vec![1, 3, 12, 20]).unwrap();
        let paf = RawTensor::new(pafs.iter().copied().collect(), vec![1, 4, 12, 20]).unwrap();
        assert_eq!(assembler.decode(&heat, &paf).unwrap().len(), 1);
    }

    #[test]
    fn test_openpose_with_background_channel() {
        let assembler = PoseAssembler::openpose(PoseConfig::default()).unwrap();
        let heatmaps = Array3::<f32>::zeros((19, 8, 8));
        let pafs = Array3::<f32>::zeros((38, 8, 8));
        assert!(assembler.assemble(heatmaps.view(), pafs.view()).unwrap().is_empty());
    }
}
