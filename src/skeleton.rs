// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton topology: joint types, limb pairs and their PAF channels.

use crate::error::{DecodeError, Result};

/// Joint names of the 18-keypoint OpenPose body model, in network channel order.
pub const OPENPOSE_JOINT_NAMES: [&str; 18] = [
    "nose",
    "neck",
    "right_shoulder",
    "right_elbow",
    "right_wrist",
    "left_shoulder",
    "left_elbow",
    "left_wrist",
    "right_hip",
    "right_knee",
    "right_ankle",
    "left_hip",
    "left_knee",
    "left_ankle",
    "right_eye",
    "left_eye",
    "right_ear",
    "left_ear",
];

/// OpenPose limb definitions (pairs of joint indices).
/// The order matters: limbs are assembled in this sequence, torso outward.
pub const OPENPOSE_LIMBS: [[usize; 2]; 19] = [
    [1, 2],   // neck to right shoulder
    [1, 5],   // neck to left shoulder
    [2, 3],   // right shoulder to right elbow
    [3, 4],   // right elbow to right wrist
    [5, 6],   // left shoulder to left elbow
    [6, 7],   // left elbow to left wrist
    [1, 8],   // neck to right hip
    [8, 9],   // right hip to right knee
    [9, 10],  // right knee to right ankle
    [1, 11],  // neck to left hip
    [11, 12], // left hip to left knee
    [12, 13], // left knee to left ankle
    [1, 0],   // neck to nose
    [0, 14],  // nose to right eye
    [14, 16], // right eye to right ear
    [0, 15],  // nose to left eye
    [15, 17], // left eye to left ear
    [2, 16],  // right shoulder to right ear
    [5, 17],  // left shoulder to left ear
];

/// PAF (x, y) channel pair for each entry of [`OPENPOSE_LIMBS`].
pub const OPENPOSE_PAF_CHANNELS: [[usize; 2]; 19] = [
    [12, 13],
    [20, 21],
    [14, 15],
    [16, 17],
    [22, 23],
    [24, 25],
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    [8, 9],
    [10, 11],
    [28, 29],
    [30, 31],
    [34, 35],
    [32, 33],
    [36, 37],
    [18, 19],
    [26, 27],
];

/// COCO slot for each OpenPose joint. The neck has no COCO counterpart.
pub const OPENPOSE_TO_COCO: [Option<usize>; 18] = [
    Some(0),  // nose
    None,     // neck
    Some(6),  // right shoulder
    Some(8),  // right elbow
    Some(10), // right wrist
    Some(5),  // left shoulder
    Some(7),  // left elbow
    Some(9),  // left wrist
    Some(12), // right hip
    Some(14), // right knee
    Some(16), // right ankle
    Some(11), // left hip
    Some(13), // left knee
    Some(15), // left ankle
    Some(2),  // right eye
    Some(1),  // left eye
    Some(4),  // right ear
    Some(3),  // left ear
];

/// A validated pose topology.
///
/// Limb `l` connects `limbs[l][0]` to `limbs[l][1]` and reads its field from
/// the PAF channels `paf_channels[l]` (x component first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skeleton {
    num_joints: usize,
    limbs: Vec<[usize; 2]>,
    paf_channels: Vec<[usize; 2]>,
    joint_names: Vec<String>,
}

impl Skeleton {
    /// Build a skeleton from explicit limb and PAF channel tables.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConfigError`] if the tables have different lengths,
    /// a limb references an unknown joint or connects a joint to itself, or a
    /// limb uses the same channel for both field components.
    pub fn new(
        num_joints: usize,
        limbs: Vec<[usize; 2]>,
        paf_channels: Vec<[usize; 2]>,
    ) -> Result<Self> {
        if num_joints == 0 {
            return Err(DecodeError::ConfigError(
                "skeleton needs at least one joint".to_string(),
            ));
        }
        if limbs.len() != paf_channels.len() {
            return Err(DecodeError::ConfigError(format!(
                "{} limbs but {} PAF channel pairs",
                limbs.len(),
                paf_channels.len()
            )));
        }
        for (l, &[a, b]) in limbs.iter().enumerate() {
            if a >= num_joints || b >= num_joints {
                return Err(DecodeError::ConfigError(format!(
                    "limb {l} ({a}, {b}) references a joint outside 0..{num_joints}"
                )));
            }
            if a == b {
                return Err(DecodeError::ConfigError(format!(
                    "limb {l} connects joint {a} to itself"
                )));
            }
        }
        for (l, &[cx, cy]) in paf_channels.iter().enumerate() {
            if cx == cy {
                return Err(DecodeError::ConfigError(format!(
                    "limb {l} uses PAF channel {cx} for both components"
                )));
            }
        }

        Ok(Self {
            num_joints,
            limbs,
            paf_channels,
            joint_names: (0..num_joints).map(|j| format!("joint_{j}")).collect(),
        })
    }

    /// Build a skeleton whose limb `l` reads PAF channels `2l` and `2l + 1`.
    ///
    /// # Errors
    ///
    /// See [`Skeleton::new`].
    pub fn with_default_pafs(num_joints: usize, limbs: Vec<[usize; 2]>) -> Result<Self> {
        let paf_channels = (0..limbs.len()).map(|l| [2 * l, 2 * l + 1]).collect();
        Self::new(num_joints, limbs, paf_channels)
    }

    /// The 18-joint, 19-limb OpenPose body topology.
    #[must_use]
    pub fn openpose() -> Self {
        Self {
            num_joints: OPENPOSE_JOINT_NAMES.len(),
            limbs: OPENPOSE_LIMBS.to_vec(),
            paf_channels: OPENPOSE_PAF_CHANNELS.to_vec(),
            joint_names: OPENPOSE_JOINT_NAMES.iter().map(ToString::to_string).collect(),
        }
    }

    /// Replace the joint names.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConfigError`] if the count differs from the joint count.
    pub fn with_joint_names<S: Into<String>>(mut self, names: Vec<S>) -> Result<Self> {
        if names.len() != self.num_joints {
            return Err(DecodeError::ConfigError(format!(
                "expected {} joint names, got {}",
                self.num_joints,
                names.len()
            )));
        }
        self.joint_names = names.into_iter().map(Into::into).collect();
        Ok(self)
    }

    /// Number of joint types (K).
    #[must_use]
    pub const fn num_joints(&self) -> usize {
        self.num_joints
    }

    /// Number of limb types (L).
    #[must_use]
    pub fn num_limbs(&self) -> usize {
        self.limbs.len()
    }

    /// Limb joint pairs.
    #[must_use]
    pub fn limbs(&self) -> &[[usize; 2]] {
        &self.limbs
    }

    /// PAF channel pair per limb.
    #[must_use]
    pub fn paf_channels(&self) -> &[[usize; 2]] {
        &self.paf_channels
    }

    /// Joint names in channel order.
    #[must_use]
    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    /// Smallest PAF channel count that covers every limb.
    #[must_use]
    pub fn required_paf_channels(&self) -> usize {
        self.paf_channels
            .iter()
            .map(|&[cx, cy]| cx.max(cy) + 1)
            .max()
            .unwrap_or(0)
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::openpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openpose_topology() {
        let skeleton = Skeleton::openpose();
        assert_eq!(skeleton.num_joints(), 18);
        assert_eq!(skeleton.num_limbs(), 19);
        assert_eq!(skeleton.required_paf_channels(), 38);
        assert_eq!(skeleton.joint_names()[1], "neck");

        // The constant tables pass the same validation as user topologies
        assert!(Skeleton::new(18, OPENPOSE_LIMBS.to_vec(), OPENPOSE_PAF_CHANNELS.to_vec()).is_ok());
    }

    #[test]
    fn test_paf_channels_are_unique() {
        let mut channels: Vec<usize> = OPENPOSE_PAF_CHANNELS.iter().flatten().copied().collect();
        channels.sort_unstable();
        assert_eq!(channels, (0..38).collect::<Vec<_>>());
    }

    #[test]
    fn test_coco_mapping_is_a_permutation() {
        let mut targets: Vec<usize> = OPENPOSE_TO_COCO.iter().flatten().copied().collect();
        targets.sort_unstable();
        assert_eq!(targets, (0..17).collect::<Vec<_>>());
    }

    #[test]
    fn test_with_default_pafs() {
        let skeleton = Skeleton::with_default_pafs(3, vec![[0, 1], [1, 2]]).unwrap();
        assert_eq!(skeleton.paf_channels(), &[[0, 1], [2, 3]]);
        assert_eq!(skeleton.required_paf_channels(), 4);
    }

    #[test]
    fn test_invalid_topologies() {
        assert!(Skeleton::new(0, vec![], vec![]).is_err());
        assert!(Skeleton::new(2, vec![[0, 2]], vec![[0, 1]]).is_err());
        assert!(Skeleton::new(2, vec![[1, 1]], vec![[0, 1]]).is_err());
        assert!(Skeleton::new(2, vec![[0, 1]], vec![]).is_err());
        assert!(Skeleton::new(2, vec![[0, 1]], vec![[3, 3]]).is_err());
    }

    #[test]
    fn test_joint_names() {
        let skeleton = Skeleton::with_default_pafs(2, vec![[0, 1]]).unwrap();
        assert_eq!(skeleton.joint_names(), &["joint_0", "joint_1"]);
        let skeleton = skeleton.with_joint_names(vec!["head", "tail"]).unwrap();
        assert_eq!(skeleton.joint_names()[1], "tail");
        assert!(skeleton.with_joint_names(vec!["only"]).is_err());
    }
}
