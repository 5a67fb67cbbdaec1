// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Vision Decode
//!
//! Post-processing for per-frame neural-network outputs: SSD-style detection
//! rows become pixel-space [`Detection`]s, and OpenPose-style joint heatmaps plus
//! part affinity fields become multi-person [`Pose`]s.
//!
//! ## Pipelines
//!
//! Both pipelines share one shape: raw tensor → decode → filter → structured objects.
//!
//! - **Detection** - [`DetectionDecoder`] converts normalized
//!   `(batch, label, score, xmin, ymin, xmax, ymax)` rows to pixel boxes, drops
//!   low scores and runs greedy NMS.
//! - **Pose** - [`heatmap::suppress_non_peaks`] keeps the 3×3 local maxima of every
//!   joint heatmap, [`paf::score_limb`] integrates the PAF along candidate limbs,
//!   and [`PoseAssembler`] matches limbs greedily and merges them into skeletons.
//!   [`Rescaler`] maps the result from the heatmap grid to frame pixels.
//!
//! ## Quick Start
//!
//! ```rust
//! use vision_decode::{DetectionConfig, DetectionDecoder};
//!
//! let decoder = DetectionDecoder::new(DetectionConfig::new().with_score_threshold(0.5))?;
//!
//! // Two overlapping boxes of the same class: only the stronger one survives
//! let rows = [
//!     0.0, 1.0, 0.9, 0.10, 0.10, 0.50, 0.50,
//!     0.0, 1.0, 0.8, 0.12, 0.12, 0.52, 0.52,
//! ];
//! let detections = decoder.decode(&rows, &[1, 1, 2, 7], (640, 480))?;
//! assert_eq!(detections.len(), 1);
//! println!("{}", decoder.summarize(&detections));
//! # Ok::<(), vision_decode::DecodeError>(())
//! ```
//!
//! With the `onnx` feature, [`InferenceSession`] wraps ONNX Runtime and
//! [`pipeline`] runs a whole frame:
//!
//! ```no_run
//! use vision_decode::pipeline::estimate_poses;
//! use vision_decode::{InferenceSession, PoseAssembler, PoseConfig, SessionConfig, Task};
//!
//! let mut session = InferenceSession::load(
//!     "human-pose-estimation-0001.onnx",
//!     Task::Pose,
//!     SessionConfig::new(256, 456),
//! )?;
//! let assembler = PoseAssembler::openpose(PoseConfig::default())?;
//!
//! let image = image::open("people.jpg")?;
//! let frame = estimate_poses(&mut session, &assembler, &image)?;
//! for (pose, score) in frame.poses.iter() {
//!     println!("pose {score:.2}: {} joints", pose.num_visible());
//! }
//! # Ok::<(), vision_decode::DecodeError>(())
//! ```
//!
//! ## CLI
//!
//! ```bash
//! vision-decode detect --model ssd300.onnx --source image.jpg --conf 0.6
//! vision-decode pose --model human-pose-estimation-0001.onnx --source frames/ --imgsz 256x456
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`detection`] | [`DetectionDecoder`]: rows → boxes, score filter, NMS |
//! | [`heatmap`] | 3×3 max-pool peak mask and joint candidates |
//! | [`paf`] | PAF limb scoring and greedy per-limb matching |
//! | [`assembler`] | [`PoseAssembler`]: limbs → whole poses |
//! | [`rescale`] | [`Rescaler`]: heatmap grid → frame pixels |
//! | [`skeleton`] | [`Skeleton`] topology, OpenPose tables |
//! | [`results`] | Output types ([`Detection`], [`Pose`], [`PoseSet`], [`Speed`]) |
//! | [`config`] | [`DetectionConfig`], [`PoseConfig`], [`SessionConfig`] |
//! | [`tensor`] | [`RawTensor`] and shape contracts |
//! | [`error`] | Error types ([`DecodeError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `onnx` | ONNX Runtime session, frame pipeline and CLI (default) |
//!
//! ## License
//!
//! Licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod assembler;
#[cfg(feature = "onnx")]
pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod heatmap;
pub mod labels;
pub mod logging;
pub mod paf;
#[cfg(feature = "onnx")]
pub mod pipeline;
pub mod preprocessing;
pub mod rescale;
pub mod results;
#[cfg(feature = "onnx")]
pub mod session;
pub mod skeleton;
pub mod task;
pub mod tensor;
pub mod utils;

// Re-export main types for convenience
pub use assembler::PoseAssembler;
pub use config::{DetectionConfig, PoseConfig, SessionConfig};
pub use detection::DetectionDecoder;
pub use error::{DecodeError, Result};
pub use heatmap::JointCandidate;
pub use paf::LimbConnection;
pub use preprocessing::ChannelOrder;
pub use rescale::Rescaler;
pub use results::{BoundingBox, Detection, Keypoint, Pose, PoseSet, Speed};
#[cfg(feature = "onnx")]
pub use session::InferenceSession;
pub use skeleton::Skeleton;
pub use task::{OutputRoles, Task};
pub use tensor::RawTensor;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "vision-decode");
    }
}
