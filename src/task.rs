// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Task definitions and output role resolution.
//!
//! A model output is addressed by its role (detection rows, heatmaps, PAFs),
//! resolved once from the output names when the session is created.

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, Result};
use crate::warn;

/// Decoding task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Task {
    /// Object detection - SSD-style `[N, 7]` detection rows.
    #[default]
    Detect,
    /// Multi-person pose estimation - joint heatmaps plus part affinity fields.
    Pose,
}

impl Task {
    /// Returns the string representation of the task.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Detect => "detect",
            Self::Pose => "pose",
        }
    }

    /// Number of model outputs the task consumes.
    #[must_use]
    pub const fn num_outputs(&self) -> usize {
        match self {
            Self::Detect => 1,
            Self::Pose => 2,
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Task {
    type Err = TaskParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "detect" | "detection" => Ok(Self::Detect),
            "pose" | "keypoint" | "keypoints" => Ok(Self::Pose),
            _ => Err(TaskParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid task string.
#[derive(Debug, Clone)]
pub struct TaskParseError(String);

impl fmt::Display for TaskParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task '{}', expected one of: detect, pose", self.0)
    }
}

impl std::error::Error for TaskParseError {}

/// Positions of the outputs each task reads, resolved once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputRoles {
    /// Index of the detection rows output.
    Detect {
        /// Output position.
        output: usize,
    },
    /// Indices of the heatmap and PAF outputs.
    Pose {
        /// Heatmap output position.
        heatmaps: usize,
        /// PAF output position.
        pafs: usize,
    },
}

impl OutputRoles {
    /// Resolve output roles from the model's output names.
    ///
    /// Explicit names win. Otherwise detection models use their only (or first)
    /// output, and pose models look for names containing `heatmap` and `paf`.
    /// A two-output pose model with unrecognized names falls back to
    /// `[pafs, heatmaps]` order with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ModelLoadError`] if an explicit name is missing or
    /// the roles cannot be determined.
    pub fn resolve(
        task: Task,
        outputs: &[String],
        detection_output: Option<&str>,
        pose_outputs: Option<(&str, &str)>,
    ) -> Result<Self> {
        match task {
            Task::Detect => {
                let output = match detection_output {
                    Some(name) => position(outputs, name)?,
                    None if !outputs.is_empty() => 0,
                    None => {
                        return Err(DecodeError::ModelLoadError(
                            "Model has no outputs".to_string(),
                        ))
                    }
                };
                Ok(Self::Detect { output })
            }
            Task::Pose => {
                if let Some((heatmaps, pafs)) = pose_outputs {
                    return Ok(Self::Pose {
                        heatmaps: position(outputs, heatmaps)?,
                        pafs: position(outputs, pafs)?,
                    });
                }

                let heatmaps = find(outputs, "heatmap");
                let pafs = find(outputs, "paf");
                match (heatmaps, pafs) {
                    (Some(heatmaps), Some(pafs)) if heatmaps != pafs => {
                        Ok(Self::Pose { heatmaps, pafs })
                    }
                    _ if outputs.len() == 2 => {
                        warn!(
                            "Pose outputs {:?} have no recognizable names. Assuming PAFs first, heatmaps second.",
                            outputs
                        );
                        Ok(Self::Pose {
                            heatmaps: 1,
                            pafs: 0,
                        })
                    }
                    _ => Err(DecodeError::ModelLoadError(format!(
                        "Cannot identify heatmap and PAF outputs among {outputs:?}"
                    ))),
                }
            }
        }
    }

    /// Task these roles belong to.
    #[must_use]
    pub const fn task(&self) -> Task {
        match self {
            Self::Detect { .. } => Task::Detect,
            Self::Pose { .. } => Task::Pose,
        }
    }
}

fn position(outputs: &[String], name: &str) -> Result<usize> {
    outputs.iter().position(|o| o == name).ok_or_else(|| {
        DecodeError::ModelLoadError(format!("Output '{name}' not found in {outputs:?}"))
    })
}

fn find(outputs: &[String], needle: &str) -> Option<usize> {
    outputs
        .iter()
        .position(|o| o.to_lowercase().contains(needle))
}
