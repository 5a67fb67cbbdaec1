// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX Runtime inference session.
//!
//! [`InferenceSession`] owns the runtime session and the output roles resolved
//! at load time. It is passed explicitly into the frame pipeline; there is no
//! process-wide model state.

use std::path::Path;

use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use crate::config::SessionConfig;
use crate::error::{DecodeError, Result};
use crate::task::{OutputRoles, Task};
use crate::tensor::RawTensor;

/// A loaded model plus the roles of its outputs.
///
/// # Example
///
/// ```no_run
/// use vision_decode::{InferenceSession, SessionConfig, Task};
///
/// let config = SessionConfig::new(256, 456);
/// let session = InferenceSession::load("human-pose-estimation-0001.onnx", Task::Pose, config)?;
/// println!("{:?}", session.roles());
/// # Ok::<(), vision_decode::DecodeError>(())
/// ```
pub struct InferenceSession {
    /// ONNX Runtime session.
    session: Session,
    /// Input tensor name.
    input_name: String,
    /// Output tensor names, in model order.
    output_names: Vec<String>,
    /// Output roles resolved at load time.
    roles: OutputRoles,
    /// Session configuration.
    config: SessionConfig,
}

impl InferenceSession {
    /// Load a model from an ONNX file.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the ONNX model file.
    /// * `task` - What the model's outputs are decoded into.
    /// * `config` - Input size, threads, channel order and output names.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ConfigError`] for an invalid configuration and
    /// [`DecodeError::ModelLoadError`] if the file is missing, cannot be loaded,
    /// or its outputs do not fit the task.
    pub fn load<P: AsRef<Path>>(path: P, task: Task, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref();

        if !path.exists() {
            return Err(DecodeError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e| DecodeError::ModelLoadError(format!("Failed to create session builder: {e}")))?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .map_err(|e| DecodeError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
            .with_intra_threads(config.num_threads)
            .map_err(|e| DecodeError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
            .commit_from_file(path)
            .map_err(|e| DecodeError::ModelLoadError(format!("Failed to load model: {e}")))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| DecodeError::ModelLoadError("Model has no inputs".to_string()))?;

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        let roles = OutputRoles::resolve(
            task,
            &output_names,
            config.detection_output.as_deref(),
            config
                .pose_outputs
                .as_ref()
                .map(|(heatmaps, pafs)| (heatmaps.as_str(), pafs.as_str())),
        )?;

        Ok(Self {
            session,
            input_name,
            output_names,
            roles,
            config,
        })
    }

    /// Run the model on a `[1, 3, H, W]` tensor.
    ///
    /// # Returns
    ///
    /// Every output, in model order.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InferenceError`] if the runtime fails or an output
    /// is not an `f32` tensor.
    pub fn run(&mut self, input: &Array4<f32>) -> Result<Vec<RawTensor>> {
        // Ensure input is contiguous in memory
        let input_contiguous = input.as_standard_layout();

        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| DecodeError::InferenceError(format!("Failed to create input tensor: {e}")))?;

        let inputs = ort::inputs![&self.input_name => input_tensor];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| DecodeError::InferenceError(format!("Inference failed: {e}")))?;

        let mut tensors = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let output = outputs
                .get(name.as_str())
                .ok_or_else(|| DecodeError::InferenceError(format!("Output '{name}' not found")))?;

            let (shape, data) = output
                .try_extract_tensor::<f32>()
                .map_err(|e| DecodeError::InferenceError(format!("Failed to extract output '{name}': {e}")))?;

            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let shape_vec: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
            tensors.push(RawTensor::new(data.to_vec(), shape_vec)?);
        }

        Ok(tensors)
    }

    /// The detection rows among `outputs`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidInput`] if this is not a detection session or
    /// the output is missing.
    pub fn detection_output<'a>(&self, outputs: &'a [RawTensor]) -> Result<&'a RawTensor> {
        match self.roles {
            OutputRoles::Detect { output } => pick(outputs, output),
            OutputRoles::Pose { .. } => Err(DecodeError::InvalidInput(
                "session was loaded for pose estimation".to_string(),
            )),
        }
    }

    /// The (heatmaps, pafs) pair among `outputs`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidInput`] if this is not a pose session or an
    /// output is missing.
    pub fn pose_outputs<'a>(&self, outputs: &'a [RawTensor]) -> Result<(&'a RawTensor, &'a RawTensor)> {
        match self.roles {
            OutputRoles::Pose { heatmaps, pafs } => Ok((pick(outputs, heatmaps)?, pick(outputs, pafs)?)),
            OutputRoles::Detect { .. } => Err(DecodeError::InvalidInput(
                "session was loaded for detection".to_string(),
            )),
        }
    }

    /// Task this session decodes.
    #[must_use]
    pub const fn task(&self) -> Task {
        self.roles.task()
    }

    /// Output roles resolved at load time.
    #[must_use]
    pub const fn roles(&self) -> OutputRoles {
        self.roles
    }

    /// Session configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Model input size (height, width).
    #[must_use]
    pub const fn input_size(&self) -> (usize, usize) {
        self.config.input_size
    }

    /// Output names, in model order.
    #[must_use]
    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

fn pick(outputs: &[RawTensor], index: usize) -> Result<&RawTensor> {
    outputs.get(index).ok_or_else(|| {
        DecodeError::InvalidInput(format!(
            "expected output #{index}, model returned {}",
            outputs.len()
        ))
    })
}

impl std::fmt::Debug for InferenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSession")
            .field("input_name", &self.input_name)
            .field("output_names", &self.output_names)
            .field("roles", &self.roles)
            .field("input_size", &self.config.input_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found() {
        let result = InferenceSession::load("nonexistent.onnx", Task::Detect, SessionConfig::new(300, 300));
        assert!(matches!(result.unwrap_err(), DecodeError::ModelLoadError(_)));
    }

    #[test]
    fn test_invalid_config_is_checked_first() {
        let result = InferenceSession::load("nonexistent.onnx", Task::Pose, SessionConfig::new(0, 456));
        assert!(matches!(result.unwrap_err(), DecodeError::ConfigError(_)));
    }

    #[test]
    fn test_pick() {
        let outputs = vec![RawTensor::new(vec![0.0], vec![1]).unwrap()];
        assert!(pick(&outputs, 0).is_ok());
        assert!(matches!(pick(&outputs, 1), Err(DecodeError::InvalidInput(_))));
    }
}
