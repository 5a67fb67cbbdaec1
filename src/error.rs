// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the decoding library.

use thiserror::Error;

/// Result type alias for decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// Main error type for the decoding library.
///
/// Malformed inputs (wrong tensor rank or size) are reported as
/// [`DecodeError::ShapeMismatch`] and indicate a caller bug. Empty results are
/// never errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Tensor shape does not match the contract of the stage that received it.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch {
        /// Human readable description of the expected shape.
        expected: String,
        /// The shape that was actually received.
        got: String,
    },
    /// Input values that cannot be processed (e.g. zero grid dimensions).
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Invalid configuration provided.
    #[error("Config error: {0}")]
    ConfigError(String),
    /// Error loading the ONNX model.
    #[error("Model load error: {0}")]
    ModelLoadError(String),
    /// Error during model inference.
    #[error("Inference error: {0}")]
    InferenceError(String),
    /// Error processing images.
    #[error("Image error: {0}")]
    ImageError(String),
    /// Wrapped `std::io::Error`
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    /// Build a [`DecodeError::ShapeMismatch`] from an expected description and the received shape.
    pub fn shape(expected: impl Into<String>, got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            got: format!("{got:?}"),
        }
    }
}

impl From<image::ImageError> for DecodeError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::ModelLoadError("test".to_string());
        assert_eq!(err.to_string(), "Model load error: test");

        let err = DecodeError::shape("[N, 7]", &[3, 5]);
        assert_eq!(err.to_string(), "Shape mismatch: expected [N, 7], got [3, 5]");
    }

    #[test]
    fn test_io_source_is_kept() {
        use std::error::Error as _;

        let err = DecodeError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "IO error: gone");
    }
}
