//! Error types for deforestation detection operations

use thiserror::Error;

/// Result type alias for deforestation detection operations
pub type Result<T> = std::result::Result<T, DeforestError>;

/// Comprehensive error types for preprocessing, inference and training
#[derive(Error, Debug)]
pub enum DeforestError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or unreadable image bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// Input spatial dimensions incompatible with the network's downsampling stages
    #[error("Shape mismatch: input {width}x{height} must have dimensions divisible by {divisor}")]
    ShapeMismatch {
        /// Input width in pixels
        width: usize,
        /// Input height in pixels
        height: usize,
        /// Required divisor (2^downsampling-stages)
        divisor: usize,
    },

    /// No trained parameters found at load time
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Invalid training setup (empty dataset, zero steps per epoch)
    #[error("Training configuration error: {0}")]
    TrainingConfig(String),

    /// Inference execution errors
    #[error("Inference error: {0}")]
    Inference(String),

    /// Model loading, saving or initialization errors
    #[error("Model error: {0}")]
    Model(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeforestError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a shape mismatch error for the given input dimensions
    #[must_use]
    pub fn shape_mismatch(width: usize, height: usize, divisor: usize) -> Self {
        Self::ShapeMismatch {
            width,
            height,
            divisor,
        }
    }

    /// Create a new model-unavailable error
    pub fn model_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::ModelUnavailable(msg.into())
    }

    /// Create a new training configuration error
    pub fn training_config<S: Into<String>>(msg: S) -> Self {
        Self::TrainingConfig(msg.into())
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(msg: S) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new model error
    pub fn model<S: Into<String>>(msg: S) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = DeforestError::decode("truncated header");
        assert!(matches!(err, DeforestError::Decode(_)));

        let err = DeforestError::model_unavailable("saved_model missing");
        assert!(matches!(err, DeforestError::ModelUnavailable(_)));

        let err = DeforestError::training_config("dataset is empty");
        assert!(matches!(err, DeforestError::TrainingConfig(_)));
    }

    #[test]
    fn test_error_display() {
        let err = DeforestError::decode("not an image");
        assert_eq!(err.to_string(), "Decode error: not an image");

        let err = DeforestError::shape_mismatch(100, 100, 16);
        assert_eq!(
            err.to_string(),
            "Shape mismatch: input 100x100 must have dimensions divisible by 16"
        );
    }

    #[test]
    fn test_file_io_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = DeforestError::file_io_error(
            "read mask file",
            std::path::Path::new("/data/masks/42.png"),
            io_error,
        );
        let error_string = err.to_string();
        assert!(error_string.contains("read mask file"));
        assert!(error_string.contains("/data/masks/42.png"));
    }
}
