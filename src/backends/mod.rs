//! Inference backend abstraction
//!
//! The processor talks to the segmentation network through the
//! [`InferenceBackend`] trait so tests can substitute a deterministic mock for
//! the real network.

mod burn_backend;
mod mock;

pub use burn_backend::BurnBackend;
pub use mock::MockBackend;

use crate::error::Result;
use ndarray::Array4;

/// Trait for inference backends
///
/// Implementations take a batch-of-one normalized `[1, 3, H, W]` tensor and
/// return a `[1, 1, H, W]` probability map.
pub trait InferenceBackend {
    /// Run inference on the input tensor
    ///
    /// # Errors
    /// - `DeforestError::ShapeMismatch` when the input spatial dimensions are
    ///   incompatible with the network's downsampling stages
    /// - `DeforestError::Inference` for execution failures
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>>;

    /// Human-readable backend description for logging
    fn description(&self) -> String;
}
