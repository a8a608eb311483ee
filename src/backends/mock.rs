//! Mock backend for testing without trained model parameters

use crate::backends::InferenceBackend;
use crate::error::{DeforestError, Result};
use crate::model::DOWNSAMPLE_FACTOR;
use ndarray::Array4;

/// Deterministic mock backend producing a uniform probability map
///
/// Test-only substitute for the real network; never used in a deployed
/// pipeline. Applies the same input validation as [`super::BurnBackend`] so
/// pipeline tests exercise the full error surface.
#[derive(Debug, Clone)]
pub struct MockBackend {
    probability: f32,
    fail_inference: bool,
}

impl MockBackend {
    /// Create a mock backend predicting the given probability everywhere
    #[must_use]
    pub fn uniform(probability: f32) -> Self {
        Self {
            probability,
            fail_inference: false,
        }
    }

    /// Create a mock backend that fails every inference call
    #[must_use]
    pub fn failing() -> Self {
        Self {
            probability: 0.0,
            fail_inference: true,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::uniform(0.3)
    }
}

impl InferenceBackend for MockBackend {
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        if self.fail_inference {
            return Err(DeforestError::inference("Mock inference failure"));
        }

        let (batch, channels, height, width) = input.dim();
        if channels != 3 {
            return Err(DeforestError::inference(format!(
                "Expected 3 input channels, got {}",
                channels
            )));
        }
        if height % DOWNSAMPLE_FACTOR != 0 || width % DOWNSAMPLE_FACTOR != 0 {
            return Err(DeforestError::shape_mismatch(
                width,
                height,
                DOWNSAMPLE_FACTOR,
            ));
        }

        Ok(Array4::from_elem((batch, 1, height, width), self.probability))
    }

    fn description(&self) -> String {
        format!("mock backend (uniform {})", self.probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_output() {
        let mut backend = MockBackend::uniform(0.7);
        let input = Array4::<f32>::zeros((1, 3, 16, 16));

        let output = backend.infer(&input).unwrap();
        assert_eq!(output.dim(), (1, 1, 16, 16));
        assert!(output.iter().all(|&v| (v - 0.7).abs() < f32::EPSILON));
    }

    #[test]
    fn test_failing_backend() {
        let mut backend = MockBackend::failing();
        let input = Array4::<f32>::zeros((1, 3, 16, 16));
        assert!(backend.infer(&input).is_err());
    }

    #[test]
    fn test_shape_validation_matches_real_backend() {
        let mut backend = MockBackend::default();
        let input = Array4::<f32>::zeros((1, 3, 30, 30));
        assert!(matches!(
            backend.infer(&input),
            Err(DeforestError::ShapeMismatch { .. })
        ));
    }
}
