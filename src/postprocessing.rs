//! Prediction postprocessing
//!
//! Thresholds the model's probability map into a binary mask and derives the
//! scalar deforestation percentage. Pure function of its inputs; running it
//! twice on the same prediction yields identical results.

use crate::error::{DeforestError, Result};
use crate::types::BinaryMask;
use ndarray::Array4;

/// Configuration for postprocessing behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostprocessingConfig {
    /// Probability threshold above which a pixel counts as deforested
    pub threshold: f32,
}

impl Default for PostprocessingConfig {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

/// Shared prediction postprocessing utilities
pub struct Postprocessor;

impl Postprocessor {
    /// Threshold a `[1, 1, H, W]` probability map into a binary mask and
    /// compute the deforestation percentage
    ///
    /// The percentage is `100 * positives / total`, in [0, 100].
    ///
    /// # Errors
    /// - `DeforestError::Inference` when the prediction is not a single-example,
    ///   single-channel tensor or contains values outside [0, 1]
    pub fn postprocess(
        prediction: &Array4<f32>,
        config: &PostprocessingConfig,
    ) -> Result<(BinaryMask, f32)> {
        let (batch, channels, height, width) = prediction.dim();
        if batch != 1 || channels != 1 {
            return Err(DeforestError::inference(format!(
                "Expected prediction of shape [1, 1, H, W], got [{}, {}, {}, {}]",
                batch, channels, height, width
            )));
        }
        if prediction.iter().any(|&v| !(0.0..=1.0).contains(&v)) {
            return Err(DeforestError::inference(
                "Prediction contains values outside [0, 1]",
            ));
        }

        let data: Vec<u8> = prediction
            .iter()
            .map(|&p| u8::from(p > config.threshold))
            .collect();

        let mask = BinaryMask::new(data, (width as u32, height as u32))?;
        let percentage = mask.positive_ratio() * 100.0;
        Ok((mask, percentage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction_from(values: Vec<f32>, height: usize, width: usize) -> Array4<f32> {
        Array4::from_shape_vec((1, 1, height, width), values).unwrap()
    }

    #[test]
    fn test_threshold_and_percentage() {
        let prediction = prediction_from(vec![0.9, 0.1, 0.7, 0.2], 2, 2);
        let (mask, percentage) =
            Postprocessor::postprocess(&prediction, &PostprocessingConfig::default()).unwrap();

        assert_eq!(mask.data, vec![1, 0, 1, 0]);
        assert!((percentage - 50.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mask_values_are_binary_and_percentage_bounded() {
        let prediction = prediction_from(vec![0.0, 0.25, 0.5, 0.75, 0.99, 1.0], 2, 3);
        let (mask, percentage) =
            Postprocessor::postprocess(&prediction, &PostprocessingConfig::default()).unwrap();

        assert!(mask.data.iter().all(|&v| v <= 1));
        assert!((0.0..=100.0).contains(&percentage));
    }

    #[test]
    fn test_uniform_low_probability_yields_empty_mask() {
        let prediction = prediction_from(vec![0.3; 16], 4, 4);
        let (mask, percentage) =
            Postprocessor::postprocess(&prediction, &PostprocessingConfig::default()).unwrap();

        assert!(mask.data.iter().all(|&v| v == 0));
        assert_eq!(percentage, 0.0);
    }

    #[test]
    fn test_exactly_threshold_is_negative() {
        let prediction = prediction_from(vec![0.5], 1, 1);
        let (mask, _) =
            Postprocessor::postprocess(&prediction, &PostprocessingConfig::default()).unwrap();
        assert_eq!(mask.data, vec![0]);
    }

    #[test]
    fn test_idempotence() {
        let prediction = prediction_from(vec![0.6, 0.4, 0.5001, 0.4999], 2, 2);
        let config = PostprocessingConfig::default();

        let first = Postprocessor::postprocess(&prediction, &config).unwrap();
        let second = Postprocessor::postprocess(&prediction, &config).unwrap();
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_rejects_multi_channel_prediction() {
        let prediction = Array4::<f32>::zeros((1, 2, 2, 2));
        let result = Postprocessor::postprocess(&prediction, &PostprocessingConfig::default());
        assert!(matches!(result, Err(DeforestError::Inference(_))));
    }

    #[test]
    fn test_rejects_out_of_range_probabilities() {
        let prediction = prediction_from(vec![1.5, 0.0, 0.0, 0.0], 2, 2);
        let result = Postprocessor::postprocess(&prediction, &PostprocessingConfig::default());
        assert!(matches!(result, Err(DeforestError::Inference(_))));
    }
}
