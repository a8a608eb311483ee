//! Burn-based inference backend wrapping a trained U-Net

use crate::backends::InferenceBackend;
use crate::error::{DeforestError, Result};
use crate::model::{Unet, DOWNSAMPLE_FACTOR};
use ndarray::Array4;

use burn::tensor::{backend::Backend, Tensor, TensorData};

/// Inference backend holding loaded model parameters
///
/// Parameters are read-only once loaded; the load-once, read-many lifecycle
/// means a backend can be cloned per consumer without synchronization.
pub struct BurnBackend<B: Backend> {
    model: Unet<B>,
    device: B::Device,
}

impl<B: Backend> BurnBackend<B> {
    /// Wrap an already-loaded model
    pub fn new(model: Unet<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Access the wrapped model
    pub fn model(&self) -> &Unet<B> {
        &self.model
    }
}

impl<B: Backend> InferenceBackend for BurnBackend<B> {
    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
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

        let data = TensorData::new(
            input.iter().copied().collect::<Vec<f32>>(),
            [batch, channels, height, width],
        );
        let tensor = Tensor::<B, 4>::from_data(data, &self.device);

        let output = self.model.forward(tensor);
        let dims = output.dims();
        let values = output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| DeforestError::inference(format!("Failed to read output tensor: {e:?}")))?;

        Array4::from_shape_vec((dims[0], dims[1], dims[2], dims[3]), values)
            .map_err(|e| DeforestError::inference(format!("Output tensor reshape failed: {e}")))
    }

    fn description(&self) -> String {
        format!("burn U-Net on {:?}", self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UnetConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn backend() -> BurnBackend<TestBackend> {
        let device = Default::default();
        let model = UnetConfig::new()
            .with_base_channels(2)
            .init::<TestBackend>(&device);
        BurnBackend::new(model, device)
    }

    #[test]
    fn test_infer_output_shape_and_range() {
        let mut backend = backend();
        let input = Array4::<f32>::zeros((1, 3, 32, 32));

        let output = backend.infer(&input).unwrap();
        assert_eq!(output.dim(), (1, 1, 32, 32));
        assert!(output.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_indivisible_dimensions_raise_shape_mismatch() {
        let mut backend = backend();
        let input = Array4::<f32>::zeros((1, 3, 100, 100));

        let result = backend.infer(&input);
        assert!(matches!(result, Err(DeforestError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_wrong_channel_count_is_rejected() {
        let mut backend = backend();
        let input = Array4::<f32>::zeros((1, 1, 32, 32));

        let result = backend.infer(&input);
        assert!(matches!(result, Err(DeforestError::Inference(_))));
    }
}
