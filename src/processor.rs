//! Unified deforestation detection processor
//!
//! Consolidates the preprocess -> infer -> postprocess pipeline behind one
//! type so CLI and embedding callers behave identically. The processor owns
//! its inference backend; model parameters are loaded once at construction
//! and only read afterwards.

use crate::artifacts;
use crate::backends::{BurnBackend, InferenceBackend};
use crate::config::ProcessorConfig;
use crate::error::{DeforestError, Result};
use crate::postprocessing::Postprocessor;
use crate::preprocessing::ImagePreprocessor;
use crate::types::{DetectionResult, ProcessingTimings};

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
use image::DynamicImage;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Deforestation detection processor running the full inference pipeline
pub struct DeforestationProcessor {
    config: ProcessorConfig,
    backend: Box<dyn InferenceBackend>,
}

impl DeforestationProcessor {
    /// Create a processor around an explicit inference backend
    ///
    /// Dependency injection point: tests pass a mock backend, deployments
    /// pass parameters loaded via [`from_artifacts`](Self::from_artifacts).
    pub fn with_backend(config: ProcessorConfig, backend: Box<dyn InferenceBackend>) -> Self {
        Self { config, backend }
    }

    /// Create a processor from a deployment snapshot directory
    ///
    /// # Errors
    /// - `DeforestError::ModelUnavailable` when no trained snapshot exists at
    ///   `model_dir`; no inference proceeds without one
    pub fn from_artifacts<P: AsRef<Path>>(model_dir: P, config: ProcessorConfig) -> Result<Self> {
        let device = NdArrayDevice::default();
        let model = artifacts::load_deployment::<NdArray>(model_dir.as_ref(), &device)?;

        info!(
            model_dir = %model_dir.as_ref().display(),
            "Loaded deployment snapshot"
        );
        Ok(Self::with_backend(
            config,
            Box::new(BurnBackend::new(model, device)),
        ))
    }

    /// Detect deforestation in raw encoded image bytes
    ///
    /// # Errors
    /// - `DeforestError::Decode` when the bytes cannot be decoded as an image
    /// - Inference and postprocessing failures
    pub fn detect_bytes(&mut self, image_bytes: &[u8]) -> Result<DetectionResult> {
        let decode_start = Instant::now();
        let image = image::load_from_memory(image_bytes)
            .map_err(|e| DeforestError::decode(format!("Could not decode image: {}", e)))?;
        let decode_ms = decode_start.elapsed().as_millis() as u64;

        let mut result = self.detect_image(&image)?;
        result.timings.decode_ms = decode_ms;
        result.timings.total_ms += decode_ms;
        Ok(result)
    }

    /// Detect deforestation in an image file
    ///
    /// # Errors
    /// - File I/O errors when reading the input
    /// - `DeforestError::Decode` when the contents are not a valid image
    pub fn detect_file<P: AsRef<Path>>(&mut self, input_path: P) -> Result<DetectionResult> {
        let bytes = std::fs::read(input_path.as_ref())
            .map_err(|e| DeforestError::file_io_error("read image file", input_path, e))?;
        self.detect_bytes(&bytes)
    }

    /// Detect deforestation in an already-decoded image
    ///
    /// Runs preprocessing, inference and postprocessing as one sequential
    /// pipeline; the call either completes fully or fails with no partial
    /// mask.
    ///
    /// # Errors
    /// - `DeforestError::ShapeMismatch` when the configured target size is
    ///   incompatible with the network
    /// - Inference execution failures
    #[instrument(
        skip(self, image),
        fields(
            backend = %self.backend.description(),
            dimensions = %format!("{}x{}", image.width(), image.height())
        )
    )]
    pub fn detect_image(&mut self, image: &DynamicImage) -> Result<DetectionResult> {
        let total_start = Instant::now();
        let original_dimensions = (image.width(), image.height());

        let preprocess_start = Instant::now();
        let input_tensor = ImagePreprocessor::preprocess_image(image, &self.config.preprocessing());
        let preprocess_ms = preprocess_start.elapsed().as_millis() as u64;

        let inference_start = Instant::now();
        let prediction = self.backend.infer(&input_tensor)?;
        let inference_ms = inference_start.elapsed().as_millis() as u64;

        let postprocess_start = Instant::now();
        let (mask, deforestation_percentage) =
            Postprocessor::postprocess(&prediction, &self.config.postprocessing())?;
        let postprocess_ms = postprocess_start.elapsed().as_millis() as u64;

        let timings = ProcessingTimings {
            decode_ms: 0,
            preprocess_ms,
            inference_ms,
            postprocess_ms,
            total_ms: total_start.elapsed().as_millis() as u64,
        };
        debug!(
            deforestation_percentage,
            inference_ms, "Detection pipeline finished"
        );

        Ok(DetectionResult {
            mask,
            deforestation_percentage,
            original_dimensions,
            timings,
        })
    }

    /// Current processor configuration
    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockBackend;
    use image::{ImageBuffer, Rgb};

    fn processor_with(probability: f32) -> DeforestationProcessor {
        let config = ProcessorConfig::builder().build().unwrap();
        DeforestationProcessor::with_backend(config, Box::new(MockBackend::uniform(probability)))
    }

    fn png_bytes(width: u32, height: u32, pixel: [u8; 3]) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, Rgb(pixel));
        let mut bytes = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut bytes);
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_all_black_image_with_uniform_low_model_yields_zero_percentage() {
        let mut processor = processor_with(0.3);
        let result = processor
            .detect_bytes(&png_bytes(256, 256, [0, 0, 0]))
            .unwrap();

        assert!(result.mask.data.iter().all(|&v| v == 0));
        assert_eq!(result.deforestation_percentage, 0.0);
        assert_eq!(result.mask.dimensions, (256, 256));
        assert_eq!(result.original_dimensions, (256, 256));
    }

    #[test]
    fn test_high_probability_yields_full_mask() {
        let mut processor = processor_with(0.9);
        let result = processor
            .detect_bytes(&png_bytes(64, 64, [10, 200, 50]))
            .unwrap();

        assert!(result.mask.data.iter().all(|&v| v == 1));
        assert!((result.deforestation_percentage - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_input_resized_to_target() {
        let mut processor = processor_with(0.9);
        let result = processor
            .detect_bytes(&png_bytes(640, 480, [128, 128, 128]))
            .unwrap();

        assert_eq!(result.mask.dimensions, (256, 256));
        assert_eq!(result.original_dimensions, (640, 480));
    }

    #[test]
    fn test_malformed_bytes_fail_with_decode_error() {
        let mut processor = processor_with(0.3);
        let result = processor.detect_bytes(&[0xFF, 0xD8, 0x00]);
        assert!(matches!(result, Err(DeforestError::Decode(_))));
    }

    #[test]
    fn test_backend_failure_propagates() {
        let config = ProcessorConfig::builder().build().unwrap();
        let mut processor =
            DeforestationProcessor::with_backend(config, Box::new(MockBackend::failing()));
        let result = processor.detect_bytes(&png_bytes(32, 32, [0, 0, 0]));
        assert!(matches!(result, Err(DeforestError::Inference(_))));
    }

    #[test]
    fn test_missing_model_dir_is_model_unavailable() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ProcessorConfig::builder().build().unwrap();
        let result = DeforestationProcessor::from_artifacts(dir.path().join("saved_model"), config);
        assert!(matches!(result, Err(DeforestError::ModelUnavailable(_))));
    }
}
