//! Image preprocessing for model inference
//!
//! Decodes raw image bytes, converts to RGB, resizes to the model's fixed
//! input resolution and normalizes pixel intensities to [0, 1], producing a
//! batch-of-one NCHW tensor.

use crate::error::{DeforestError, Result};
use image::DynamicImage;
use ndarray::{Array3, Array4};
use std::path::Path;

/// Configuration for preprocessing behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessingConfig {
    /// Target spatial size (width, height) the input is resized to
    pub target_size: [u32; 2],
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_size: [256, 256],
        }
    }
}

impl PreprocessingConfig {
    /// Create a preprocessing configuration for a square target size
    #[must_use]
    pub fn with_target_size(size: u32) -> Self {
        Self {
            target_size: [size, size],
        }
    }
}

/// Shared image preprocessing utilities
pub struct ImagePreprocessor;

impl ImagePreprocessor {
    /// Decode raw image bytes and preprocess for inference
    ///
    /// # Errors
    /// - `DeforestError::Decode` when the bytes cannot be decoded as an image
    pub fn preprocess_bytes(bytes: &[u8], config: &PreprocessingConfig) -> Result<Array4<f32>> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| DeforestError::decode(format!("Could not decode image: {}", e)))?;
        Ok(Self::preprocess_image(&image, config))
    }

    /// Load an image file and preprocess for inference
    ///
    /// # Errors
    /// - File I/O errors when reading the input
    /// - `DeforestError::Decode` when the file contents are not a valid image
    pub fn preprocess_file<P: AsRef<Path>>(
        path: P,
        config: &PreprocessingConfig,
    ) -> Result<Array4<f32>> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| DeforestError::file_io_error("read image file", path, e))?;
        Self::preprocess_bytes(&bytes, config)
    }

    /// Preprocess an already-decoded image for inference
    ///
    /// Conversion to `Rgb8` fixes the channel order explicitly; decoders for
    /// some formats hand back BGR or paletted data, and skipping the
    /// conversion would corrupt color semantics without any error.
    #[must_use]
    pub fn preprocess_image(image: &DynamicImage, config: &PreprocessingConfig) -> Array4<f32> {
        let [target_width, target_height] = config.target_size;

        let rgb_image = image.to_rgb8();
        let resized = image::imageops::resize(
            &rgb_image,
            target_width,
            target_height,
            image::imageops::FilterType::Triangle,
        );

        let (width, height) = (target_width as usize, target_height as usize);
        let mut tensor = Array4::<f32>::zeros((1, 3, height, width));

        for (y, row) in resized.rows().enumerate() {
            for (x, pixel) in row.enumerate() {
                tensor[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
                tensor[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
                tensor[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
            }
        }

        tensor
    }

    /// Preprocess a single image into an unbatched (3, H, W) array
    ///
    /// Used by the training dataset loader, which batches examples itself.
    #[must_use]
    pub fn image_to_array(image: &DynamicImage, config: &PreprocessingConfig) -> Array3<f32> {
        let batched = Self::preprocess_image(image, config);
        batched.index_axis_move(ndarray::Axis(0), 0)
    }
}
