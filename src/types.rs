//! Core types for deforestation detection operations

use crate::error::{DeforestError, Result};
use image::ImageBuffer;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Binary segmentation mask produced by thresholding a probability map
///
/// Values are strictly `0` (not deforested) or `1` (deforested). For
/// transport the mask is scaled to `{0, 255}` and encoded as PNG, since
/// lossless raster formats store 8-bit intensities rather than booleans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    /// Mask data, one byte per pixel, each 0 or 1, row-major
    pub data: Vec<u8>,

    /// Mask dimensions (width, height)
    pub dimensions: (u32, u32),
}

impl BinaryMask {
    /// Create a new binary mask
    ///
    /// # Errors
    /// - Data length does not match `width * height`
    /// - Data contains values other than 0 or 1
    pub fn new(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let (width, height) = dimensions;
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(DeforestError::internal(format!(
                "Mask data length {} does not match dimensions {}x{}",
                data.len(),
                width,
                height
            )));
        }
        if data.iter().any(|&v| v > 1) {
            return Err(DeforestError::internal(
                "Binary mask values must be 0 or 1",
            ));
        }
        Ok(Self { data, dimensions })
    }

    /// Fraction of positive (deforested) pixels, in [0, 1]
    #[must_use]
    pub fn positive_ratio(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let positives = self.data.iter().filter(|&&v| v == 1).count();
        positives as f32 / self.data.len() as f32
    }

    /// Convert the mask to a grayscale image with values scaled to {0, 255}
    pub fn to_image(&self) -> Result<ImageBuffer<image::Luma<u8>, Vec<u8>>> {
        let (width, height) = self.dimensions;
        let scaled: Vec<u8> = self.data.iter().map(|&v| v * 255).collect();
        ImageBuffer::from_raw(width, height, scaled).ok_or_else(|| {
            DeforestError::internal("Failed to create image from mask data")
        })
    }

    /// Encode the mask as PNG bytes (values scaled to {0, 255})
    ///
    /// # Errors
    /// - PNG encoding failures
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let img = self.to_image()?;
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| DeforestError::internal(format!("Failed to encode mask as PNG: {}", e)))?;
        Ok(buffer)
    }

    /// Save the mask as a PNG file
    ///
    /// # Errors
    /// - File I/O or PNG encoding failures
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_png_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| DeforestError::file_io_error("write mask PNG", path, e))?;
        Ok(())
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let deforested_pixels = self.data.iter().filter(|&&v| v == 1).count();

        MaskStatistics {
            total_pixels,
            deforested_pixels,
            intact_pixels: total_pixels - deforested_pixels,
        }
    }
}

/// Pixel counts derived from a binary mask
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskStatistics {
    /// Total number of pixels in the mask
    pub total_pixels: usize,
    /// Number of pixels classified as deforested
    pub deforested_pixels: usize,
    /// Number of pixels classified as intact
    pub intact_pixels: usize,
}

/// Timing breakdown for a single detection call, in milliseconds
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Image decode time
    pub decode_ms: u64,
    /// Preprocessing (resize + normalize) time
    pub preprocess_ms: u64,
    /// Model inference time
    pub inference_ms: u64,
    /// Postprocessing (threshold + statistics) time
    pub postprocess_ms: u64,
    /// End-to-end time
    pub total_ms: u64,
}

/// Result of a deforestation detection operation
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Predicted binary mask at model resolution
    pub mask: BinaryMask,

    /// Percentage of pixels classified as deforested, in [0, 100]
    pub deforestation_percentage: f32,

    /// Original input dimensions before resizing (width, height)
    pub original_dimensions: (u32, u32),

    /// Timing breakdown for this call
    pub timings: ProcessingTimings,
}

impl DetectionResult {
    /// Encode the predicted mask as PNG bytes for transport
    ///
    /// # Errors
    /// - PNG encoding failures
    pub fn mask_png_bytes(&self) -> Result<Vec<u8>> {
        self.mask.to_png_bytes()
    }

    /// Save the predicted mask as a PNG file
    ///
    /// # Errors
    /// - File I/O or PNG encoding failures
    pub fn save_mask_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.mask.save_png(path)
    }
}
