//! Processor configuration
//!
//! Builder-validated configuration shared by every consumer of the detection
//! pipeline so CLI and embedding callers behave identically.

use crate::error::{DeforestError, Result};
use crate::model::DOWNSAMPLE_FACTOR;
use crate::postprocessing::PostprocessingConfig;
use crate::preprocessing::PreprocessingConfig;

/// Unified configuration for the deforestation detection processor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessorConfig {
    /// Target spatial size (width, height) inputs are resized to
    pub target_size: [u32; 2],
    /// Probability threshold for the binary mask
    pub threshold: f32,
}

impl ProcessorConfig {
    /// Create a new processor configuration builder
    #[must_use]
    pub fn builder() -> ProcessorConfigBuilder {
        ProcessorConfigBuilder::new()
    }

    /// Preprocessing view of this configuration
    #[must_use]
    pub fn preprocessing(&self) -> PreprocessingConfig {
        PreprocessingConfig {
            target_size: self.target_size,
        }
    }

    /// Postprocessing view of this configuration
    #[must_use]
    pub fn postprocessing(&self) -> PostprocessingConfig {
        PostprocessingConfig {
            threshold: self.threshold,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            target_size: [256, 256],
            threshold: 0.5,
        }
    }
}

/// Builder for [`ProcessorConfig`]
pub struct ProcessorConfigBuilder {
    config: ProcessorConfig,
}

impl ProcessorConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ProcessorConfig::default(),
        }
    }

    /// Set the target spatial size (width, height)
    #[must_use]
    pub fn target_size(mut self, width: u32, height: u32) -> Self {
        self.config.target_size = [width, height];
        self
    }

    /// Set the binary-mask probability threshold
    #[must_use]
    pub fn threshold(mut self, threshold: f32) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Build the processor configuration
    ///
    /// # Errors
    /// - Target dimensions of zero or not divisible by the network's
    ///   downsampling factor
    /// - Threshold outside (0, 1)
    pub fn build(self) -> Result<ProcessorConfig> {
        let [width, height] = self.config.target_size;
        let factor = DOWNSAMPLE_FACTOR as u32;

        if width == 0 || height == 0 {
            return Err(DeforestError::invalid_config(
                "Target dimensions must be non-zero",
            ));
        }
        if width % factor != 0 || height % factor != 0 {
            return Err(DeforestError::shape_mismatch(
                width as usize,
                height as usize,
                DOWNSAMPLE_FACTOR,
            ));
        }
        if !(0.0..1.0).contains(&self.config.threshold) || self.config.threshold <= 0.0 {
            return Err(DeforestError::invalid_config(
                "Threshold must lie strictly between 0 and 1",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ProcessorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
