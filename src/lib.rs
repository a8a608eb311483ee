//! # Deforestation Detection Library
//!
//! Semantic segmentation of satellite imagery for deforestation detection,
//! built on the burn deep-learning framework.
//!
//! The crate covers the full model lifecycle: preprocessing raw image bytes
//! into normalized tensors, a U-Net segmentation network with skip
//! connections, Dice-loss training with checkpointing and early stopping,
//! and postprocessing probability maps into binary masks with a scalar
//! deforestation percentage.
//!
//! ## Features
//!
//! - Decode/resize/normalize preprocessing for common raster formats
//!   (PNG, JPEG, TIFF)
//! - U-Net encoder-decoder with skip connections and sigmoid output
//! - Dice loss and binary-accuracy metrics
//! - Training loop with best-weights checkpointing, early stopping and
//!   multiple export formats (full snapshot, deployment snapshot, compact
//!   half-precision)
//! - Typed error taxonomy; no panics in library code paths
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deforest_detect::{detect_deforestation, ProcessorConfig};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ProcessorConfig::builder().threshold(0.5).build()?;
//! let result = detect_deforestation("tile.png", "saved_models/saved_model", config)?;
//! println!("Deforestation: {:.2}%", result.deforestation_percentage);
//! result.save_mask_png("mask.png")?;
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod backends;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod processor;
pub mod services;
pub mod training;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod tracing_config;

// Public API exports
pub use backends::{BurnBackend, InferenceBackend, MockBackend};
pub use config::{ProcessorConfig, ProcessorConfigBuilder};
pub use error::{DeforestError, Result};
pub use metrics::{binary_accuracy, dice_coefficient, dice_loss, EpochMetrics};
pub use model::{Unet, UnetConfig, DOWNSAMPLE_FACTOR};
pub use postprocessing::{PostprocessingConfig, Postprocessor};
pub use preprocessing::{ImagePreprocessor, PreprocessingConfig};
pub use processor::DeforestationProcessor;
pub use services::{NoOpProgressReporter, ProgressReporter};
pub use training::{
    SegmentationDataset, Trainer, TrainingConfig, TrainingExample, TrainingOutcome,
};
pub use types::{BinaryMask, DetectionResult, MaskStatistics, ProcessingTimings};

use std::path::Path;

/// Detect deforestation in an image file using a deployed model snapshot
///
/// Loads the deployment snapshot at `model_dir` and runs the full
/// preprocess -> infer -> postprocess pipeline. For repeated calls construct
/// a [`DeforestationProcessor`] once and reuse it; model parameters are
/// read-only after loading.
///
/// # Errors
///
/// - `DeforestError::ModelUnavailable` when no trained snapshot exists
/// - `DeforestError::Decode` when the input is not a valid image
/// - Inference and postprocessing failures
pub fn detect_deforestation<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    model_dir: Q,
    config: ProcessorConfig,
) -> Result<DetectionResult> {
    let mut processor = DeforestationProcessor::from_artifacts(model_dir, config)?;
    processor.detect_file(input_path)
}

/// Detect deforestation in raw encoded image bytes
///
/// Byte-oriented variant of [`detect_deforestation`] for callers that hold
/// uploads or in-memory images rather than files.
///
/// # Errors
///
/// - `DeforestError::ModelUnavailable` when no trained snapshot exists
/// - `DeforestError::Decode` when the bytes are not a valid image
pub fn detect_deforestation_bytes<P: AsRef<Path>>(
    image_bytes: &[u8],
    model_dir: P,
    config: ProcessorConfig,
) -> Result<DetectionResult> {
    let mut processor = DeforestationProcessor::from_artifacts(model_dir, config)?;
    processor.detect_bytes(image_bytes)
}
