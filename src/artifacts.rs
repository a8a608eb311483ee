//! Persisted training artifacts
//!
//! The training loop produces a directory holding the best-weights checkpoint,
//! a timestamped full snapshot, a deployment-ready snapshot, a compact
//! half-precision export and a metrics log. Inference-only consumers load the
//! deployment snapshot read-only; a missing snapshot is fatal at load time.
//!
//! Layout under the artifact root:
//!
//! ```text
//! saved_models/
//!   best_weights.mpk
//!   deforestation_model_<timestamp>/   (weights + training config)
//!   saved_model/                       (weights + model config)
//!   model_compact.mpk                  (half-precision export)
//!   logs/<timestamp>/metrics.jsonl
//! ```

use crate::error::{DeforestError, Result};
use crate::metrics::EpochMetrics;
use crate::model::{Unet, UnetConfig};

use burn::config::Config;
use burn::module::Module;
use burn::record::{FullPrecisionSettings, HalfPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::Backend;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

const WEIGHTS_FILE: &str = "model";
const MODEL_CONFIG_FILE: &str = "config.json";
const TRAINING_CONFIG_FILE: &str = "training_config.json";

/// Path layout for a training run's artifact directory
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    /// Create a layout rooted at the given directory, creating it if absent
    ///
    /// # Errors
    /// - Directory creation failures
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| DeforestError::file_io_error("create artifact directory", &root, e))?;
        Ok(Self { root })
    }

    /// Artifact root directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Best-weights checkpoint path, without the recorder's extension
    #[must_use]
    pub fn best_weights(&self) -> PathBuf {
        self.root.join("best_weights")
    }

    /// Full snapshot directory for the given training timestamp
    #[must_use]
    pub fn snapshot_dir(&self, timestamp: &str) -> PathBuf {
        self.root.join(format!("deforestation_model_{timestamp}"))
    }

    /// Deployment-ready snapshot directory
    #[must_use]
    pub fn deployment_dir(&self) -> PathBuf {
        self.root.join("saved_model")
    }

    /// Compact half-precision export path, without the recorder's extension
    #[must_use]
    pub fn compact_export(&self) -> PathBuf {
        self.root.join("model_compact")
    }

    /// Per-epoch metrics log path for the given training timestamp
    #[must_use]
    pub fn metrics_log(&self, timestamp: &str) -> PathBuf {
        self.root.join("logs").join(timestamp).join("metrics.jsonl")
    }
}

/// Persist model weights at full precision
///
/// `path` is extension-less; the recorder appends `.mpk`.
///
/// # Errors
/// - Serialization or file I/O failures
pub fn save_weights<B: Backend>(model: &Unet<B>, path: &Path) -> Result<()> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .clone()
        .save_file(path, &recorder)
        .map_err(|e| DeforestError::model(format!("Failed to save weights: {e}")))
}

/// Load model weights saved by [`save_weights`] into an initialized model
///
/// # Errors
/// - Missing or malformed weights file
pub fn load_weights<B: Backend>(model: Unet<B>, path: &Path, device: &B::Device) -> Result<Unet<B>> {
    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    model
        .load_file(path, &recorder, device)
        .map_err(|e| DeforestError::model(format!("Failed to load weights: {e}")))
}

/// Persist a deployment-ready snapshot: model config plus weights
///
/// # Errors
/// - Directory creation, serialization or file I/O failures
pub fn save_deployment<B: Backend>(
    model: &Unet<B>,
    config: &UnetConfig,
    dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| DeforestError::file_io_error("create deployment directory", dir, e))?;

    config
        .save(dir.join(MODEL_CONFIG_FILE))
        .map_err(|e| DeforestError::file_io_error("write model config", dir, e))?;
    save_weights(model, &dir.join(WEIGHTS_FILE))
}

/// Load the deployment snapshot produced by [`save_deployment`]
///
/// This is the read-only load path used by inference-only consumers.
///
/// # Errors
/// - `DeforestError::ModelUnavailable` when no snapshot exists at `dir`
/// - `DeforestError::Model` when the snapshot is present but unreadable
pub fn load_deployment<B: Backend>(dir: &Path, device: &B::Device) -> Result<Unet<B>> {
    let config_path = dir.join(MODEL_CONFIG_FILE);
    let weights_path = dir.join(WEIGHTS_FILE).with_extension("mpk");

    if !config_path.exists() || !weights_path.exists() {
        return Err(DeforestError::model_unavailable(format!(
            "No trained model found at '{}'. Train a model first.",
            dir.display()
        )));
    }

    let config = UnetConfig::load(&config_path)
        .map_err(|e| DeforestError::model(format!("Failed to read model config: {e}")))?;
    let model = config.init::<B>(device);
    load_weights(model, &dir.join(WEIGHTS_FILE), device)
}

/// Persist a full snapshot: weights plus the training configuration
///
/// The optimizer's moment buffers are rebuilt on resume rather than stored.
///
/// # Errors
/// - Directory creation, serialization or file I/O failures
pub fn save_snapshot<B: Backend, C: Config>(
    model: &Unet<B>,
    training_config: &C,
    dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| DeforestError::file_io_error("create snapshot directory", dir, e))?;

    training_config
        .save(dir.join(TRAINING_CONFIG_FILE))
        .map_err(|e| DeforestError::file_io_error("write training config", dir, e))?;
    save_weights(model, &dir.join(WEIGHTS_FILE))
}

/// Persist the compact half-precision export for constrained environments
///
/// Predictions are identical to the full-precision snapshot modulo
/// quantization error.
///
/// # Errors
/// - Serialization or file I/O failures
pub fn save_compact<B: Backend>(model: &Unet<B>, path: &Path) -> Result<()> {
    let recorder = NamedMpkFileRecorder::<HalfPrecisionSettings>::new();
    model
        .clone()
        .save_file(path, &recorder)
        .map_err(|e| DeforestError::model(format!("Failed to save compact export: {e}")))
}

/// Load the compact export produced by [`save_compact`]
///
/// # Errors
/// - Missing or malformed export file
pub fn load_compact<B: Backend>(
    config: &UnetConfig,
    path: &Path,
    device: &B::Device,
) -> Result<Unet<B>> {
    let recorder = NamedMpkFileRecorder::<HalfPrecisionSettings>::new();
    config
        .init::<B>(device)
        .load_file(path, &recorder, device)
        .map_err(|e| DeforestError::model(format!("Failed to load compact export: {e}")))
}

/// Append-only writer for the per-epoch metrics log
///
/// One JSON object per line, consumable by monitoring tooling.
pub struct MetricsLogger {
    file: File,
}

impl MetricsLogger {
    /// Create the log file, including parent directories
    ///
    /// # Errors
    /// - Directory creation or file I/O failures
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DeforestError::file_io_error("create metrics log directory", parent, e))?;
        }
        let file = File::create(path)
            .map_err(|e| DeforestError::file_io_error("create metrics log", path, e))?;
        Ok(Self { file })
    }

    /// Append one epoch's metrics as a JSON line
    ///
    /// # Errors
    /// - Serialization or file I/O failures
    pub fn log(&mut self, metrics: &EpochMetrics) -> Result<()> {
        let line = serde_json::to_string(metrics)
            .map_err(|e| DeforestError::internal(format!("Failed to serialize metrics: {e}")))?;
        writeln!(self.file, "{line}")
            .map_err(|e| DeforestError::internal(format!("Failed to write metrics log: {e}")))
    }
}
