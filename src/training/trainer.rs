//! Training loop for the segmentation network
//!
//! Fits model parameters against a labeled dataset with Adam, minimizing Dice
//! loss. After each epoch the validation binary accuracy drives the
//! checkpoint/early-stopping policy; on completion three artifacts are
//! exported alongside a per-epoch metrics log.

use crate::artifacts::{self, ArtifactLayout, MetricsLogger};
use crate::error::DeforestError;
use crate::metrics::{binary_accuracy, dice_coefficient, EpochMetrics};
use crate::model::{Unet, UnetConfig};
use crate::services::{NoOpProgressReporter, ProgressReporter};
use crate::training::checkpoint::CheckpointPolicy;
use crate::training::dataset::SegmentationDataset;

use burn::config::Config;
use burn::module::AutodiffModule;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{ElementConversion, Tensor, TensorData};
use chrono::Local;
use ndarray::Array4;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Hyperparameters and model configuration for one training run
#[derive(Config)]
pub struct TrainingConfig {
    /// Network architecture configuration
    pub model: UnetConfig,

    /// Optimizer configuration
    pub optimizer: AdamConfig,

    /// Number of training epochs
    #[config(default = 40)]
    pub epochs: usize,

    /// Examples per gradient step; steps per epoch = floor(n / batch size)
    #[config(default = 32)]
    pub batch_size: usize,

    /// Epochs without validation-accuracy improvement before early stopping
    #[config(default = 4)]
    pub patience: usize,

    /// Adam learning rate
    #[config(default = 1.0e-3)]
    pub learning_rate: f64,

    /// Seed for parameter initialization
    #[config(default = 42)]
    pub seed: u64,

    /// Dice smoothing constant
    #[config(default = 1.0)]
    pub smooth: f64,
}

/// Paths of the artifacts a completed run produced
#[derive(Debug, Clone)]
pub struct TrainingArtifacts {
    /// Best-weights checkpoint (extension-less; recorder appends `.mpk`)
    pub best_weights: PathBuf,
    /// Timestamped full snapshot directory
    pub snapshot_dir: PathBuf,
    /// Deployment-ready snapshot directory
    pub deployment_dir: PathBuf,
    /// Compact half-precision export (extension-less)
    pub compact_export: PathBuf,
    /// Per-epoch metrics log
    pub metrics_log: PathBuf,
}

/// Summary of a completed training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    /// Number of epochs actually executed
    pub epochs_run: usize,
    /// Best validation binary accuracy observed
    pub best_val_accuracy: f32,
    /// Whether the patience window triggered early stopping
    pub stopped_early: bool,
    /// Artifact paths produced by the run
    pub artifacts: TrainingArtifacts,
}

/// Training driver binding a configuration to a compute device
pub struct Trainer<B: AutodiffBackend> {
    config: TrainingConfig,
    device: B::Device,
    progress: Box<dyn ProgressReporter>,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a trainer with no progress reporting
    pub fn new(config: TrainingConfig, device: B::Device) -> Self {
        Self {
            config,
            device,
            progress: Box::new(NoOpProgressReporter),
        }
    }

    /// Attach a progress reporter
    #[must_use]
    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Fit the model, writing artifacts under `artifact_root`
    ///
    /// A failure inside a batch aborts the run; batches are never retried.
    ///
    /// # Errors
    /// - `DeforestError::TrainingConfig` for an empty training dataset, an
    ///   empty validation dataset, a zero batch size, or a training dataset
    ///   smaller than one batch (zero steps per epoch)
    /// - Artifact persistence failures
    pub fn fit(
        &self,
        train: &SegmentationDataset,
        valid: &SegmentationDataset,
        artifact_root: &Path,
    ) -> crate::error::Result<TrainingOutcome> {
        if self.config.batch_size == 0 {
            return Err(DeforestError::training_config("Batch size must be non-zero"));
        }
        if train.is_empty() {
            return Err(DeforestError::training_config("Training dataset is empty"));
        }
        if valid.is_empty() {
            return Err(DeforestError::training_config(
                "Validation dataset is empty",
            ));
        }
        let steps_per_epoch = train.num_batches(self.config.batch_size);
        if steps_per_epoch == 0 {
            return Err(DeforestError::training_config(format!(
                "Zero steps per epoch: {} examples cannot fill a batch of {}",
                train.len(),
                self.config.batch_size
            )));
        }

        B::seed(self.config.seed);

        let layout = ArtifactLayout::create(artifact_root)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let metrics_log_path = layout.metrics_log(&timestamp);
        let mut metrics_logger = MetricsLogger::create(&metrics_log_path)?;

        let mut model = self.config.model.init::<B>(&self.device);
        let mut optim = self.config.optimizer.init();
        let mut policy = CheckpointPolicy::new(self.config.patience);

        info!(
            epochs = self.config.epochs,
            batch_size = self.config.batch_size,
            steps_per_epoch,
            train_examples = train.len(),
            valid_examples = valid.len(),
            "Starting training run"
        );
        self.progress
            .training_started(self.config.epochs, steps_per_epoch);

        let mut epochs_run = 0;
        let mut stopped_early = false;

        for epoch in 1..=self.config.epochs {
            let mut loss_sum = 0.0f32;
            let mut dice_sum = 0.0f32;

            for step in 0..steps_per_epoch {
                let (images, masks) = train.batch(step, self.config.batch_size);
                let images = to_tensor::<B>(&images, &self.device);
                let masks = to_tensor::<B>(&masks, &self.device);

                let predictions = model.forward(images);
                let dice = dice_coefficient(masks, predictions, self.config.smooth);
                let loss = dice.clone().neg().add_scalar(1.0);

                loss_sum += scalar(loss.clone());
                dice_sum += scalar(dice);

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(self.config.learning_rate, model, grads);
            }

            let valid_model = model.valid();
            let (val_dice, val_accuracy) = evaluate(
                &valid_model,
                valid,
                self.config.batch_size,
                self.config.smooth,
                &self.device,
            );

            let metrics = EpochMetrics {
                epoch,
                train_loss: loss_sum / steps_per_epoch as f32,
                train_dice: dice_sum / steps_per_epoch as f32,
                val_dice,
                val_accuracy,
            };
            metrics_logger.log(&metrics)?;
            self.progress.epoch_completed(&metrics);
            debug!(
                epoch,
                train_loss = metrics.train_loss,
                val_dice,
                val_accuracy,
                "Epoch finished"
            );

            epochs_run = epoch;
            let decision = policy.observe(val_accuracy);
            if decision.save_best {
                artifacts::save_weights(&valid_model, &layout.best_weights())?;
                self.progress.checkpoint_saved(epoch, val_accuracy);
                debug!(epoch, val_accuracy, "Saved best-weights checkpoint");
            }
            if decision.stop {
                stopped_early = true;
                info!(
                    epoch,
                    patience = self.config.patience,
                    "Early stopping: validation accuracy stopped improving"
                );
                break;
            }
        }

        if stopped_early {
            // Deploy the best checkpoint, not the final epoch's parameters
            model = artifacts::load_weights(model, &layout.best_weights(), &self.device)?;
        }

        let final_model = model.valid();
        let snapshot_dir = layout.snapshot_dir(&timestamp);
        artifacts::save_snapshot(&final_model, &self.config, &snapshot_dir)?;
        artifacts::save_deployment(&final_model, &self.config.model, &layout.deployment_dir())?;
        artifacts::save_compact(&final_model, &layout.compact_export())?;

        let outcome = TrainingOutcome {
            epochs_run,
            best_val_accuracy: policy.best().unwrap_or(0.0),
            stopped_early,
            artifacts: TrainingArtifacts {
                best_weights: layout.best_weights(),
                snapshot_dir,
                deployment_dir: layout.deployment_dir(),
                compact_export: layout.compact_export(),
                metrics_log: metrics_log_path,
            },
        };

        info!(
            epochs_run = outcome.epochs_run,
            best_val_accuracy = outcome.best_val_accuracy,
            stopped_early,
            "Training run finished"
        );
        self.progress.training_finished(epochs_run, stopped_early);

        Ok(outcome)
    }
}

/// Compute validation Dice coefficient and binary accuracy over a dataset
fn evaluate<B: Backend>(
    model: &Unet<B>,
    dataset: &SegmentationDataset,
    batch_size: usize,
    smooth: f64,
    device: &B::Device,
) -> (f32, f32) {
    let mut dice_sum = 0.0f32;
    let mut accuracy_sum = 0.0f32;
    let mut start = 0;

    while start < dataset.len() {
        let end = (start + batch_size).min(dataset.len());
        let (images, masks) = dataset.batch_range(start, end);
        let images = to_tensor::<B>(&images, device);
        let masks = to_tensor::<B>(&masks, device);

        let predictions = model.forward(images);
        let weight = (end - start) as f32;
        dice_sum += scalar(dice_coefficient(
            masks.clone(),
            predictions.clone(),
            smooth,
        )) * weight;
        accuracy_sum += scalar(binary_accuracy(masks, predictions)) * weight;
        start = end;
    }

    let total = dataset.len() as f32;
    (dice_sum / total, accuracy_sum / total)
}

fn to_tensor<B: Backend>(array: &Array4<f32>, device: &B::Device) -> Tensor<B, 4> {
    let (n, c, h, w) = array.dim();
    Tensor::from_data(
        TensorData::new(array.iter().copied().collect::<Vec<f32>>(), [n, c, h, w]),
        device,
    )
}

fn scalar<B: Backend>(tensor: Tensor<B, 1>) -> f32 {
    tensor.into_scalar().elem::<f32>()
}
