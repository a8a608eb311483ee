//! Command-line interface for deforestation detection
//!
//! Two subcommands: `predict` runs the inference pipeline against a deployed
//! model snapshot; `train` fits the segmentation model on paired image/mask
//! directories.

use crate::config::ProcessorConfig;
use crate::metrics::EpochMetrics;
use crate::model::UnetConfig;
use crate::preprocessing::PreprocessingConfig;
use crate::processor::DeforestationProcessor;
use crate::services::ProgressReporter;
use crate::tracing_config::TracingConfig;
use crate::training::{SegmentationDataset, Trainer, TrainingConfig};

use anyhow::Context;
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::optim::AdamConfig;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Mutex;

type TrainingBackend = Autodiff<NdArray>;

/// Deforestation detection tool
#[derive(Parser)]
#[command(name = "deforest-detect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect deforestation in a satellite image
    Predict {
        /// Input image file
        input: PathBuf,

        /// Deployment snapshot directory produced by `train`
        #[arg(short, long, default_value = "saved_models/saved_model")]
        model_dir: PathBuf,

        /// Write the predicted mask as a PNG file
        #[arg(short, long)]
        output_mask: Option<PathBuf>,

        /// Probability threshold for the binary mask
        #[arg(long, default_value_t = 0.5)]
        threshold: f32,

        /// Model input size (square)
        #[arg(long, default_value_t = 256)]
        size: u32,
    },

    /// Train the segmentation model on paired image/mask directories
    Train {
        /// Directory of training images
        #[arg(long)]
        images: PathBuf,

        /// Directory of binary ground-truth masks, paired by file stem
        #[arg(long)]
        masks: PathBuf,

        /// Artifact output directory
        #[arg(short, long, default_value = "saved_models")]
        output_dir: PathBuf,

        /// Number of training epochs
        #[arg(long, default_value_t = 40)]
        epochs: usize,

        /// Examples per gradient step
        #[arg(long, default_value_t = 32)]
        batch_size: usize,

        /// Early-stopping patience in epochs
        #[arg(long, default_value_t = 4)]
        patience: usize,

        /// Adam learning rate
        #[arg(long, default_value_t = 1e-3)]
        learning_rate: f64,

        /// Fraction of examples used for training (rest validate)
        #[arg(long, default_value_t = 0.8)]
        train_fraction: f32,

        /// Seed for the dataset split and parameter initialization
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Model input size (square)
        #[arg(long, default_value_t = 256)]
        size: u32,
    },
}

/// Parse arguments and run the requested subcommand
///
/// # Errors
/// Returns an error for invalid configuration, missing models or datasets,
/// and any pipeline failure; the binary surfaces it and exits non-zero.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    TracingConfig::new()
        .with_verbosity(cli.verbose)
        .init()
        .context("Failed to initialize tracing")?;

    match cli.command {
        Command::Predict {
            input,
            model_dir,
            output_mask,
            threshold,
            size,
        } => predict(&input, &model_dir, output_mask.as_deref(), threshold, size),
        Command::Train {
            images,
            masks,
            output_dir,
            epochs,
            batch_size,
            patience,
            learning_rate,
            train_fraction,
            seed,
            size,
        } => train(
            &images,
            &masks,
            &output_dir,
            epochs,
            batch_size,
            patience,
            learning_rate,
            train_fraction,
            seed,
            size,
        ),
    }
}

fn predict(
    input: &std::path::Path,
    model_dir: &std::path::Path,
    output_mask: Option<&std::path::Path>,
    threshold: f32,
    size: u32,
) -> anyhow::Result<()> {
    let config = ProcessorConfig::builder()
        .target_size(size, size)
        .threshold(threshold)
        .build()
        .context("Invalid processor configuration")?;

    let mut processor = DeforestationProcessor::from_artifacts(model_dir, config)
        .context("Failed to load deployed model")?;
    let result = processor
        .detect_file(input)
        .with_context(|| format!("Failed to process '{}'", input.display()))?;

    println!(
        "Predicted deforestation: {:.2}%",
        result.deforestation_percentage
    );
    println!(
        "Timings: decode {}ms, preprocess {}ms, inference {}ms, postprocess {}ms (total {}ms)",
        result.timings.decode_ms,
        result.timings.preprocess_ms,
        result.timings.inference_ms,
        result.timings.postprocess_ms,
        result.timings.total_ms
    );

    if let Some(mask_path) = output_mask {
        result
            .save_mask_png(mask_path)
            .with_context(|| format!("Failed to write mask to '{}'", mask_path.display()))?;
        println!("Mask written to {}", mask_path.display());
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn train(
    images: &std::path::Path,
    masks: &std::path::Path,
    output_dir: &std::path::Path,
    epochs: usize,
    batch_size: usize,
    patience: usize,
    learning_rate: f64,
    train_fraction: f32,
    seed: u64,
    size: u32,
) -> anyhow::Result<()> {
    let preprocessing = PreprocessingConfig::with_target_size(size);
    let dataset = SegmentationDataset::from_directories(images, masks, &preprocessing)
        .context("Failed to load training data")?;
    println!("Loaded {} examples", dataset.len());

    let (train_split, valid_split) = dataset
        .split(train_fraction, seed)
        .context("Failed to split dataset")?;
    println!(
        "Split: {} training, {} validation",
        train_split.len(),
        valid_split.len()
    );

    let config = TrainingConfig::new(UnetConfig::new(), AdamConfig::new())
        .with_epochs(epochs)
        .with_batch_size(batch_size)
        .with_patience(patience)
        .with_learning_rate(learning_rate)
        .with_seed(seed);

    let trainer = Trainer::<TrainingBackend>::new(config, NdArrayDevice::default())
        .with_progress(Box::new(ConsoleProgressReporter::default()));
    let outcome = trainer
        .fit(&train_split, &valid_split, output_dir)
        .context("Training failed")?;

    println!(
        "Training finished after {} epochs{} (best validation accuracy {:.4})",
        outcome.epochs_run,
        if outcome.stopped_early {
            ", stopped early"
        } else {
            ""
        },
        outcome.best_val_accuracy
    );
    println!(
        "Deployment snapshot: {}",
        outcome.artifacts.deployment_dir.display()
    );
    println!(
        "Compact export: {}",
        outcome.artifacts.compact_export.display()
    );
    println!("Metrics log: {}", outcome.artifacts.metrics_log.display());

    Ok(())
}

/// Console progress reporter backed by an indicatif epoch bar
#[derive(Default)]
struct ConsoleProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter for ConsoleProgressReporter {
    fn training_started(&self, total_epochs: usize, steps_per_epoch: usize) {
        let bar = ProgressBar::new(total_epochs as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.green} {pos}/{len} epochs {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message(format!("({steps_per_epoch} steps/epoch)"));
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(bar);
        }
    }

    fn epoch_completed(&self, metrics: &EpochMetrics) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.set_message(format!(
                    "loss {:.4} val_dice {:.4} val_acc {:.4}",
                    metrics.train_loss, metrics.val_dice, metrics.val_accuracy
                ));
                bar.inc(1);
            }
        }
    }

    fn checkpoint_saved(&self, epoch: usize, val_accuracy: f32) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.println(format!(
                    "Epoch {epoch}: new best validation accuracy {val_accuracy:.4}, checkpoint saved"
                ));
            }
        }
    }

    fn training_finished(&self, _epochs_run: usize, stopped_early: bool) {
        if let Ok(slot) = self.bar.lock() {
            if let Some(bar) = slot.as_ref() {
                if stopped_early {
                    bar.abandon_with_message("early stopping".to_string());
                } else {
                    bar.finish();
                }
            }
        }
    }
}
