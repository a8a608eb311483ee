//! Model training: datasets, checkpoint policy and the training loop

mod checkpoint;
mod dataset;
mod trainer;

pub use checkpoint::{CheckpointPolicy, EpochDecision};
pub use dataset::{SegmentationDataset, TrainingExample};
pub use trainer::{Trainer, TrainingArtifacts, TrainingConfig, TrainingOutcome};
