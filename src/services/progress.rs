//! Progress reporting service
//!
//! Separates progress reporting concerns from the training loop, allowing
//! different frontends to implement their own handling. The CLI attaches a
//! console progress bar; embedding callers get the no-op default.

use crate::metrics::EpochMetrics;

/// Callbacks invoked by the training loop as it advances
pub trait ProgressReporter {
    /// Training is about to start
    fn training_started(&self, total_epochs: usize, steps_per_epoch: usize) {
        let _ = (total_epochs, steps_per_epoch);
    }

    /// One epoch finished, with its metrics
    fn epoch_completed(&self, metrics: &EpochMetrics) {
        let _ = metrics;
    }

    /// The best-weights checkpoint was overwritten
    fn checkpoint_saved(&self, epoch: usize, val_accuracy: f32) {
        let _ = (epoch, val_accuracy);
    }

    /// Training finished, normally or early-stopped
    fn training_finished(&self, epochs_run: usize, stopped_early: bool) {
        let _ = (epochs_run, stopped_early);
    }
}

/// Reporter that ignores every callback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReporter {
        epochs: AtomicUsize,
    }

    impl ProgressReporter for CountingReporter {
        fn epoch_completed(&self, _metrics: &EpochMetrics) {
            self.epochs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_custom_reporter_receives_callbacks() {
        let reporter = CountingReporter {
            epochs: AtomicUsize::new(0),
        };
        reporter.epoch_completed(&EpochMetrics {
            epoch: 1,
            train_loss: 0.4,
            train_dice: 0.6,
            val_dice: 0.5,
            val_accuracy: 0.7,
        });
        assert_eq!(reporter.epochs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_noop_reporter_accepts_all_callbacks() {
        let reporter = NoOpProgressReporter;
        reporter.training_started(10, 5);
        reporter.checkpoint_saved(1, 0.9);
        reporter.training_finished(10, false);
    }
}
