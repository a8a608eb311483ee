//! Segmentation metrics: Dice coefficient, Dice loss and binary accuracy
//!
//! The Dice coefficient is computed per example (summing over channel and
//! spatial axes) and then averaged over the batch. A smoothing constant keeps
//! the ratio defined when a mask is entirely empty.

use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

/// Default smoothing constant for the Dice coefficient
pub const DEFAULT_SMOOTH: f64 = 1.0;

/// Dice coefficient between two probability/mask tensors of shape `[N, C, H, W]`
///
/// Returns a scalar tensor in [0, 1]; 1 means perfect overlap.
pub fn dice_coefficient<B: Backend>(
    y_true: Tensor<B, 4>,
    y_pred: Tensor<B, 4>,
    smooth: f64,
) -> Tensor<B, 1> {
    let intersection = (y_true.clone() * y_pred.clone()).flatten::<2>(1, 3).sum_dim(1);
    let union = y_true.flatten::<2>(1, 3).sum_dim(1) + y_pred.flatten::<2>(1, 3).sum_dim(1);

    let per_example = intersection
        .mul_scalar(2.0)
        .add_scalar(smooth)
        .div(union.add_scalar(smooth));

    per_example.mean()
}

/// Dice loss, the complement of the Dice coefficient
///
/// Minimized during training; `dice_loss + dice_coefficient = 1` exactly.
pub fn dice_loss<B: Backend>(
    y_true: Tensor<B, 4>,
    y_pred: Tensor<B, 4>,
    smooth: f64,
) -> Tensor<B, 1> {
    dice_coefficient(y_true, y_pred, smooth).neg().add_scalar(1.0)
}

/// Fraction of pixels whose thresholded classification matches the target
///
/// Both tensors are thresholded at 0.5 before comparison, so probabilities and
/// already-binary masks are treated uniformly.
pub fn binary_accuracy<B: Backend>(y_true: Tensor<B, 4>, y_pred: Tensor<B, 4>) -> Tensor<B, 1> {
    let true_bin = y_true.greater_elem(0.5);
    let pred_bin = y_pred.greater_elem(0.5);
    pred_bin.equal(true_bin).float().mean()
}

/// Metrics recorded at the end of one training epoch
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// Epoch number, starting at 1
    pub epoch: usize,
    /// Mean training Dice loss across the epoch's batches
    pub train_loss: f32,
    /// Mean training Dice coefficient across the epoch's batches
    pub train_dice: f32,
    /// Validation Dice coefficient
    pub val_dice: f32,
    /// Validation binary accuracy, the checkpointing monitor
    pub val_accuracy: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{ElementConversion, TensorData};

    type TestBackend = NdArray;

    fn tensor_from(values: Vec<f32>, shape: [usize; 4]) -> Tensor<TestBackend, 4> {
        let device = Default::default();
        Tensor::from_data(TensorData::new(values, shape), &device)
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    #[test]
    fn test_dice_identical_masks_is_one() {
        let mask = tensor_from(vec![1.0, 0.0, 1.0, 0.0], [1, 1, 2, 2]);
        let dice = scalar(dice_coefficient(mask.clone(), mask, DEFAULT_SMOOTH));
        assert!((dice - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dice_disjoint_masks_is_zero_without_smoothing() {
        let y_true = tensor_from(vec![1.0, 1.0, 0.0, 0.0], [1, 1, 2, 2]);
        let y_pred = tensor_from(vec![0.0, 0.0, 1.0, 1.0], [1, 1, 2, 2]);
        let dice = scalar(dice_coefficient(y_true, y_pred, 0.0));
        assert!(dice.abs() < 1e-6);
    }

    #[test]
    fn test_empty_masks_with_smoothing_do_not_divide_by_zero() {
        let zeros = tensor_from(vec![0.0; 4], [1, 1, 2, 2]);
        let dice = scalar(dice_coefficient(zeros.clone(), zeros, DEFAULT_SMOOTH));
        assert!((dice - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_loss_plus_coefficient_is_one() {
        let y_true = tensor_from(vec![1.0, 0.0, 1.0, 1.0], [1, 1, 2, 2]);
        let y_pred = tensor_from(vec![0.9, 0.1, 0.4, 0.8], [1, 1, 2, 2]);

        let coef = scalar(dice_coefficient(y_true.clone(), y_pred.clone(), DEFAULT_SMOOTH));
        let loss = scalar(dice_loss(y_true, y_pred, DEFAULT_SMOOTH));
        assert!((coef + loss - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dice_averages_over_batch() {
        // First example perfect overlap, second fully disjoint
        let y_true = tensor_from(vec![1.0, 1.0, 1.0, 0.0], [2, 1, 1, 2]);
        let y_pred = tensor_from(vec![1.0, 1.0, 0.0, 1.0], [2, 1, 1, 2]);
        let dice = scalar(dice_coefficient(y_true, y_pred, 0.0));
        assert!((dice - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_binary_accuracy() {
        let y_true = tensor_from(vec![1.0, 0.0, 1.0, 0.0], [1, 1, 2, 2]);
        let y_pred = tensor_from(vec![0.9, 0.2, 0.3, 0.1], [1, 1, 2, 2]);
        let acc = scalar(binary_accuracy(y_true, y_pred));
        assert!((acc - 0.75).abs() < 1e-6);
    }
}
