//! Labeled dataset handling for training
//!
//! A training example pairs a normalized RGB image with a binary ground-truth
//! mask at the same spatial resolution. Datasets are loaded from paired
//! image/mask directories, partitioned disjointly into train/validation
//! splits with a deterministic seed, and batched into fixed-size groups.

use crate::error::{DeforestError, Result};
use crate::preprocessing::{ImagePreprocessor, PreprocessingConfig};
use ndarray::{Array3, Array4};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::path::Path;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tif", "tiff"];

/// One labeled example: a `(3, H, W)` image paired with a `(1, H, W)` mask
#[derive(Debug, Clone)]
pub struct TrainingExample {
    /// Normalized RGB image, values in [0, 1]
    pub image: Array3<f32>,
    /// Binary ground-truth mask, values in {0, 1}
    pub mask: Array3<f32>,
}

impl TrainingExample {
    /// Create a training example, validating the pairing invariants
    ///
    /// # Errors
    /// - Image/mask spatial dimensions differ
    /// - Mask contains values other than 0 or 1
    pub fn new(image: Array3<f32>, mask: Array3<f32>) -> Result<Self> {
        let (_, ih, iw) = image.dim();
        let (mc, mh, mw) = mask.dim();
        if mc != 1 || mh != ih || mw != iw {
            return Err(DeforestError::invalid_config(format!(
                "Mask shape (1, {}, {}) expected, got ({}, {}, {})",
                ih, iw, mc, mh, mw
            )));
        }
        if mask.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(DeforestError::invalid_config(
                "Mask values must be 0 or 1",
            ));
        }
        Ok(Self { image, mask })
    }
}

/// An in-memory collection of training examples with uniform dimensions
#[derive(Debug, Clone, Default)]
pub struct SegmentationDataset {
    examples: Vec<TrainingExample>,
}

impl SegmentationDataset {
    /// Build a dataset from examples, validating uniform dimensions
    ///
    /// # Errors
    /// - Examples with differing spatial dimensions
    pub fn from_examples(examples: Vec<TrainingExample>) -> Result<Self> {
        if let Some(first) = examples.first() {
            let dims = first.image.dim();
            if examples.iter().any(|e| e.image.dim() != dims) {
                return Err(DeforestError::invalid_config(
                    "All examples in a dataset must share the same dimensions",
                ));
            }
        }
        Ok(Self { examples })
    }

    /// Load a dataset from paired image and mask directories
    ///
    /// Images and masks are matched by file stem; each image must have a mask.
    /// Both are resized to the preprocessing target size. Masks are resized
    /// with nearest-neighbor filtering to stay binary, then thresholded at
    /// mid-intensity.
    ///
    /// # Errors
    /// - Directory read failures
    /// - `DeforestError::Decode` for unreadable images
    /// - `DeforestError::InvalidConfig` when an image has no paired mask
    pub fn from_directories<P: AsRef<Path>>(
        images_dir: P,
        masks_dir: P,
        config: &PreprocessingConfig,
    ) -> Result<Self> {
        let images_dir = images_dir.as_ref();
        let masks_dir = masks_dir.as_ref();

        let mut image_paths: Vec<_> = std::fs::read_dir(images_dir)
            .map_err(|e| DeforestError::file_io_error("read images directory", images_dir, e))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| {
                        IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                    })
            })
            .collect();
        image_paths.sort();

        let mut examples = Vec::with_capacity(image_paths.len());
        for image_path in image_paths {
            let stem = image_path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    DeforestError::invalid_config(format!(
                        "Unreadable file name: {}",
                        image_path.display()
                    ))
                })?;

            let mask_path = IMAGE_EXTENSIONS
                .iter()
                .map(|ext| masks_dir.join(format!("{stem}.{ext}")))
                .find(|p| p.exists())
                .ok_or_else(|| {
                    DeforestError::invalid_config(format!(
                        "No mask found for image '{}'",
                        image_path.display()
                    ))
                })?;

            let image = load_image_array(&image_path, config)?;
            let mask = load_mask_array(&mask_path, config)?;
            examples.push(TrainingExample::new(image, mask)?);
        }

        Self::from_examples(examples)
    }

    /// Number of examples
    #[must_use]
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the dataset holds no examples
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Partition into disjoint train/validation splits
    ///
    /// The split is deterministic for a given seed; every example lands in
    /// exactly one side.
    ///
    /// # Errors
    /// - `train_fraction` outside (0, 1)
    pub fn split(mut self, train_fraction: f32, seed: u64) -> Result<(Self, Self)> {
        if !(0.0..1.0).contains(&train_fraction) || train_fraction <= 0.0 {
            return Err(DeforestError::invalid_config(
                "Train fraction must lie strictly between 0 and 1",
            ));
        }

        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        self.examples.shuffle(&mut rng);

        let split_at = ((self.examples.len() as f32) * train_fraction).round() as usize;
        let validation = self.examples.split_off(split_at.min(self.examples.len()));

        Ok((
            Self {
                examples: self.examples,
            },
            Self {
                examples: validation,
            },
        ))
    }

    /// Number of full batches available at the given batch size
    #[must_use]
    pub fn num_batches(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            0
        } else {
            self.examples.len() / batch_size
        }
    }

    /// Assemble the `index`-th full batch as `(images, masks)` NCHW arrays
    ///
    /// # Panics
    /// Panics if `index >= num_batches(batch_size)`; callers iterate within
    /// the computed batch count.
    #[must_use]
    pub fn batch(&self, index: usize, batch_size: usize) -> (Array4<f32>, Array4<f32>) {
        let start = index * batch_size;
        self.batch_range(start, start + batch_size)
    }

    /// Assemble the examples in `[start, end)` as `(images, masks)` arrays
    #[must_use]
    pub fn batch_range(&self, start: usize, end: usize) -> (Array4<f32>, Array4<f32>) {
        let examples = &self.examples[start..end];
        let n = examples.len();
        let (c, h, w) = examples[0].image.dim();

        let mut images = Array4::<f32>::zeros((n, c, h, w));
        let mut masks = Array4::<f32>::zeros((n, 1, h, w));
        for (i, example) in examples.iter().enumerate() {
            images
                .index_axis_mut(ndarray::Axis(0), i)
                .assign(&example.image);
            masks
                .index_axis_mut(ndarray::Axis(0), i)
                .assign(&example.mask);
        }
        (images, masks)
    }
}

fn load_image_array(path: &Path, config: &PreprocessingConfig) -> Result<Array3<f32>> {
    let bytes = std::fs::read(path)
        .map_err(|e| DeforestError::file_io_error("read image file", path, e))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| DeforestError::decode(format!("Could not decode '{}': {}", path.display(), e)))?;
    Ok(ImagePreprocessor::image_to_array(&image, config))
}

fn load_mask_array(path: &Path, config: &PreprocessingConfig) -> Result<Array3<f32>> {
    let bytes = std::fs::read(path)
        .map_err(|e| DeforestError::file_io_error("read mask file", path, e))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| DeforestError::decode(format!("Could not decode '{}': {}", path.display(), e)))?;

    let [target_width, target_height] = config.target_size;
    let luma = image.to_luma8();
    let resized = image::imageops::resize(
        &luma,
        target_width,
        target_height,
        image::imageops::FilterType::Nearest,
    );

    let (width, height) = (target_width as usize, target_height as usize);
    let mut mask = Array3::<f32>::zeros((1, height, width));
    for (y, row) in resized.rows().enumerate() {
        for (x, pixel) in row.enumerate() {
            mask[[0, y, x]] = if pixel.0[0] > 127 { 1.0 } else { 0.0 };
        }
    }
    Ok(mask)
}
