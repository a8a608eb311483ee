//! End-to-end tests for the preprocess -> infer -> postprocess pipeline

use deforest_detect::{
    BurnBackend, DeforestError, DeforestationProcessor, ImagePreprocessor, InferenceBackend,
    MockBackend, PostprocessingConfig, Postprocessor, PreprocessingConfig, ProcessorConfig,
    UnetConfig,
};

use burn::backend::NdArray;
use image::{ImageBuffer, Rgb};

type InferenceB = NdArray;

fn png_bytes(width: u32, height: u32, pixel: [u8; 3]) -> Vec<u8> {
    let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(width, height, Rgb(pixel));
    let mut bytes = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut bytes);
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .unwrap();
    bytes
}

fn small_backend() -> BurnBackend<InferenceB> {
    let device = Default::default();
    let model = UnetConfig::new()
        .with_base_channels(2)
        .init::<InferenceB>(&device);
    BurnBackend::new(model, device)
}

#[test]
fn pipeline_operations_compose() {
    let preprocessing = PreprocessingConfig::with_target_size(32);
    let tensor = ImagePreprocessor::preprocess_bytes(&png_bytes(100, 80, [50, 120, 30]), &preprocessing)
        .unwrap();
    assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
    assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));

    let mut backend = small_backend();
    let prediction = backend.infer(&tensor).unwrap();
    assert_eq!(prediction.dim(), (1, 1, 32, 32));

    let (mask, percentage) =
        Postprocessor::postprocess(&prediction, &PostprocessingConfig::default()).unwrap();
    assert_eq!(mask.dimensions, (32, 32));
    assert!(mask.data.iter().all(|&v| v <= 1));
    assert!((0.0..=100.0).contains(&percentage));
}

#[test]
fn processor_with_real_network_is_deterministic() {
    let config = ProcessorConfig::builder()
        .target_size(32, 32)
        .build()
        .unwrap();
    let mut processor = DeforestationProcessor::with_backend(config, Box::new(small_backend()));
    let bytes = png_bytes(64, 64, [90, 140, 40]);

    let first = processor.detect_bytes(&bytes).unwrap();
    let second = processor.detect_bytes(&bytes).unwrap();

    assert_eq!(first.mask, second.mask);
    assert_eq!(
        first.deforestation_percentage,
        second.deforestation_percentage
    );
}

#[test]
fn uniform_low_probability_model_detects_nothing() {
    let config = ProcessorConfig::builder().build().unwrap();
    let mut processor =
        DeforestationProcessor::with_backend(config, Box::new(MockBackend::uniform(0.3)));

    let result = processor.detect_bytes(&png_bytes(256, 256, [0, 0, 0])).unwrap();
    assert!(result.mask.data.iter().all(|&v| v == 0));
    assert_eq!(result.deforestation_percentage, 0.0);
}

#[test]
fn mask_png_export_round_trips() {
    let config = ProcessorConfig::builder()
        .target_size(32, 32)
        .build()
        .unwrap();
    let mut processor =
        DeforestationProcessor::with_backend(config, Box::new(MockBackend::uniform(0.9)));

    let result = processor.detect_bytes(&png_bytes(32, 32, [0, 0, 0])).unwrap();
    let png = result.mask_png_bytes().unwrap();

    let decoded = image::load_from_memory(&png).unwrap().to_luma8();
    assert_eq!(decoded.dimensions(), (32, 32));
    assert!(decoded.pixels().all(|p| p.0[0] == 255));
}

#[test]
fn truncated_bytes_surface_decode_error() {
    let config = ProcessorConfig::builder().build().unwrap();
    let mut processor =
        DeforestationProcessor::with_backend(config, Box::new(MockBackend::default()));

    let mut truncated = png_bytes(32, 32, [0, 0, 0]);
    truncated.truncate(8);
    let result = processor.detect_bytes(&truncated);
    assert!(matches!(result, Err(DeforestError::Decode(_))));
}

#[test]
fn incompatible_target_size_is_rejected_at_configuration() {
    let result = ProcessorConfig::builder().target_size(100, 100).build();
    assert!(matches!(result, Err(DeforestError::ShapeMismatch { .. })));
}
