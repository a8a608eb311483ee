//! U-Net segmentation network
//!
//! Encoder-decoder convolutional network with skip connections between
//! contracting and expanding stages at equal spatial resolution. The skip
//! connections recover fine spatial detail lost to downsampling and are what
//! distinguishes this architecture from a plain encoder/decoder. The final
//! stage applies a per-pixel sigmoid to produce probabilities.

mod blocks;

pub use blocks::{
    ConvBlock, ConvBlockConfig, DecoderBlock, DecoderBlockConfig, EncoderBlock, EncoderBlockConfig,
};

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::tensor::{activation::sigmoid, backend::Backend, Tensor};

/// Number of downsampling stages in the contracting path
pub const DOWNSAMPLE_STAGES: usize = 4;

/// Factor by which input spatial dimensions must be divisible (2^stages)
pub const DOWNSAMPLE_FACTOR: usize = 1 << DOWNSAMPLE_STAGES;

/// Configuration for the [`Unet`] segmentation network
#[derive(Config, Debug)]
pub struct UnetConfig {
    /// Input channel count (3 for RGB imagery)
    #[config(default = 3)]
    pub input_channels: usize,

    /// Output channel count; 1 for binary deforestation segmentation.
    /// Multi-class variants change only this and the loss.
    #[config(default = 1)]
    pub output_channels: usize,

    /// Channel count of the first encoder stage; each deeper stage doubles it
    #[config(default = 64)]
    pub base_channels: usize,
}

impl UnetConfig {
    /// Initialize a [`Unet`] with randomly initialized parameters
    pub fn init<B: Backend>(&self, device: &B::Device) -> Unet<B> {
        let c = self.base_channels;

        Unet {
            inc: ConvBlockConfig::new(self.input_channels, c).init(device),
            down1: EncoderBlockConfig::new(c, c * 2).init(device),
            down2: EncoderBlockConfig::new(c * 2, c * 4).init(device),
            down3: EncoderBlockConfig::new(c * 4, c * 8).init(device),
            down4: EncoderBlockConfig::new(c * 8, c * 16).init(device),
            up1: DecoderBlockConfig::new(c * 16, c * 8).init(device),
            up2: DecoderBlockConfig::new(c * 8, c * 4).init(device),
            up3: DecoderBlockConfig::new(c * 4, c * 2).init(device),
            up4: DecoderBlockConfig::new(c * 2, c).init(device),
            outc: Conv2dConfig::new([c, self.output_channels], [1, 1]).init(device),
        }
    }
}

/// U-Net encoder-decoder with skip connections
#[derive(Module, Debug)]
pub struct Unet<B: Backend> {
    inc: ConvBlock<B>,
    down1: EncoderBlock<B>,
    down2: EncoderBlock<B>,
    down3: EncoderBlock<B>,
    down4: EncoderBlock<B>,
    up1: DecoderBlock<B>,
    up2: DecoderBlock<B>,
    up3: DecoderBlock<B>,
    up4: DecoderBlock<B>,
    outc: Conv2d<B>,
}

impl<B: Backend> Unet<B> {
    /// Forward pass: `[N, 3, H, W]` normalized images to `[N, 1, H, W]`
    /// per-pixel probabilities in [0, 1]
    ///
    /// `H` and `W` must be divisible by [`DOWNSAMPLE_FACTOR`]; callers
    /// validate this before invoking the network.
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x1 = self.inc.forward(input);
        let x2 = self.down1.forward(x1.clone());
        let x3 = self.down2.forward(x2.clone());
        let x4 = self.down3.forward(x3.clone());
        let x5 = self.down4.forward(x4.clone());

        let x = self.up1.forward(x5, x4);
        let x = self.up2.forward(x, x3);
        let x = self.up3.forward(x, x2);
        let x = self.up4.forward(x, x1);

        sigmoid(self.outc.forward(x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn small_config() -> UnetConfig {
        UnetConfig::new().with_base_channels(2)
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);

        let output = model.forward(input);
        assert_eq!(output.dims(), [1, 1, 32, 32]);
    }

    #[test]
    fn test_output_values_are_probabilities() {
        let device = Default::default();
        let model = small_config().init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 16, 16],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );

        let output = model.forward(input);
        let values = output.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_multi_class_output_channels() {
        let device = Default::default();
        let model = small_config().with_output_channels(3).init::<TestBackend>(&device);
        let input = Tensor::<TestBackend, 4>::zeros([1, 3, 16, 16], &device);

        assert_eq!(model.forward(input).dims(), [1, 3, 16, 16]);
    }
}
