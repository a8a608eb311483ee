//! Building blocks for the segmentation network

use burn::config::Config;
use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{PaddingConfig2d, Relu};
use burn::tensor::{backend::Backend, Tensor};

/// Configuration for a double-convolution block
#[derive(Config, Debug)]
pub struct ConvBlockConfig {
    /// Input channel count
    pub channels_in: usize,
    /// Output channel count
    pub channels_out: usize,
}

impl ConvBlockConfig {
    /// Initialize a [`ConvBlock`] on the given device
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvBlock<B> {
        let conv1 = Conv2dConfig::new([self.channels_in, self.channels_out], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);
        let conv2 = Conv2dConfig::new([self.channels_out, self.channels_out], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        ConvBlock {
            conv1,
            conv2,
            activation: Relu::new(),
        }
    }
}

/// Two 3x3 convolutions with ReLU activations, preserving spatial resolution
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    activation: Relu,
}

impl<B: Backend> ConvBlock<B> {
    /// Forward pass: `[N, C_in, H, W]` -> `[N, C_out, H, W]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.activation.forward(self.conv1.forward(input));
        self.activation.forward(self.conv2.forward(x))
    }
}

/// Configuration for a contracting-path stage
#[derive(Config, Debug)]
pub struct EncoderBlockConfig {
    /// Input channel count
    pub channels_in: usize,
    /// Output channel count
    pub channels_out: usize,
}

impl EncoderBlockConfig {
    /// Initialize an [`EncoderBlock`] on the given device
    pub fn init<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            conv: ConvBlockConfig::new(self.channels_in, self.channels_out).init(device),
        }
    }
}

/// Contracting-path stage: 2x2 max-pool followed by a double convolution
///
/// Halves the spatial resolution, so input dimensions must be even.
#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pool: MaxPool2d,
    conv: ConvBlock<B>,
}

impl<B: Backend> EncoderBlock<B> {
    /// Forward pass: `[N, C_in, H, W]` -> `[N, C_out, H/2, W/2]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        self.conv.forward(self.pool.forward(input))
    }
}

/// Configuration for an expanding-path stage
#[derive(Config, Debug)]
pub struct DecoderBlockConfig {
    /// Input channel count from the previous (deeper) stage
    pub channels_in: usize,
    /// Output channel count; also the channel count of the skip input
    pub channels_out: usize,
}

impl DecoderBlockConfig {
    /// Initialize a [`DecoderBlock`] on the given device
    pub fn init<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        let upsample = ConvTranspose2dConfig::new([self.channels_in, self.channels_out], [2, 2])
            .with_stride([2, 2])
            .init(device);
        // Concatenating the skip feature doubles the channel count again
        let conv = ConvBlockConfig::new(self.channels_out * 2, self.channels_out).init(device);

        DecoderBlock { upsample, conv }
    }
}

/// Expanding-path stage: transposed-convolution upsampling, skip-feature
/// concatenation and a double convolution
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    upsample: ConvTranspose2d<B>,
    conv: ConvBlock<B>,
}

impl<B: Backend> DecoderBlock<B> {
    /// Forward pass combining the deeper feature map with its skip connection
    ///
    /// `input` is `[N, C_in, H, W]`; `skip` must be `[N, C_out, 2H, 2W]`, the
    /// encoder feature at matching resolution.
    pub fn forward(&self, input: Tensor<B, 4>, skip: Tensor<B, 4>) -> Tensor<B, 4> {
        let upsampled = self.upsample.forward(input);
        let merged = Tensor::cat(vec![skip, upsampled], 1);
        self.conv.forward(merged)
    }
}
