//! CNN Model Architecture for Plant Disease Classification
//!
//! Convolutional network built with Burn. Served by the Burn classifier
//! runtime from a `CompactRecorder` record; the input size is free since the
//! head sits behind global average pooling.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

/// Configuration for the PlantClassifier CNN model
#[derive(Config, Debug)]
pub struct PlantClassifierConfig {
    /// Number of output classes
    #[config(default = "38")]
    pub num_classes: usize,

    /// Dropout rate for regularization (inactive at inference)
    #[config(default = "0.3")]
    pub dropout_rate: f64,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Base number of convolutional filters
    #[config(default = "32")]
    pub base_filters: usize,
}

impl PlantClassifierConfig {
    /// Build the model on a device
    pub fn init<B: Backend>(&self, device: &B::Device) -> PlantClassifier<B> {
        PlantClassifier::new(self, device)
    }
}

/// Conv2d, BatchNorm, ReLU, then 2×2 max-pool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub bn: BatchNorm<B, 2>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Same)
            .init(device);

        Self {
            conv,
            bn: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.bn.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Plant Disease Classifier CNN
///
/// Architecture:
/// - 4 convolutional blocks (3 → 32 → 64 → 128 → 256 filters at the default base)
/// - Global Average Pooling
/// - Fully connected head with dropout
#[derive(Module, Debug)]
pub struct PlantClassifier<B: Backend> {
    pub conv1: ConvBlock<B>,
    pub conv2: ConvBlock<B>,
    pub conv3: ConvBlock<B>,
    pub conv4: ConvBlock<B>,
    pub global_pool: AdaptiveAvgPool2d,
    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> PlantClassifier<B> {
    pub fn new(config: &PlantClassifierConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        Self {
            conv1: ConvBlock::new(config.in_channels, base, device), // 128 -> 64
            conv2: ConvBlock::new(base, base * 2, device),           // 64 -> 32
            conv3: ConvBlock::new(base * 2, base * 4, device),       // 32 -> 16
            conv4: ConvBlock::new(base * 4, base * 8, device),       // 16 -> 8
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            fc1: LinearConfig::new(base * 8, 256).init(device),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            fc2: LinearConfig::new(256, config.num_classes).init(device),
            num_classes: config.num_classes,
        }
    }

    /// Logits for an NCHW batch `[batch, 3, height, width]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv1.forward(x);
        let x = self.conv2.forward(x);
        let x = self.conv3.forward(x);
        let x = self.conv4.forward(x);

        // [B, C, H, W] -> [B, C, 1, 1] -> [B, C]
        let x = self.global_pool.forward(x);
        let [batch_size, channels, _, _] = x.dims();
        let x = x.reshape([batch_size, channels]);

        let x = self.fc1.forward(x);
        let x = Relu::new().forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Class probabilities
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
