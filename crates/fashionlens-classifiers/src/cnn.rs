//! Convolutional image classifier built on Candle
//!
//! The network is a plain stack: for every entry in
//! [`CnnArchitecture::conv_channels`] a "same"-padded convolution, ReLU and a
//! 2x2 max-pool; then flatten, a hidden dense layer with ReLU, and a dense
//! output layer followed by softmax.
//!
//! Input arrives NHWC (`[1, H, W, 3]`). Convolutions run in NCHW and the
//! feature map is permuted back to NHWC before flattening, so dense weights
//! exported from a channels-last framework line up without reordering.
//!
//! Weight names: `conv{i}.weight`, `conv{i}.bias`, `hidden.weight`,
//! `hidden.bias`, `output.weight`, `output.bias`.

use crate::classifier::Classifier;
use crate::model_loader::LoadedWeights;
use crate::preprocess::{ImageTensor, InputSize, CHANNELS};
use candle_core::{Device, Tensor, D};
use candle_nn::{Conv2d, Conv2dConfig, Linear, Module, VarBuilder};
use fashionlens_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Layer sizes of the convolutional stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CnnArchitecture {
    /// Output channels of each conv block
    #[serde(default = "default_conv_channels")]
    pub conv_channels: Vec<usize>,

    /// Square kernel side; must be odd for "same" padding
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,

    /// Width of the hidden dense layer
    #[serde(default = "default_hidden_units")]
    pub hidden_units: usize,
}

impl Default for CnnArchitecture {
    fn default() -> Self {
        Self {
            conv_channels: default_conv_channels(),
            kernel_size: default_kernel_size(),
            hidden_units: default_hidden_units(),
        }
    }
}

impl CnnArchitecture {
    /// Length of the flattened feature vector for a given input size
    pub fn flattened_features(&self, input: InputSize) -> Result<usize> {
        let mut height = input.height as usize;
        let mut width = input.width as usize;
        for _ in &self.conv_channels {
            height /= 2;
            width /= 2;
        }
        if height == 0 || width == 0 {
            return Err(Error::config(format!(
                "{} pooling stages reduce a {}x{} input to nothing",
                self.conv_channels.len(),
                input.height,
                input.width
            )));
        }

        let channels = self.conv_channels.last().copied().unwrap_or(CHANNELS);
        Ok(height * width * channels)
    }

    fn validate(&self) -> Result<()> {
        if self.kernel_size % 2 == 0 {
            return Err(Error::config(format!(
                "kernel_size must be odd, got {}",
                self.kernel_size
            )));
        }
        if self.hidden_units == 0 || self.conv_channels.iter().any(|&c| c == 0) {
            return Err(Error::config("layer widths must be non-zero"));
        }
        Ok(())
    }
}

fn default_conv_channels() -> Vec<usize> {
    vec![16, 32, 64]
}

fn default_kernel_size() -> usize {
    3
}

fn default_hidden_units() -> usize {
    128
}

/// A CNN classifier with fixed input size and class count
pub struct CnnClassifier {
    name: String,
    convs: Vec<Conv2d>,
    hidden: Linear,
    output: Linear,
    input: InputSize,
    num_classes: usize,
    device: Device,
}

impl CnnClassifier {
    /// Build the network from a VarBuilder
    ///
    /// Every tensor is fetched with its expected shape, so weights produced
    /// for a different architecture or class count are rejected here.
    pub fn new(
        name: impl Into<String>,
        architecture: &CnnArchitecture,
        input: InputSize,
        num_classes: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let name = name.into();
        architecture.validate()?;
        let flattened = architecture.flattened_features(input)?;
        let device = vb.device().clone();

        let build = || -> candle_core::Result<(Vec<Conv2d>, Linear, Linear)> {
            let conv_config = Conv2dConfig {
                padding: architecture.kernel_size / 2,
                ..Default::default()
            };

            let mut convs = Vec::with_capacity(architecture.conv_channels.len());
            let mut in_channels = CHANNELS;
            for (i, &out_channels) in architecture.conv_channels.iter().enumerate() {
                convs.push(candle_nn::conv2d(
                    in_channels,
                    out_channels,
                    architecture.kernel_size,
                    conv_config,
                    vb.pp(format!("conv{}", i)),
                )?);
                in_channels = out_channels;
            }

            let hidden = candle_nn::linear(flattened, architecture.hidden_units, vb.pp("hidden"))?;
            let output = candle_nn::linear(architecture.hidden_units, num_classes, vb.pp("output"))?;
            Ok((convs, hidden, output))
        };

        let (convs, hidden, output) = build().map_err(|e| {
            Error::config(format!("weights for '{}' do not match the network: {}", name, e))
        })?;

        Ok(Self {
            name,
            convs,
            hidden,
            output,
            input,
            num_classes,
            device,
        })
    }

    /// Build the network from loaded weights
    pub fn load(
        name: impl Into<String>,
        architecture: &CnnArchitecture,
        input: InputSize,
        num_classes: usize,
        weights: &LoadedWeights,
    ) -> Result<Self> {
        Self::new(
            name,
            architecture,
            input,
            num_classes,
            weights.var_builder().clone(),
        )
    }

    pub fn input_size(&self) -> InputSize {
        self.input
    }

    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let mut xs = xs.permute((0, 3, 1, 2))?.contiguous()?;
        for conv in &self.convs {
            xs = conv.forward(&xs)?.relu()?.max_pool2d(2)?;
        }
        let xs = xs.permute((0, 2, 3, 1))?.contiguous()?.flatten_from(1)?;
        let xs = self.hidden.forward(&xs)?.relu()?;
        let logits = self.output.forward(&xs)?;
        candle_nn::ops::softmax(&logits, D::Minus1)
    }
}

impl Classifier for CnnClassifier {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        let expected = self.input.shape();
        if input.shape() != expected {
            return Err(Error::shape_mismatch(
                [1, expected[0], expected[1], expected[2]],
                input.batched_shape(),
            ));
        }

        let probabilities = input
            .to_batched_tensor(&self.device)
            .and_then(|xs| self.forward(&xs))
            .and_then(|probs| probs.squeeze(0))
            .and_then(|probs| probs.to_vec1::<f32>())
            .map_err(|e| Error::classifier(format!("{} inference failed: {}", self.name, e)))?;

        Ok(probabilities)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn name(&self) -> &str {
        &self.name
    }
}
