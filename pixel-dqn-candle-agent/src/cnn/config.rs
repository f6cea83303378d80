use crate::util::OutDim;
use anyhow::Result;
use pixel_dqn_core::error::PixelDqnError;
use serde::{Deserialize, Serialize};

/// A convolution stage: `out_channels` kernels of side `kernel` moved by `stride`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct ConvLayer {
    /// Number of output channels.
    pub out_channels: usize,

    /// Side of the square kernel.
    pub kernel: usize,

    /// Stride in both directions.
    pub stride: usize,
}

impl ConvLayer {
    /// Creates a convolution stage.
    pub fn new(out_channels: usize, kernel: usize, stride: usize) -> Self {
        Self {
            out_channels,
            kernel,
            stride,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`Cnn`](super::Cnn).
pub struct CnnConfig {
    pub(super) in_channels: usize,
    pub(super) in_shape: [usize; 2],
    pub(super) conv: Vec<ConvLayer>,
    pub(super) hidden: usize,
    pub(super) out_dim: usize,
}

impl Default for CnnConfig {
    /// Three stages in the manner of the DQN paper, sized for `1 × 60 × 80` states
    /// and 3 actions. The feature maps are `11 × 15`, `5 × 7` and `3 × 5`.
    fn default() -> Self {
        Self {
            in_channels: 1,
            in_shape: [60, 80],
            conv: vec![
                ConvLayer::new(32, 10, 5),
                ConvLayer::new(64, 3, 2),
                ConvLayer::new(64, 3, 1),
            ],
            hidden: 512,
            out_dim: 3,
        }
    }
}

impl CnnConfig {
    /// Sets the number of input channels.
    pub fn in_channels(mut self, v: usize) -> Self {
        self.in_channels = v;
        self
    }

    /// Sets the height and width of the input.
    pub fn in_shape(mut self, v: [usize; 2]) -> Self {
        self.in_shape = v;
        self
    }

    /// Sets the convolution stages.
    pub fn conv(mut self, v: Vec<ConvLayer>) -> Self {
        self.conv = v;
        self
    }

    /// Sets the width of the hidden fully-connected layer.
    pub fn hidden(mut self, v: usize) -> Self {
        self.hidden = v;
        self
    }

    /// Sets the output dimension.
    pub fn out_dim(mut self, v: usize) -> Self {
        self.out_dim = v;
        self
    }

    /// Size of the flattened output of the last convolution stage.
    ///
    /// Convolutions use valid padding, so each stage maps a side `n` to
    /// `(n - kernel) / stride + 1`. The strides of every stage must tile its input,
    /// i.e., `(n - kernel) % stride == 0`; otherwise the gradient of the convolution
    /// does not match the shape of its input.
    pub fn flattened_dim(&self) -> Result<usize> {
        let [mut h, mut w] = self.in_shape;
        let mut channels = self.in_channels;
        for (i, layer) in self.conv.iter().enumerate() {
            if layer.stride == 0 || layer.kernel == 0 {
                return Err(PixelDqnError::Config(format!(
                    "Kernel and stride of convolution {} must be positive",
                    i
                ))
                .into());
            }
            if h < layer.kernel || w < layer.kernel {
                return Err(PixelDqnError::Config(format!(
                    "Input of convolution {} is {}x{}, smaller than its kernel {}",
                    i, h, w, layer.kernel
                ))
                .into());
            }
            if (h - layer.kernel) % layer.stride != 0 || (w - layer.kernel) % layer.stride != 0 {
                return Err(PixelDqnError::Config(format!(
                    "Convolution {} with kernel {} and stride {} does not tile its {}x{} input",
                    i, layer.kernel, layer.stride, h, w
                ))
                .into());
            }
            h = (h - layer.kernel) / layer.stride + 1;
            w = (w - layer.kernel) / layer.stride + 1;
            channels = layer.out_channels;
        }
        Ok(channels * h * w)
    }
}

impl OutDim for CnnConfig {
    fn get_out_dim(&self) -> usize {
        self.out_dim
    }

    fn set_out_dim(&mut self, v: usize) {
        self.out_dim = v;
    }
}
