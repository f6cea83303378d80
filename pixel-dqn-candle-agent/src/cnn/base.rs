use super::CnnConfig;
use crate::model::SubModel1;
use anyhow::Result;
use candle_core::{DType::F32, Device, Tensor};
use candle_nn::{
    conv::Conv2dConfig,
    conv2d, linear,
    sequential::{seq, Sequential},
    Module, VarBuilder,
};

/// Convolutional neural network, which has the architecture of the DQN paper.
///
/// Inputs are `(batch, channels, height, width)` intensities in `[0, 255]`; they are
/// scaled to `[0, 1]` inside the network. The output is one value per action
/// without a final activation.
pub struct Cnn {
    config: CnnConfig,
    device: Device,
    seq: Sequential,
}

impl Cnn {
    fn stride(s: usize) -> Conv2dConfig {
        Conv2dConfig {
            stride: s,
            ..Default::default()
        }
    }

    fn create_net(vb: &VarBuilder, config: &CnnConfig) -> Result<Sequential> {
        let flattened_dim = config.flattened_dim()?;
        let mut seq = seq().add_fn(|xs| xs.to_dtype(F32)? / 255.0);

        let mut in_channels = config.in_channels;
        for (i, layer) in config.conv.iter().enumerate() {
            seq = seq
                .add(conv2d(
                    in_channels,
                    layer.out_channels,
                    layer.kernel,
                    Self::stride(layer.stride),
                    vb.pp(format!("c{}", i + 1)),
                )?)
                .add_fn(|xs| xs.relu());
            in_channels = layer.out_channels;
        }

        let seq = seq
            .add_fn(|xs| xs.flatten_from(1))
            .add(linear(flattened_dim, config.hidden, vb.pp("l1"))?)
            .add_fn(|xs| xs.relu())
            .add(linear(config.hidden, config.out_dim, vb.pp("l2"))?);

        Ok(seq)
    }

    /// The configuration of the network.
    pub fn config(&self) -> &CnnConfig {
        &self.config
    }
}

impl SubModel1 for Cnn {
    type Config = CnnConfig;
    type Input = Tensor;
    type Output = Tensor;

    fn forward(&self, x: &Self::Input) -> Result<Tensor> {
        Ok(self.seq.forward(&x.to_device(&self.device)?)?)
    }

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let seq = Self::create_net(&vb, &config)?;

        Ok(Self {
            config,
            device,
            seq,
        })
    }
}
