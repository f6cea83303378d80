//! DQN agent and value networks implemented with [candle](https://crates.io/crates/candle-core).
//!
//! * [`dqn::Dqn`] is the agent: epsilon-greedy action selection, a categorized
//!   replay memory, Bellman targets from the target network and soft updates.
//!   It is generic over [`ValueApproximator`](pixel_dqn_core::ValueApproximator).
//! * [`dqn::DqnModel`] is the candle implementation of the approximator, wrapping a
//!   [`cnn::Cnn`] or an [`mlp::Mlp`] together with its optimizer.
pub mod cnn;
pub mod dqn;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod util;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    #[default]
    Cpu,

    /// The GPU device with the given ordinal.
    Cuda(usize),
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
        }
    }
}
