//! Configuration of DQN agent.
use super::explorer::EpsilonGreedy;
use crate::Device;
use anyhow::Result;
use log::info;
use pixel_dqn_core::{error::PixelDqnError, ReplayMemoryConfig};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Constructs [`Dqn`](super::Dqn).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct DqnConfig {
    pub(super) batch_size: usize,
    pub(super) discount_factor: f64,
    pub(super) tau: f64,
    pub(super) explorer: EpsilonGreedy,
    pub(super) memory_config: ReplayMemoryConfig,
    #[serde(default)]
    pub(super) batched_update: bool,
    #[serde(default = "default_train")]
    pub(super) train: bool,
    pub(super) seed: u64,
    #[serde(default)]
    pub device: Device,
}

fn default_train() -> bool {
    true
}

impl Default for DqnConfig {
    /// Constructs DQN builder with default parameters.
    fn default() -> Self {
        Self {
            batch_size: 32,
            discount_factor: 0.85,
            tau: 0.125,
            explorer: EpsilonGreedy::default(),
            memory_config: ReplayMemoryConfig::default(),
            batched_update: false,
            train: true,
            seed: 42,
            device: Device::Cpu,
        }
    }
}

impl DqnConfig {
    /// Batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.discount_factor = v;
        self
    }

    /// Soft update coefficient.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Explorer.
    pub fn explorer(mut self, v: EpsilonGreedy) -> Self {
        self.explorer = v;
        self
    }

    /// Configuration of the replay memory.
    pub fn memory_config(mut self, v: ReplayMemoryConfig) -> Self {
        self.memory_config = v;
        self
    }

    /// If `true`, a replay applies one gradient step on the whole batch instead of
    /// one step per transition.
    pub fn batched_update(mut self, v: bool) -> Self {
        self.batched_update = v;
        self
    }

    /// Initial mode of the agent.
    pub fn train(mut self, v: bool) -> Self {
        self.train = v;
        self
    }

    /// Seed of the random number generator of the explorer.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Device on which the networks are built.
    pub fn device(mut self, v: Device) -> Self {
        self.device = v;
        self
    }

    /// Checks the values of the configuration.
    pub fn validate(&self) -> Result<(), PixelDqnError> {
        self.memory_config.validate()?;
        self.explorer.validate()?;
        if self.batch_size == 0 {
            return Err(PixelDqnError::Config("batch_size must be positive".into()));
        }
        if self.batch_size > self.memory_config.total_capacity() {
            return Err(PixelDqnError::Config(format!(
                "batch_size ({}) exceeds the total capacity of the replay memory ({})",
                self.batch_size,
                self.memory_config.total_capacity()
            )));
        }
        if !(0.0..=1.0).contains(&self.discount_factor) {
            return Err(PixelDqnError::Config(format!(
                "discount_factor must be in [0, 1], got {}",
                self.discount_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.tau) {
            return Err(PixelDqnError::Config(format!(
                "tau must be in [0, 1], got {}",
                self.tau
            )));
        }
        Ok(())
    }

    /// Constructs [`DqnConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of DQN agent from {}", path_.to_str().unwrap_or("?"));
        Ok(b)
    }

    /// Saves [`DqnConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of DQN agent into {}", path_.to_str().unwrap_or("?"));
        Ok(())
    }
}
