//! Configuration of [`ReplayMemory`](super::ReplayMemory).
use super::MemoryCategory;
use crate::error::PixelDqnError;
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`ReplayMemory`](super::ReplayMemory).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct ReplayMemoryConfig {
    /// Capacity of each category.
    pub capacities: BTreeMap<MemoryCategory, usize>,

    /// Seed of the random number generator used for sampling.
    pub seed: u64,
}

impl Default for ReplayMemoryConfig {
    fn default() -> Self {
        Self {
            capacities: BTreeMap::from([
                (MemoryCategory::Default, 10000),
                (MemoryCategory::Best, 100),
                (MemoryCategory::Random, 100),
            ]),
            seed: 42,
        }
    }
}

impl ReplayMemoryConfig {
    /// Sets the capacity of a category.
    pub fn capacity(mut self, category: MemoryCategory, capacity: usize) -> Self {
        self.capacities.insert(category, capacity);
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// The sum of the capacities of all categories.
    pub fn total_capacity(&self) -> usize {
        self.capacities.values().sum()
    }

    /// Checks that every category has a non-zero capacity.
    pub fn validate(&self) -> Result<(), PixelDqnError> {
        for category in MemoryCategory::ALL {
            match self.capacities.get(&category) {
                None => {
                    return Err(PixelDqnError::Config(format!(
                        "capacity of {:?} is not set",
                        category
                    )))
                }
                Some(0) => {
                    return Err(PixelDqnError::Config(format!(
                        "capacity of {:?} must be positive",
                        category
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Constructs [`ReplayMemoryConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of replay memory from {:?}", path.as_ref());
        Ok(b)
    }

    /// Saves [`ReplayMemoryConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path.as_ref())?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of replay memory into {:?}", path.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_replay_memory_config() -> Result<()> {
        let config = ReplayMemoryConfig::default()
            .capacity(MemoryCategory::Best, 7)
            .seed(3);
        let dir = TempDir::new("replay_memory_config")?;
        let path = dir.path().join("replay_memory_config.yaml");

        config.save(&path)?;
        let config_ = ReplayMemoryConfig::load(&path)?;
        assert_eq!(config, config_);
        assert_eq!(config_.total_capacity(), 10000 + 7 + 100);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = ReplayMemoryConfig::default().capacity(MemoryCategory::Random, 0);
        assert!(matches!(config.validate(), Err(PixelDqnError::Config(_))));
    }
}
