//! Configuration of [`Trainer`](super::Trainer).
use crate::error::PixelDqnError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The number of episodes to train.
    pub max_episodes: usize,

    /// Episodes are cut after this number of decision ticks.
    pub max_steps_per_episode: usize,

    /// Probability that a transition is stored in the `Random` category instead of
    /// the `Default` category.
    pub random_rate: f64,

    /// If `true`, the transitions of an episode with the best return so far are
    /// also stored in the `Best` category.
    pub remember_best: bool,

    /// Interval of saving model parameters in episodes.
    pub save_interval: usize,

    /// Where to save the trained model.
    pub model_dir: Option<String>,

    /// Seed given to the environment and the routing of transitions.
    pub seed: i64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_episodes: 1000,
            max_steps_per_episode: usize::MAX,
            random_rate: 0.0,
            remember_best: true,
            save_interval: usize::MAX,
            model_dir: None,
            seed: 42,
        }
    }
}

impl TrainerConfig {
    /// Sets the number of episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the maximum length of an episode in decision ticks.
    pub fn max_steps_per_episode(mut self, v: usize) -> Self {
        self.max_steps_per_episode = v;
        self
    }

    /// Sets the probability of routing a transition into the `Random` category.
    pub fn random_rate(mut self, v: f64) -> Self {
        self.random_rate = v;
        self
    }

    /// Enables or disables keeping the transitions of best episodes.
    pub fn remember_best(mut self, v: bool) -> Self {
        self.remember_best = v;
        self
    }

    /// Sets the interval of saving in episodes.
    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    /// Sets the directory where the trained model is saved.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = Some(v.into());
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, v: i64) -> Self {
        self.seed = v;
        self
    }

    /// Checks the values of the configuration.
    pub fn validate(&self) -> Result<(), PixelDqnError> {
        if !(0.0..=1.0).contains(&self.random_rate) {
            return Err(PixelDqnError::Config(format!(
                "random_rate must be in [0, 1], got {}",
                self.random_rate
            )));
        }
        if self.max_steps_per_episode == 0 {
            return Err(PixelDqnError::Config(
                "max_steps_per_episode must be positive".to_string(),
            ));
        }
        if self.save_interval == 0 {
            return Err(PixelDqnError::Config(
                "save_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trainer_config() -> Result<()> {
        let config = TrainerConfig::default()
            .max_episodes(100)
            .random_rate(0.1)
            .model_dir("some/directory");

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer_config.yaml");

        config.save(&path)?;
        let config_ = TrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_validate_random_rate() {
        let config = TrainerConfig::default().random_rate(1.5);
        assert!(config.validate().is_err());
    }
}
