//! Small environment and filter used for tests.
use crate::{DiscreteAct, Env, ObsFilter, Observation};
use anyhow::Result;

/// Configuration of [`DummyEnv`].
#[derive(Clone, Debug)]
pub struct DummyEnvConfig {
    /// Position of the goal.
    pub length: usize,
}

impl Default for DummyEnvConfig {
    fn default() -> Self {
        Self { length: 5 }
    }
}

/// A one-dimensional walk towards a goal.
///
/// Actions are `0: left`, `1: stay`, `2: right`. Moving right gives reward `1`,
/// anything else `-1`. The episode ends at the goal. The observation is the
/// position as a one-element vector.
pub struct DummyEnv {
    length: usize,
    pos: usize,
    reward: f32,
}

impl Env for DummyEnv {
    type Config = DummyEnvConfig;
    type Obs = Vec<f32>;

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            length: config.length,
            pos: 0,
            reward: 0.0,
        })
    }

    fn reset(&mut self) -> Result<()> {
        self.pos = 0;
        self.reward = 0.0;
        Ok(())
    }

    fn observe(&mut self) -> Result<Observation<Self::Obs>> {
        let reward = std::mem::replace(&mut self.reward, 0.0);
        Ok(Observation {
            obs: vec![self.pos as f32],
            reward,
            is_done: self.pos >= self.length,
        })
    }

    fn apply(&mut self, act: &DiscreteAct) -> Result<()> {
        match act.index() {
            0 => {
                self.pos = self.pos.saturating_sub(1);
                self.reward -= 1.0;
            }
            2 => {
                self.pos += 1;
                self.reward += 1.0;
            }
            _ => self.reward -= 1.0,
        }
        Ok(())
    }

    fn n_actions(&self) -> usize {
        3
    }
}

/// Passes observations through unchanged.
#[derive(Default)]
pub struct IdentityFilter;

impl<O> ObsFilter<O> for IdentityFilter {
    type Output = O;

    fn filt(&mut self, obs: O) -> Result<O> {
        Ok(obs)
    }
}
