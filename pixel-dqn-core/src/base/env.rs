//! Environment.
use super::DiscreteAct;
use anyhow::Result;

/// What the environment reports at a decision tick.
#[derive(Debug, Clone)]
pub struct Observation<O> {
    /// Raw observation, typically an RGB frame.
    pub obs: O,

    /// Reward received since the previous decision tick.
    pub reward: f32,

    /// Flag denoting if the episode has ended.
    pub is_done: bool,
}

/// Represents an environment producing raw observations, rewards and terminal flags.
///
/// Physics, rendering and scoring live behind this trait. The learning core only
/// calls [`Env::observe`] and [`Env::apply`] once per decision tick.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Raw observation of the environment.
    type Obs;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Starts a new episode.
    fn reset(&mut self) -> Result<()>;

    /// Returns the current observation together with the reward accumulated since
    /// the last call and the terminal flag.
    fn observe(&mut self) -> Result<Observation<Self::Obs>>;

    /// Applies an action. Called once per decision tick before the next
    /// [`Env::observe`].
    fn apply(&mut self, act: &DiscreteAct) -> Result<()>;

    /// The size of the action set.
    fn n_actions(&self) -> usize;
}

/// Converts raw observations into the states consumed by agents.
pub trait ObsFilter<O> {
    /// Filtered observation.
    type Output;

    /// Filters an observation.
    fn filt(&mut self, obs: O) -> Result<Self::Output>;
}
