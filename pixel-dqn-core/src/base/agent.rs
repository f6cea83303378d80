//! Agent.
use super::Policy;
use crate::{record::Record, replay_memory::MemoryCategory, Transition};
use anyhow::Result;
use std::path::Path;

/// Represents a trainable policy owning its replay memory.
pub trait Agent<O>: Policy<O> {
    /// Set the policy to training mode.
    fn train(&mut self);

    /// Set the policy to evaluation mode.
    fn eval(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Stores a transition in the given category of the replay memory.
    fn remember(&mut self, category: MemoryCategory, transition: Transition<O>);

    /// Performs an optimization step with a batch sampled from the replay memory.
    ///
    /// Returns `Ok(None)` without touching any state when the memory does not yet
    /// hold enough transitions for a batch.
    fn replay(&mut self) -> Result<Option<Record>>;

    /// Moves the target network towards the trained network.
    fn target_train(&mut self) -> Result<()>;

    /// Save the parameters of the agent in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
