//! Action-value function approximators.
use anyhow::Result;
use std::path::Path;

/// A parametric function mapping a state to one value per action.
///
/// DQN agents own two instances: the policy network, updated only through
/// [`ValueApproximator::train_step`] and [`ValueApproximator::train_batch`], and the
/// target network, updated only through [`ValueApproximator::soft_update`].
pub trait ValueApproximator {
    /// Input of the approximator, a single state.
    type Input;

    /// A snapshot of the full parameter set.
    type Params: Clone;

    /// The number of actions, i.e., the length of the vectors returned by
    /// [`ValueApproximator::predict`].
    fn n_actions(&self) -> usize;

    /// Forward pass. Does not modify parameters.
    fn predict(&self, x: &Self::Input) -> Result<Vec<f32>>;

    /// One gradient step moving `predict(x)` towards `target`. Returns the loss.
    fn train_step(&mut self, x: &Self::Input, target: &[f32]) -> Result<f32>;

    /// Gradient steps on a batch. Returns the mean loss.
    ///
    /// The default implementation applies [`ValueApproximator::train_step`]
    /// sample by sample in the given order; backends may override it with a single
    /// batched step.
    fn train_batch(&mut self, xs: &[Self::Input], targets: &[Vec<f32>]) -> Result<f32> {
        if xs.is_empty() {
            return Ok(0.0);
        }
        let mut loss = 0f32;
        for (x, t) in xs.iter().zip(targets.iter()) {
            loss += self.train_step(x, t)?;
        }
        Ok(loss / xs.len() as f32)
    }

    /// `self = tau * src + (1 - tau) * self` for every parameter tensor.
    fn soft_update(&mut self, src: &Self::Params, tau: f64) -> Result<()>;

    /// Returns a copy of the parameters.
    fn get_parameters(&self) -> Result<Self::Params>;

    /// Replaces all parameters at once.
    fn set_parameters(&mut self, params: &Self::Params) -> Result<()>;

    /// Saves the parameters to a file.
    fn save(&self, path: &Path) -> Result<()>;

    /// Loads the parameters from a file.
    ///
    /// On failure the in-memory parameters are left untouched.
    fn load(&mut self, path: &Path) -> Result<()>;
}
