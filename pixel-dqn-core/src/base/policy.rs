//! Policy.
use super::DiscreteAct;
use anyhow::Result;

/// A policy on states of type `O`.
///
/// Policy is a mapping from a state to an action.
/// The mapping can be either of deterministic or stochastic.
pub trait Policy<O> {
    /// Sample an action given a state.
    fn sample(&mut self, obs: &O) -> Result<DiscreteAct>;
}
