//! Discrete action.
use serde::{Deserialize, Serialize};

/// An index into the fixed action set of the environment,
/// e.g., `{0: left, 1: jump, 2: right}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiscreteAct(usize);

impl DiscreteAct {
    /// Creates an action with the given index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the action index.
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<usize> for DiscreteAct {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl From<DiscreteAct> for usize {
    fn from(act: DiscreteAct) -> Self {
        act.0
    }
}
