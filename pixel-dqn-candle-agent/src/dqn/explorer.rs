//! Exploration strategy of DQN.
use pixel_dqn_core::error::PixelDqnError;
use serde::{Deserialize, Serialize};

/// Epsilon-greedy explorer for DQN.
///
/// Epsilon starts at `eps_start` and is multiplied by `decay` at every action
/// selection in training mode, never going below `eps_final`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct EpsilonGreedy {
    /// Initial value of epsilon.
    pub eps_start: f64,

    /// Floor of epsilon.
    pub eps_final: f64,

    /// Multiplicative decay applied at every action selection.
    pub decay: f64,
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self {
            eps_start: 1.0,
            eps_final: 0.01,
            decay: 0.995,
        }
    }
}

impl EpsilonGreedy {
    /// Constructs epsilon-greedy explorer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the epsilon value at the start.
    pub fn eps_start(mut self, v: f64) -> Self {
        self.eps_start = v;
        self
    }

    /// Set the floor of epsilon.
    pub fn eps_final(mut self, v: f64) -> Self {
        self.eps_final = v;
        self
    }

    /// Set the decay factor.
    pub fn decay(mut self, v: f64) -> Self {
        self.decay = v;
        self
    }

    /// Epsilon after one decay step from `eps`.
    pub fn next_eps(&self, eps: f64) -> f64 {
        (eps * self.decay).max(self.eps_final)
    }

    /// Checks that the schedule is non-increasing and stays in `[0, 1]`.
    pub fn validate(&self) -> Result<(), PixelDqnError> {
        if !(0.0..=1.0).contains(&self.eps_start) || !(0.0..=1.0).contains(&self.eps_final) {
            return Err(PixelDqnError::Config(format!(
                "eps_start and eps_final must be in [0, 1], got {} and {}",
                self.eps_start, self.eps_final
            )));
        }
        if self.eps_final > self.eps_start {
            return Err(PixelDqnError::Config(format!(
                "eps_final ({}) must not exceed eps_start ({})",
                self.eps_final, self.eps_start
            )));
        }
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(PixelDqnError::Config(format!(
                "decay must be in (0, 1], got {}",
                self.decay
            )));
        }
        Ok(())
    }
}
