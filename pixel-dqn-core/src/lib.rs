#![warn(missing_docs)]
//! Core of pixel-dqn: backend-independent traits, the categorized replay memory
//! and the episodic training loop.
pub mod dummy;
pub mod error;
pub mod record;
pub mod replay_memory;

mod base;
pub use base::{Agent, DiscreteAct, Env, ObsFilter, Observation, Policy, ValueApproximator};
pub use replay_memory::{MemoryCategory, ReplayMemory, ReplayMemoryConfig, Transition};

mod trainer;
pub use trainer::{Trainer, TrainerConfig};
