//! DQN agent.
mod base;
mod config;
mod explorer;
mod model;
pub use base::{Dqn, DqnMeta};
pub use config::DqnConfig;
pub use explorer::EpsilonGreedy;
pub use model::{DqnModel, DqnModelConfig};
