//! A DQN agent learning a discrete control policy from downsampled pixel frames.
//!
//! pixel-dqn consists of the following crates:
//!
//! * [`pixel_dqn_core`] provides the traits shared by environments, agents and
//!   value approximators, the categorized replay memory and the episodic
//!   [`Trainer`](pixel_dqn_core::Trainer).
//! * [`pixel_dqn_frame`] turns RGB frames into downsampled intensity maps.
//! * [`pixel_dqn_candle_agent`] implements the DQN agent and its value networks with
//!   [candle](https://crates.io/crates/candle-core).
//!
//! This crate re-exports them and adds [`corridor`], a small side-scrolling
//! environment rendering RGB frames, used by the demo driver and the tests.
pub mod corridor;
pub use pixel_dqn_candle_agent as candle_agent;
pub use pixel_dqn_core as core;
pub use pixel_dqn_frame as frame;
