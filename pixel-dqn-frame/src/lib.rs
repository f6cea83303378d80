//! Frame preprocessing for pixel-dqn.
//!
//! A raw RGB [`Frame`] rendered by the environment is converted to a single-channel
//! intensity map with [`grayscale`], then reduced with [`downsample`], which replaces
//! each non-overlapping `factor × factor` block with its mean. The result is a
//! [`State`], the unit consumed by value approximators and stored in transitions.
//!
//! ```rust
//! use pixel_dqn_frame::{Frame, FramePreprocessor, FramePreprocessorConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let frame = Frame::new(600, 800, vec![128; 600 * 800 * 3])?;
//! let preprocessor = FramePreprocessor::build(&FramePreprocessorConfig::default())?;
//! let state = preprocessor.process(&frame)?;
//! assert_eq!(state.shape(), [60, 80]);
//! # Ok(())
//! # }
//! ```
mod frame;
mod ops;
mod preprocessor;
mod state;
pub use frame::Frame;
pub use ops::{downsample, grayscale, LUMA_WEIGHTS};
pub use preprocessor::{FramePreprocessor, FramePreprocessorConfig};
pub use state::State;
