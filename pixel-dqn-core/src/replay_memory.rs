//! Categorized replay memory.
//!
//! Transitions are kept in a small set of bounded FIFO buffers, one per
//! [`MemoryCategory`]. Sampling draws uniformly, without replacement, from the union
//! of all buffers, so curated categories such as [`MemoryCategory::Best`] keep their
//! content longer than ordinary experience without changing how batches are drawn.
mod base;
mod category;
mod config;
mod transition;
pub use base::ReplayMemory;
pub use category::MemoryCategory;
pub use config::ReplayMemoryConfig;
pub use transition::Transition;
