use serde::{Deserialize, Serialize};

/// Categories of the replay memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MemoryCategory {
    /// Ordinary experience.
    Default,

    /// Transitions of the best episodes.
    Best,

    /// Transitions kept as a random subset.
    Random,
}

impl MemoryCategory {
    /// All categories in sampling order.
    pub const ALL: [MemoryCategory; 3] = [Self::Default, Self::Best, Self::Random];
}
