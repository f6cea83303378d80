//! Replay memory made of bounded FIFO buffers.
use super::{MemoryCategory, ReplayMemoryConfig};
use anyhow::Result;
use rand::{rngs::SmallRng, seq::index, SeedableRng};
use std::collections::{BTreeMap, VecDeque};

/// Bounded, categorized storage of items with uniform sampling over all categories.
///
/// Each category is a FIFO of fixed capacity; adding to a full category evicts its
/// oldest item. The sampling pool is the concatenation of all categories in the order
/// of [`MemoryCategory::ALL`].
pub struct ReplayMemory<T> {
    buffers: BTreeMap<MemoryCategory, VecDeque<T>>,
    capacities: BTreeMap<MemoryCategory, usize>,
    rng: SmallRng,
}

impl<T> ReplayMemory<T> {
    /// Builds an empty memory.
    pub fn build(config: &ReplayMemoryConfig) -> Result<Self> {
        config.validate()?;
        let buffers = config
            .capacities
            .iter()
            .map(|(&category, &capacity)| (category, VecDeque::with_capacity(capacity.min(1024))))
            .collect();

        Ok(Self {
            buffers,
            capacities: config.capacities.clone(),
            rng: SmallRng::seed_from_u64(config.seed),
        })
    }

    /// Appends an item to a category, evicting the oldest item of that category
    /// when it is full.
    pub fn add(&mut self, category: MemoryCategory, item: T) {
        let capacity = self.capacity_of(category);
        let buf = self.buffers.entry(category).or_default();
        while buf.len() >= capacity && !buf.is_empty() {
            buf.pop_front();
        }
        if capacity > 0 {
            buf.push_back(item);
        }
    }

    /// The number of items in the sampling pool.
    pub fn len(&self) -> usize {
        self.buffers.values().map(|b| b.len()).sum()
    }

    /// Returns `true` if no category holds an item.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of items in a category.
    pub fn len_of(&self, category: MemoryCategory) -> usize {
        self.buffers.get(&category).map_or(0, |b| b.len())
    }

    /// The capacity of a category.
    pub fn capacity_of(&self, category: MemoryCategory) -> usize {
        self.capacities.get(&category).copied().unwrap_or(0)
    }

    /// The sum of the capacities of all categories.
    pub fn total_capacity(&self) -> usize {
        self.capacities.values().sum()
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        self.buffers.values_mut().for_each(|b| b.clear());
    }

    /// Iterates over the pool, category by category, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffers.values().flat_map(|b| b.iter())
    }

    /// Iterates over the items of a category, oldest first.
    pub fn iter_of(&self, category: MemoryCategory) -> impl Iterator<Item = &T> {
        self.buffers.get(&category).into_iter().flat_map(|b| b.iter())
    }

    fn get(&self, mut ix: usize) -> Option<&T> {
        for buf in self.buffers.values() {
            if ix < buf.len() {
                return buf.get(ix);
            }
            ix -= buf.len();
        }
        None
    }
}

impl<T: Clone> ReplayMemory<T> {
    /// Draws `batch_size` distinct items uniformly at random from the pool.
    ///
    /// Returns `None` if the pool holds fewer than `batch_size` items; this is the
    /// normal state while the memory warms up.
    pub fn sample(&mut self, batch_size: usize) -> Option<Vec<T>> {
        let pool_size = self.len();
        if pool_size < batch_size {
            return None;
        }
        let ixs = index::sample(&mut self.rng, pool_size, batch_size);
        ixs.iter().map(|ix| self.get(ix).cloned()).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    fn small_config() -> ReplayMemoryConfig {
        ReplayMemoryConfig::default()
            .capacity(MemoryCategory::Default, 5)
            .capacity(MemoryCategory::Best, 2)
            .capacity(MemoryCategory::Random, 2)
    }

    #[test]
    fn test_fifo_eviction() -> Result<()> {
        let mut memory = ReplayMemory::build(&small_config())?;
        for i in 0..12 {
            memory.add(MemoryCategory::Default, i);
            assert!(memory.len_of(MemoryCategory::Default) <= 5);
        }

        // 0..=6 were evicted in order, 7 is the oldest survivor.
        let items: Vec<_> = memory.iter_of(MemoryCategory::Default).copied().collect();
        assert_eq!(items, vec![7, 8, 9, 10, 11]);
        assert_eq!(memory.len(), 5);
        Ok(())
    }

    #[test]
    fn test_categories_are_independent() -> Result<()> {
        let mut memory = ReplayMemory::build(&small_config())?;
        for i in 0..4 {
            memory.add(MemoryCategory::Best, 100 + i);
        }
        memory.add(MemoryCategory::Default, 0);
        memory.add(MemoryCategory::Random, 200);

        assert_eq!(memory.len_of(MemoryCategory::Best), 2);
        assert_eq!(memory.len_of(MemoryCategory::Default), 1);
        assert_eq!(memory.len_of(MemoryCategory::Random), 1);
        assert_eq!(memory.len(), 4);

        let pool: Vec<_> = memory.iter().copied().collect();
        assert_eq!(pool, vec![0, 102, 103, 200]);
        Ok(())
    }

    #[test]
    fn test_sample_requires_full_batch() -> Result<()> {
        let mut memory = ReplayMemory::build(&small_config())?;
        for i in 0..3 {
            memory.add(MemoryCategory::Default, i);
        }
        assert!(memory.sample(4).is_none());

        memory.add(MemoryCategory::Best, 10);
        let batch = memory.sample(4).unwrap();
        assert_eq!(batch.len(), 4);
        Ok(())
    }

    #[test]
    fn test_sample_without_replacement() -> Result<()> {
        let mut memory = ReplayMemory::build(&small_config())?;
        for i in 0..5 {
            memory.add(MemoryCategory::Default, i);
        }
        memory.add(MemoryCategory::Best, 5);
        memory.add(MemoryCategory::Best, 6);
        memory.add(MemoryCategory::Random, 7);

        for _ in 0..20 {
            let batch = memory.sample(6).unwrap();
            let distinct: HashSet<_> = batch.iter().collect();
            assert_eq!(distinct.len(), 6);
        }

        // A batch of the full pool returns every item exactly once.
        let mut batch = memory.sample(8).unwrap();
        batch.sort();
        assert_eq!(batch, (0..8).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn test_clear() -> Result<()> {
        let mut memory = ReplayMemory::build(&small_config())?;
        memory.add(MemoryCategory::Random, 1);
        memory.clear();
        assert!(memory.is_empty());
        assert_eq!(memory.total_capacity(), 9);
        Ok(())
    }
}
