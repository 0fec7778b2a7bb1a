//! Live per-tag usage counters, driven by assignment deltas.

use std::collections::HashMap;

use super::types::TagId;

#[derive(Debug, Default)]
pub struct StatisticsAggregator {
    counts: HashMap<TagId, usize>,
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a freshly created tag at zero.
    pub fn track(&mut self, tag: TagId) {
        self.counts.entry(tag).or_insert(0);
    }

    pub fn increment(&mut self, tag: TagId) {
        *self.counts.entry(tag).or_insert(0) += 1;
    }

    pub fn decrement(&mut self, tag: TagId) {
        if let Some(count) = self.counts.get_mut(&tag) {
            *count = count.saturating_sub(1);
        }
    }

    /// Forget the counter for a deleted tag.
    pub fn remove(&mut self, tag: TagId) {
        self.counts.remove(&tag);
    }

    pub fn count(&self, tag: TagId) -> usize {
        self.counts.get(&tag).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> HashMap<TagId, usize> {
        self.counts.clone()
    }
}
