//! Resource returns
//!
//! Dead particles give their cost back to their owner. Deaths are collected
//! for a whole tick before anyone is told, so each owner hears about a tick
//! at most once.

use std::collections::BTreeMap;

use super::state::OwnerId;

/// Anything that can be credited with returned resources
pub trait ResourceSink {
    fn credit(&mut self, owner: OwnerId, amount: u32);
}

impl<S: ResourceSink> ResourceSink for [S] {
    fn credit(&mut self, owner: OwnerId, amount: u32) {
        for sink in self {
            sink.credit(owner, amount);
        }
    }
}

impl<S: ResourceSink> ResourceSink for Vec<S> {
    fn credit(&mut self, owner: OwnerId, amount: u32) {
        self.as_mut_slice().credit(owner, amount);
    }
}

/// One owner's return for one tick, as sent to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceReturn {
    /// Simulator frame the deaths happened in
    pub frame: u64,
    pub owner: OwnerId,
    pub amount: u32,
}

/// Per-owner return counts for one tick, in owner order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceReturns {
    counts: BTreeMap<OwnerId, u32>,
}

impl ResourceReturns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, owner: OwnerId, amount: u32) {
        if amount > 0 {
            let count = self.counts.entry(owner).or_insert(0);
            *count = count.saturating_add(amount);
        }
    }

    /// Count for `owner`, 0 if nothing was returned
    pub fn get(&self, owner: OwnerId) -> u32 {
        self.counts.get(&owner).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.counts.values().fold(0, |acc, n| acc.saturating_add(*n))
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of owners with a return
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OwnerId, u32)> + '_ {
        self.counts.iter().map(|(o, n)| (*o, *n))
    }

    /// Credit every owner's total to `sink`, one call per owner
    pub fn deliver<S: ResourceSink + ?Sized>(&self, sink: &mut S) {
        for (owner, amount) in self.iter() {
            sink.credit(owner, amount);
        }
    }
}
