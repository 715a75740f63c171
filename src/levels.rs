//! Per-level prefix tables.
//!
//! Level `L` (for `L` in `0..max_bits`) indexes the nodes whose prefix is the
//! top `L + 1` bits of a value. The last level is the leaf table, keyed by the
//! full value.

use rustc_hash::FxHashMap;

use crate::node::NodeId;

#[derive(Clone, Debug)]
pub(crate) struct LevelTables {
    max_bits: u32,
    tables: Vec<FxHashMap<u128, NodeId>>,
}

impl LevelTables {
    pub(crate) fn new(max_bits: u32, leaf_capacity: usize) -> Self {
        debug_assert!(max_bits >= 1);
        let mut tables: Vec<FxHashMap<u128, NodeId>> =
            (0..max_bits).map(|_| FxHashMap::default()).collect();
        if let Some(leaves) = tables.last_mut() {
            leaves.reserve(leaf_capacity);
        }
        Self { max_bits, tables }
    }

    /// Index of the leaf table.
    #[inline]
    pub(crate) fn leaf_level(&self) -> u32 {
        self.max_bits - 1
    }

    /// Top `level + 1` bits of `value`.
    #[inline]
    pub(crate) fn prefix(&self, value: u128, level: u32) -> u128 {
        debug_assert!(level < self.max_bits);
        value >> (self.max_bits - 1 - level)
    }

    #[inline]
    pub(crate) fn get(&self, level: u32, prefix: u128) -> Option<NodeId> {
        self.tables[level as usize].get(&prefix).copied()
    }

    #[inline]
    pub(crate) fn leaf(&self, value: u128) -> Option<NodeId> {
        self.get(self.leaf_level(), value)
    }

    pub(crate) fn insert(&mut self, level: u32, prefix: u128, id: NodeId) {
        let prev = self.tables[level as usize].insert(prefix, id);
        debug_assert!(prev.is_none(), "level {level} already holds prefix {prefix:#b}");
    }

    pub(crate) fn remove(&mut self, level: u32, prefix: u128) -> Option<NodeId> {
        self.tables[level as usize].remove(&prefix)
    }

    /// Children of the node at (`level`, `prefix`), read from the next level.
    #[inline]
    pub(crate) fn children(&self, level: u32, prefix: u128) -> (Option<NodeId>, Option<NodeId>) {
        let below = level + 1;
        (self.get(below, prefix << 1), self.get(below, (prefix << 1) | 1))
    }

    #[cfg(test)]
    pub(crate) fn iter_level(&self, level: u32) -> impl Iterator<Item = (u128, NodeId)> + '_ {
        self.tables[level as usize].iter().map(|(&p, &id)| (p, id))
    }

    #[cfg(test)]
    pub(crate) fn level_len(&self, level: u32) -> usize {
        self.tables[level as usize].len()
    }

    pub(crate) fn clear(&mut self) {
        for t in &mut self.tables {
            t.clear();
        }
    }

    pub(crate) fn capacity_bytes(&self) -> usize {
        let entry = std::mem::size_of::<(u128, NodeId)>() + 1;
        self.tables.capacity() * std::mem::size_of::<FxHashMap<u128, NodeId>>()
            + self.tables.iter().map(|t| t.capacity() * entry).sum::<usize>()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        for t in &mut self.tables {
            t.shrink_to_fit();
        }
    }
}
