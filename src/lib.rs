//! # xfast-trie
//!
//! An ordered set of unsigned integers drawn from a bounded universe
//! `0..2^max_bits`, answering predecessor and successor queries in
//! O(log log U) time.
//!
//! The trie keeps one hash table per bit level, mapping each prefix present
//! in the set to its node, and threads all stored values into an ascending
//! doubly linked list. A query binary-searches the levels for the longest
//! stored prefix of the query value, then follows a single descendant pointer
//! to a neighbouring leaf.
//!
//! ## Example
//!
//! ```rust
//! use xfast_trie::XFastTrie;
//!
//! let mut trie = XFastTrie::with_max_bits(4).unwrap();
//! trie.insert(3u8).unwrap();
//! trie.insert(7u8).unwrap();
//! trie.insert(1u8).unwrap();
//!
//! assert_eq!(trie.predecessor(5u8).unwrap(), Some(3));
//! assert_eq!(trie.successor(5u8).unwrap(), Some(7));
//! assert_eq!(trie.iter().collect::<Vec<_>>(), vec![1, 3, 7]);
//! ```

use std::iter::FusedIterator;
use std::ops::{Bound, RangeBounds};

use tracing::{debug, trace};

mod config;
mod error;
mod key;
mod levels;
mod node;

pub use config::{Config, DEFAULT_MAX_BITS, MAX_SUPPORTED_BITS};
pub use error::{Result, XFastError};
pub use key::IntoKey;

use levels::LevelTables;
use node::{ChildRef, Internal, Leaf, Node, NodeArena, NodeId, Side};

// =============================================================================
// XFastTrie
// =============================================================================

/// An X-fast trie over `0..2^max_bits`.
///
/// Values may be passed as any primitive integer or as a big-endian byte
/// sequence (see [`IntoKey`]); they are stored and returned as `u128`.
///
/// Not internally synchronized. Wrap it in a lock to share it across threads.
#[derive(Clone)]
pub struct XFastTrie {
    max_bits: u32,
    nodes: NodeArena,
    levels: LevelTables,
    /// The empty prefix. Lives outside the arena and always exists.
    root: Internal,
    min: Option<NodeId>,
    max: Option<NodeId>,
    count: usize,
}

impl XFastTrie {
    /// Creates an empty trie with [`DEFAULT_MAX_BITS`].
    pub fn new() -> Self {
        Self::build(Config::default())
    }

    pub fn with_max_bits(max_bits: u32) -> Result<Self> {
        Self::with_config(Config::with_max_bits(max_bits))
    }

    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: Config) -> Self {
        debug!(
            max_bits = config.max_bits,
            initial_capacity = config.initial_capacity,
            "creating x-fast trie"
        );
        Self {
            max_bits: config.max_bits,
            // Each leaf brings at most `max_bits - 1` internal nodes, but
            // shared prefixes make the real ratio far smaller.
            nodes: NodeArena::with_capacity(config.initial_capacity.saturating_mul(2)),
            levels: LevelTables::new(config.max_bits, config.initial_capacity),
            root: Internal::new(0),
            min: None,
            max: None,
            count: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Width of the universe in bits.
    #[inline]
    pub fn max_bits(&self) -> u32 {
        self.max_bits
    }

    /// Largest value the universe can hold.
    #[inline]
    pub fn universe_max(&self) -> u128 {
        u128::MAX >> (u128::BITS - self.max_bits)
    }

    #[inline]
    fn normalize<K: IntoKey>(&self, value: K) -> Result<u128> {
        value.into_key(self.max_bits)
    }

    #[inline]
    fn value_of(&self, id: NodeId) -> u128 {
        self.nodes.leaf(id).value
    }

    pub fn min(&self) -> Option<u128> {
        self.min.map(|id| self.value_of(id))
    }

    pub fn max(&self) -> Option<u128> {
        self.max.map(|id| self.value_of(id))
    }

    pub fn contains<K: IntoKey>(&self, value: K) -> Result<bool> {
        let v = self.normalize(value)?;
        Ok(self.levels.leaf(v).is_some())
    }

    /// Largest stored value strictly less than `value`.
    ///
    /// Fails with [`XFastError::EmptyTrie`] when nothing is stored.
    pub fn predecessor<K: IntoKey>(&self, value: K) -> Result<Option<u128>> {
        let v = self.normalize(value)?;
        if self.is_empty() {
            return Err(XFastError::EmptyTrie);
        }
        Ok(self.predecessor_node(v).map(|id| self.value_of(id)))
    }

    /// Smallest stored value strictly greater than `value`.
    ///
    /// Fails with [`XFastError::EmptyTrie`] when nothing is stored.
    pub fn successor<K: IntoKey>(&self, value: K) -> Result<Option<u128>> {
        let v = self.normalize(value)?;
        if self.is_empty() {
            return Err(XFastError::EmptyTrie);
        }
        Ok(self.successor_node(v).map(|id| self.value_of(id)))
    }

    /// Ascending iterator over the stored values.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            trie: self,
            front: self.min,
            back: self.max,
        }
    }

    /// Ascending iterator over the stored values inside `range`.
    ///
    /// Bounds outside the universe are clamped rather than rejected.
    pub fn range<R: RangeBounds<u128>>(&self, range: R) -> Iter<'_> {
        let top = self.universe_max();
        let front = match range.start_bound() {
            Bound::Unbounded => self.min,
            Bound::Included(&lo) if lo > top => None,
            Bound::Included(&lo) => self.ceil_node(lo),
            Bound::Excluded(&lo) if lo >= top => None,
            Bound::Excluded(&lo) => self.ceil_node(lo + 1),
        };
        let back = match range.end_bound() {
            Bound::Unbounded => self.max,
            Bound::Included(&hi) if hi >= top => self.max,
            Bound::Included(&hi) => self.floor_node(hi),
            Bound::Excluded(&0) => None,
            Bound::Excluded(&hi) if hi > top => self.max,
            Bound::Excluded(&hi) => self.floor_node(hi - 1),
        };
        match (front, back) {
            (Some(f), Some(b)) if self.value_of(f) <= self.value_of(b) => Iter {
                trie: self,
                front,
                back,
            },
            _ => Iter {
                trie: self,
                front: None,
                back: None,
            },
        }
    }

    /// Removes every value. The configured universe is kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.levels.clear();
        self.root = Internal::new(0);
        self.min = None;
        self.max = None;
        self.count = 0;
    }

    /// Approximate heap bytes held by the trie.
    pub fn memory_usage(&self) -> usize {
        self.nodes.capacity_bytes() + self.levels.capacity_bytes()
    }

    pub fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
        self.levels.shrink_to_fit();
    }
}

// =============================================================================
// Search
// =============================================================================

impl XFastTrie {
    /// Deepest stored node whose prefix is a prefix of `v`, with its level.
    ///
    /// Binary search over levels: prefixes of a stored value exist at every
    /// level above its leaf, so presence is monotone in depth. `None` means
    /// only the root matches.
    fn closest_ancestor(&self, v: u128) -> Option<(u32, NodeId)> {
        let mut best = None;
        let (mut lo, mut hi) = (0u32, self.max_bits);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.levels.get(mid, self.levels.prefix(v, mid)) {
                Some(id) => {
                    best = Some((mid, id));
                    lo = mid + 1;
                }
                None => hi = mid,
            }
        }
        best
    }

    /// Stored leaf numerically nearest to `v`; `None` only when empty.
    ///
    /// The result is `v` itself, its predecessor, or its successor.
    fn closest_leaf(&self, v: u128) -> Option<NodeId> {
        if self.is_empty() {
            return None;
        }

        let (next_level, branch) = match self.closest_ancestor(v) {
            Some((level, id)) if level == self.levels.leaf_level() => return Some(id),
            Some((level, id)) => (level + 1, self.nodes.internal(id)),
            None => (0, &self.root),
        };

        let side = Side::from_bit(self.levels.prefix(v, next_level));
        let leaf = match branch.get(side) {
            ChildRef::Descendant(id) => id,
            other => panic!(
                "closest ancestor of {v} has {other:?} on the {side:?} side, expected a descendant pointer"
            ),
        };

        // A descendant pointer lands on one neighbour of `v`; the other is one
        // list hop away.
        let l = self.nodes.leaf(leaf);
        let neighbour = match side {
            Side::Left => l.pred,
            Side::Right => l.succ,
        };
        match neighbour {
            Some(n) if self.value_of(n).abs_diff(v) < l.value.abs_diff(v) => Some(n),
            _ => Some(leaf),
        }
    }

    fn predecessor_node(&self, v: u128) -> Option<NodeId> {
        let id = self.closest_leaf(v)?;
        let leaf = self.nodes.leaf(id);
        if leaf.value >= v {
            leaf.pred
        } else {
            Some(id)
        }
    }

    fn successor_node(&self, v: u128) -> Option<NodeId> {
        let id = self.closest_leaf(v)?;
        let leaf = self.nodes.leaf(id);
        if leaf.value <= v {
            leaf.succ
        } else {
            Some(id)
        }
    }

    /// First stored value `>= v`. `v` must lie in the universe.
    fn ceil_node(&self, v: u128) -> Option<NodeId> {
        self.levels.leaf(v).or_else(|| self.successor_node(v))
    }

    /// Last stored value `<= v`. `v` must lie in the universe.
    fn floor_node(&self, v: u128) -> Option<NodeId> {
        self.levels.leaf(v).or_else(|| self.predecessor_node(v))
    }

    /// Smallest (`toward == Left`) or largest (`toward == Right`) leaf under
    /// `start`.
    ///
    /// Walks real children toward `toward` and stops at the first descendant
    /// pointer, which already names the extreme leaf. Takes at most
    /// `max_bits` steps.
    fn extreme_leaf(&self, start: NodeId, toward: Side) -> NodeId {
        let mut current = start;
        for _ in 0..self.max_bits {
            let node = match self.nodes.get(current) {
                Node::Leaf(_) => return current,
                Node::Internal(node) => node,
                Node::Vacant => panic!("walked into vacant slot {current:?}"),
            };
            // A node with no subtree toward `toward` points across at the
            // nearest leaf on the other side, which is the extreme we want.
            current = match node.get(toward) {
                ChildRef::Child(id) | ChildRef::Descendant(id) => id,
                ChildRef::Empty => panic!("internal node {:#b} has an empty side", node.prefix),
            };
        }
        match self.nodes.get(current) {
            Node::Leaf(_) => current,
            other => panic!("no leaf within {} levels of {start:?}: {other:?}", self.max_bits),
        }
    }

    /// Points the root at the top-level subtrees, or across at the global
    /// extremes where a subtree is missing.
    fn refresh_root(&mut self) {
        let (Some(min), Some(max)) = (self.min, self.max) else {
            self.root.left = ChildRef::Empty;
            self.root.right = ChildRef::Empty;
            return;
        };
        self.root.left = match self.levels.get(0, 0) {
            Some(id) => ChildRef::Child(id),
            None => ChildRef::Descendant(min),
        };
        self.root.right = match self.levels.get(0, 1) {
            Some(id) => ChildRef::Child(id),
            None => ChildRef::Descendant(max),
        };
    }
}

// =============================================================================
// Mutation
// =============================================================================

impl XFastTrie {
    /// Adds `value`. Returns `false` if it was already present.
    pub fn insert<K: IntoKey>(&mut self, value: K) -> Result<bool> {
        let v = self.normalize(value)?;
        if self.levels.leaf(v).is_some() {
            return Ok(false);
        }

        let (pred, succ) = match self.closest_leaf(v) {
            None => (None, None),
            Some(id) => {
                let near = self.nodes.leaf(id);
                if near.value < v {
                    (Some(id), near.succ)
                } else {
                    (near.pred, Some(id))
                }
            }
        };

        let leaf_id = self.nodes.alloc(Node::Leaf(Leaf {
            value: v,
            pred,
            succ,
        }));
        match pred {
            Some(p) => self.nodes.leaf_mut(p).succ = Some(leaf_id),
            None => self.min = Some(leaf_id),
        }
        match succ {
            Some(s) => self.nodes.leaf_mut(s).pred = Some(leaf_id),
            None => self.max = Some(leaf_id),
        }
        let leaf_level = self.levels.leaf_level();
        self.levels.insert(leaf_level, v, leaf_id);
        self.count += 1;
        trace!(value = %v, "inserted leaf");

        let mut child = leaf_id;
        for level in (0..leaf_level).rev() {
            let prefix = self.levels.prefix(v, level);
            let side = Side::from_bit(self.levels.prefix(v, level + 1));

            child = match self.levels.get(level, prefix) {
                Some(id) => {
                    self.link_new_leaf(id, side, child, leaf_id, v);
                    id
                }
                None => {
                    // The new leaf is the only one under this prefix, so it is
                    // also the extreme the missing side points across at.
                    let mut node = Internal::new(prefix);
                    node.set(side, ChildRef::Child(child));
                    node.set(side.opposite(), ChildRef::Descendant(leaf_id));
                    let id = self.nodes.alloc(Node::Internal(node));
                    self.levels.insert(level, prefix, id);
                    trace!(level, prefix = %prefix, "created internal node");
                    id
                }
            };
        }

        self.refresh_root();
        Ok(true)
    }

    /// Updates an existing ancestor after a leaf `v` was added below it on
    /// `side` through `child`.
    fn link_new_leaf(&mut self, id: NodeId, side: Side, child: NodeId, leaf: NodeId, v: u128) {
        let other = side.opposite();
        let stale = match self.nodes.internal(id).get(other) {
            // Left points at the minimum of the right subtree, right at the
            // maximum of the left subtree.
            ChildRef::Descendant(d) => {
                let dv = self.value_of(d);
                match other {
                    Side::Left => v < dv,
                    Side::Right => v > dv,
                }
            }
            _ => false,
        };
        let node = self.nodes.internal_mut(id);
        node.set(side, ChildRef::Child(child));
        if stale {
            node.set(other, ChildRef::Descendant(leaf));
        }
    }

    /// Removes `value`, failing with [`XFastError::NotFound`] if absent.
    pub fn remove<K: IntoKey>(&mut self, value: K) -> Result<()> {
        let v = self.normalize(value)?;
        let leaf_id = self.levels.leaf(v).ok_or(XFastError::NotFound(v))?;

        let Leaf { pred, succ, .. } = *self.nodes.leaf(leaf_id);
        match pred {
            Some(p) => self.nodes.leaf_mut(p).succ = succ,
            None => self.min = succ,
        }
        match succ {
            Some(s) => self.nodes.leaf_mut(s).pred = pred,
            None => self.max = pred,
        }
        let leaf_level = self.levels.leaf_level();
        self.levels.remove(leaf_level, v);
        self.nodes.free(leaf_id);
        self.count -= 1;
        trace!(value = %v, "removed leaf");

        for level in (0..leaf_level).rev() {
            let prefix = self.levels.prefix(v, level);
            let id = self
                .levels
                .get(level, prefix)
                .unwrap_or_else(|| panic!("missing ancestor {prefix:#b} at level {level}"));

            match self.levels.children(level, prefix) {
                (None, None) => {
                    self.levels.remove(level, prefix);
                    self.nodes.free(id);
                    trace!(level, prefix = %prefix, "deleted internal node");
                }
                (left, right) => {
                    let fixed_left =
                        self.unlink_side(id, Side::Left, left, right, leaf_id, succ);
                    let fixed_right =
                        self.unlink_side(id, Side::Right, right, left, leaf_id, pred);
                    let node = self.nodes.internal_mut(id);
                    node.left = fixed_left;
                    node.right = fixed_right;
                }
            }
        }

        self.refresh_root();
        Ok(())
    }

    /// New value for `side` of a surviving ancestor of the removed leaf.
    ///
    /// `replacement` is the removed leaf's list neighbour in the direction
    /// this side's descendant pointer looks (successor for left, predecessor
    /// for right).
    fn unlink_side(
        &self,
        id: NodeId,
        side: Side,
        this: Option<NodeId>,
        sibling: Option<NodeId>,
        removed: NodeId,
        replacement: Option<NodeId>,
    ) -> ChildRef {
        if let Some(c) = this {
            return ChildRef::Child(c);
        }
        match self.nodes.internal(id).get(side) {
            ChildRef::Child(_) => {
                // This side just lost its only subtree: point across at the
                // nearest leaf of the sibling subtree.
                let sibling = sibling.expect("surviving node has at least one child");
                ChildRef::Descendant(self.extreme_leaf(sibling, side))
            }
            ChildRef::Descendant(d) if d == removed => ChildRef::Descendant(
                replacement.expect("removed descendant target has a neighbour in the same subtree"),
            ),
            unchanged => unchanged,
        }
    }
}

impl Default for XFastTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for XFastTrie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a XFastTrie {
    type Item = u128;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Iterator over stored values in ascending order, walking the leaf list.
pub struct Iter<'a> {
    trie: &'a XFastTrie,
    front: Option<NodeId>,
    back: Option<NodeId>,
}

impl<'a> Iter<'a> {
    fn finish_if_met(&mut self, id: NodeId) -> bool {
        if self.front == self.back {
            debug_assert_eq!(self.front, Some(id));
            self.front = None;
            self.back = None;
            return true;
        }
        false
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = u128;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.front?;
        let Leaf { value, succ, .. } = *self.trie.nodes.leaf(id);
        if !self.finish_if_met(id) {
            self.front = succ;
        }
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.front {
            None => (0, Some(0)),
            Some(_) => (1, Some(self.trie.count)),
        }
    }
}

impl<'a> DoubleEndedIterator for Iter<'a> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.back?;
        let Leaf { value, pred, .. } = *self.trie.nodes.leaf(id);
        if !self.finish_if_met(id) {
            self.back = pred;
        }
        Some(value)
    }
}

impl<'a> FusedIterator for Iter<'a> {}


#[cfg(test)]
mod proptests;
