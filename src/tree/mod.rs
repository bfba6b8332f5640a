//! Tree Module
//!
//! In-memory B-Tree holding every live key.
//!
//! ## Responsibilities
//! - Ordered point lookups, inserts and deletes in O(log_order N) node visits
//! - Keep every leaf at the same depth (split on overflow, borrow/merge on
//!   underflow)
//! - Structural self-check used by recovery and tests
//!
//! ## Shape
//! Entries live in every node (classic B-Tree, not B+). A node holds at most
//! `order - 1` entries; every node except the root holds at least
//! `ceil(order / 2) - 1`. Children are owned by value, so no node can be
//! reachable from two parents.
//!
//! ## Rebalancing Rules
//! - Split: an overflowing node gives its median entry to the parent; the left
//!   half keeps the smaller share on odd splits. A root split adds one level.
//! - Borrow: from the sibling with more spare entries; the left one on ties.
//! - Merge: with the right sibling when there is one, else the left. A root
//!   left with no entries after a merge is replaced by its single child.

mod node;
mod iter;

pub use iter::Iter;

use std::borrow::Borrow;

use crate::error::{Result, TimberError};
use node::{Insertion, Node};

/// An ordered map backed by a B-Tree of configurable order
pub struct BTree<K, V> {
    root: Node<K, V>,
    order: usize,
    len: usize,
}

impl<K: Ord, V> BTree<K, V> {
    /// Create an empty tree. Orders below 3 are raised to 3.
    pub fn new(order: usize) -> Self {
        Self {
            root: Node::new(),
            order: order.max(crate::config::MIN_TREE_ORDER),
            len: 0,
        }
    }

    /// Look up a key
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut node = &self.root;
        loop {
            match node.search(key) {
                Ok(i) => return Some(&node.values[i]),
                Err(_) if node.is_leaf() => return None,
                Err(i) => node = &node.children[i],
            }
        }
    }

    /// Whether the key is present
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Insert or replace. Returns the previous value when the key existed.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let max_keys = self.max_keys();
        match self.root.insert(key, value, max_keys) {
            Insertion::Replaced(previous) => Some(previous),
            Insertion::Inserted => {
                self.len += 1;
                None
            }
            Insertion::Split { key, value, right } => {
                self.len += 1;
                let left = std::mem::replace(&mut self.root, Node::new());
                self.root.keys.push(key);
                self.root.values.push(value);
                self.root.children.push(left);
                self.root.children.push(right);
                None
            }
        }
    }

    /// Remove a key, returning its value
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Remove a key, returning the stored key and value
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let min_keys = self.min_keys();
        let removed = self.root.remove(key, min_keys)?;
        self.len -= 1;

        if self.root.keys.is_empty() && !self.root.is_leaf() {
            self.root = self.root.children.remove(0);
        }
        Some(removed)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Branching factor
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of levels; an empty tree has height 1
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut node = &self.root;
        while let Some(child) = node.children.first() {
            height += 1;
            node = child;
        }
        height
    }

    /// Keys of every node, grouped by depth, left to right
    pub fn levels(&self) -> Vec<Vec<Vec<&K>>> {
        let mut levels = Vec::new();
        let mut current = vec![&self.root];
        while !current.is_empty() {
            levels.push(current.iter().map(|&n| n.keys.iter().collect()).collect());
            current = current.into_iter().flat_map(|n| n.children.iter()).collect();
        }
        levels
    }

    /// In-order iterator over all entries
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.root, self.len)
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.root = Node::new();
        self.len = 0;
    }

    /// Check ordering, balance, occupancy and the entry count
    pub fn verify(&self) -> Result<()> {
        let mut leaf_depth = None;
        let counted = self.root.verify(
            None,
            None,
            0,
            &mut leaf_depth,
            &Bounds {
                max_keys: self.max_keys(),
                min_keys: self.min_keys(),
                is_root: true,
            },
        )?;

        if counted != self.len {
            return Err(TimberError::TreeInvariant(format!(
                "tree reports {} entries but holds {}",
                self.len, counted
            )));
        }
        Ok(())
    }

    fn max_keys(&self) -> usize {
        self.order - 1
    }

    fn min_keys(&self) -> usize {
        self.order.div_ceil(2) - 1
    }
}

impl<K: Ord, V> Default for BTree<K, V> {
    fn default() -> Self {
        Self::new(5)
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a BTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Occupancy limits handed down during verification
pub(crate) struct Bounds {
    pub(crate) max_keys: usize,
    pub(crate) min_keys: usize,
    pub(crate) is_root: bool,
}
