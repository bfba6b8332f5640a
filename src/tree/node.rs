//! B-Tree node and the recursive mutation algorithms
//!
//! `keys[i]` and `values[i]` form one entry. An internal node has exactly
//! `keys.len() + 1` children; a leaf has none.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::mem;

use crate::error::{Result, TimberError};
use super::Bounds;

pub(crate) struct Node<K, V> {
    pub(crate) keys: Vec<K>,
    pub(crate) values: Vec<V>,
    pub(crate) children: Vec<Node<K, V>>,
}

/// Outcome of inserting into a subtree
pub(crate) enum Insertion<K, V> {
    /// Key existed; value swapped in place
    Replaced(V),
    /// New entry, node still within capacity
    Inserted,
    /// New entry overflowed the node; the median moves up to the parent
    Split { key: K, value: V, right: Node<K, V> },
}

impl<K, V> Node<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            keys: Vec::new(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl<K: Ord, V> Node<K, V> {
    /// Binary search within this node: `Ok(i)` on a hit, `Err(i)` gives the
    /// child to descend into
    #[inline]
    pub(crate) fn search<Q>(&self, key: &Q) -> std::result::Result<usize, usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.keys.binary_search_by(|probe| probe.borrow().cmp(key))
    }

    // =========================================================================
    // Insert
    // =========================================================================

    pub(crate) fn insert(&mut self, key: K, value: V, max_keys: usize) -> Insertion<K, V> {
        let idx = match self.search(&key) {
            Ok(i) => return Insertion::Replaced(mem::replace(&mut self.values[i], value)),
            Err(i) => i,
        };

        if self.is_leaf() {
            self.keys.insert(idx, key);
            self.values.insert(idx, value);
        } else {
            match self.children[idx].insert(key, value, max_keys) {
                Insertion::Split { key, value, right } => {
                    self.keys.insert(idx, key);
                    self.values.insert(idx, value);
                    self.children.insert(idx + 1, right);
                }
                other => return other,
            }
        }

        if self.keys.len() > max_keys {
            self.split()
        } else {
            Insertion::Inserted
        }
    }

    /// Split an overflowing node around its median
    fn split(&mut self) -> Insertion<K, V> {
        let mid = self.keys.len() / 2;

        let mut right_keys = self.keys.split_off(mid);
        let mut right_values = self.values.split_off(mid);
        let key = right_keys.remove(0);
        let value = right_values.remove(0);

        let right_children = if self.is_leaf() {
            Vec::new()
        } else {
            self.children.split_off(mid + 1)
        };

        Insertion::Split {
            key,
            value,
            right: Node {
                keys: right_keys,
                values: right_values,
                children: right_children,
            },
        }
    }

    // =========================================================================
    // Remove
    // =========================================================================

    pub(crate) fn remove<Q>(&mut self, key: &Q, min_keys: usize) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            Ok(i) if self.is_leaf() => Some((self.keys.remove(i), self.values.remove(i))),
            Ok(i) => {
                // Replace with the in-order predecessor, then repair child i
                let (pred_key, pred_value) = self.children[i].pop_last(min_keys)?;
                let key = mem::replace(&mut self.keys[i], pred_key);
                let value = mem::replace(&mut self.values[i], pred_value);
                self.rebalance(i, min_keys);
                Some((key, value))
            }
            Err(_) if self.is_leaf() => None,
            Err(i) => {
                let removed = self.children[i].remove(key, min_keys)?;
                self.rebalance(i, min_keys);
                Some(removed)
            }
        }
    }

    /// Remove and return the largest entry of this subtree
    fn pop_last(&mut self, min_keys: usize) -> Option<(K, V)> {
        if self.is_leaf() {
            let key = self.keys.pop()?;
            let value = self.values.pop()?;
            return Some((key, value));
        }

        let last = self.children.len() - 1;
        let popped = self.children[last].pop_last(min_keys)?;
        self.rebalance(last, min_keys);
        Some(popped)
    }

    /// Restore occupancy of child `i` after a removal below it
    fn rebalance(&mut self, i: usize, min_keys: usize) {
        if self.children[i].keys.len() >= min_keys {
            return;
        }

        let left_spare = i
            .checked_sub(1)
            .map(|l| self.children[l].keys.len())
            .filter(|&n| n > min_keys);
        let right_spare = self
            .children
            .get(i + 1)
            .map(|r| r.keys.len())
            .filter(|&n| n > min_keys);

        match (left_spare, right_spare) {
            (Some(left), Some(right)) if right > left => self.borrow_from_right(i),
            (Some(_), _) => self.borrow_from_left(i),
            (None, Some(_)) => self.borrow_from_right(i),
            (None, None) if i + 1 < self.children.len() => self.merge_with_next(i),
            (None, None) if i > 0 => self.merge_with_next(i - 1),
            (None, None) => {}
        }
    }

    /// Rotate the left sibling's last entry through the parent into child `i`
    fn borrow_from_left(&mut self, i: usize) {
        let (before, after) = self.children.split_at_mut(i);
        let left = &mut before[i - 1];
        let child = &mut after[0];

        let (Some(key), Some(value)) = (left.keys.pop(), left.values.pop()) else {
            return;
        };
        let separator_key = mem::replace(&mut self.keys[i - 1], key);
        let separator_value = mem::replace(&mut self.values[i - 1], value);
        child.keys.insert(0, separator_key);
        child.values.insert(0, separator_value);

        if let Some(grandchild) = left.children.pop() {
            child.children.insert(0, grandchild);
        }
    }

    /// Rotate the right sibling's first entry through the parent into child `i`
    fn borrow_from_right(&mut self, i: usize) {
        let (before, after) = self.children.split_at_mut(i + 1);
        let child = &mut before[i];
        let right = &mut after[0];

        if right.keys.is_empty() {
            return;
        }
        let key = right.keys.remove(0);
        let value = right.values.remove(0);
        let separator_key = mem::replace(&mut self.keys[i], key);
        let separator_value = mem::replace(&mut self.values[i], value);
        child.keys.push(separator_key);
        child.values.push(separator_value);

        if !right.is_leaf() {
            child.children.push(right.children.remove(0));
        }
    }

    /// Fold child `i + 1` and separator `i` into child `i`
    fn merge_with_next(&mut self, i: usize) {
        let right = self.children.remove(i + 1);
        let separator_key = self.keys.remove(i);
        let separator_value = self.values.remove(i);

        let left = &mut self.children[i];
        left.keys.push(separator_key);
        left.values.push(separator_value);
        left.keys.extend(right.keys);
        left.values.extend(right.values);
        left.children.extend(right.children);
    }

    // =========================================================================
    // Verification
    // =========================================================================

    /// Returns the number of entries in this subtree
    pub(crate) fn verify(
        &self,
        lower: Option<&K>,
        upper: Option<&K>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        bounds: &Bounds,
    ) -> Result<usize> {
        let n = self.keys.len();

        if self.values.len() != n {
            return Err(invariant(depth, format!("{} keys but {} values", n, self.values.len())));
        }
        if n > bounds.max_keys {
            return Err(invariant(depth, format!("{} entries exceeds max {}", n, bounds.max_keys)));
        }
        if !bounds.is_root && n < bounds.min_keys {
            return Err(invariant(depth, format!("{} entries below min {}", n, bounds.min_keys)));
        }
        if self.keys.windows(2).any(|w| w[0].cmp(&w[1]) != Ordering::Less) {
            return Err(invariant(depth, "keys not strictly increasing".to_string()));
        }
        if let (Some(lo), Some(first)) = (lower, self.keys.first()) {
            if first <= lo {
                return Err(invariant(depth, "key at or below parent separator".to_string()));
            }
        }
        if let (Some(hi), Some(last)) = (upper, self.keys.last()) {
            if last >= hi {
                return Err(invariant(depth, "key at or above parent separator".to_string()));
            }
        }

        if self.is_leaf() {
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(invariant(
                        depth,
                        format!("leaf at depth {} but first leaf at {}", depth, expected),
                    ));
                }
                Some(_) => {}
            }
            return Ok(n);
        }

        if self.children.len() != n + 1 {
            return Err(invariant(
                depth,
                format!("{} entries but {} children", n, self.children.len()),
            ));
        }

        let child_bounds = Bounds {
            max_keys: bounds.max_keys,
            min_keys: bounds.min_keys,
            is_root: false,
        };
        let mut total = n;
        for (i, child) in self.children.iter().enumerate() {
            let lo = if i == 0 { lower } else { self.keys.get(i - 1) };
            let hi = if i == n { upper } else { self.keys.get(i) };
            total += child.verify(lo, hi, depth + 1, leaf_depth, &child_bounds)?;
        }
        Ok(total)
    }
}

fn invariant(depth: usize, detail: String) -> TimberError {
    TimberError::TreeInvariant(format!("node at depth {}: {}", depth, detail))
}
