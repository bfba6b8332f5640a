//! In-order traversal

use super::node::Node;

/// Iterator over tree entries in ascending key order
pub struct Iter<'a, K, V> {
    /// Path from the root; each frame holds the next entry index to yield
    stack: Vec<(&'a Node<K, V>, usize)>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(root: &'a Node<K, V>, len: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: len,
        };
        iter.descend_left(root);
        iter
    }

    fn descend_left(&mut self, mut node: &'a Node<K, V>) {
        loop {
            self.stack.push((node, 0));
            match node.children.first() {
                Some(child) => node = child,
                None => break,
            }
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, idx) = {
                let frame = self.stack.last_mut()?;
                let current = (frame.0, frame.1);
                frame.1 += 1;
                current
            };

            if idx >= node.keys.len() {
                self.stack.pop();
                continue;
            }

            if let Some(child) = node.children.get(idx + 1) {
                self.descend_left(child);
            }
            self.remaining = self.remaining.saturating_sub(1);
            return Some((&node.keys[idx], &node.values[idx]));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
