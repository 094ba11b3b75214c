//! Breadth-first listing of a calculator tree, e.g. for a flat picker list.
//!
//! Carries no dependency semantics; the propagation engine relies on
//! [`crate::domain::TreeIndex`] instead.

use std::collections::VecDeque;

use tracing::instrument;

use crate::domain::arena::{CalculatorNode, CalculatorTree};

/// Queue-based breadth-first iterator, children in stored order.
pub struct BreadthFirst<'a> {
    tree: &'a CalculatorTree,
    queue: VecDeque<&'a CalculatorNode>,
}

impl<'a> BreadthFirst<'a> {
    pub fn new(tree: &'a CalculatorTree) -> Self {
        let mut queue = VecDeque::new();
        queue.push_back(tree.root());
        Self { tree, queue }
    }
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = &'a CalculatorNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        for &child in &node.children {
            if let Some(child) = self.tree.get(child) {
                self.queue.push_back(child);
            }
        }
        Some(node)
    }
}

/// Every calculator exactly once, parents before their children.
///
/// Returns owned snapshots; calling it again restarts from the root.
#[instrument(level = "debug", skip(tree))]
pub fn flatten(tree: &CalculatorTree) -> Vec<CalculatorNode> {
    BreadthFirst::new(tree).cloned().collect()
}

/// Breadth-first listing with each calculator's depth (root = 0).
pub fn flatten_with_depth(tree: &CalculatorTree) -> Vec<(usize, &CalculatorNode)> {
    let mut listing = Vec::with_capacity(tree.len());
    let mut queue = VecDeque::new();
    queue.push_back((0, tree.root()));

    while let Some((depth, node)) = queue.pop_front() {
        listing.push((depth, node));
        for &child in &node.children {
            if let Some(child) = tree.get(child) {
                queue.push_back((depth + 1, child));
            }
        }
    }
    listing
}
