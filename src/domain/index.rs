//! Id lookup and ancestor chains for one tree snapshot.
//!
//! The index is rebuilt from scratch for every snapshot with a single
//! depth-first walk; it is never patched incrementally.

use std::collections::{HashMap, HashSet};

use tracing::{instrument, trace};

use crate::domain::arena::{CalculatorNode, CalculatorTree, NodeLookup};
use crate::domain::entities::CalculatorId;
use crate::domain::error::{DomainError, TreeResult};

/// Borrowed id→node map over a [`CalculatorTree`] snapshot.
#[derive(Debug)]
pub struct TreeIndex<'a> {
    nodes: HashMap<CalculatorId, &'a CalculatorNode>,
    /// Ids in depth-first pre-order
    order: Vec<CalculatorId>,
}

impl NodeLookup for TreeIndex<'_> {
    fn node(&self, id: CalculatorId) -> Option<&CalculatorNode> {
        self.get(id)
    }
}

impl<'a> TreeIndex<'a> {
    /// Index the whole tree.
    #[instrument(level = "debug", skip(tree), fields(root = tree.root_id()))]
    pub fn build(tree: &'a CalculatorTree) -> TreeResult<Self> {
        Self::build_from(tree, tree.root_id())
    }

    /// Index the subtree rooted at `start`.
    ///
    /// Fails with `NodeNotFound` on a dangling child or parent reference, with
    /// `ParentMismatch` if a child names a different parent than the one
    /// listing it, and with `CycleDetected` if a node is reachable twice.
    #[instrument(level = "debug", skip(tree))]
    pub fn build_from(tree: &'a CalculatorTree, start: CalculatorId) -> TreeResult<Self> {
        let mut nodes = HashMap::new();
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        // (calculator, the calculator whose children list holds it)
        let mut stack: Vec<(CalculatorId, Option<CalculatorId>)> = vec![(start, None)];

        while let Some((current, listed_under)) = stack.pop() {
            if !visited.insert(current) {
                return Err(DomainError::CycleDetected(current));
            }
            let node = tree.find_by_id(current)?;
            if let Some(parent_id) = node.parent_id {
                if !tree.contains(parent_id) {
                    return Err(DomainError::NodeNotFound(parent_id));
                }
            }
            // Scope follows `children`, propagation follows `parent_id`: both must agree.
            if let Some(listed_under) = listed_under {
                if node.parent_id != Some(listed_under) {
                    return Err(DomainError::ParentMismatch {
                        calculator_id: current,
                        listed_under,
                        parent_id: node.parent_id,
                    });
                }
            }
            nodes.insert(current, node);
            order.push(current);

            for &child in node.children.iter().rev() {
                stack.push((child, Some(current)));
            }
        }

        trace!("indexed {} calculators", order.len());
        Ok(Self { nodes, order })
    }

    pub fn get(&self, id: CalculatorId) -> Option<&'a CalculatorNode> {
        self.nodes.get(&id).copied()
    }

    pub fn find_by_id(&self, id: CalculatorId) -> TreeResult<&'a CalculatorNode> {
        self.get(id).ok_or(DomainError::NodeNotFound(id))
    }

    pub fn contains(&self, id: CalculatorId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in depth-first pre-order.
    pub fn ids(&self) -> &[CalculatorId] {
        &self.order
    }

    /// The node itself, then its parent, grandparent, ... up to the indexed root.
    #[instrument(level = "trace", skip(self))]
    pub fn ancestors(&self, id: CalculatorId) -> TreeResult<Vec<CalculatorId>> {
        let mut chain = Vec::new();
        let mut current = Some(self.find_by_id(id)?);

        while let Some(node) = current {
            // A chain longer than the tree means the parent links loop.
            if chain.len() == self.order.len() {
                return Err(DomainError::CycleDetected(node.id));
            }
            chain.push(node.id);
            // Parents outside a subtree index end the chain.
            current = node.parent_id.and_then(|parent_id| self.get(parent_id));
        }
        Ok(chain)
    }
}
