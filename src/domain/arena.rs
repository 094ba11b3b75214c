use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::{debug, instrument};

use crate::domain::entities::{
    CalculatorId, CalculatorRecord, CalculatorView, ProjectId, Variable, VariableId,
};
use crate::domain::error::{DomainError, TreeResult};

/// One calculator in the hierarchy.
///
/// Parent and children are referenced by id; the owning [`CalculatorTree`]
/// resolves them.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatorNode {
    pub id: CalculatorId,
    pub project_id: ProjectId,
    /// Key under which `result` is exposed to the parent's scope
    pub name: String,
    /// None for the root
    pub parent_id: Option<CalculatorId>,
    pub expression: Option<String>,
    /// Last known good value, None if never evaluated successfully
    pub result: Option<f64>,
    pub note: String,
    pub variables: Vec<Variable>,
    /// Child ids in display order
    pub children: Vec<CalculatorId>,
}

impl CalculatorNode {
    /// Fresh calculator: no expression, no result, no variables.
    pub fn new(
        id: CalculatorId,
        project_id: ProjectId,
        name: impl Into<String>,
        parent_id: Option<CalculatorId>,
    ) -> Self {
        Self {
            id,
            project_id,
            name: name.into(),
            parent_id,
            expression: None,
            result: None,
            note: String::new(),
            variables: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn variable(&self, variable_id: VariableId) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == variable_id)
    }

    fn variable_mut(&mut self, variable_id: VariableId) -> TreeResult<&mut Variable> {
        let calculator_id = self.id;
        self.variables
            .iter_mut()
            .find(|v| v.id == variable_id)
            .ok_or(DomainError::VariableNotFound {
                calculator_id,
                variable_id,
            })
    }

    /// Flat record without children, as a store would hold it.
    pub fn to_record(&self) -> CalculatorRecord {
        CalculatorRecord {
            id: self.id,
            project_id: self.project_id,
            name: self.name.clone(),
            parent_id: self.parent_id,
            expression: self.expression.clone(),
            result: self.result,
            note: self.note.clone(),
            variables: self.variables.clone(),
        }
    }

    pub(crate) fn from_record(record: CalculatorRecord) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id,
            name: record.name,
            parent_id: record.parent_id,
            expression: record.expression,
            result: record.result,
            note: record.note,
            variables: record.variables,
            children: Vec::new(),
        }
    }
}

impl fmt::Display for CalculatorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

/// Lookup of calculators by id.
///
/// Implemented by the tree itself and by [`crate::domain::TreeIndex`], so the
/// scope builder works against either.
pub trait NodeLookup {
    fn node(&self, id: CalculatorId) -> Option<&CalculatorNode>;
}

/// Arena-based snapshot of one project's calculator hierarchy.
///
/// Nodes live in a generational arena keyed by calculator id. Every public
/// mutator leaves `self` untouched and returns a new snapshot.
#[derive(Debug, Clone)]
pub struct CalculatorTree {
    project_id: ProjectId,
    /// Arena storage for all calculators
    arena: Arena<CalculatorNode>,
    /// Calculator id to arena slot
    slots: HashMap<CalculatorId, Index>,
    root: CalculatorId,
}

impl NodeLookup for CalculatorTree {
    fn node(&self, id: CalculatorId) -> Option<&CalculatorNode> {
        self.get(id)
    }
}

impl CalculatorTree {
    /// Start a tree from its root calculator.
    ///
    /// The root's parent and children are reset; children are attached
    /// afterwards through [`CalculatorTree::insert_node`] or `add_child`.
    pub fn new(mut root: CalculatorNode) -> Self {
        root.parent_id = None;
        root.children.clear();
        let root_id = root.id;
        let project_id = root.project_id;
        let mut arena = Arena::new();
        let idx = arena.insert(root);
        let mut slots = HashMap::new();
        slots.insert(root_id, idx);
        Self {
            project_id,
            arena,
            slots,
            root: root_id,
        }
    }

    /// Attach a node below its `parent_id`, appending to the parent's children.
    ///
    /// Used by the builder; the node's own children list is rebuilt from
    /// subsequent inserts.
    #[instrument(level = "trace", skip(self, node), fields(id = node.id))]
    pub(crate) fn insert_node(&mut self, mut node: CalculatorNode) -> TreeResult<()> {
        if self.slots.contains_key(&node.id) {
            return Err(DomainError::DuplicateNode(node.id));
        }
        if node.project_id != self.project_id {
            return Err(DomainError::ProjectMismatch {
                calculator_id: node.id,
                expected: self.project_id,
                found: node.project_id,
            });
        }
        let parent_id = node.parent_id.ok_or(DomainError::MultipleRoots(self.root, node.id))?;
        let parent_idx = *self
            .slots
            .get(&parent_id)
            .ok_or(DomainError::NodeNotFound(parent_id))?;

        node.children.clear();
        let node_id = node.id;
        let node_idx = self.arena.insert(node);
        self.slots.insert(node_id, node_idx);
        if let Some(parent) = self.arena.get_mut(parent_idx) {
            parent.children.push(node_id);
        }
        Ok(())
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn root_id(&self) -> CalculatorId {
        self.root
    }

    pub fn root(&self) -> &CalculatorNode {
        // The root slot is created in `new` and never removed.
        &self.arena[self.slots[&self.root]]
    }

    pub fn get(&self, id: CalculatorId) -> Option<&CalculatorNode> {
        self.slots.get(&id).and_then(|&idx| self.arena.get(idx))
    }

    #[instrument(level = "trace", skip(self))]
    pub fn find_by_id(&self, id: CalculatorId) -> TreeResult<&CalculatorNode> {
        self.get(id).ok_or(DomainError::NodeNotFound(id))
    }

    pub fn contains(&self, id: CalculatorId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Mutable access for in-crate working copies.
    pub(crate) fn node_mut(&mut self, id: CalculatorId) -> TreeResult<&mut CalculatorNode> {
        let idx = *self.slots.get(&id).ok_or(DomainError::NodeNotFound(id))?;
        self.arena.get_mut(idx).ok_or(DomainError::NodeNotFound(id))
    }

    // ------------------------------------------------------------
    // snapshot-producing mutators
    // ------------------------------------------------------------

    #[instrument(level = "debug", skip(self))]
    pub fn set_expression(&self, id: CalculatorId, expression: Option<String>) -> TreeResult<Self> {
        let mut next = self.clone();
        next.node_mut(id)?.expression = expression;
        Ok(next)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn set_variable_value(
        &self,
        id: CalculatorId,
        variable_id: VariableId,
        value: f64,
    ) -> TreeResult<Self> {
        if !value.is_finite() {
            // Resolve ids first so unknown ids report as such.
            self.find_by_id(id)?
                .variable(variable_id)
                .ok_or(DomainError::VariableNotFound {
                    calculator_id: id,
                    variable_id,
                })?;
            return Err(DomainError::InvalidValue { variable_id, value });
        }
        let mut next = self.clone();
        next.node_mut(id)?.variable_mut(variable_id)?.value = value;
        Ok(next)
    }

    #[instrument(level = "debug", skip(self, variable), fields(name = %variable.name))]
    pub fn add_variable(&self, id: CalculatorId, variable: Variable) -> TreeResult<Self> {
        variable.validate()?;
        let mut next = self.clone();
        let node = next.node_mut(id)?;
        if node.variables.iter().any(|v| v.name == variable.name) {
            return Err(DomainError::DuplicateVariable {
                calculator_id: id,
                name: variable.name,
            });
        }
        if node.variables.iter().any(|v| v.id == variable.id) {
            return Err(DomainError::DuplicateVariableId {
                calculator_id: id,
                variable_id: variable.id,
            });
        }
        node.variables.push(variable);
        Ok(next)
    }

    /// Rename a variable and/or change its display name.
    #[instrument(level = "debug", skip(self))]
    pub fn update_variable(
        &self,
        id: CalculatorId,
        variable_id: VariableId,
        name: &str,
        display_name: &str,
    ) -> TreeResult<Self> {
        if !crate::domain::is_identifier(name) {
            return Err(DomainError::InvalidIdentifier(name.to_string()));
        }
        let mut next = self.clone();
        let node = next.node_mut(id)?;
        if node
            .variables
            .iter()
            .any(|v| v.name == name && v.id != variable_id)
        {
            return Err(DomainError::DuplicateVariable {
                calculator_id: id,
                name: name.to_string(),
            });
        }
        let variable = node.variable_mut(variable_id)?;
        variable.name = name.to_string();
        variable.display_name = display_name.to_string();
        Ok(next)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn remove_variable(&self, id: CalculatorId, variable_id: VariableId) -> TreeResult<Self> {
        let mut next = self.clone();
        let node = next.node_mut(id)?;
        let pos = node
            .variables
            .iter()
            .position(|v| v.id == variable_id)
            .ok_or(DomainError::VariableNotFound {
                calculator_id: id,
                variable_id,
            })?;
        node.variables.remove(pos);
        Ok(next)
    }

    /// Append a new, empty calculator below `parent_id`.
    #[instrument(level = "debug", skip(self))]
    pub fn add_child(
        &self,
        parent_id: CalculatorId,
        id: CalculatorId,
        name: &str,
    ) -> TreeResult<Self> {
        self.find_by_id(parent_id)?;
        let mut next = self.clone();
        next.insert_node(CalculatorNode::new(
            id,
            self.project_id,
            name,
            Some(parent_id),
        ))?;
        Ok(next)
    }

    /// Delete a calculator together with all its descendants.
    #[instrument(level = "debug", skip(self))]
    pub fn remove_subtree(&self, id: CalculatorId) -> TreeResult<Self> {
        let node = self.find_by_id(id)?;
        let parent_id = node.parent_id.ok_or(DomainError::RootRemoval(id))?;

        let doomed: Vec<CalculatorId> = self.iter_from(id).map(|n| n.id).collect();
        let mut next = self.clone();
        for doomed_id in &doomed {
            if let Some(idx) = next.slots.remove(doomed_id) {
                next.arena.remove(idx);
            }
        }
        next.node_mut(parent_id)?.children.retain(|&c| c != id);
        debug!("removed {} calculators below {}", doomed.len(), parent_id);
        Ok(next)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn rename(&self, id: CalculatorId, name: &str) -> TreeResult<Self> {
        let mut next = self.clone();
        next.node_mut(id)?.name = name.to_string();
        Ok(next)
    }

    #[instrument(level = "debug", skip(self, note))]
    pub fn set_note(&self, id: CalculatorId, note: &str) -> TreeResult<Self> {
        let mut next = self.clone();
        next.node_mut(id)?.note = note.to_string();
        Ok(next)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn set_result(&self, id: CalculatorId, result: Option<f64>) -> TreeResult<Self> {
        let mut next = self.clone();
        next.node_mut(id)?.result = result;
        Ok(next)
    }

    // ------------------------------------------------------------
    // structural queries
    // ------------------------------------------------------------

    /// Pre-order depth-first iterator starting at the root.
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    /// Pre-order iterator over the subtree rooted at `id` (empty if unknown).
    pub fn iter_from(&self, id: CalculatorId) -> TreeIterator<'_> {
        TreeIterator::new(self, id)
    }

    /// Children before parents.
    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    pub fn children_of(&self, id: CalculatorId) -> TreeResult<Vec<&CalculatorNode>> {
        let node = self.find_by_id(id)?;
        node.children
            .iter()
            .map(|&child| self.find_by_id(child))
            .collect()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        self.calculate_depth(self.root)
    }

    fn calculate_depth(&self, id: CalculatorId) -> usize {
        if let Some(node) = self.get(id) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Calculators without children, left to right.
    #[instrument(level = "debug", skip(self))]
    pub fn leaf_ids(&self) -> Vec<CalculatorId> {
        self.iter()
            .filter(|node| node.children.is_empty())
            .map(|node| node.id)
            .collect()
    }

    /// Nested view of the whole tree, children embedded in order.
    pub fn to_view(&self) -> CalculatorView {
        self.view_of(self.root())
    }

    fn view_of(&self, node: &CalculatorNode) -> CalculatorView {
        CalculatorView {
            record: node.to_record(),
            children: node
                .children
                .iter()
                .filter_map(|&child| self.get(child))
                .map(|child| self.view_of(child))
                .collect(),
        }
    }

    /// Flat records in pre-order.
    pub fn to_records(&self) -> Vec<CalculatorRecord> {
        self.iter().map(CalculatorNode::to_record).collect()
    }
}

pub struct TreeIterator<'a> {
    tree: &'a CalculatorTree,
    stack: Vec<CalculatorId>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a CalculatorTree, start: CalculatorId) -> Self {
        let mut stack = Vec::new();
        if tree.contains(start) {
            stack.push(start);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = &'a CalculatorNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some(node);
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    tree: &'a CalculatorTree,
    stack: Vec<(CalculatorId, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(tree: &'a CalculatorTree) -> Self {
        Self {
            tree,
            stack: vec![(tree.root_id(), false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = &'a CalculatorNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.tree.get(current) {
                if !visited {
                    self.stack.push((current, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some(node);
                }
            }
        }
        None
    }
}
