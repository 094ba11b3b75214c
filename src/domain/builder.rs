//! Tree builder: validated [`CalculatorTree`] snapshots from store data.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::domain::arena::{CalculatorNode, CalculatorTree};
use crate::domain::entities::{CalculatorId, CalculatorRecord, CalculatorView};
use crate::domain::error::{DomainError, TreeResult};

/// Constructs calculator trees from flat records or nested views.
pub struct TreeBuilder {
    relationship_cache: HashMap<CalculatorId, Vec<CalculatorId>>,
    visited: HashSet<CalculatorId>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            relationship_cache: HashMap::new(),
            visited: HashSet::new(),
        }
    }

    /// Build a tree from flat records, each naming its parent by id.
    ///
    /// Sibling order follows record order. Fails if there is not exactly one
    /// root, a parent is missing, records disagree on the project, ids or
    /// variable names repeat, or parent links form a cycle.
    #[instrument(level = "debug", skip(self, records), fields(count = records.len()))]
    pub fn build_from_records(&mut self, records: Vec<CalculatorRecord>) -> TreeResult<CalculatorTree> {
        self.relationship_cache.clear();
        self.visited.clear();

        let mut by_id: HashMap<CalculatorId, CalculatorRecord> = HashMap::new();
        let mut root: Option<CalculatorId> = None;
        let mut project_id = None;
        let mut input_order = Vec::with_capacity(records.len());

        for record in records {
            if by_id.contains_key(&record.id) {
                return Err(DomainError::DuplicateNode(record.id));
            }
            Self::validate_record(&record)?;

            let expected = *project_id.get_or_insert(record.project_id);
            if record.project_id != expected {
                return Err(DomainError::ProjectMismatch {
                    calculator_id: record.id,
                    expected,
                    found: record.project_id,
                });
            }

            match record.parent_id {
                None => {
                    if let Some(existing) = root {
                        return Err(DomainError::MultipleRoots(existing, record.id));
                    }
                    root = Some(record.id);
                }
                Some(parent_id) => {
                    self.relationship_cache
                        .entry(parent_id)
                        .or_default()
                        .push(record.id);
                }
            }

            input_order.push(record.id);
            by_id.insert(record.id, record);
        }

        let root_id = root.ok_or(DomainError::MissingRoot)?;

        for parent_id in self.relationship_cache.keys() {
            if !by_id.contains_key(parent_id) {
                return Err(DomainError::NodeNotFound(*parent_id));
            }
        }

        let tree = self.build_tree(root_id, &mut by_id)?;

        // Records never reached from the root hang off a parent loop.
        if let Some(&unreached) = input_order.iter().find(|&&id| !self.visited.contains(&id)) {
            return Err(DomainError::CycleDetected(unreached));
        }

        self.warn_duplicate_sibling_names(&tree);
        debug!("built tree with {} calculators", tree.len());
        Ok(tree)
    }

    /// Build a tree from a nested hierarchy view.
    ///
    /// Parent ids are taken from the nesting; a record whose own parent id
    /// disagrees is logged and corrected.
    #[instrument(level = "debug", skip(self, view), fields(root = view.record.id))]
    pub fn build_from_view(&mut self, view: CalculatorView) -> TreeResult<CalculatorTree> {
        let mut records = Vec::new();
        let mut stack = vec![(view, None)];

        while let Some((current, parent_id)) = stack.pop() {
            let CalculatorView {
                mut record,
                children,
            } = current;
            if record.parent_id != parent_id {
                warn!(
                    calculator = record.id,
                    "parent id {:?} contradicts nesting, using {:?}", record.parent_id, parent_id
                );
                record.parent_id = parent_id;
            }
            let id = record.id;
            records.push(record);
            for child in children.into_iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        self.build_from_records(records)
    }

    fn validate_record(record: &CalculatorRecord) -> TreeResult<()> {
        let mut names = HashSet::new();
        let mut ids = HashSet::new();
        for variable in &record.variables {
            variable.validate()?;
            if !names.insert(variable.name.as_str()) {
                return Err(DomainError::DuplicateVariable {
                    calculator_id: record.id,
                    name: variable.name.clone(),
                });
            }
            if !ids.insert(variable.id) {
                return Err(DomainError::DuplicateVariableId {
                    calculator_id: record.id,
                    variable_id: variable.id,
                });
            }
        }
        Ok(())
    }

    fn build_tree(
        &mut self,
        root_id: CalculatorId,
        by_id: &mut HashMap<CalculatorId, CalculatorRecord>,
    ) -> TreeResult<CalculatorTree> {
        let root = by_id
            .remove(&root_id)
            .ok_or(DomainError::NodeNotFound(root_id))?;
        let mut tree = CalculatorTree::new(CalculatorNode::from_record(root));
        self.visited.insert(root_id);

        let mut stack: Vec<CalculatorId> = self.children_of(root_id).into_iter().rev().collect();

        while let Some(current) = stack.pop() {
            // Cycle detection
            if !self.visited.insert(current) {
                return Err(DomainError::CycleDetected(current));
            }
            let record = by_id
                .remove(&current)
                .ok_or(DomainError::NodeNotFound(current))?;
            tree.insert_node(CalculatorNode::from_record(record))?;

            // Reverse push keeps siblings in record order
            for child in self.children_of(current).into_iter().rev() {
                stack.push(child);
            }
        }

        Ok(tree)
    }

    fn children_of(&self, id: CalculatorId) -> Vec<CalculatorId> {
        self.relationship_cache.get(&id).cloned().unwrap_or_default()
    }

    fn warn_duplicate_sibling_names(&self, tree: &CalculatorTree) {
        for node in tree.iter() {
            let mut seen = HashSet::new();
            for child in node.children.iter().filter_map(|&c| tree.get(c)) {
                if !seen.insert(child.name.as_str()) {
                    warn!(
                        parent = node.id,
                        "sibling name '{}' is not unique; later calculator shadows earlier", child.name
                    );
                }
            }
        }
    }
}
