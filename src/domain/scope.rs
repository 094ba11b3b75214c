//! Evaluation scope for a single calculator.

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::domain::arena::{CalculatorNode, NodeLookup};
use crate::domain::error::{DomainError, TreeResult};

/// Value a child contributes while it has no result yet.
pub const UNEVALUATED_CHILD_VALUE: f64 = 0.0;

/// Flat name→number mapping an expression is evaluated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    values: BTreeMap<String, f64>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later inserts overwrite earlier ones.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn as_map(&self) -> &BTreeMap<String, f64> {
        &self.values
    }

    pub fn into_map(self) -> BTreeMap<String, f64> {
        self.values
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Build the scope for `node`: its variables, then its direct children's results.
///
/// Variables are applied in list order, so a repeated name keeps the last
/// value. Children follow, keyed by their name; a child without a result
/// contributes [`UNEVALUATED_CHILD_VALUE`]. A child named like a variable
/// therefore shadows it, and of two equally named siblings the later wins.
pub fn build_scope(lookup: &impl NodeLookup, node: &CalculatorNode) -> TreeResult<Scope> {
    let mut scope = Scope::new();

    for variable in &node.variables {
        scope.insert(variable.name.clone(), variable.value);
    }

    for &child_id in &node.children {
        let child = lookup
            .node(child_id)
            .ok_or(DomainError::NodeNotFound(child_id))?;
        scope.insert(
            child.name.clone(),
            child.result.unwrap_or(UNEVALUATED_CHILD_VALUE),
        );
    }

    trace!(calculator = node.id, "scope: {}", scope);
    Ok(scope)
}
