//! Calculator service: evaluation and upward change propagation
//!
//! Every operation takes a tree snapshot by reference and returns a new one.
//! Results are recomputed along the ancestor chain of the changed calculator,
//! leaving unrelated subtrees untouched.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::application::services::evaluation::{Evaluation, EvaluatorAdapter, Outcome};
use crate::application::{ApplicationResult, EvaluationError};
use crate::domain::{
    build_scope, CalculatorId, CalculatorTree, DomainError, Scope, TreeIndex, TreeResult,
    Variable, VariableId,
};
use crate::infrastructure::traits::ExpressionEngine;

/// Updated snapshot plus everything that went wrong on the way.
#[derive(Debug, Clone)]
pub struct Propagation {
    pub tree: CalculatorTree,
    /// Usually empty; one entry per calculator whose expression failed
    pub errors: Vec<EvaluationError>,
    /// Calculators recomputed, in evaluation order
    pub visited: Vec<CalculatorId>,
}

impl Propagation {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_for(&self, calculator_id: CalculatorId) -> Option<&EvaluationError> {
        self.errors.iter().find(|e| e.calculator_id == calculator_id)
    }
}

/// Service computing calculator results.
pub struct CalculatorService {
    evaluator: EvaluatorAdapter,
}

impl CalculatorService {
    pub fn new(engine: Arc<dyn ExpressionEngine>) -> Self {
        Self {
            evaluator: EvaluatorAdapter::new(engine),
        }
    }

    /// Scope the calculator's expression is evaluated against.
    pub fn scope(&self, tree: &CalculatorTree, calculator_id: CalculatorId) -> ApplicationResult<Scope> {
        let node = tree.find_by_id(calculator_id)?;
        Ok(build_scope(tree, node)?)
    }

    /// Evaluate one calculator against the current snapshot without storing the result.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn evaluate_node(
        &self,
        tree: &CalculatorTree,
        calculator_id: CalculatorId,
    ) -> ApplicationResult<Evaluation> {
        let index = TreeIndex::build(tree)?;
        let node = index.find_by_id(calculator_id)?;
        let scope = build_scope(&index, node)?;
        Ok(self
            .evaluator
            .evaluate(node.id, node.expression.as_deref(), &scope))
    }

    /// Set one variable and recompute its calculator and every ancestor.
    ///
    /// Unknown ids abort before anything changes. Failing expressions keep
    /// their previous result and are reported in [`Propagation::errors`].
    #[instrument(level = "debug", skip(self, tree))]
    pub fn apply_variable_change(
        &self,
        tree: &CalculatorTree,
        calculator_id: CalculatorId,
        variable_id: VariableId,
        value: f64,
    ) -> ApplicationResult<Propagation> {
        let updated = tree.set_variable_value(calculator_id, variable_id, value)?;
        Ok(self.propagate(updated, calculator_id)?)
    }

    /// Replace a calculator's expression and recompute it and its ancestors.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn apply_expression_change(
        &self,
        tree: &CalculatorTree,
        calculator_id: CalculatorId,
        expression: Option<String>,
    ) -> ApplicationResult<Propagation> {
        let updated = tree.set_expression(calculator_id, expression)?;
        Ok(self.propagate(updated, calculator_id)?)
    }

    /// Add an empty calculator and recompute from its new parent upwards.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn add_calculator(
        &self,
        tree: &CalculatorTree,
        parent_id: CalculatorId,
        calculator_id: CalculatorId,
        name: &str,
    ) -> ApplicationResult<Propagation> {
        let updated = tree.add_child(parent_id, calculator_id, name)?;
        Ok(self.propagate(updated, parent_id)?)
    }

    /// Delete a calculator with its subtree and recompute from its former parent.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn remove_calculator(
        &self,
        tree: &CalculatorTree,
        calculator_id: CalculatorId,
    ) -> ApplicationResult<Propagation> {
        let parent_id = tree
            .find_by_id(calculator_id)?
            .parent_id
            .ok_or(DomainError::RootRemoval(calculator_id))?;
        let updated = tree.remove_subtree(calculator_id)?;
        Ok(self.propagate(updated, parent_id)?)
    }

    /// Add a variable and recompute from its calculator upwards.
    #[instrument(level = "debug", skip(self, tree, variable), fields(name = %variable.name))]
    pub fn add_variable(
        &self,
        tree: &CalculatorTree,
        calculator_id: CalculatorId,
        variable: Variable,
    ) -> ApplicationResult<Propagation> {
        let updated = tree.add_variable(calculator_id, variable)?;
        Ok(self.propagate(updated, calculator_id)?)
    }

    /// Drop a variable; expressions still naming it fail and keep their result.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn remove_variable(
        &self,
        tree: &CalculatorTree,
        calculator_id: CalculatorId,
        variable_id: VariableId,
    ) -> ApplicationResult<Propagation> {
        let updated = tree.remove_variable(calculator_id, variable_id)?;
        Ok(self.propagate(updated, calculator_id)?)
    }

    /// Rename a variable and recompute from its calculator upwards.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn update_variable(
        &self,
        tree: &CalculatorTree,
        calculator_id: CalculatorId,
        variable_id: VariableId,
        name: &str,
        display_name: &str,
    ) -> ApplicationResult<Propagation> {
        let updated = tree.update_variable(calculator_id, variable_id, name, display_name)?;
        Ok(self.propagate(updated, calculator_id)?)
    }

    /// Rename a calculator and recompute from its parent, whose scope key changed.
    ///
    /// Renaming the root only recomputes the root.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn rename_calculator(
        &self,
        tree: &CalculatorTree,
        calculator_id: CalculatorId,
        name: &str,
    ) -> ApplicationResult<Propagation> {
        let start = tree
            .find_by_id(calculator_id)?
            .parent_id
            .unwrap_or(calculator_id);
        let updated = tree.rename(calculator_id, name)?;
        Ok(self.propagate(updated, start)?)
    }

    /// Recompute every calculator, children before parents.
    ///
    /// Used on freshly loaded snapshots whose stored results may be stale.
    #[instrument(level = "debug", skip(self, tree), fields(size = tree.len()))]
    pub fn recalculate(&self, tree: &CalculatorTree) -> ApplicationResult<Propagation> {
        TreeIndex::build(tree)?;
        let order: Vec<CalculatorId> = tree.iter_postorder().map(|n| n.id).collect();

        let mut working = tree.clone();
        let mut errors = Vec::new();
        for &id in &order {
            if let Some(error) = self.recompute(&mut working, id)? {
                errors.push(error);
            }
        }

        debug!("recalculated {} calculators, {} errors", order.len(), errors.len());
        Ok(Propagation {
            tree: working,
            errors,
            visited: order,
        })
    }

    /// Walk from `start` to the root, recomputing each calculator on the way.
    fn propagate(&self, mut working: CalculatorTree, start: CalculatorId) -> TreeResult<Propagation> {
        let chain = TreeIndex::build(&working)?.ancestors(start)?;

        let mut errors = Vec::new();
        for &id in &chain {
            if let Some(error) = self.recompute(&mut working, id)? {
                errors.push(error);
            }
        }

        debug!(calculator = start, "propagated over {:?}, {} errors", chain, errors.len());
        Ok(Propagation {
            tree: working,
            errors,
            visited: chain,
        })
    }

    /// Evaluate one calculator in place.
    ///
    /// A value replaces the result; no expression leaves it as is; a failure
    /// keeps the last known good result and is returned.
    fn recompute(
        &self,
        working: &mut CalculatorTree,
        id: CalculatorId,
    ) -> TreeResult<Option<EvaluationError>> {
        let node = working.find_by_id(id)?;
        let scope = build_scope(&*working, node)?;
        let evaluation = self
            .evaluator
            .evaluate(id, node.expression.as_deref(), &scope);

        match evaluation {
            Ok(Outcome::Value(value)) => {
                working.node_mut(id)?.result = Some(value);
                Ok(None)
            }
            Ok(Outcome::NoResult) => Ok(None),
            Err(error) => Ok(Some(error)),
        }
    }
}
