//! Tests for CalculatorService change propagation

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use calctree::application::{ApplicationError, CalculatorService, Outcome};
use calctree::domain::{
    CalculatorId, CalculatorRecord, CalculatorTree, DomainError, Scope, TreeBuilder, Variable,
};
use calctree::infrastructure::traits::{EngineError, ExpressionEngine, FastevalEngine};
use calctree::util::testing::{init_test_setup, sample_tree};

fn service() -> CalculatorService {
    init_test_setup();
    CalculatorService::new(Arc::new(FastevalEngine))
}

fn result_of(tree: &CalculatorTree, id: CalculatorId) -> Option<f64> {
    tree.find_by_id(id).unwrap().result
}

fn record(
    id: CalculatorId,
    parent_id: Option<CalculatorId>,
    name: &str,
    expression: Option<&str>,
) -> CalculatorRecord {
    CalculatorRecord {
        id,
        project_id: 1,
        name: name.to_string(),
        parent_id,
        expression: expression.map(str::to_string),
        result: None,
        note: String::new(),
        variables: Vec::new(),
    }
}

/// Counts calls and delegates to fasteval.
struct CountingEngine {
    calls: AtomicUsize,
}

impl ExpressionEngine for CountingEngine {
    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<f64, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        FastevalEngine.evaluate(expression, scope)
    }
}

/// Fails on every expression.
struct BrokenEngine;

impl ExpressionEngine for BrokenEngine {
    fn evaluate(&self, _expression: &str, _scope: &Scope) -> Result<f64, EngineError> {
        Err(EngineError::new("engine offline"))
    }
}

#[test]
fn given_sample_tree_when_recalculating_then_results_flow_up() {
    // Arrange
    let tree = sample_tree();

    // Act
    let propagation = service().recalculate(&tree).unwrap();

    // Assert
    assert!(propagation.is_clean());
    assert_eq!(result_of(&propagation.tree, 2), Some(6.0));
    assert_eq!(result_of(&propagation.tree, 3), Some(5.0));
    assert_eq!(result_of(&propagation.tree, 1), Some(11.0));
    assert_eq!(propagation.visited, vec![2, 3, 1]);
}

#[test]
fn given_variable_change_when_applying_then_recomputes_chain_to_root() {
    // Arrange
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;

    // Act
    let propagation = svc.apply_variable_change(&tree, 2, 10, 10.0).unwrap();

    // Assert
    assert!(propagation.is_clean());
    assert_eq!(propagation.visited, vec![2, 1]);
    assert_eq!(result_of(&propagation.tree, 2), Some(20.0));
    assert_eq!(result_of(&propagation.tree, 1), Some(25.0));
    assert_eq!(result_of(&propagation.tree, 3), Some(5.0));
}

#[test]
fn given_variable_change_when_applying_then_input_snapshot_is_unchanged() {
    // Arrange
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;

    // Act
    let _ = svc.apply_variable_change(&tree, 2, 10, 10.0).unwrap();

    // Assert
    assert_eq!(tree.find_by_id(2).unwrap().variable(10).unwrap().value, 3.0);
    assert_eq!(result_of(&tree, 2), Some(6.0));
    assert_eq!(result_of(&tree, 1), Some(11.0));
}

#[test]
fn given_undefined_name_when_applying_then_reports_error_and_keeps_results() {
    // Arrange
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;
    let tree = tree.set_expression(2, Some("x * C".into())).unwrap();

    // Act
    let propagation = svc.apply_variable_change(&tree, 2, 10, 10.0).unwrap();

    // Assert
    assert_eq!(propagation.errors.len(), 1);
    assert!(propagation.error_for(2).is_some());
    assert_eq!(result_of(&propagation.tree, 2), Some(6.0));
    // the root still recomputes against A's stale result
    assert_eq!(result_of(&propagation.tree, 1), Some(11.0));
    assert_eq!(
        propagation.tree.find_by_id(2).unwrap().variable(10).unwrap().value,
        10.0
    );
}

#[test]
fn given_root_referencing_undefined_name_when_recalculating_then_result_stays_empty() {
    // Arrange
    let tree = sample_tree().set_expression(1, Some("A + B + C".into())).unwrap();

    // Act
    let propagation = service().recalculate(&tree).unwrap();

    // Assert
    assert_eq!(propagation.errors.len(), 1);
    assert!(propagation.error_for(1).is_some());
    assert_eq!(result_of(&propagation.tree, 1), None);
    assert_eq!(result_of(&propagation.tree, 2), Some(6.0));
}

#[test]
fn given_failing_ancestor_when_applying_then_only_that_ancestor_keeps_stale_result() {
    // Arrange: R = M / 0 fails, M = L + 1, L = v
    let mut leaf = record(3, Some(2), "L", Some("v"));
    leaf.variables = vec![Variable::new(1, "v", "v", 1.0)];
    let records = vec![
        record(1, None, "R", Some("M / 0")),
        record(2, Some(1), "M", Some("L + 1")),
        leaf,
    ];
    let mut tree = TreeBuilder::new().build_from_records(records).unwrap();
    tree = tree.set_result(1, Some(99.0)).unwrap();
    let svc = service();

    // Act
    let propagation = svc.apply_variable_change(&tree, 3, 1, 4.0).unwrap();

    // Assert
    assert_eq!(result_of(&propagation.tree, 3), Some(4.0));
    assert_eq!(result_of(&propagation.tree, 2), Some(5.0));
    assert_eq!(result_of(&propagation.tree, 1), Some(99.0));
    assert_eq!(propagation.errors.len(), 1);
    assert_eq!(propagation.errors[0].calculator_id, 1);
}

#[test]
fn given_sibling_subtree_when_applying_change_then_it_is_not_visited() {
    // Arrange
    let records = vec![
        record(1, None, "R", Some("A + B")),
        record(2, Some(1), "A", Some("a1")),
        record(3, Some(2), "a1", Some("1")),
        record(4, Some(1), "B", Some("b1 * 2")),
        record(5, Some(4), "b1", Some("3")),
    ];
    let tree = TreeBuilder::new().build_from_records(records).unwrap();
    let engine = Arc::new(CountingEngine {
        calls: AtomicUsize::new(0),
    });
    let svc = CalculatorService::new(engine.clone());
    let tree = tree
        .add_variable(3, Variable::new(1, "k", "k", 0.0))
        .unwrap();

    // Act
    let propagation = svc.apply_variable_change(&tree, 3, 1, 2.0).unwrap();

    // Assert
    assert_eq!(propagation.visited, vec![3, 2, 1]);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
    assert_eq!(result_of(&propagation.tree, 4), None);
    assert_eq!(result_of(&propagation.tree, 5), None);
}

#[test]
fn given_calculator_without_expression_when_applying_then_walks_past_it() {
    // Arrange: B has no expression, its result stays
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;
    let tree = tree
        .add_variable(3, Variable::new(20, "y", "Y", 1.0))
        .unwrap();

    // Act
    let propagation = svc.apply_variable_change(&tree, 3, 20, 2.0).unwrap();

    // Assert
    assert!(propagation.is_clean());
    assert_eq!(propagation.visited, vec![3, 1]);
    assert_eq!(result_of(&propagation.tree, 3), Some(5.0));
    assert_eq!(result_of(&propagation.tree, 1), Some(11.0));
}

#[test]
fn given_unknown_calculator_when_applying_then_fails_without_change() {
    // Arrange
    let svc = service();
    let tree = sample_tree();

    // Act
    let result = svc.apply_variable_change(&tree, 42, 10, 1.0);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::NodeNotFound(42)))
    ));
}

#[test]
fn given_unknown_variable_when_applying_then_fails() {
    // Arrange
    let svc = service();
    let tree = sample_tree();

    // Act
    let result = svc.apply_variable_change(&tree, 2, 99, 1.0);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::VariableNotFound {
            calculator_id: 2,
            variable_id: 99
        }))
    ));
}

#[test]
fn given_non_finite_value_when_applying_then_rejects_it() {
    // Arrange
    let svc = service();
    let tree = sample_tree();

    // Act
    let result = svc.apply_variable_change(&tree, 2, 10, f64::NAN);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::InvalidValue { variable_id: 10, .. }))
    ));
}

#[test]
fn given_expression_change_when_applying_then_recomputes_from_that_calculator() {
    // Arrange
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;

    // Act
    let propagation = svc
        .apply_expression_change(&tree, 2, Some("x + 100".into()))
        .unwrap();

    // Assert
    assert_eq!(result_of(&propagation.tree, 2), Some(103.0));
    assert_eq!(result_of(&propagation.tree, 1), Some(108.0));
}

#[test]
fn given_new_child_when_adding_then_parent_sees_it_as_zero() {
    // Arrange: parent refers to the new child by name
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;
    let tree = tree.set_expression(1, Some("A + B + C".into())).unwrap();

    // Act
    let propagation = svc.add_calculator(&tree, 1, 4, "C").unwrap();

    // Assert
    assert!(propagation.is_clean());
    assert_eq!(propagation.visited, vec![1]);
    assert_eq!(propagation.tree.root().children, vec![2, 3, 4]);
    assert_eq!(result_of(&propagation.tree, 1), Some(11.0));
}

#[test]
fn given_removed_child_when_removing_then_parent_fails_on_missing_name() {
    // Arrange
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;

    // Act
    let propagation = svc.remove_calculator(&tree, 3).unwrap();

    // Assert
    assert!(!propagation.tree.contains(3));
    assert!(propagation.error_for(1).is_some());
    assert_eq!(result_of(&propagation.tree, 1), Some(11.0));
}

#[test]
fn given_root_when_removing_then_fails() {
    // Arrange
    let svc = service();

    // Act
    let result = svc.remove_calculator(&sample_tree(), 1);

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::RootRemoval(1)))
    ));
}

#[test]
fn given_same_snapshot_when_evaluating_twice_then_outcomes_match() {
    // Arrange
    let svc = service();
    let tree = sample_tree();

    // Act
    let first = svc.evaluate_node(&tree, 1).unwrap();
    let second = svc.evaluate_node(&tree, 1).unwrap();

    // Assert
    assert_eq!(first, second);
    assert_eq!(first, Ok(Outcome::Value(5.0)));
    assert_eq!(result_of(&tree, 1), None);
}

#[test]
fn given_broken_engine_when_recalculating_then_every_expression_reports_error() {
    // Arrange
    let svc = CalculatorService::new(Arc::new(BrokenEngine));
    let tree = sample_tree();

    // Act
    let propagation = svc.recalculate(&tree).unwrap();

    // Assert
    assert_eq!(propagation.errors.len(), 2);
    assert_eq!(propagation.errors[0].message, "engine offline");
    assert_eq!(result_of(&propagation.tree, 3), Some(5.0));
}

#[test]
fn given_missing_name_when_adding_variable_then_calculator_recovers() {
    // Arrange: A = x * 2 + y fails until y exists
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;
    let tree = svc
        .apply_expression_change(&tree, 2, Some("x * 2 + y".into()))
        .unwrap()
        .tree;
    assert_eq!(result_of(&tree, 2), Some(6.0));

    // Act
    let propagation = svc
        .add_variable(&tree, 2, Variable::new(11, "y", "Y", 100.0))
        .unwrap();

    // Assert
    assert!(propagation.is_clean());
    assert_eq!(propagation.visited, vec![2, 1]);
    assert_eq!(result_of(&propagation.tree, 2), Some(106.0));
    assert_eq!(result_of(&propagation.tree, 1), Some(111.0));
}

#[test]
fn given_used_variable_when_removing_it_then_calculator_fails_with_stale_result() {
    // Arrange
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;

    // Act
    let propagation = svc.remove_variable(&tree, 2, 10).unwrap();

    // Assert
    assert!(propagation.tree.find_by_id(2).unwrap().variable(10).is_none());
    assert!(propagation.error_for(2).is_some());
    assert_eq!(result_of(&propagation.tree, 2), Some(6.0));
    assert_eq!(result_of(&propagation.tree, 1), Some(11.0));
}

#[test]
fn given_renamed_variable_when_expression_uses_new_name_then_recomputes() {
    // Arrange: A = z * 2 fails while the variable is still called x
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;
    let tree = tree
        .set_variable_value(2, 10, 4.0)
        .unwrap()
        .set_expression(2, Some("z * 2".into()))
        .unwrap();
    assert_eq!(result_of(&tree, 2), Some(6.0));

    // Act
    let propagation = svc.update_variable(&tree, 2, 10, "z", "Z").unwrap();

    // Assert
    assert!(propagation.is_clean());
    assert_eq!(result_of(&propagation.tree, 2), Some(8.0));
    assert_eq!(result_of(&propagation.tree, 1), Some(13.0));
}

#[test]
fn given_renamed_child_when_parent_uses_old_name_then_parent_fails() {
    // Arrange
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;

    // Act
    let propagation = svc.rename_calculator(&tree, 3, "Z").unwrap();

    // Assert
    assert_eq!(propagation.tree.find_by_id(3).unwrap().name, "Z");
    assert_eq!(propagation.visited, vec![1]);
    assert!(propagation.error_for(1).is_some());
    assert_eq!(result_of(&propagation.tree, 1), Some(11.0));
}

#[test]
fn given_renamed_child_when_parent_uses_new_name_then_parent_recomputes() {
    // Arrange
    let svc = service();
    let tree = svc.recalculate(&sample_tree()).unwrap().tree;
    let tree = tree.set_expression(1, Some("A * Z".into())).unwrap();

    // Act
    let propagation = svc.rename_calculator(&tree, 3, "Z").unwrap();

    // Assert
    assert!(propagation.is_clean());
    assert_eq!(result_of(&propagation.tree, 1), Some(30.0));
}

#[test]
fn given_unknown_calculator_when_renaming_then_fails() {
    // Act
    let result = service().rename_calculator(&sample_tree(), 42, "Q");

    // Assert
    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::NodeNotFound(42)))
    ));
}
