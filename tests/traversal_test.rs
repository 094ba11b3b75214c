//! Tests for indexing, scopes and traversal over calculator trees

use std::collections::HashSet;

use rstest::{fixture, rstest};

use calctree::domain::{
    build_scope, flatten, CalculatorId, CalculatorRecord, CalculatorTree, DomainError, TreeBuilder,
    TreeIndex, Variable,
};

fn record(id: CalculatorId, parent_id: Option<CalculatorId>, name: &str) -> CalculatorRecord {
    CalculatorRecord {
        id,
        project_id: 1,
        name: name.to_string(),
        parent_id,
        expression: None,
        result: None,
        note: String::new(),
        variables: Vec::new(),
    }
}

/// ```text
/// 1 R
/// ├── 2 A
/// │   ├── 4 A1
/// │   └── 5 A2
/// │       └── 7 A2a
/// └── 3 B
///     └── 6 B1
/// ```
#[fixture]
fn tree() -> CalculatorTree {
    TreeBuilder::new()
        .build_from_records(vec![
            record(1, None, "R"),
            record(2, Some(1), "A"),
            record(3, Some(1), "B"),
            record(4, Some(2), "A1"),
            record(5, Some(2), "A2"),
            record(6, Some(3), "B1"),
            record(7, Some(5), "A2a"),
        ])
        .unwrap()
}

#[rstest]
fn given_tree_when_flattening_then_visits_each_calculator_once(tree: CalculatorTree) {
    // Act
    let flat = flatten(&tree);

    // Assert
    let ids: Vec<_> = flat.iter().map(|n| n.id).collect();
    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(ids.len(), tree.len());
    assert_eq!(unique.len(), tree.len());
}

#[rstest]
fn given_tree_when_flattening_then_parents_precede_children(tree: CalculatorTree) {
    // Act
    let flat = flatten(&tree);

    // Assert
    let position = |id| flat.iter().position(|n| n.id == id).unwrap();
    for node in &flat {
        if let Some(parent_id) = node.parent_id {
            assert!(position(parent_id) < position(node.id));
        }
    }
    assert_eq!(flat[0].id, 1);
}

#[rstest]
fn given_tree_when_indexing_then_ids_follow_preorder(tree: CalculatorTree) {
    // Act
    let index = TreeIndex::build(&tree).unwrap();

    // Assert
    assert_eq!(index.ids(), &[1, 2, 4, 5, 7, 3, 6]);
    assert_eq!(index.len(), 7);
}

#[rstest]
#[case::leaf(7, vec![7, 5, 2, 1])]
#[case::inner(3, vec![3, 1])]
#[case::root(1, vec![1])]
fn given_calculator_when_listing_ancestors_then_walks_to_root(
    tree: CalculatorTree,
    #[case] id: CalculatorId,
    #[case] expected: Vec<CalculatorId>,
) {
    // Act
    let chain = TreeIndex::build(&tree).unwrap().ancestors(id).unwrap();

    // Assert
    assert_eq!(chain, expected);
}

#[rstest]
fn given_unknown_id_when_listing_ancestors_then_fails(tree: CalculatorTree) {
    // Act
    let result = TreeIndex::build(&tree).unwrap().ancestors(99);

    // Assert
    assert!(matches!(result, Err(DomainError::NodeNotFound(99))));
}

#[rstest]
fn given_deleted_subtree_when_flattening_then_its_calculators_are_gone(tree: CalculatorTree) {
    // Act
    let pruned = tree.remove_subtree(2).unwrap();

    // Assert
    let ids: Vec<_> = flatten(&pruned).iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 3, 6]);
    let index = TreeIndex::build(&pruned).unwrap();
    for gone in [2, 4, 5, 7] {
        assert!(!index.contains(gone));
        assert!(!pruned.contains(gone));
    }
    assert_eq!(tree.len(), 7, "original snapshot untouched");
}

#[rstest]
fn given_calculator_when_building_scope_then_has_variables_and_children(tree: CalculatorTree) {
    // Arrange
    let tree = tree
        .add_variable(2, Variable::new(1, "rate", "Rate", 0.5))
        .unwrap()
        .set_result(4, Some(3.0))
        .unwrap();
    let node = tree.find_by_id(2).unwrap();

    // Act
    let scope = build_scope(&tree, node).unwrap();

    // Assert
    let names: Vec<_> = scope.names().collect();
    assert_eq!(names, vec!["A1", "A2", "rate"]);
    assert_eq!(scope.get("rate"), Some(0.5));
    assert_eq!(scope.get("A1"), Some(3.0));
    assert_eq!(scope.get("A2"), Some(0.0));
    assert_eq!(scope.get("A2a"), None, "grandchildren are not in scope");
}

#[rstest]
fn given_child_named_like_variable_when_building_scope_then_child_wins(tree: CalculatorTree) {
    // Arrange
    let tree = tree
        .add_variable(3, Variable::new(1, "B1", "shadowed", 1.0))
        .unwrap()
        .set_result(6, Some(8.0))
        .unwrap();
    let node = tree.find_by_id(3).unwrap();

    // Act
    let scope = build_scope(&tree, node).unwrap();

    // Assert
    assert_eq!(scope.len(), 1);
    assert_eq!(scope.get("B1"), Some(8.0));
}
