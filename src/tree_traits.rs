/*
Rendering of calculator trees for the terminal.

`termtree::Tree` is built recursively from the arena; each label shows the
calculator name, its result and, if present, its expression.
 */
use termtree::Tree;

use crate::cli::output::format_result;
use crate::domain::{CalculatorNode, CalculatorTree};

/// Label options for rendered trees.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub precision: usize,
    pub show_ids: bool,
}

pub trait TreeNodeConvert {
    fn to_tree_string(&self, options: RenderOptions) -> Tree<String>;
}

impl TreeNodeConvert for CalculatorTree {
    fn to_tree_string(&self, options: RenderOptions) -> Tree<String> {
        fn build_tree(tree: &CalculatorTree, node: &CalculatorNode, options: RenderOptions) -> Tree<String> {
            let leaves: Vec<_> = node
                .children
                .iter()
                .filter_map(|&child| tree.get(child))
                .map(|child| build_tree(tree, child, options))
                .collect();
            Tree::new(label(node, options)).with_leaves(leaves)
        }

        build_tree(self, self.root(), options)
    }
}

/// `name [id] = result  (expression)`
pub fn label(node: &CalculatorNode, options: RenderOptions) -> String {
    let mut text = node.name.clone();
    if options.show_ids {
        text.push_str(&format!(" [{}]", node.id));
    }
    text.push_str(&format!(" = {}", format_result(node.result, options.precision)));
    if let Some(expression) = node.expression.as_deref().filter(|e| !e.trim().is_empty()) {
        text.push_str(&format!("  ({})", expression));
    }
    text
}
