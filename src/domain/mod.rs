//! Domain layer: calculator tree, indexing, scopes and traversal
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod index;
pub mod scope;
pub mod traversal;

pub use arena::{CalculatorNode, CalculatorTree, NodeLookup};
pub use builder::TreeBuilder;
pub use entities::*;
pub use error::{DomainError, TreeResult};
pub use index::TreeIndex;
pub use scope::{build_scope, Scope, UNEVALUATED_CHILD_VALUE};
pub use traversal::{flatten, flatten_with_depth, BreadthFirst};
