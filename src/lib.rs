//! calctree: a tree of calculators whose results flow upwards.
//!
//! Each calculator holds named variables and an arithmetic expression over
//! those variables and the results of its direct children. Changing a
//! variable recomputes the calculator and every ancestor up to the root.
//!
//! Layers, inner to outer:
//! - [`domain`]: tree snapshots, indexing, scopes, traversal
//! - [`application`]: evaluation and change propagation
//! - [`infrastructure`]: expression engine, snapshot files, wiring
//! - [`cli`]: command-line host

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod tree_traits;
pub mod util;

pub use application::{CalculatorService, EvaluationError, Outcome, Propagation};
pub use domain::{flatten, CalculatorNode, CalculatorTree, DomainError, TreeBuilder, TreeIndex};
