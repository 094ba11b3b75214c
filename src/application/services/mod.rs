//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on boundary traits (ExpressionEngine, FileSystem)
//! but are themselves concrete structs, not traits.

mod calculator;
mod evaluation;

pub use calculator::{CalculatorService, Propagation};
pub use evaluation::{Evaluation, EvaluatorAdapter, Outcome};
