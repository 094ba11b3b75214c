//! Evaluator adapter
//!
//! Thin contract around an [`ExpressionEngine`]: maps missing expressions to
//! "no result" and every engine failure or non-finite value to an
//! [`EvaluationError`].

use std::sync::Arc;

use tracing::{trace, warn};

use crate::application::EvaluationError;
use crate::domain::{CalculatorId, Scope};
use crate::infrastructure::traits::ExpressionEngine;

/// Successful outcome of evaluating one calculator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// Finite result of the expression
    Value(f64),
    /// The calculator has no expression; nothing to compute
    NoResult,
}

impl Outcome {
    pub fn value(&self) -> Option<f64> {
        match self {
            Outcome::Value(v) => Some(*v),
            Outcome::NoResult => None,
        }
    }
}

/// Result of evaluating one calculator.
pub type Evaluation = Result<Outcome, EvaluationError>;

pub struct EvaluatorAdapter {
    engine: Arc<dyn ExpressionEngine>,
}

impl EvaluatorAdapter {
    pub fn new(engine: Arc<dyn ExpressionEngine>) -> Self {
        Self { engine }
    }

    pub fn evaluate(
        &self,
        calculator_id: CalculatorId,
        expression: Option<&str>,
        scope: &Scope,
    ) -> Evaluation {
        let expression = match expression.map(str::trim) {
            Some(e) if !e.is_empty() => e,
            _ => return Ok(Outcome::NoResult),
        };

        match self.engine.evaluate(expression, scope) {
            Ok(value) if value.is_finite() => {
                trace!(calculator = calculator_id, "{} = {}", expression, value);
                Ok(Outcome::Value(value))
            }
            Ok(value) => {
                warn!(calculator = calculator_id, "non-finite result {} for '{}'", value, expression);
                Err(EvaluationError::new(
                    calculator_id,
                    format!("non-finite result: {}", value),
                ))
            }
            Err(e) => {
                warn!(calculator = calculator_id, "cannot evaluate '{}': {}", expression, e);
                Err(EvaluationError::new(calculator_id, e.message))
            }
        }
    }
}
