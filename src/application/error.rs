//! Application-level errors (wraps domain errors)

use thiserror::Error;

use crate::domain::{CalculatorId, DomainError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;

/// An expression that could not be evaluated against its scope.
///
/// Recorded per calculator and returned alongside the updated snapshot;
/// it never aborts propagation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid expression in calculator {calculator_id}: {message}")]
pub struct EvaluationError {
    pub calculator_id: CalculatorId,
    pub message: String,
}

impl EvaluationError {
    pub fn new(calculator_id: CalculatorId, message: impl Into<String>) -> Self {
        Self {
            calculator_id,
            message: message.into(),
        }
    }
}
