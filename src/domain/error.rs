//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::{CalculatorId, ProjectId, VariableId};

/// Domain errors represent violations of the calculator tree invariants
/// or references to ids that are not part of the snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("calculator not found: {0}")]
    NodeNotFound(CalculatorId),

    #[error("variable {variable_id} not found on calculator {calculator_id}")]
    VariableNotFound {
        calculator_id: CalculatorId,
        variable_id: VariableId,
    },

    #[error("calculator already exists: {0}")]
    DuplicateNode(CalculatorId),

    #[error("variable name '{name}' already used on calculator {calculator_id}")]
    DuplicateVariable {
        calculator_id: CalculatorId,
        name: String,
    },

    #[error("variable id {variable_id} already used on calculator {calculator_id}")]
    DuplicateVariableId {
        calculator_id: CalculatorId,
        variable_id: VariableId,
    },

    #[error("invalid variable name: '{0}' (letters, digits and underscore only)")]
    InvalidIdentifier(String),

    #[error("invalid value for variable {variable_id}: {value}")]
    InvalidValue { variable_id: VariableId, value: f64 },

    #[error("no root calculator found")]
    MissingRoot,

    #[error("multiple root calculators: {0} and {1}")]
    MultipleRoots(CalculatorId, CalculatorId),

    #[error("cycle detected in hierarchy at calculator: {0}")]
    CycleDetected(CalculatorId),

    #[error("calculator {calculator_id} is listed under {listed_under} but names {parent_id:?} as parent")]
    ParentMismatch {
        calculator_id: CalculatorId,
        listed_under: CalculatorId,
        parent_id: Option<CalculatorId>,
    },

    #[error("calculator {calculator_id} belongs to project {found}, expected {expected}")]
    ProjectMismatch {
        calculator_id: CalculatorId,
        expected: ProjectId,
        found: ProjectId,
    },

    #[error("cannot remove root calculator: {0}")]
    RootRemoval(CalculatorId),
}

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, DomainError>;
