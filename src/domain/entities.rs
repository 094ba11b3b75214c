//! Domain entities: core data structures

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, TreeResult};

pub type CalculatorId = i64;
pub type VariableId = i64;
pub type ProjectId = i64;

/// Named numeric input owned by exactly one calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(rename = "variable_id")]
    pub id: VariableId,
    /// Scope key, must satisfy [`is_identifier`]
    #[serde(rename = "variable_name")]
    pub name: String,
    /// Free text shown to users
    #[serde(rename = "variable_display", default)]
    pub display_name: String,
    #[serde(rename = "variable_value")]
    pub value: f64,
}

impl Variable {
    pub fn new(
        id: VariableId,
        name: impl Into<String>,
        display_name: impl Into<String>,
        value: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: display_name.into(),
            value,
        }
    }

    /// Check the name is usable as a scope key.
    pub fn validate(&self) -> TreeResult<()> {
        if !is_identifier(&self.name) {
            return Err(DomainError::InvalidIdentifier(self.name.clone()));
        }
        if !self.value.is_finite() {
            return Err(DomainError::InvalidValue {
                variable_id: self.id,
                value: self.value,
            });
        }
        Ok(())
    }
}

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

/// Returns true if `name` can be used as a key in an evaluation scope.
///
/// Letters, digits and underscore; must not start with a digit.
pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// One calculator row as a store returns it: flat, parent referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorRecord {
    #[serde(rename = "calculator_id")]
    pub id: CalculatorId,
    pub project_id: ProjectId,
    #[serde(rename = "calculator_name")]
    pub name: String,
    #[serde(rename = "parent_calculator_id", default)]
    pub parent_id: Option<CalculatorId>,
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub result: Option<f64>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub variables: Vec<Variable>,
}

/// Nested hierarchy view: a record with its children embedded.
///
/// This is the shape of a project snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorView {
    #[serde(flatten)]
    pub record: CalculatorRecord,
    #[serde(default)]
    pub children: Vec<CalculatorView>,
}
