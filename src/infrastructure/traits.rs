//! I/O and engine boundary traits for testability
//!
//! These traits abstract external collaborators, allowing services
//! to be tested with fake implementations.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use thiserror::Error;

use crate::domain::Scope;

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()>;
}

/// Failure reported by an expression engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External arithmetic evaluator: expression plus flat scope in, number out.
pub trait ExpressionEngine: Send + Sync {
    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<f64, EngineError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}

/// Floating point evaluator backed by `fasteval`.
///
/// Supports `+ - * / % ^`, parentheses, comparisons and the built-in
/// functions of `fasteval` (`min`, `max`, `abs`, `round`, ...).
#[derive(Debug, Default)]
pub struct FastevalEngine;

impl ExpressionEngine for FastevalEngine {
    fn evaluate(&self, expression: &str, scope: &Scope) -> Result<f64, EngineError> {
        let mut namespace: BTreeMap<String, f64> = scope.as_map().clone();
        fasteval::ez_eval(expression, &mut namespace).map_err(|e| EngineError::new(format!("{:?}", e)))
    }
}
