//! Boundary between the pipeline and native code emission.

use std::path::Path;

use thiserror::Error;

use crate::ast::Program;
use crate::cancel::CancellationToken;
use crate::namespace::{NamespaceGraph, SymbolRef};

#[derive(Debug, Error)]
pub enum CodeGenError {
    #[error("unresolved symbol {0:?} reached code generation")]
    UnresolvedSymbol(SymbolRef),
    #[error("internal code generator fault: {0}")]
    Internal(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("linking failed: {0}")]
    Link(String),
    #[error("cancelled before the executable was written")]
    Cancelled,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodeGenError {
    /// Faults that indicate a bug in the generator rather than in the
    /// environment.
    pub fn is_internal(&self) -> bool {
        matches!(self, CodeGenError::UnresolvedSymbol(_) | CodeGenError::Internal(_))
    }
}

/// Emits a self-contained executable for an evaluated, optimized program.
///
/// Implementations never mutate the program and must leave `output`
/// untouched when they fail or observe cancellation.
pub trait CodeGenerator {
    fn generate(
        &self,
        program: &Program,
        namespaces: &NamespaceGraph,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), CodeGenError>;
}
