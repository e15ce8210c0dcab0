//! Ordered error and warning collection shared by every pipeline stage.

use std::fmt;

use frontend::{ParserError, Position};

use crate::namespace::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    Syntax(String),
    DuplicateDeclaration { name: String, first: Position },
    UnresolvedReference { name: String },
    TypeMismatch { context: &'static str, expected: ValueType, found: ValueType },
    InvalidOperand { operator: String, found: ValueType },
    NotAnArray { name: String },
    NotCallable { name: String },
    NotAVariable { name: String },
    VoidValue { name: String },
    ArityMismatch { name: String, expected: usize, found: usize },
    ReturnOutsideFunction,
    MissingReturnValue { expected: ValueType },
    UnexpectedReturnValue,
    MisplacedFunction { name: String },
    UnsupportedArrayKey { found: ValueType },
    InvalidLiteral { text: String },
    ShadowedDeclaration { name: String, outer: Position },
    /// Malformed parse tree; evaluation stopped.
    EvaluationFault(String),
    CodeGen(String),
}

impl DiagnosticKind {
    pub fn message(&self) -> String {
        match self {
            DiagnosticKind::Syntax(msg) => msg.clone(),
            DiagnosticKind::DuplicateDeclaration { name, first } => {
                format!("'{name}' is already declared in this scope (first declared at {first})")
            }
            DiagnosticKind::UnresolvedReference { name } => format!("'{name}' is not declared"),
            DiagnosticKind::TypeMismatch { context, expected, found } => {
                format!("type mismatch in {context}: expected {expected}, found {found}")
            }
            DiagnosticKind::InvalidOperand { operator, found } => {
                format!("operator '{operator}' cannot be applied to {found}")
            }
            DiagnosticKind::NotAnArray { name } => format!("'{name}' is not an array"),
            DiagnosticKind::NotCallable { name } => format!("'{name}' is not a function"),
            DiagnosticKind::NotAVariable { name } => format!("'{name}' cannot be used as a value"),
            DiagnosticKind::VoidValue { name } => format!("'{name}' does not return a value"),
            DiagnosticKind::ArityMismatch { name, expected, found } => {
                format!("'{name}' expects {expected} argument(s), found {found}")
            }
            DiagnosticKind::ReturnOutsideFunction => "return outside of a function".to_string(),
            DiagnosticKind::MissingReturnValue { expected } => format!("return requires a value of type {expected}"),
            DiagnosticKind::UnexpectedReturnValue => "function has no return type".to_string(),
            DiagnosticKind::MisplacedFunction { name } => {
                format!("function '{name}' must be declared at the top level")
            }
            DiagnosticKind::UnsupportedArrayKey { found } => format!("{found} cannot be used as an array key"),
            DiagnosticKind::InvalidLiteral { text } => format!("invalid literal '{text}'"),
            DiagnosticKind::ShadowedDeclaration { name, outer } => {
                format!("'{name}' shadows the declaration at {outer}")
            }
            DiagnosticKind::EvaluationFault(msg) => format!("internal error: {msg}"),
            DiagnosticKind::CodeGen(msg) => format!("code generation failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// Absent for failures that are not tied to source text.
    pub location: Option<Position>,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, location: Option<Position>) -> Self {
        Diagnostic { kind, severity: Severity::Error, location }
    }

    pub fn warning(kind: DiagnosticKind, location: Option<Position>) -> Self {
        Diagnostic { kind, severity: Severity::Warning, location }
    }

    pub fn message(&self) -> String {
        self.kind.message()
    }
}

impl From<&ParserError> for Diagnostic {
    fn from(err: &ParserError) -> Self {
        Diagnostic::error(DiagnosticKind::Syntax(err.message()), Some(err.location))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(location) => write!(f, "{}: {}", location, self.message()),
            None => write!(f, "{}", self.message()),
        }
    }
}

/// Every diagnostic of a compilation in the order it was reported.
/// Errors and warnings are views filtered by severity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn error(&mut self, kind: DiagnosticKind, location: Option<Position>) {
        self.push(Diagnostic::error(kind, location));
    }

    pub fn warn(&mut self, kind: DiagnosticKind, location: Option<Position>) {
        self.push(Diagnostic::warning(kind, location));
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.severity == severity)
    }

    pub fn has_errors(&self) -> bool {
        self.with_severity(Severity::Error).next().is_some()
    }

    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.with_severity(Severity::Error).collect()
    }

    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.with_severity(Severity::Warning).collect()
    }

    pub fn error_count(&self) -> usize {
        self.with_severity(Severity::Error).count()
    }

    /// `Errors: none` or `Errors: ` followed by one line per error.
    pub fn status_text(&self) -> String {
        let lines: Vec<String> = self.with_severity(Severity::Error).map(|e| e.to_string()).collect();
        if lines.is_empty() {
            return "Errors: none".to_string();
        }
        format!("Errors: {}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warn(
            DiagnosticKind::ShadowedDeclaration { name: "x".into(), outer: Position::new(1, 5) },
            Some(Position::new(3, 9)),
        );
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.warnings().len(), 1);
        assert_eq!(diagnostics.status_text(), "Errors: none");
    }

    #[test]
    fn status_lists_errors_in_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(DiagnosticKind::UnresolvedReference { name: "a".into() }, Some(Position::new(1, 2)));
        diagnostics.error(DiagnosticKind::CodeGen("linker missing".into()), None);
        assert_eq!(
            diagnostics.status_text(),
            "Errors: 1:2: 'a' is not declared\ncode generation failed: linker missing"
        );
    }

    #[test]
    fn entries_keep_report_order_across_severities() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error(DiagnosticKind::UnresolvedReference { name: "a".into() }, Some(Position::new(1, 1)));
        diagnostics.warn(
            DiagnosticKind::ShadowedDeclaration { name: "b".into(), outer: Position::new(1, 5) },
            Some(Position::new(2, 3)),
        );
        diagnostics.error(DiagnosticKind::UnresolvedReference { name: "c".into() }, Some(Position::new(3, 1)));
        let order: Vec<Severity> = diagnostics.entries().iter().map(|d| d.severity).collect();
        assert_eq!(order, vec![Severity::Error, Severity::Warning, Severity::Error]);
        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(diagnostics.errors()[1].location, Some(Position::new(3, 1)));
        assert_eq!(diagnostics.warnings().len(), 1);
    }
}
