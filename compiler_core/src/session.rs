//! Pipeline orchestration: scan, parse, evaluate, optimize and generate,
//! short-circuiting once a stage reports an error.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;

use frontend::{ParseNode, ParseTree, ParserError, Token};

use crate::ast::{Expr, Program, Stmt};
use crate::backend::{CodeGenError, CodeGenerator};
use crate::cancel::CancellationToken;
use crate::debug_log;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::evaluator::evaluate;
use crate::introspection::{self, ViewKey, ViewNode};
use crate::namespace::{Namespace, NamespaceGraph, Symbol};
use crate::optimizer::{OptimizationStats, optimize};

#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Emit an executable once analysis succeeds.
    pub generate_executable: bool,
    pub output_path: PathBuf,
    pub optimize: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            generate_executable: false,
            output_path: PathBuf::from("output"),
            optimize: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed,
    Cancelled,
}

/// Everything one compilation produced. Nothing is shared between
/// compilations.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub tokens: Vec<Token>,
    pub parse_tree: ParseTree,
    pub diagnostics: Diagnostics,
    pub namespaces: Option<NamespaceGraph>,
    pub program: Option<Program>,
    pub optimization: Option<OptimizationStats>,
    pub executable: Option<PathBuf>,
    pub outcome: Outcome,
}

/// The artifact a [`ViewKey`] refers to.
#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Token(&'a Token),
    ParseNode(&'a ParseNode),
    Namespace(&'a Namespace),
    Symbol(&'a Symbol),
    Statement(&'a Stmt),
    Expression(&'a Expr),
}

impl Compilation {
    fn new(tokens: Vec<Token>, parse_tree: ParseTree) -> Self {
        Compilation {
            tokens,
            parse_tree,
            diagnostics: Diagnostics::new(),
            namespaces: None,
            program: None,
            optimization: None,
            executable: None,
            outcome: Outcome::Failed,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn status(&self) -> String {
        match self.outcome {
            Outcome::Cancelled => "Errors: cancelled".to_string(),
            _ => self.diagnostics.status_text(),
        }
    }

    pub fn token_lines(&self) -> Vec<ViewNode> {
        introspection::token_lines(&self.tokens)
    }

    pub fn parse_tree_view(&self) -> Option<ViewNode> {
        introspection::parse_tree_view(&self.parse_tree)
    }

    pub fn namespace_view(&self) -> Option<ViewNode> {
        let (graph, program) = (self.namespaces.as_ref()?, self.program.as_ref()?);
        Some(introspection::namespace_view(graph, &program.string_interner))
    }

    pub fn ast_view(&self) -> Vec<ViewNode> {
        match (&self.program, &self.namespaces) {
            (Some(program), Some(graph)) => introspection::ast_view(program, graph),
            _ => vec![],
        }
    }

    pub fn resolve_key(&self, key: ViewKey) -> Option<Resolved<'_>> {
        match key {
            ViewKey::Token(i) => self.tokens.get(i).map(Resolved::Token),
            ViewKey::ParseNode(id) => self.parse_tree.get(id).map(Resolved::ParseNode),
            ViewKey::Namespace(id) => self.namespaces.as_ref()?.get(id).map(Resolved::Namespace),
            ViewKey::Symbol(r) => self.namespaces.as_ref()?.symbol(r).map(Resolved::Symbol),
            ViewKey::Statement(r) => self.program.as_ref()?.stmt(r).map(Resolved::Statement),
            ViewKey::Expression(r) => self.program.as_ref()?.expr(r).map(Resolved::Expression),
        }
    }

    fn finish(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        debug_log!(
            "session",
            "{:?} with {} error(s), {} warning(s)",
            outcome,
            self.diagnostics.error_count(),
            self.diagnostics.warnings().len()
        );
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompilerSession {
    options: CompileOptions,
}

impl CompilerSession {
    pub fn new(options: CompileOptions) -> Self {
        CompilerSession { options }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn compile_source<B>(&self, source: &str, backend: &B, cancel: &CancellationToken) -> Compilation
    where
        B: CodeGenerator + ?Sized,
    {
        let parsed = frontend::parse(source);
        debug_log!(
            "session",
            "scanned {} token(s), {} syntax error(s)",
            parsed.tokens.len(),
            parsed.errors.len()
        );
        self.compile_tree(parsed.tree, parsed.tokens, &parsed.errors, backend, cancel)
    }

    /// Runs the back end over a tree produced elsewhere. Syntax errors are
    /// recorded first; if there are any, no later stage runs.
    pub fn compile_tree<B>(
        &self,
        tree: ParseTree,
        tokens: Vec<Token>,
        syntax_errors: &[ParserError],
        backend: &B,
        cancel: &CancellationToken,
    ) -> Compilation
    where
        B: CodeGenerator + ?Sized,
    {
        let mut compilation = Compilation::new(tokens, tree);
        for error in syntax_errors {
            compilation.diagnostics.push(Diagnostic::from(error));
        }
        if compilation.diagnostics.has_errors() {
            return compilation.finish(Outcome::Failed);
        }
        if cancel.is_cancelled() {
            return compilation.finish(Outcome::Cancelled);
        }

        let evaluation = match evaluate(&compilation.parse_tree, &mut compilation.diagnostics) {
            Ok(evaluation) => evaluation,
            Err(fault) => {
                compilation
                    .diagnostics
                    .error(DiagnosticKind::EvaluationFault(fault.to_string()), None);
                return compilation.finish(Outcome::Failed);
            }
        };
        let mut program = evaluation.program;
        compilation.namespaces = Some(evaluation.namespaces);
        if compilation.diagnostics.has_errors() {
            compilation.program = Some(program);
            return compilation.finish(Outcome::Failed);
        }

        if self.options.optimize {
            if cancel.is_cancelled() {
                compilation.program = Some(program);
                return compilation.finish(Outcome::Cancelled);
            }
            compilation.optimization = Some(optimize(&mut program));
        }
        compilation.program = Some(program);

        if !self.options.generate_executable {
            return compilation.finish(Outcome::Success);
        }
        if cancel.is_cancelled() {
            return compilation.finish(Outcome::Cancelled);
        }
        let outcome = self.generate(&mut compilation, backend, cancel);
        compilation.finish(outcome)
    }

    fn generate<B>(&self, compilation: &mut Compilation, backend: &B, cancel: &CancellationToken) -> Outcome
    where
        B: CodeGenerator + ?Sized,
    {
        let (Some(program), Some(namespaces)) = (&compilation.program, &compilation.namespaces) else {
            return Outcome::Failed;
        };
        let output = self.options.output_path.as_path();
        // A panicking backend is reported like any other generation failure.
        let result = catch_unwind(AssertUnwindSafe(|| backend.generate(program, namespaces, output, cancel)));
        let message = match result {
            Ok(Ok(())) => {
                compilation.executable = Some(self.options.output_path.clone());
                return Outcome::Success;
            }
            Ok(Err(CodeGenError::Cancelled)) => return Outcome::Cancelled,
            Ok(Err(err)) => err.to_string(),
            Err(panic) => panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "code generator panicked".to_string()),
        };
        compilation.diagnostics.error(DiagnosticKind::CodeGen(message), None);
        Outcome::Failed
    }
}
