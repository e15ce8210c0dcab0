use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use compiler_core::{
    CancellationToken, CodeGenError, CodeGenerator, CompileOptions, CompilerSession, DiagnosticKind,
    NamespaceGraph, Outcome, Program, Resolved, ViewKey,
};
use frontend::{Position, TokenType, rules};
use rayon::prelude::*;
use tempfile::TempDir;

/// Writes a summary of the program instead of machine code and counts how
/// often it was asked to.
#[derive(Default)]
struct SummaryBackend {
    calls: AtomicUsize,
}

impl CodeGenerator for SummaryBackend {
    fn generate(
        &self,
        program: &Program,
        _namespaces: &NamespaceGraph,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), CodeGenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(CodeGenError::Cancelled);
        }
        std::fs::write(output, format!("{} statements", program.statements.len()))?;
        Ok(())
    }
}

struct FailingBackend;

impl CodeGenerator for FailingBackend {
    fn generate(&self, _: &Program, _: &NamespaceGraph, _: &Path, _: &CancellationToken) -> Result<(), CodeGenError> {
        Err(CodeGenError::Link("cc: not found".to_string()))
    }
}

struct PanickingBackend;

impl CodeGenerator for PanickingBackend {
    fn generate(&self, _: &Program, _: &NamespaceGraph, _: &Path, _: &CancellationToken) -> Result<(), CodeGenError> {
        panic!("register allocation exploded")
    }
}

/// Cancels the run from inside generation, as a UI thread would.
struct CancellingBackend {
    token: CancellationToken,
}

impl CodeGenerator for CancellingBackend {
    fn generate(&self, _: &Program, _: &NamespaceGraph, _: &Path, cancel: &CancellationToken) -> Result<(), CodeGenError> {
        self.token.cancel();
        if cancel.is_cancelled() {
            return Err(CodeGenError::Cancelled);
        }
        Ok(())
    }
}

fn generating_session(dir: &TempDir) -> CompilerSession {
    CompilerSession::new(CompileOptions {
        generate_executable: true,
        output_path: dir.path().join("program"),
        optimize: true,
    })
}

#[test]
fn successful_compile_invokes_backend_once() {
    let dir = TempDir::new().unwrap();
    let backend = SummaryBackend::default();
    let compilation = generating_session(&dir).compile_source(
        "int x = 2 + 3 * 4;\nprint(x);",
        &backend,
        &CancellationToken::new(),
    );
    assert_eq!(compilation.outcome, Outcome::Success, "{}", compilation.status());
    assert_eq!(compilation.status(), "Errors: none");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    let output = compilation.executable.as_ref().unwrap();
    assert_eq!(std::fs::read_to_string(output).unwrap(), "2 statements");
}

#[test]
fn unresolved_reference_blocks_generation() {
    let dir = TempDir::new().unwrap();
    let backend = SummaryBackend::default();
    let compilation = generating_session(&dir).compile_source("print(y);", &backend, &CancellationToken::new());
    assert_eq!(compilation.outcome, Outcome::Failed);
    assert_eq!(compilation.diagnostics.error_count(), 1);
    assert_eq!(
        compilation.diagnostics.errors()[0].kind,
        DiagnosticKind::UnresolvedReference { name: "y".into() }
    );
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    assert!(!dir.path().join("program").exists());
    assert!(compilation.namespaces.is_some());
}

#[test]
fn syntax_errors_skip_every_later_stage() {
    let backend = SummaryBackend::default();
    let session = CompilerSession::new(CompileOptions::default());
    let compilation = session.compile_source("int = ;\nprint(undeclared);", &backend, &CancellationToken::new());
    assert_eq!(compilation.outcome, Outcome::Failed);
    assert!(compilation.namespaces.is_none());
    assert!(compilation.program.is_none());
    assert!(
        compilation
            .diagnostics
            .errors()
            .iter()
            .all(|d| matches!(d.kind, DiagnosticKind::Syntax(_)))
    );
    assert!(compilation.status().starts_with("Errors: 1:5:"));
}

#[test]
fn backend_failure_becomes_diagnostic() {
    let dir = TempDir::new().unwrap();
    let compilation = generating_session(&dir).compile_source("print(1);", &FailingBackend, &CancellationToken::new());
    assert_eq!(compilation.outcome, Outcome::Failed);
    assert_eq!(
        compilation.diagnostics.errors()[0].kind,
        DiagnosticKind::CodeGen("linking failed: cc: not found".into())
    );
    assert!(compilation.executable.is_none());
}

#[test]
fn backend_panic_becomes_diagnostic() {
    let dir = TempDir::new().unwrap();
    let compilation = generating_session(&dir).compile_source("print(1);", &PanickingBackend, &CancellationToken::new());
    assert_eq!(compilation.outcome, Outcome::Failed);
    assert_eq!(
        compilation.diagnostics.errors()[0].kind,
        DiagnosticKind::CodeGen("register allocation exploded".into())
    );
}

#[test]
fn cancelled_before_start_does_nothing() {
    let backend = SummaryBackend::default();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let dir = TempDir::new().unwrap();
    let compilation = generating_session(&dir).compile_source("print(1);", &backend, &cancel);
    assert_eq!(compilation.outcome, Outcome::Cancelled);
    assert!(compilation.namespaces.is_none());
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn cancellation_during_generation_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let token = CancellationToken::new();
    let backend = CancellingBackend { token: token.clone() };
    let compilation = generating_session(&dir).compile_source("print(1);", &backend, &token);
    assert_eq!(compilation.outcome, Outcome::Cancelled);
    assert!(compilation.executable.is_none());
    assert!(!dir.path().join("program").exists());
}

#[test]
fn namespace_view_lists_root_symbols() {
    let session = CompilerSession::default();
    let compilation = session.compile_source("int x;\nint[bool] y;", &SummaryBackend::default(), &CancellationToken::new());
    let view = compilation.namespace_view().unwrap();
    assert_eq!(view.text, "Root");
    let entries: Vec<&str> = view.children.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(entries, vec!["Scalar : x", "Int[Bool] : y"]);
    match compilation.resolve_key(view.children[1].key) {
        Some(Resolved::Symbol(symbol)) => assert_eq!(symbol.position, Position::new(2, 11)),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn views_render_tokens_tree_and_ast() {
    let session = CompilerSession::default();
    let compilation = session.compile_source("int x = 2 + 3 * 4;", &SummaryBackend::default(), &CancellationToken::new());
    let tokens: Vec<String> = compilation.token_lines().into_iter().map(|t| t.text).collect();
    assert_eq!(tokens[0], "TYPE (1:1)");
    assert_eq!(tokens[1], "IDENTIFIER (1:5) : x");
    assert_eq!(tokens[3], "INTEGER (1:9) : 2");
    assert_eq!(tokens.last().unwrap(), "EOF (1:19)");

    let tree = compilation.parse_tree_view().unwrap();
    assert_eq!(tree.text, rules::START);
    let leaf = tree.find("x(1:5)").unwrap();
    match compilation.resolve_key(leaf.key) {
        Some(Resolved::ParseNode(node)) => assert_eq!(node.token, Some(TokenType::Identifier)),
        other => panic!("unexpected {other:?}"),
    }

    let ast = compilation.ast_view();
    assert_eq!(ast[0].render(), "VarDecl x\n  Int64 14\n");
    assert!(matches!(compilation.resolve_key(ast[0].key), Some(Resolved::Statement(_))));
    assert!(compilation.resolve_key(ViewKey::Token(999)).is_none());
}

#[test]
fn unoptimized_compile_keeps_arithmetic() {
    let session = CompilerSession::new(CompileOptions {
        optimize: false,
        ..CompileOptions::default()
    });
    let compilation = session.compile_source("int x = 2 + 3;", &SummaryBackend::default(), &CancellationToken::new());
    assert!(compilation.optimization.is_none());
    assert_eq!(compilation.ast_view()[0].render(), "VarDecl x\n  Binary +\n    Int64 2\n    Int64 3\n");
}

#[test]
fn external_tree_with_syntax_errors_is_not_evaluated() {
    let parsed = frontend::parse("print(1);");
    let errors = frontend::parse("int = 1;").errors;
    let session = CompilerSession::default();
    let compilation = session.compile_tree(
        parsed.tree,
        parsed.tokens,
        &errors,
        &SummaryBackend::default(),
        &CancellationToken::new(),
    );
    assert_eq!(compilation.outcome, Outcome::Failed);
    assert!(compilation.namespaces.is_none());
}

#[test]
fn parallel_compilations_are_independent() {
    let dir = TempDir::new().unwrap();
    let backend = SummaryBackend::default();
    let outcomes: Vec<(usize, Outcome, usize)> = (0..16usize)
        .into_par_iter()
        .map(|i| {
            let session = CompilerSession::new(CompileOptions {
                generate_executable: true,
                output_path: dir.path().join(format!("program-{i}")),
                optimize: true,
            });
            let source = if i % 2 == 0 {
                format!("int v{i} = {i};\nprint(v{i});")
            } else {
                format!("print(missing{i});")
            };
            let compilation = session.compile_source(&source, &backend, &CancellationToken::new());
            let symbols = compilation.namespaces.as_ref().map(|g| g.root().symbols.len()).unwrap_or(0);
            (i, compilation.outcome, symbols)
        })
        .collect();
    for (i, outcome, symbols) in outcomes {
        if i % 2 == 0 {
            assert_eq!(outcome, Outcome::Success);
            assert_eq!(symbols, 1);
            assert!(dir.path().join(format!("program-{i}")).exists());
        } else {
            assert_eq!(outcome, Outcome::Failed);
            assert_eq!(symbols, 0);
        }
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 8);
}
