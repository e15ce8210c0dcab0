//! Compiler back end: semantic evaluation into a namespace graph and typed
//! AST, AST optimization, and the pipeline that drives a [`CodeGenerator`].

mod logging;

pub mod ast;
pub mod backend;
pub mod cancel;
pub mod collapse;
pub mod diagnostics;
pub mod evaluator;
pub mod introspection;
pub mod namespace;
pub mod optimizer;
pub mod session;

pub use ast::{Expr, ExprRef, FunctionDecl, Operator, Program, Stmt, StmtRef, UnaryOp};
pub use backend::{CodeGenError, CodeGenerator};
pub use cancel::CancellationToken;
pub use collapse::collapse_wrappers;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use evaluator::{Evaluation, EvaluationFault, evaluate};
pub use introspection::{ViewKey, ViewNode};
pub use namespace::{Namespace, NamespaceGraph, NamespaceId, ScopeKind, Symbol, SymbolKind, SymbolRef, ValueType};
pub use optimizer::{OptimizationStats, optimize};
pub use session::{Compilation, CompileOptions, CompilerSession, Outcome, Resolved};
