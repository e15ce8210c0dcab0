//! Single-pass semantic evaluation.
//!
//! The evaluator walks the wrapper-collapsed parse tree once, depth first. It
//! opens a namespace for every function body and block, declares symbols as
//! it meets them, resolves references innermost-first and builds the typed
//! AST at the same time. Semantic violations are collected as diagnostics;
//! only a malformed tree stops the walk with an [`EvaluationFault`].

mod expression;
mod statement;

use frontend::{NodeId, ParseNode, ParseTree, Position, TokenType, TreeShapeError, rules};
use string_interner::DefaultSymbol;
use thiserror::Error;

use crate::ast::{ExprRef, Program};
use crate::collapse::collapse_wrappers;
use crate::debug_log;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::namespace::{DeclareError, NamespaceGraph, NamespaceId, ScopeKind, Symbol, SymbolKind, SymbolRef, ValueType};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationFault {
    #[error("malformed parse tree: {0}")]
    MalformedTree(TreeShapeError),
    #[error("unexpected node '{label}' at {location}")]
    UnexpectedNode { label: String, location: String },
    #[error("'{label}' node is missing its {what}")]
    MissingChild { label: String, what: &'static str },
    #[error("declaration into closed namespace {0:?}")]
    ClosedNamespace(NamespaceId),
}

/// Output of a successful walk: the populated namespace graph and the raw
/// AST whose references point into it.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub namespaces: NamespaceGraph,
    pub program: Program,
}

pub fn evaluate(tree: &ParseTree, diagnostics: &mut Diagnostics) -> Result<Evaluation, EvaluationFault> {
    tree.validate().map_err(EvaluationFault::MalformedTree)?;
    let collapsed = collapse_wrappers(tree);
    let mut evaluator = Evaluator::new(&collapsed, diagnostics);
    evaluator.run()?;
    debug_log!(
        "evaluate",
        "{} namespaces, {} top-level statements",
        evaluator.namespaces.len(),
        evaluator.program.statements.len()
    );
    Ok(Evaluation {
        namespaces: evaluator.namespaces,
        program: evaluator.program,
    })
}

/// An evaluated expression with its static type. `ty` is `None` when the
/// expression has no value or an error was already reported for it, which
/// keeps one mistake from producing a cascade of diagnostics.
#[derive(Debug, Clone, Copy)]
struct Typed {
    expr: ExprRef,
    ty: Option<ValueType>,
}

/// Token leaf with its guaranteed source position.
#[derive(Debug, Clone, Copy)]
struct Leaf<'a> {
    text: &'a str,
    position: Position,
}

#[derive(Debug, Clone, Copy)]
struct FunctionContext {
    ret: Option<ValueType>,
}

struct Evaluator<'a> {
    tree: &'a ParseTree,
    diagnostics: &'a mut Diagnostics,
    namespaces: NamespaceGraph,
    program: Program,
    current: NamespaceId,
    function: Option<FunctionContext>,
}

impl<'a> Evaluator<'a> {
    fn new(tree: &'a ParseTree, diagnostics: &'a mut Diagnostics) -> Self {
        Evaluator {
            tree,
            diagnostics,
            namespaces: NamespaceGraph::new(),
            program: Program::new(),
            current: NamespaceId::ROOT,
            function: None,
        }
    }

    fn run(&mut self) -> Result<(), EvaluationFault> {
        let root = self
            .tree
            .root()
            .ok_or(EvaluationFault::MalformedTree(TreeShapeError::EmptyTree))?;
        let start = self.node(root)?;
        if start.label != rules::START {
            return Err(self.unexpected(root));
        }
        for child in &start.children {
            let node = self.node(*child)?;
            if node.is_token(TokenType::EOF) {
                continue;
            }
            let stmt = if node.label == rules::FUNC_DECL {
                self.function_decl(*child)?
            } else {
                self.statement(*child)?
            };
            self.program.statements.push(stmt);
        }
        self.namespaces.seal(NamespaceId::ROOT);
        Ok(())
    }

    fn node(&self, id: NodeId) -> Result<&'a ParseNode, EvaluationFault> {
        let tree: &'a ParseTree = self.tree;
        tree.get(id).ok_or(EvaluationFault::MalformedTree(TreeShapeError::MissingNode(id)))
    }

    fn child(&self, node: &ParseNode, index: usize, what: &'static str) -> Result<NodeId, EvaluationFault> {
        node.children.get(index).copied().ok_or_else(|| EvaluationFault::MissingChild {
            label: node.label.clone(),
            what,
        })
    }

    /// The child at `index` must be a token leaf of the given kind.
    fn leaf(&self, node: &ParseNode, index: usize, kind: TokenType, what: &'static str) -> Result<Leaf<'a>, EvaluationFault> {
        let id = self.child(node, index, what)?;
        let leaf = self.node(id)?;
        match leaf.position {
            Some(position) if leaf.is_token(kind) => Ok(Leaf {
                text: &leaf.label,
                position,
            }),
            _ => Err(self.unexpected(id)),
        }
    }

    fn type_leaf(&self, node: &ParseNode, index: usize) -> Result<(ValueType, Position), EvaluationFault> {
        let leaf = self.leaf(node, index, TokenType::Type, "type")?;
        let ty = ValueType::from_type_name(leaf.text).ok_or_else(|| EvaluationFault::UnexpectedNode {
            label: leaf.text.to_string(),
            location: leaf.position.to_string(),
        })?;
        Ok((ty, leaf.position))
    }

    fn position(&self, id: NodeId) -> Option<Position> {
        self.tree.leftmost_position(id)
    }

    fn unexpected(&self, id: NodeId) -> EvaluationFault {
        let label = self.tree.get(id).map(|n| n.label.clone()).unwrap_or_default();
        let location = self
            .position(id)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown position".to_string());
        EvaluationFault::UnexpectedNode { label, location }
    }

    fn intern(&mut self, text: &str) -> DefaultSymbol {
        self.program.string_interner.get_or_intern(text)
    }

    fn error(&mut self, kind: DiagnosticKind, position: Option<Position>) {
        self.diagnostics.error(kind, position);
    }

    /// Declares `name` in the current namespace. A duplicate is reported and
    /// resolves to the first declaration.
    fn declare(&mut self, name: Leaf<'_>, kind: SymbolKind) -> Result<SymbolRef, EvaluationFault> {
        let interned = self.intern(name.text);
        let symbol = Symbol {
            name: interned,
            kind,
            position: name.position,
        };
        match self.namespaces.declare(self.current, symbol) {
            Ok(declared) => {
                let outer = self
                    .namespaces
                    .parent(self.current)
                    .and_then(|parent| self.namespaces.resolve(parent, interned))
                    .and_then(|r| self.namespaces.symbol(r))
                    .map(|s| s.position);
                if let Some(outer) = outer {
                    self.diagnostics.warn(
                        DiagnosticKind::ShadowedDeclaration {
                            name: name.text.to_string(),
                            outer,
                        },
                        Some(name.position),
                    );
                }
                Ok(declared)
            }
            Err(DeclareError::Duplicate(first)) => {
                let first_position = self
                    .namespaces
                    .symbol(first)
                    .map(|s| s.position)
                    .unwrap_or(name.position);
                self.error(
                    DiagnosticKind::DuplicateDeclaration {
                        name: name.text.to_string(),
                        first: first_position,
                    },
                    Some(name.position),
                );
                Ok(first)
            }
            Err(DeclareError::Sealed(ns)) | Err(DeclareError::UnknownNamespace(ns)) => {
                Err(EvaluationFault::ClosedNamespace(ns))
            }
        }
    }

    /// Innermost-first lookup from the current namespace. Unresolved names
    /// are reported here.
    fn resolve(&mut self, name: Leaf<'_>) -> Option<(SymbolRef, SymbolKind)> {
        let interned = self.intern(name.text);
        let found = self
            .namespaces
            .resolve(self.current, interned)
            .and_then(|r| self.namespaces.symbol(r).map(|s| (r, s.kind.clone())));
        if found.is_none() {
            self.error(
                DiagnosticKind::UnresolvedReference {
                    name: name.text.to_string(),
                },
                Some(name.position),
            );
        }
        found
    }

    /// Runs `body` inside a fresh child namespace, which is closed again
    /// before the parent becomes current.
    fn with_scope<T>(
        &mut self,
        name: &str,
        kind: ScopeKind,
        position: Option<Position>,
        body: impl FnOnce(&mut Self) -> Result<T, EvaluationFault>,
    ) -> Result<(NamespaceId, T), EvaluationFault> {
        let parent = self.current;
        let scope = self.namespaces.open_child(parent, name, kind, position);
        self.current = scope;
        let result = body(self);
        self.namespaces.seal(scope);
        self.current = parent;
        Ok((scope, result?))
    }

    fn expect_type(&mut self, value: Typed, expected: ValueType, context: &'static str, position: Option<Position>) {
        if let Some(found) = value.ty
            && found != expected
        {
            self.error(
                DiagnosticKind::TypeMismatch {
                    context,
                    expected,
                    found,
                },
                position,
            );
        }
    }
}

#[cfg(test)]
mod tests;
