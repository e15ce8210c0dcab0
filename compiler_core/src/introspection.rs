//! Read-only tree views over the artifacts of a compilation.
//!
//! Every view node carries a [`ViewKey`] that maps back to the underlying
//! token, parse node, namespace, symbol or AST node.

use frontend::{NodeId, ParseTree, Token};
use string_interner::DefaultStringInterner;

use crate::ast::{Expr, ExprRef, Program, Stmt, StmtRef, UnaryOp};
use crate::namespace::{NamespaceGraph, NamespaceId, SymbolRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKey {
    Token(usize),
    ParseNode(NodeId),
    Namespace(NamespaceId),
    Symbol(SymbolRef),
    Statement(StmtRef),
    Expression(ExprRef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewNode {
    pub text: String,
    pub key: ViewKey,
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    fn new(text: impl Into<String>, key: ViewKey, children: Vec<ViewNode>) -> Self {
        ViewNode {
            text: text.into(),
            key,
            children,
        }
    }

    /// One line per node, indented two spaces per level.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(0, &mut out);
        out
    }

    fn render_into(&self, depth: usize, out: &mut String) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.text);
        out.push('\n');
        for child in &self.children {
            child.render_into(depth + 1, out);
        }
    }

    /// First node in pre-order whose text equals `text`.
    pub fn find(&self, text: &str) -> Option<&ViewNode> {
        if self.text == text {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(text))
    }
}

/// `KIND (line:column)`, followed by ` : text` for tokens that carry text.
pub fn token_lines(tokens: &[Token]) -> Vec<ViewNode> {
    tokens
        .iter()
        .enumerate()
        .map(|(i, token)| ViewNode::new(token.to_string(), ViewKey::Token(i), vec![]))
        .collect()
}

/// Labels with `(line:column)` appended where the node has a position.
pub fn parse_tree_view(tree: &ParseTree) -> Option<ViewNode> {
    fn build(tree: &ParseTree, id: NodeId) -> Option<ViewNode> {
        let node = tree.get(id)?;
        let text = match node.position {
            Some(position) => format!("{}({})", node.label, position),
            None => node.label.clone(),
        };
        let children = node.children.iter().filter_map(|c| build(tree, *c)).collect();
        Some(ViewNode::new(text, ViewKey::ParseNode(id), children))
    }
    build(tree, tree.root()?)
}

/// Each namespace lists its own symbols first, then its nested namespaces.
pub fn namespace_view(graph: &NamespaceGraph, interner: &DefaultStringInterner) -> ViewNode {
    fn build(graph: &NamespaceGraph, interner: &DefaultStringInterner, id: NamespaceId) -> Option<ViewNode> {
        let ns = graph.get(id)?;
        let symbols = ns.symbols.iter().enumerate().map(|(index, symbol)| {
            let key = ViewKey::Symbol(SymbolRef {
                namespace: id,
                index: index as u32,
            });
            ViewNode::new(symbol.describe(interner), key, vec![])
        });
        let nested = ns.children.iter().filter_map(|c| build(graph, interner, *c));
        Some(ViewNode::new(ns.name.clone(), ViewKey::Namespace(id), symbols.chain(nested).collect()))
    }
    build(graph, interner, NamespaceId::ROOT)
        .unwrap_or_else(|| ViewNode::new("Root", ViewKey::Namespace(NamespaceId::ROOT), vec![]))
}

pub fn ast_view(program: &Program, graph: &NamespaceGraph) -> Vec<ViewNode> {
    let printer = AstPrinter { program, graph };
    program
        .statements
        .iter()
        .filter_map(|s| printer.stmt(*s))
        .collect()
}

struct AstPrinter<'a> {
    program: &'a Program,
    graph: &'a NamespaceGraph,
}

impl AstPrinter<'_> {
    fn name(&self, symbol: SymbolRef) -> &str {
        self.graph
            .symbol(symbol)
            .and_then(|s| self.program.string_interner.resolve(s.name))
            .unwrap_or("?")
    }

    fn stmt(&self, r: StmtRef) -> Option<ViewNode> {
        let exprs = |refs: &[ExprRef]| refs.iter().filter_map(|e| self.expr(*e)).collect::<Vec<_>>();
        let (text, children) = match self.program.stmt(r)? {
            Stmt::VarDecl(symbol, init) => (format!("VarDecl {}", self.name(*symbol)), exprs(init.as_slice())),
            Stmt::ArrayDecl(symbol) => (format!("ArrayDecl {}", self.name(*symbol)), vec![]),
            Stmt::Assign(symbol, value) => (format!("Assign {}", self.name(*symbol)), exprs(&[*value])),
            Stmt::IndexAssign(symbol, key, value) => {
                (format!("IndexAssign {}", self.name(*symbol)), exprs(&[*key, *value]))
            }
            Stmt::If(cond, then, otherwise) => {
                let mut children = exprs(&[*cond]);
                children.extend(self.stmt(*then));
                children.extend(otherwise.and_then(|o| self.stmt(o)));
                ("If".to_string(), children)
            }
            Stmt::While(cond, body) => {
                let mut children = exprs(&[*cond]);
                children.extend(self.stmt(*body));
                ("While".to_string(), children)
            }
            Stmt::Block(scope, body) => {
                let name = self.graph.get(*scope).map(|ns| ns.name.as_str()).unwrap_or("?");
                (format!("Block {name}"), body.iter().filter_map(|s| self.stmt(*s)).collect())
            }
            Stmt::Return(value) => ("Return".to_string(), exprs(value.as_slice())),
            Stmt::Print(value) => ("Print".to_string(), exprs(&[*value])),
            Stmt::Expression(value) => ("Expression".to_string(), exprs(&[*value])),
            Stmt::Function(decl) => (
                format!("Function {}", self.name(decl.symbol)),
                self.stmt(decl.body).into_iter().collect(),
            ),
            Stmt::Nop => ("Nop".to_string(), vec![]),
        };
        Some(ViewNode::new(text, ViewKey::Statement(r), children))
    }

    fn expr(&self, r: ExprRef) -> Option<ViewNode> {
        let sub = |refs: &[ExprRef]| refs.iter().filter_map(|e| self.expr(*e)).collect::<Vec<_>>();
        let (text, children) = match self.program.expr(r)? {
            Expr::Int64(v) => (format!("Int64 {v}"), vec![]),
            Expr::Double(v) => (format!("Double {v}"), vec![]),
            Expr::Bool(v) => (format!("Bool {v}"), vec![]),
            Expr::String(s) => (format!("String {:?}", self.program.resolve_str(*s)), vec![]),
            Expr::Identifier(symbol) => (format!("Identifier {}", self.name(*symbol)), vec![]),
            Expr::Index(symbol, key) => (format!("Index {}", self.name(*symbol)), sub(&[*key])),
            Expr::Call(symbol, args) => (format!("Call {}", self.name(*symbol)), sub(args)),
            Expr::Unary(op, operand) => {
                let symbol = match op {
                    UnaryOp::Negate => "-",
                    UnaryOp::LogicalNot => "!",
                };
                (format!("Unary {symbol}"), sub(&[*operand]))
            }
            Expr::Binary(op, lhs, rhs) => (format!("Binary {}", op.symbol()), sub(&[*lhs, *rhs])),
        };
        Some(ViewNode::new(text, ViewKey::Expression(r), children))
    }
}
