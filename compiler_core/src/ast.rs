//! Typed AST produced by the evaluator, rewritten in place by the optimizer
//! and consumed read-only by code generation.
//!
//! Nodes live in pools and refer to each other through [`ExprRef`] and
//! [`StmtRef`]; names are already resolved to [`SymbolRef`]s.

use frontend::Position;
use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::namespace::{NamespaceGraph, NamespaceId, SymbolKind, SymbolRef, ValueType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExprRef(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StmtRef(pub u32);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExprPool(pub Vec<Expr>);

impl ExprPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, expr: Expr) -> ExprRef {
        let r = ExprRef(self.0.len() as u32);
        self.0.push(expr);
        r
    }

    pub fn get(&self, r: ExprRef) -> Option<&Expr> {
        self.0.get(r.0 as usize)
    }

    pub fn replace(&mut self, r: ExprRef, expr: Expr) {
        if let Some(slot) = self.0.get_mut(r.0 as usize) {
            *slot = expr;
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StmtPool(pub Vec<Stmt>);

impl StmtPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, stmt: Stmt) -> StmtRef {
        let r = StmtRef(self.0.len() as u32);
        self.0.push(stmt);
        r
    }

    pub fn get(&self, r: StmtRef) -> Option<&Stmt> {
        self.0.get(r.0 as usize)
    }

    pub fn replace(&mut self, r: StmtRef, stmt: Stmt) {
        if let Some(slot) = self.0.get_mut(r.0 as usize) {
            *slot = stmt;
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Source positions indexed in parallel with the expression and statement
/// pools.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationPool {
    expr: Vec<Option<Position>>,
    stmt: Vec<Option<Position>>,
}

impl LocationPool {
    pub fn expr(&self, r: ExprRef) -> Option<Position> {
        self.expr.get(r.0 as usize).copied().flatten()
    }

    pub fn stmt(&self, r: StmtRef) -> Option<Position> {
        self.stmt.get(r.0 as usize).copied().flatten()
    }

    fn set_expr(&mut self, r: ExprRef, position: Option<Position>) {
        let index = r.0 as usize;
        if self.expr.len() <= index {
            self.expr.resize(index + 1, None);
        }
        self.expr[index] = position;
    }

    fn set_stmt(&mut self, r: StmtRef, position: Option<Position>) {
        let index = r.0 as usize;
        if self.stmt.len() <= index {
            self.stmt.resize(index + 1, None);
        }
        self.stmt[index] = position;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,

    // Comparison operator
    EQ,
    NE,
    LT,
    LE,
    GT,
    GE,

    LogicalAnd,
    LogicalOr,
}

impl Operator {
    pub fn from_text(text: &str) -> Option<Operator> {
        let op = match text {
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "%" => Operator::Rem,
            "==" => Operator::EQ,
            "!=" => Operator::NE,
            "<" => Operator::LT,
            "<=" => Operator::LE,
            ">" => Operator::GT,
            ">=" => Operator::GE,
            "&&" => Operator::LogicalAnd,
            "||" => Operator::LogicalOr,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::EQ => "==",
            Operator::NE => "!=",
            Operator::LT => "<",
            Operator::LE => "<=",
            Operator::GT => ">",
            Operator::GE => ">=",
            Operator::LogicalAnd => "&&",
            Operator::LogicalOr => "||",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::EQ | Operator::NE | Operator::LT | Operator::LE | Operator::GT | Operator::GE
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Operator::LogicalAnd | Operator::LogicalOr)
    }

    /// Operand order does not affect the result.
    pub fn is_commutative(self) -> bool {
        matches!(self, Operator::Add | Operator::Mul | Operator::EQ | Operator::NE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    LogicalNot,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Int64(i64),
    Double(f64),
    Bool(bool),
    String(DefaultSymbol),
    Identifier(SymbolRef),
    Index(SymbolRef, ExprRef),
    Call(SymbolRef, Vec<ExprRef>),
    Unary(UnaryOp, ExprRef),
    Binary(Operator, ExprRef, ExprRef),
}

// Doubles compare by bit pattern so that a folded NaN still equals itself
// when two trees are compared structurally.
impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Int64(a), Expr::Int64(b)) => a == b,
            (Expr::Double(a), Expr::Double(b)) => a.to_bits() == b.to_bits(),
            (Expr::Bool(a), Expr::Bool(b)) => a == b,
            (Expr::String(a), Expr::String(b)) => a == b,
            (Expr::Identifier(a), Expr::Identifier(b)) => a == b,
            (Expr::Index(a, i), Expr::Index(b, j)) => a == b && i == j,
            (Expr::Call(a, x), Expr::Call(b, y)) => a == b && x == y,
            (Expr::Unary(a, x), Expr::Unary(b, y)) => a == b && x == y,
            (Expr::Binary(a, l1, r1), Expr::Binary(b, l2, r2)) => a == b && l1 == l2 && r1 == r2,
            _ => false,
        }
    }
}

impl Expr {
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Int64(_) | Expr::Double(_) | Expr::Bool(_) | Expr::String(_))
    }

    pub fn literal_type(&self) -> Option<ValueType> {
        match self {
            Expr::Int64(_) => Some(ValueType::Int),
            Expr::Double(_) => Some(ValueType::Double),
            Expr::Bool(_) => Some(ValueType::Bool),
            Expr::String(_) => Some(ValueType::String),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub symbol: SymbolRef,
    pub scope: NamespaceId,
    pub params: Vec<SymbolRef>,
    pub ret: Option<ValueType>,
    /// Always a `Stmt::Block` over `scope`.
    pub body: StmtRef,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl(SymbolRef, Option<ExprRef>),
    ArrayDecl(SymbolRef),
    Assign(SymbolRef, ExprRef),
    IndexAssign(SymbolRef, ExprRef, ExprRef),
    If(ExprRef, StmtRef, Option<StmtRef>),
    While(ExprRef, StmtRef),
    Block(NamespaceId, Vec<StmtRef>),
    Return(Option<ExprRef>),
    Print(ExprRef),
    Expression(ExprRef),
    Function(FunctionDecl),
    Nop,
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    /// Top-level statements and function declarations in source order.
    pub statements: Vec<StmtRef>,
    pub expression: ExprPool,
    pub statement: StmtPool,
    pub location: LocationPool,
    pub string_interner: DefaultStringInterner,
}

// Two programs are equal when their trees are; the interner is append-only
// and not part of the tree.
impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        self.statements == other.statements
            && self.expression == other.expression
            && self.statement == other.statement
            && self.location == other.location
    }
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_expr(&mut self, expr: Expr, position: Option<Position>) -> ExprRef {
        let r = self.expression.add(expr);
        self.location.set_expr(r, position);
        r
    }

    pub fn add_stmt(&mut self, stmt: Stmt, position: Option<Position>) -> StmtRef {
        let r = self.statement.add(stmt);
        self.location.set_stmt(r, position);
        r
    }

    pub fn expr(&self, r: ExprRef) -> Option<&Expr> {
        self.expression.get(r)
    }

    pub fn stmt(&self, r: StmtRef) -> Option<&Stmt> {
        self.statement.get(r)
    }

    pub fn resolve_str(&self, symbol: DefaultSymbol) -> &str {
        self.string_interner.resolve(symbol).unwrap_or("")
    }

    /// Top-level function declarations in source order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.statements.iter().filter_map(|s| match self.stmt(*s) {
            Some(Stmt::Function(decl)) => Some(decl),
            _ => None,
        })
    }

    /// Static type of an expression; `None` for calls to functions without a
    /// return type and for dangling references.
    pub fn type_of(&self, r: ExprRef, namespaces: &NamespaceGraph) -> Option<ValueType> {
        match self.expr(r)? {
            Expr::Int64(_) => Some(ValueType::Int),
            Expr::Double(_) => Some(ValueType::Double),
            Expr::Bool(_) => Some(ValueType::Bool),
            Expr::String(_) => Some(ValueType::String),
            Expr::Identifier(symbol) => match namespaces.symbol(*symbol)?.kind {
                SymbolKind::Scalar(ty) => Some(ty),
                _ => None,
            },
            Expr::Index(symbol, _) => match namespaces.symbol(*symbol)?.kind {
                SymbolKind::Array { value, .. } => Some(value),
                _ => None,
            },
            Expr::Call(symbol, _) => match &namespaces.symbol(*symbol)?.kind {
                SymbolKind::Function { ret, .. } => *ret,
                _ => None,
            },
            Expr::Unary(UnaryOp::LogicalNot, _) => Some(ValueType::Bool),
            Expr::Unary(UnaryOp::Negate, operand) => self.type_of(*operand, namespaces),
            Expr::Binary(op, lhs, _) => {
                if op.is_comparison() || op.is_logical() {
                    Some(ValueType::Bool)
                } else {
                    self.type_of(*lhs, namespaces)
                }
            }
        }
    }
}
