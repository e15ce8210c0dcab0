//! In-place AST rewriting: constant folding, algebraic simplification,
//! canonical operand order and dead-code removal.
//!
//! Every rewrite preserves the observable behaviour of the program under the
//! runtime semantics of the generated code: integers wrap, integer division
//! or remainder that would trap is left for run time, doubles follow
//! IEEE-754. A second run over an optimized program changes nothing.

use crate::ast::{Expr, ExprRef, Operator, Program, Stmt, StmtRef, UnaryOp};
use crate::debug_log;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizationStats {
    pub folded: usize,
    pub simplified: usize,
    pub canonicalized: usize,
    pub dead_branches: usize,
    pub pruned: usize,
}

impl OptimizationStats {
    pub fn total(&self) -> usize {
        self.folded + self.simplified + self.canonicalized + self.dead_branches + self.pruned
    }
}

pub fn optimize(program: &mut Program) -> OptimizationStats {
    let mut optimizer = Optimizer {
        program,
        stats: OptimizationStats::default(),
    };
    let top_level = optimizer.program.statements.clone();
    for stmt in &top_level {
        optimizer.stmt(*stmt);
    }
    let before = top_level.len();
    let kept: Vec<StmtRef> = top_level
        .into_iter()
        .filter(|s| !matches!(optimizer.program.stmt(*s), Some(Stmt::Nop)))
        .collect();
    optimizer.stats.pruned += before - kept.len();
    optimizer.program.statements = kept;
    let stats = optimizer.stats;
    debug_log!("optimize", "{:?}", stats);
    stats
}

/// Folds a unary operator applied to a literal.
pub fn fold_unary(op: UnaryOp, operand: &Expr) -> Option<Expr> {
    match (op, operand) {
        (UnaryOp::Negate, Expr::Int64(v)) => Some(Expr::Int64(v.wrapping_neg())),
        (UnaryOp::Negate, Expr::Double(v)) => Some(Expr::Double(-v)),
        (UnaryOp::LogicalNot, Expr::Bool(v)) => Some(Expr::Bool(!v)),
        _ => None,
    }
}

/// Folds a binary operator applied to two literals. Returns `None` for
/// operations that trap at run time or whose operand types do not match.
pub fn fold_binary(op: Operator, lhs: &Expr, rhs: &Expr) -> Option<Expr> {
    match (lhs, rhs) {
        (Expr::Int64(a), Expr::Int64(b)) => fold_int(op, *a, *b),
        (Expr::Double(a), Expr::Double(b)) => fold_double(op, *a, *b),
        (Expr::Bool(a), Expr::Bool(b)) => {
            let value = match op {
                Operator::EQ => a == b,
                Operator::NE => a != b,
                Operator::LogicalAnd => *a && *b,
                Operator::LogicalOr => *a || *b,
                _ => return None,
            };
            Some(Expr::Bool(value))
        }
        _ => None,
    }
}

fn fold_int(op: Operator, a: i64, b: i64) -> Option<Expr> {
    let value = match op {
        Operator::Add => a.wrapping_add(b),
        Operator::Sub => a.wrapping_sub(b),
        Operator::Mul => a.wrapping_mul(b),
        Operator::Div => a.checked_div(b)?,
        Operator::Rem => a.checked_rem(b)?,
        Operator::EQ => return Some(Expr::Bool(a == b)),
        Operator::NE => return Some(Expr::Bool(a != b)),
        Operator::LT => return Some(Expr::Bool(a < b)),
        Operator::LE => return Some(Expr::Bool(a <= b)),
        Operator::GT => return Some(Expr::Bool(a > b)),
        Operator::GE => return Some(Expr::Bool(a >= b)),
        Operator::LogicalAnd | Operator::LogicalOr => return None,
    };
    Some(Expr::Int64(value))
}

fn fold_double(op: Operator, a: f64, b: f64) -> Option<Expr> {
    let value = match op {
        Operator::Add => a + b,
        Operator::Sub => a - b,
        Operator::Mul => a * b,
        Operator::Div => a / b,
        Operator::EQ => return Some(Expr::Bool(a == b)),
        Operator::NE => return Some(Expr::Bool(a != b)),
        Operator::LT => return Some(Expr::Bool(a < b)),
        Operator::LE => return Some(Expr::Bool(a <= b)),
        Operator::GT => return Some(Expr::Bool(a > b)),
        Operator::GE => return Some(Expr::Bool(a >= b)),
        Operator::Rem | Operator::LogicalAnd | Operator::LogicalOr => return None,
    };
    Some(Expr::Double(value))
}

struct Optimizer<'p> {
    program: &'p mut Program,
    stats: OptimizationStats,
}

impl Optimizer<'_> {
    fn get(&self, r: ExprRef) -> Option<Expr> {
        self.program.expr(r).cloned()
    }

    /// Optimizes the operands, then rewrites the node itself until it is
    /// stable.
    fn expr(&mut self, r: ExprRef) {
        match self.get(r) {
            Some(Expr::Unary(_, operand)) => self.expr(operand),
            Some(Expr::Binary(_, lhs, rhs)) => {
                self.expr(lhs);
                self.expr(rhs);
            }
            Some(Expr::Index(_, key)) => self.expr(key),
            Some(Expr::Call(_, args)) => {
                for arg in args {
                    self.expr(arg);
                }
            }
            _ => return,
        }
        while self.rewrite(r) {}
    }

    fn rewrite(&mut self, r: ExprRef) -> bool {
        match self.get(r) {
            Some(Expr::Unary(op, operand)) => {
                let folded = self.get(operand).and_then(|v| fold_unary(op, &v));
                match folded {
                    Some(value) => {
                        self.program.expression.replace(r, value);
                        self.stats.folded += 1;
                        true
                    }
                    None => false,
                }
            }
            Some(Expr::Binary(op, lhs, rhs)) => self.rewrite_binary(r, op, lhs, rhs),
            _ => false,
        }
    }

    fn rewrite_binary(&mut self, r: ExprRef, op: Operator, lhs: ExprRef, rhs: ExprRef) -> bool {
        let (Some(left), Some(right)) = (self.get(lhs), self.get(rhs)) else {
            return false;
        };
        if let Some(value) = fold_binary(op, &left, &right) {
            self.program.expression.replace(r, value);
            self.stats.folded += 1;
            return true;
        }

        // Short circuit on a literal left operand; the right operand is
        // only dropped where it would not have been evaluated.
        let short = match (op, &left) {
            (Operator::LogicalAnd, Expr::Bool(true)) | (Operator::LogicalOr, Expr::Bool(false)) => Some(right.clone()),
            (Operator::LogicalAnd, Expr::Bool(false)) | (Operator::LogicalOr, Expr::Bool(true)) => Some(left.clone()),
            _ => None,
        };
        if let Some(value) = short {
            self.program.expression.replace(r, value);
            self.stats.folded += 1;
            return true;
        }

        if op.is_commutative() && left.is_literal() && !right.is_literal() {
            self.program.expression.replace(r, Expr::Binary(op, rhs, lhs));
            self.stats.canonicalized += 1;
            return true;
        }

        let identity = matches!(
            (op, &right),
            (Operator::Add | Operator::Sub, Expr::Int64(0)) | (Operator::Mul | Operator::Div, Expr::Int64(1))
        );
        if identity {
            self.program.expression.replace(r, left);
            self.stats.simplified += 1;
            return true;
        }

        // (x op c1) op c2  =>  x op (c1 op c2) for wrapping + and *
        if let (Operator::Add | Operator::Mul, Expr::Binary(inner_op, inner_lhs, inner_rhs), Expr::Int64(c2)) =
            (op, &left, &right)
            && *inner_op == op
            && let Some(Expr::Int64(c1)) = self.get(*inner_rhs)
            && let Some(Expr::Int64(combined)) = fold_int(op, c1, *c2)
        {
            let position = self.program.location.expr(*inner_rhs);
            let literal = self.program.add_expr(Expr::Int64(combined), position);
            self.program.expression.replace(r, Expr::Binary(op, *inner_lhs, literal));
            self.stats.simplified += 1;
            return true;
        }

        false
    }

    fn stmt(&mut self, s: StmtRef) {
        let Some(stmt) = self.program.stmt(s).cloned() else {
            return;
        };
        match stmt {
            Stmt::VarDecl(_, Some(e))
            | Stmt::Assign(_, e)
            | Stmt::Return(Some(e))
            | Stmt::Print(e)
            | Stmt::Expression(e) => self.expr(e),
            Stmt::IndexAssign(_, key, value) => {
                self.expr(key);
                self.expr(value);
            }
            Stmt::If(cond, then, otherwise) => {
                self.expr(cond);
                self.stmt(then);
                if let Some(otherwise) = otherwise {
                    self.stmt(otherwise);
                }
                let replacement = match self.get(cond) {
                    Some(Expr::Bool(true)) => self.program.stmt(then).cloned(),
                    Some(Expr::Bool(false)) => match otherwise {
                        Some(otherwise) => self.program.stmt(otherwise).cloned(),
                        None => Some(Stmt::Nop),
                    },
                    _ => None,
                };
                if let Some(replacement) = replacement {
                    self.program.statement.replace(s, replacement);
                    self.stats.dead_branches += 1;
                }
            }
            Stmt::While(cond, body) => {
                self.expr(cond);
                self.stmt(body);
                if matches!(self.get(cond), Some(Expr::Bool(false))) {
                    self.program.statement.replace(s, Stmt::Nop);
                    self.stats.dead_branches += 1;
                }
            }
            Stmt::Block(scope, body) => {
                for child in &body {
                    self.stmt(*child);
                }
                let pruned = self.prune(&body);
                if pruned.len() != body.len() {
                    self.stats.pruned += body.len() - pruned.len();
                    self.program.statement.replace(s, Stmt::Block(scope, pruned));
                }
            }
            Stmt::Function(decl) => self.stmt(decl.body),
            Stmt::VarDecl(_, None) | Stmt::ArrayDecl(_) | Stmt::Return(None) | Stmt::Nop => (),
        }
    }

    /// Drops empty statements and everything after the first `return`.
    fn prune(&self, body: &[StmtRef]) -> Vec<StmtRef> {
        let mut kept = Vec::with_capacity(body.len());
        for stmt in body {
            match self.program.stmt(*stmt) {
                Some(Stmt::Nop) => continue,
                Some(Stmt::Return(_)) => {
                    kept.push(*stmt);
                    break;
                }
                _ => kept.push(*stmt),
            }
        }
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::evaluate;
    use crate::diagnostics::Diagnostics;
    use rstest::rstest;

    fn optimized(source: &str) -> (Program, OptimizationStats) {
        let parsed = frontend::parse(source);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        let mut diagnostics = Diagnostics::new();
        let mut program = evaluate(&parsed.tree, &mut diagnostics).unwrap().program;
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics.errors());
        let stats = optimize(&mut program);
        (program, stats)
    }

    fn first_initializer(program: &Program) -> Expr {
        let init = program
            .statements
            .iter()
            .find_map(|s| match program.stmt(*s) {
                Some(Stmt::VarDecl(_, Some(init))) => Some(*init),
                _ => None,
            })
            .unwrap();
        program.expr(init).cloned().unwrap()
    }

    #[rstest]
    #[case("int x = 2 + 3 * 4;", Expr::Int64(14))]
    #[case("int x = 9223372036854775807 + 1;", Expr::Int64(i64::MIN))]
    #[case("int x = -(-7) % 4;", Expr::Int64(3))]
    #[case("double d = 1.5 * 2.0;", Expr::Double(3.0))]
    #[case("bool b = !(1 < 2) || 2.0 == 2.0;", Expr::Bool(true))]
    #[case("bool b = false && 1 / 0 == 1;", Expr::Bool(false))]
    fn folds_constants(#[case] source: &str, #[case] expected: Expr) {
        let (program, stats) = optimized(source);
        assert_eq!(first_initializer(&program), expected);
        assert!(stats.folded > 0);
    }

    #[rstest]
    #[case("int x = 1 / 0;")]
    #[case("int x = 5 % 0;")]
    #[case("int x = -9223372036854775807 - 1;\nint y = x / -1;")]
    fn trapping_division_is_not_folded(#[case] source: &str) {
        let (program, _) = optimized(source);
        let trapping = program
            .expression
            .0
            .iter()
            .any(|e| matches!(e, Expr::Binary(Operator::Div | Operator::Rem, _, _)));
        assert!(trapping);
    }

    #[test]
    fn literal_operand_moves_right() {
        let (program, stats) = optimized("int a = 1;\nint x = 2 * a;");
        let Expr::Binary(Operator::Mul, lhs, rhs) = first_initializer_of(&program, 1) else {
            panic!("expected multiplication");
        };
        assert!(matches!(program.expr(lhs), Some(Expr::Identifier(_))));
        assert_eq!(program.expr(rhs), Some(&Expr::Int64(2)));
        assert_eq!(stats.canonicalized, 1);
    }

    fn first_initializer_of(program: &Program, index: usize) -> Expr {
        match program.stmt(program.statements[index]) {
            Some(Stmt::VarDecl(_, Some(init))) => program.expr(*init).cloned().unwrap(),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn literal_chains_reassociate_and_identities_vanish() {
        let (program, _) = optimized("int a = 1;\nint x = 1 + a + 2 - 3;");
        // ((1 + a) + 2) - 3 becomes (a + 3) - 3; subtraction is not reassociated.
        let Expr::Binary(Operator::Sub, lhs, _) = first_initializer_of(&program, 1) else {
            panic!("expected subtraction");
        };
        let Some(Expr::Binary(Operator::Add, _, three)) = program.expr(lhs).cloned() else {
            panic!("expected addition");
        };
        assert_eq!(program.expr(three), Some(&Expr::Int64(3)));

        let (program, _) = optimized("int a = 1;\nint x = (a * 1) + 0;");
        assert!(matches!(first_initializer_of(&program, 1), Expr::Identifier(_)));
    }

    #[test]
    fn constant_if_keeps_only_taken_branch() {
        let (program, stats) = optimized("if (true) { print(1); } else { print(2); }\nif (1 > 2) { print(3); }");
        assert_eq!(program.statements.len(), 1);
        let Some(Stmt::Block(_, body)) = program.stmt(program.statements[0]) else {
            panic!("expected then-block");
        };
        assert!(matches!(program.stmt(body[0]), Some(Stmt::Print(_))));
        assert_eq!(stats.dead_branches, 2);
    }

    #[test]
    fn false_while_and_unreachable_code_are_removed() {
        let (program, _) =
            optimized("func f(): int { while (false) { print(0); } return 1; print(2); }\nprint(f());");
        let decl = program.functions().next().unwrap();
        let Some(Stmt::Block(_, body)) = program.stmt(decl.body) else {
            panic!("expected body");
        };
        assert_eq!(body.len(), 1);
        assert!(matches!(program.stmt(body[0]), Some(Stmt::Return(Some(_)))));
    }

    #[test]
    fn second_run_changes_nothing() {
        let (mut program, _) = optimized(
            "int a = 4;\nfunc g(n: int): int { if (n > 0 && true) { return n * 2 * 3; } return 0 + n; }\nprint(g(1 + a + 1));",
        );
        let snapshot = program.clone();
        let stats = optimize(&mut program);
        assert_eq!(stats.total(), 0);
        assert_eq!(program, snapshot);
    }
}
