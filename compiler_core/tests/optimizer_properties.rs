use compiler_core::{Diagnostics, Expr, ExprRef, Operator, Program, Stmt, UnaryOp, evaluate, optimize};
use proptest::prelude::*;

const VAR_VALUE: i64 = 7;

#[derive(Debug, Clone)]
enum Arith {
    Lit(i64),
    Var,
    Neg(Box<Arith>),
    Bin(char, Box<Arith>, Box<Arith>),
}

impl Arith {
    fn render(&self) -> String {
        match self {
            Arith::Lit(v) => v.to_string(),
            Arith::Var => "v".to_string(),
            Arith::Neg(e) => format!("-({})", e.render()),
            Arith::Bin(op, l, r) => format!("({} {} {})", l.render(), op, r.render()),
        }
    }

    fn value(&self) -> i64 {
        match self {
            Arith::Lit(v) => *v,
            Arith::Var => VAR_VALUE,
            Arith::Neg(e) => e.value().wrapping_neg(),
            Arith::Bin('+', l, r) => l.value().wrapping_add(r.value()),
            Arith::Bin('-', l, r) => l.value().wrapping_sub(r.value()),
            Arith::Bin(_, l, r) => l.value().wrapping_mul(r.value()),
        }
    }

    fn has_var(&self) -> bool {
        match self {
            Arith::Lit(_) => false,
            Arith::Var => true,
            Arith::Neg(e) => e.has_var(),
            Arith::Bin(_, l, r) => l.has_var() || r.has_var(),
        }
    }
}

fn arith() -> impl Strategy<Value = Arith> {
    let leaf = prop_oneof![(0i64..100_000).prop_map(Arith::Lit), Just(Arith::Var)];
    leaf.prop_recursive(5, 48, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Arith::Neg(Box::new(e))),
            (prop::sample::select(vec!['+', '-', '*']), inner.clone(), inner)
                .prop_map(|(op, l, r)| Arith::Bin(op, Box::new(l), Box::new(r))),
        ]
    })
}

/// Program with `v` declared first and the expression as the initializer of
/// the second declaration.
fn compile(expr: &Arith) -> Program {
    let source = format!("int v = {VAR_VALUE};\nint x = {};", expr.render());
    let parsed = frontend::parse(&source);
    assert!(parsed.errors.is_empty(), "{source}: {:?}", parsed.errors);
    let mut diagnostics = Diagnostics::new();
    let program = evaluate(&parsed.tree, &mut diagnostics).unwrap().program;
    assert!(!diagnostics.has_errors(), "{source}: {:?}", diagnostics.errors());
    program
}

fn initializer(program: &Program) -> ExprRef {
    match program.stmt(program.statements[1]) {
        Some(Stmt::VarDecl(_, Some(init))) => *init,
        other => panic!("unexpected {other:?}"),
    }
}

/// Reference interpreter over the AST, with `v` bound to `VAR_VALUE`.
fn run(program: &Program, r: ExprRef) -> i64 {
    match program.expr(r).unwrap() {
        Expr::Int64(v) => *v,
        Expr::Identifier(_) => VAR_VALUE,
        Expr::Unary(UnaryOp::Negate, e) => run(program, *e).wrapping_neg(),
        Expr::Binary(Operator::Add, l, r) => run(program, *l).wrapping_add(run(program, *r)),
        Expr::Binary(Operator::Sub, l, r) => run(program, *l).wrapping_sub(run(program, *r)),
        Expr::Binary(Operator::Mul, l, r) => run(program, *l).wrapping_mul(run(program, *r)),
        other => panic!("unexpected node {other:?}"),
    }
}

proptest! {
    #[test]
    fn optimize_is_idempotent(expr in arith()) {
        let mut program = compile(&expr);
        optimize(&mut program);
        let once = program.clone();
        let stats = optimize(&mut program);
        prop_assert_eq!(stats.total(), 0);
        prop_assert_eq!(program, once);
    }

    #[test]
    fn optimize_preserves_wrapping_semantics(expr in arith()) {
        let mut program = compile(&expr);
        optimize(&mut program);
        prop_assert_eq!(run(&program, initializer(&program)), expr.value());
    }

    #[test]
    fn closed_expressions_fold_to_one_literal(expr in arith().prop_filter("no variable", |e| !e.has_var())) {
        let mut program = compile(&expr);
        optimize(&mut program);
        let folded = program.expr(initializer(&program)).cloned();
        prop_assert_eq!(folded, Some(Expr::Int64(expr.value())));
    }
}
