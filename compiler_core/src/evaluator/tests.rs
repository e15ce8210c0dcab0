use super::*;
use crate::ast::{Expr, Stmt};
use crate::diagnostics::Diagnostic;
use frontend::ParseTree;
use rstest::rstest;

fn eval(source: &str) -> (Evaluation, Diagnostics) {
    let parsed = frontend::parse(source);
    assert!(parsed.errors.is_empty(), "syntax errors: {:?}", parsed.errors);
    let mut diagnostics = Diagnostics::new();
    let evaluation = evaluate(&parsed.tree, &mut diagnostics).unwrap();
    (evaluation, diagnostics)
}

fn error_kinds(diagnostics: &Diagnostics) -> Vec<&DiagnosticKind> {
    diagnostics.errors().into_iter().map(|d: &Diagnostic| &d.kind).collect()
}

fn names(evaluation: &Evaluation, ns: NamespaceId) -> Vec<String> {
    evaluation
        .namespaces
        .get(ns)
        .unwrap()
        .symbols
        .iter()
        .map(|s| evaluation.program.resolve_str(s.name).to_string())
        .collect()
}

#[test]
fn duplicate_declaration_reports_once_and_keeps_first() {
    let (evaluation, diagnostics) = eval("int x = 1; int x = 2;");
    assert_eq!(diagnostics.error_count(), 1);
    let error = &diagnostics.errors()[0];
    assert_eq!(
        error.kind,
        DiagnosticKind::DuplicateDeclaration {
            name: "x".into(),
            first: Position::new(1, 5)
        }
    );
    assert_eq!(error.location, Some(Position::new(1, 16)));
    let root = evaluation.namespaces.root();
    assert_eq!(root.symbols.len(), 1);
    assert_eq!(root.symbols[0].kind, SymbolKind::Scalar(ValueType::Int));
}

#[test]
fn outer_declaration_resolves_from_nested_block() {
    let (evaluation, diagnostics) = eval("int x = 1; { { print(x); } }");
    assert!(!diagnostics.has_errors());
    let print = evaluation
        .program
        .statement
        .0
        .iter()
        .find_map(|s| match s {
            Stmt::Print(e) => Some(*e),
            _ => None,
        })
        .unwrap();
    let x = SymbolRef {
        namespace: NamespaceId::ROOT,
        index: 0,
    };
    assert_eq!(evaluation.program.expr(print), Some(&Expr::Identifier(x)));
}

#[test]
fn unresolved_references_are_all_collected() {
    let (_, diagnostics) = eval("print(a);\nprint(b);");
    assert_eq!(
        error_kinds(&diagnostics),
        vec![
            &DiagnosticKind::UnresolvedReference { name: "a".into() },
            &DiagnosticKind::UnresolvedReference { name: "b".into() }
        ]
    );
    assert_eq!(diagnostics.errors()[1].location, Some(Position::new(2, 7)));
}

#[test]
fn namespaces_follow_lexical_structure() {
    let (evaluation, diagnostics) =
        eval("func f(a: int): int { if (a > 0) { return a; } return 0; }\nwhile (false) { int z; }");
    assert!(!diagnostics.has_errors());
    let graph = &evaluation.namespaces;
    let children: Vec<&str> = graph
        .root()
        .children
        .iter()
        .map(|c| graph.get(*c).unwrap().name.as_str())
        .collect();
    assert_eq!(children, vec!["f", "while"]);
    assert_eq!(names(&evaluation, NamespaceId::ROOT), vec!["f"]);
    let f = graph.root().children[0];
    assert_eq!(names(&evaluation, f), vec!["a"]);
    assert_eq!(graph.get(graph.get(f).unwrap().children[0]).unwrap().name, "if");
    for (id, ns) in graph.iter() {
        assert!(ns.is_sealed());
        assert_eq!(graph.ancestors(id).last(), Some(NamespaceId::ROOT));
    }
}

#[test]
fn recursion_resolves_but_forward_calls_do_not() {
    let (_, diagnostics) = eval("func fact(n: int): int { if (n < 2) { return 1; } return n * fact(n - 1); }");
    assert!(!diagnostics.has_errors());

    let (_, diagnostics) = eval("func a() { b(); }\nfunc b() { }");
    assert_eq!(
        error_kinds(&diagnostics),
        vec![&DiagnosticKind::UnresolvedReference { name: "b".into() }]
    );
}

#[test]
fn shadowing_is_a_warning() {
    let (_, diagnostics) = eval("int x;\n{ int x; }");
    assert!(!diagnostics.has_errors());
    assert_eq!(
        diagnostics.warnings()[0].kind,
        DiagnosticKind::ShadowedDeclaration {
            name: "x".into(),
            outer: Position::new(1, 5)
        }
    );
}

#[rstest]
#[case("int x = true;", DiagnosticKind::TypeMismatch { context: "initialization", expected: ValueType::Int, found: ValueType::Bool })]
#[case("{ func g() { } }", DiagnosticKind::MisplacedFunction { name: "g".into() })]
#[case("return 1;", DiagnosticKind::ReturnOutsideFunction)]
#[case("func f(a: int) { }\nf(1, 2);", DiagnosticKind::ArityMismatch { name: "f".into(), expected: 1, found: 2 })]
#[case("int[string] m;", DiagnosticKind::UnsupportedArrayKey { found: ValueType::String })]
#[case("int[bool] m;\nm[1] = 2;", DiagnosticKind::TypeMismatch { context: "array key", expected: ValueType::Bool, found: ValueType::Int })]
#[case("int x;\nx[1] = 2;", DiagnosticKind::NotAnArray { name: "x".into() })]
#[case("int x;\nx(1);", DiagnosticKind::NotCallable { name: "x".into() })]
#[case("func f() { }\nint y = f;", DiagnosticKind::NotAVariable { name: "f".into() })]
#[case("func p() { }\nint y = p();", DiagnosticKind::VoidValue { name: "p".into() })]
#[case("int x = 99999999999999999999;", DiagnosticKind::InvalidLiteral { text: "99999999999999999999".into() })]
#[case("func f(): int { return; }", DiagnosticKind::MissingReturnValue { expected: ValueType::Int })]
#[case("func f() { return 1; }", DiagnosticKind::UnexpectedReturnValue)]
#[case("if (1) { }", DiagnosticKind::TypeMismatch { context: "if condition", expected: ValueType::Bool, found: ValueType::Int })]
#[case("double d = 1.5 % 2.0;", DiagnosticKind::InvalidOperand { operator: "%".into(), found: ValueType::Double })]
#[case("bool b = 1 + 2.0 == 3;", DiagnosticKind::TypeMismatch { context: "arithmetic", expected: ValueType::Int, found: ValueType::Double })]
fn single_semantic_error(#[case] source: &str, #[case] expected: DiagnosticKind) {
    let (_, diagnostics) = eval(source);
    assert_eq!(error_kinds(&diagnostics), vec![&expected]);
}

#[test]
fn unknown_rule_is_a_fault() {
    let mut tree = ParseTree::new();
    let leaf = tree.add_leaf("?", TokenType::Identifier, Position::new(1, 1));
    let bogus = tree.add_rule("Bogus", vec![leaf]);
    let start = tree.add_rule(rules::START, vec![bogus]);
    tree.set_root(start);
    let mut diagnostics = Diagnostics::new();
    let fault = evaluate(&tree, &mut diagnostics).unwrap_err();
    assert!(matches!(fault, EvaluationFault::UnexpectedNode { ref label, .. } if label == "Bogus"));
}

#[test]
fn unpositioned_leaf_is_a_fault() {
    let mut tree = ParseTree::new();
    let empty = tree.add_rule(rules::BLOCK, vec![]);
    let start = tree.add_rule(rules::START, vec![empty]);
    tree.set_root(start);
    let mut diagnostics = Diagnostics::new();
    assert_eq!(
        evaluate(&tree, &mut diagnostics).unwrap_err(),
        EvaluationFault::MalformedTree(TreeShapeError::LeafWithoutPosition(empty))
    );
}

#[test]
fn cyclic_tree_is_a_fault() {
    let mut tree = ParseTree::new();
    let block = tree.add_rule(rules::BLOCK, vec![NodeId(1)]);
    let start = tree.add_rule(rules::START, vec![block]);
    tree.set_root(start);
    let mut diagnostics = Diagnostics::new();
    assert_eq!(
        evaluate(&tree, &mut diagnostics).unwrap_err(),
        EvaluationFault::MalformedTree(TreeShapeError::Cycle(start))
    );
}

#[test]
fn root_outside_the_arena_is_a_missing_node() {
    let mut tree = ParseTree::new();
    tree.set_root(NodeId(7));
    let mut diagnostics = Diagnostics::new();
    assert_eq!(
        evaluate(&tree, &mut diagnostics).unwrap_err(),
        EvaluationFault::MalformedTree(TreeShapeError::MissingNode(NodeId(7)))
    );
}

#[test]
fn function_declaration_records_signature() {
    let (evaluation, diagnostics) = eval("func add(a: int, b: double): bool { return true; }");
    assert!(!diagnostics.has_errors());
    let f = &evaluation.namespaces.root().symbols[0];
    assert_eq!(
        f.kind,
        SymbolKind::Function {
            params: vec![ValueType::Int, ValueType::Double],
            ret: Some(ValueType::Bool)
        }
    );
    let decl = evaluation.program.functions().next().unwrap();
    assert_eq!(decl.params.len(), 2);
    assert!(matches!(evaluation.program.stmt(decl.body), Some(Stmt::Block(scope, body)) if *scope == decl.scope && body.len() == 1));
}
