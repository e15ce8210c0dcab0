use crate::parse_tree::{rules, NodeId, ParseTree};
use crate::token::{Position, TokenType};
use rstest::rstest;

fn parse_ok(input: &str) -> ParseTree {
    let output = crate::parse(input);
    assert!(output.errors.is_empty(), "unexpected errors: {:?}", output.errors);
    output.tree
}

fn labels(tree: &ParseTree, id: NodeId) -> Vec<String> {
    tree.children(id)
        .iter()
        .map(|c| tree.get(*c).unwrap().label.clone())
        .collect()
}

fn top_level(tree: &ParseTree) -> Vec<NodeId> {
    tree.children(tree.root().unwrap()).to_vec()
}

#[test]
fn empty_program_has_eof_leaf_and_validates() {
    let tree = parse_ok("");
    assert_eq!(labels(&tree, tree.root().unwrap()), vec!["EOF"]);
    assert!(tree.validate().is_ok());
}

#[test]
fn var_decl_is_wrapped_in_statement() {
    let tree = parse_ok("int x = 1;");
    let stmt = top_level(&tree)[0];
    assert_eq!(tree.get(stmt).unwrap().label, rules::STATEMENT);
    let decl = tree.children(stmt)[0];
    assert_eq!(labels(&tree, decl), vec![rules::TYPE, "x", "=", rules::EXPR, ";"]);
}

#[test]
fn literal_expression_keeps_full_precedence_chain() {
    let tree = parse_ok("int x = 1;");
    let decl = tree.children(top_level(&tree)[0])[0];
    let mut node = tree.children(decl)[3];
    let mut chain = vec![];
    while tree.children(node).len() == 1 {
        chain.push(tree.get(node).unwrap().label.clone());
        node = tree.children(node)[0];
    }
    assert_eq!(
        chain,
        vec![
            rules::EXPR,
            rules::OR_EXPR,
            rules::AND_EXPR,
            rules::COMP_EXPR,
            rules::ADD_EXPR,
            rules::MUL_EXPR,
            rules::UNARY_EXPR,
            rules::PRIMARY
        ]
    );
    let leaf = tree.get(node).unwrap();
    assert_eq!(leaf.token, Some(TokenType::Integer));
    assert_eq!(leaf.position, Some(Position::new(1, 9)));
}

#[test]
fn additive_chain_is_flat() {
    let tree = parse_ok("int x = 1 + 2 - 3;");
    let found = tree
        .walk()
        .into_iter()
        .find(|(id, _)| tree.get(*id).unwrap().label == rules::ADD_EXPR && tree.children(*id).len() > 1)
        .map(|(id, _)| id)
        .unwrap();
    assert_eq!(tree.children(found).len(), 5);
}

#[test]
fn function_declaration_shape() {
    let tree = parse_ok("func add(a: int, b: int): int { return a + b; }");
    let func = top_level(&tree)[0];
    assert_eq!(
        labels(&tree, func),
        vec!["func", "add", "(", rules::PARAM_LIST, ")", ":", rules::TYPE, rules::BLOCK]
    );
}

#[test]
fn array_declaration_and_index_assignment() {
    let tree = parse_ok("int[bool] flags;\nflags[true] = 3;");
    let decl = tree.children(top_level(&tree)[0])[0];
    assert_eq!(tree.get(decl).unwrap().label, rules::ARRAY_DECL);
    let assign = tree.children(top_level(&tree)[1])[0];
    assert_eq!(labels(&tree, assign), vec![rules::INDEX_EXPR, "=", rules::EXPR, ";"]);
}

#[rstest]
#[case("if (x) { } else { }")]
#[case("if (x) { } else if (y) { print(1); }")]
#[case("while (i < 10) { i = i + 1; }")]
#[case("print(\"hi\");")]
#[case("f(1, 2.5, true);")]
#[case("{ int a; { bool b; } }")]
#[case("int y = -(-3) * !false % 2;")]
fn statements_parse(#[case] input: &str) {
    parse_ok(input);
}

#[test]
fn comparison_does_not_chain() {
    let output = crate::parse("bool b = 1 < 2 < 3;");
    assert_eq!(output.errors.len(), 1);
}

#[test]
fn recovery_collects_multiple_errors() {
    let output = crate::parse("int = 3;\nint y = 2;\nbool z = ;\nprint(y);");
    assert_eq!(output.errors.len(), 2);
    assert_eq!(output.errors[0].location, Position::new(1, 5));
    assert_eq!(output.errors[1].location, Position::new(3, 10));
}

#[test]
fn recovery_inside_block_keeps_following_statements() {
    let output = crate::parse("func f() { int = 1; print(2); }\nprint(3);");
    assert_eq!(output.errors.len(), 1);
    let printed = output
        .tree
        .walk()
        .into_iter()
        .filter(|(id, _)| output.tree.get(*id).unwrap().label == rules::PRINT_STATEMENT)
        .count();
    assert_eq!(printed, 2);
}

#[test]
fn missing_closing_brace_reports_eof() {
    let output = crate::parse("func f() { print(1);");
    assert_eq!(output.errors.len(), 1);
    assert!(output.errors[0].message().contains("end of input"));
}
