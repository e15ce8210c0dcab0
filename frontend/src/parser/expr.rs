use super::core::Parser;
use super::error::ParserResult;
use crate::parse_tree::{rules, NodeId};
use crate::token::TokenType;

struct OperatorGroup {
    label: &'static str,
    kind: TokenType,
    operators: &'static [&'static str],
    next_precedence: fn(&mut Parser) -> ParserResult<NodeId>,
    /// Comparison does not chain: `a < b < c` is rejected.
    single: bool,
}

// expr := or_expr
pub fn parse_expr(parser: &mut Parser) -> ParserResult<NodeId> {
    let inner = parse_or(parser)?;
    Ok(parser.tree.add_rule(rules::EXPR, vec![inner]))
}

fn parse_or(parser: &mut Parser) -> ParserResult<NodeId> {
    parse_binary(parser, &OperatorGroup {
        label: rules::OR_EXPR,
        kind: TokenType::Oper,
        operators: &["||"],
        next_precedence: parse_and,
        single: false,
    })
}

fn parse_and(parser: &mut Parser) -> ParserResult<NodeId> {
    parse_binary(parser, &OperatorGroup {
        label: rules::AND_EXPR,
        kind: TokenType::Oper,
        operators: &["&&"],
        next_precedence: parse_comparison,
        single: false,
    })
}

fn parse_comparison(parser: &mut Parser) -> ParserResult<NodeId> {
    parse_binary(parser, &OperatorGroup {
        label: rules::COMP_EXPR,
        kind: TokenType::Comp,
        operators: &["==", "!=", "<", "<=", ">", ">="],
        next_precedence: parse_add,
        single: true,
    })
}

fn parse_add(parser: &mut Parser) -> ParserResult<NodeId> {
    parse_binary(parser, &OperatorGroup {
        label: rules::ADD_EXPR,
        kind: TokenType::Oper,
        operators: &["+", "-"],
        next_precedence: parse_mul,
        single: false,
    })
}

fn parse_mul(parser: &mut Parser) -> ParserResult<NodeId> {
    parse_binary(parser, &OperatorGroup {
        label: rules::MUL_EXPR,
        kind: TokenType::Oper,
        operators: &["*", "/", "%"],
        next_precedence: parse_unary,
        single: false,
    })
}

fn parse_binary(parser: &mut Parser, group: &OperatorGroup) -> ParserResult<NodeId> {
    let mut children = vec![(group.next_precedence)(parser)?];
    loop {
        let matched = group.operators.iter().any(|op| parser.check_text(group.kind, op));
        if !matched {
            break;
        }
        children.push(parser.bump_leaf()?);
        children.push((group.next_precedence)(parser)?);
        if group.single {
            break;
        }
    }
    Ok(parser.tree.add_rule(group.label, children))
}

// unary := ("-" | "!") unary | primary
fn parse_unary(parser: &mut Parser) -> ParserResult<NodeId> {
    let children = if parser.check_text(TokenType::Oper, "-") || parser.check_text(TokenType::Oper, "!") {
        let op = parser.bump_leaf()?;
        vec![op, parse_unary(parser)?]
    } else {
        vec![parse_primary(parser)?]
    };
    Ok(parser.tree.add_rule(rules::UNARY_EXPR, children))
}

// primary := INTEGER | DOUBLE | BOOL | STRING | identifier | call | index | "(" expr ")"
fn parse_primary(parser: &mut Parser) -> ParserResult<NodeId> {
    let children = match parser.peek_kind() {
        TokenType::Integer | TokenType::Double | TokenType::Bool | TokenType::String => vec![parser.bump_leaf()?],
        TokenType::Identifier => match parser.peek_kind_at(1) {
            TokenType::ParenOpen => vec![parse_call_expr(parser)?],
            TokenType::BracketOpen => vec![parse_index_expr(parser)?],
            _ => vec![parser.bump_leaf()?],
        },
        TokenType::ParenOpen => {
            let open = parser.bump_leaf()?;
            let inner = parse_expr(parser)?;
            let close = parser.expect(TokenType::ParenClose, "')'")?;
            vec![open, inner, close]
        }
        _ => return Err(parser.error_here("expression")),
    };
    Ok(parser.tree.add_rule(rules::PRIMARY, children))
}

// call := identifier "(" arg_list? ")"
pub fn parse_call_expr(parser: &mut Parser) -> ParserResult<NodeId> {
    let mut children = vec![parser.expect(TokenType::Identifier, "function name")?];
    children.push(parser.expect(TokenType::ParenOpen, "'('")?);
    if !parser.check(TokenType::ParenClose) {
        let mut args = vec![parse_expr(parser)?];
        while parser.check(TokenType::Comma) {
            args.push(parser.bump_leaf()?);
            args.push(parse_expr(parser)?);
        }
        children.push(parser.tree.add_rule(rules::ARG_LIST, args));
    }
    children.push(parser.expect(TokenType::ParenClose, "')'")?);
    Ok(parser.tree.add_rule(rules::CALL_EXPR, children))
}

// index := identifier "[" expr "]"
pub fn parse_index_expr(parser: &mut Parser) -> ParserResult<NodeId> {
    let name = parser.expect(TokenType::Identifier, "array name")?;
    let open = parser.expect(TokenType::BracketOpen, "'['")?;
    let key = parse_expr(parser)?;
    let close = parser.expect(TokenType::BracketClose, "']'")?;
    Ok(parser.tree.add_rule(rules::INDEX_EXPR, vec![name, open, key, close]))
}
