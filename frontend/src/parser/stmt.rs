use super::core::Parser;
use super::error::ParserResult;
use super::expr::{parse_call_expr, parse_expr, parse_index_expr};
use crate::parse_tree::{rules, NodeId};
use crate::token::TokenType;

// func_decl := "func" identifier "(" param_list? ")" (":" type)? block
pub fn parse_func_decl(parser: &mut Parser) -> ParserResult<NodeId> {
    let mut children = vec![parser.expect(TokenType::Func, "'func'")?];
    children.push(parser.expect(TokenType::Identifier, "function name")?);
    children.push(parser.expect(TokenType::ParenOpen, "'('")?);
    if !parser.check(TokenType::ParenClose) {
        children.push(parse_param_list(parser)?);
    }
    children.push(parser.expect(TokenType::ParenClose, "')'")?);
    if parser.check(TokenType::Colon) {
        children.push(parser.bump_leaf()?);
        children.push(parse_type(parser)?);
    }
    children.push(parse_block(parser)?);
    Ok(parser.tree.add_rule(rules::FUNC_DECL, children))
}

// param_list := param ("," param)*
// param := identifier ":" type
fn parse_param_list(parser: &mut Parser) -> ParserResult<NodeId> {
    let mut children = vec![];
    loop {
        let name = parser.expect(TokenType::Identifier, "parameter name")?;
        let colon = parser.expect(TokenType::Colon, "':'")?;
        let ty = parse_type(parser)?;
        children.push(parser.tree.add_rule(rules::PARAM, vec![name, colon, ty]));
        if parser.check(TokenType::Comma) {
            children.push(parser.bump_leaf()?);
        } else {
            break;
        }
    }
    Ok(parser.tree.add_rule(rules::PARAM_LIST, children))
}

pub fn parse_type(parser: &mut Parser) -> ParserResult<NodeId> {
    let ty = parser.expect(TokenType::Type, "type name")?;
    Ok(parser.tree.add_rule(rules::TYPE, vec![ty]))
}

// statement := var_decl | array_decl | assignment | if | while | return
//            | print | call_statement | block
pub fn parse_statement(parser: &mut Parser) -> ParserResult<NodeId> {
    let inner = match parser.peek_kind() {
        TokenType::Type if parser.peek_kind_at(1) == TokenType::BracketOpen => parse_array_decl(parser)?,
        TokenType::Type => parse_var_decl(parser)?,
        TokenType::Identifier => match parser.peek_kind_at(1) {
            TokenType::ParenOpen => {
                let call = parse_call_expr(parser)?;
                let semi = parser.expect(TokenType::Semicolon, "';'")?;
                parser.tree.add_rule(rules::CALL_STATEMENT, vec![call, semi])
            }
            _ => parse_assignment(parser)?,
        },
        TokenType::If => parse_if(parser)?,
        TokenType::While => parse_while(parser)?,
        TokenType::Return => parse_return(parser)?,
        TokenType::Print => parse_print(parser)?,
        TokenType::BraceOpen => parse_block(parser)?,
        // Functions are only legal at the top level; the back end reports
        // the misplaced declaration, the grammar accepts it.
        TokenType::Func => parse_func_decl(parser)?,
        _ => return Err(parser.error_here("statement")),
    };
    Ok(parser.tree.add_rule(rules::STATEMENT, vec![inner]))
}

// var_decl := type identifier ("=" expr)? ";"
fn parse_var_decl(parser: &mut Parser) -> ParserResult<NodeId> {
    let mut children = vec![parse_type(parser)?];
    children.push(parser.expect(TokenType::Identifier, "variable name")?);
    if parser.check(TokenType::Assign) {
        children.push(parser.bump_leaf()?);
        children.push(parse_expr(parser)?);
    }
    children.push(parser.expect(TokenType::Semicolon, "';'")?);
    Ok(parser.tree.add_rule(rules::VAR_DECL, children))
}

// array_decl := type "[" type "]" identifier ";"
fn parse_array_decl(parser: &mut Parser) -> ParserResult<NodeId> {
    let value = parse_type(parser)?;
    let open = parser.expect(TokenType::BracketOpen, "'['")?;
    let key = parse_type(parser)?;
    let close = parser.expect(TokenType::BracketClose, "']'")?;
    let array_type = parser.tree.add_rule(rules::ARRAY_TYPE, vec![value, open, key, close]);
    let name = parser.expect(TokenType::Identifier, "array name")?;
    let semi = parser.expect(TokenType::Semicolon, "';'")?;
    Ok(parser.tree.add_rule(rules::ARRAY_DECL, vec![array_type, name, semi]))
}

// assignment := (identifier | index_expr) "=" expr ";"
fn parse_assignment(parser: &mut Parser) -> ParserResult<NodeId> {
    let target = if parser.peek_kind_at(1) == TokenType::BracketOpen {
        parse_index_expr(parser)?
    } else {
        parser.expect(TokenType::Identifier, "identifier")?
    };
    let assign = parser.expect(TokenType::Assign, "'='")?;
    let value = parse_expr(parser)?;
    let semi = parser.expect(TokenType::Semicolon, "';'")?;
    Ok(parser.tree.add_rule(rules::ASSIGNMENT, vec![target, assign, value, semi]))
}

// if := "if" "(" expr ")" block ("else" (block | if))?
fn parse_if(parser: &mut Parser) -> ParserResult<NodeId> {
    let mut children = vec![parser.expect(TokenType::If, "'if'")?];
    children.push(parser.expect(TokenType::ParenOpen, "'('")?);
    children.push(parse_expr(parser)?);
    children.push(parser.expect(TokenType::ParenClose, "')'")?);
    children.push(parse_block(parser)?);
    if parser.check(TokenType::Else) {
        children.push(parser.bump_leaf()?);
        if parser.check(TokenType::If) {
            children.push(parse_if(parser)?);
        } else {
            children.push(parse_block(parser)?);
        }
    }
    Ok(parser.tree.add_rule(rules::IF_STATEMENT, children))
}

// while := "while" "(" expr ")" block
fn parse_while(parser: &mut Parser) -> ParserResult<NodeId> {
    let kw = parser.expect(TokenType::While, "'while'")?;
    let open = parser.expect(TokenType::ParenOpen, "'('")?;
    let cond = parse_expr(parser)?;
    let close = parser.expect(TokenType::ParenClose, "')'")?;
    let body = parse_block(parser)?;
    Ok(parser.tree.add_rule(rules::WHILE_STATEMENT, vec![kw, open, cond, close, body]))
}

// return := "return" expr? ";"
fn parse_return(parser: &mut Parser) -> ParserResult<NodeId> {
    let mut children = vec![parser.expect(TokenType::Return, "'return'")?];
    if !parser.check(TokenType::Semicolon) {
        children.push(parse_expr(parser)?);
    }
    children.push(parser.expect(TokenType::Semicolon, "';'")?);
    Ok(parser.tree.add_rule(rules::RETURN_STATEMENT, children))
}

// print := "print" "(" expr ")" ";"
fn parse_print(parser: &mut Parser) -> ParserResult<NodeId> {
    let kw = parser.expect(TokenType::Print, "'print'")?;
    let open = parser.expect(TokenType::ParenOpen, "'('")?;
    let value = parse_expr(parser)?;
    let close = parser.expect(TokenType::ParenClose, "')'")?;
    let semi = parser.expect(TokenType::Semicolon, "';'")?;
    Ok(parser.tree.add_rule(rules::PRINT_STATEMENT, vec![kw, open, value, close, semi]))
}

// block := "{" statement* "}"
// Statement errors inside a block are recorded and skipped so one typo does
// not hide the rest of the block.
pub fn parse_block(parser: &mut Parser) -> ParserResult<NodeId> {
    let mut children = vec![parser.expect(TokenType::BraceOpen, "'{'")?];
    loop {
        match parser.peek_kind() {
            TokenType::BraceClose => break,
            TokenType::EOF => return Err(parser.error_here("'}'")),
            _ => match parse_statement(parser) {
                Ok(stmt) => children.push(stmt),
                Err(e) => {
                    parser.errors.push(e);
                    parser.synchronize();
                }
            },
        }
    }
    children.push(parser.expect(TokenType::BraceClose, "'}'")?);
    Ok(parser.tree.add_rule(rules::BLOCK, children))
}
