//! Reference front end: scanner, recursive-descent parser and the parse-tree
//! model that the compiler back end consumes.

pub mod lexer;
pub mod parse_tree;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use parse_tree::{rules, NodeId, ParseNode, ParseTree, TreeShapeError};
pub use parser::{Parser, ParserError, ParserErrorKind};
pub use token::{Position, Token, TokenType};

/// Everything the scanner and parser produce for one source text.
#[derive(Debug, Clone)]
pub struct ParseOutput {
    /// All recognized tokens, comments included.
    pub tokens: Vec<Token>,
    pub tree: ParseTree,
    /// Lexical errors first, then syntax errors, each in source order.
    pub errors: Vec<ParserError>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

pub fn parse(source: &str) -> ParseOutput {
    let scan = Lexer::new(source).tokenize();
    let (tree, parse_errors) = Parser::new(&scan.tokens).parse_program();
    let mut errors = scan.errors;
    errors.extend(parse_errors);
    ParseOutput {
        tokens: scan.tokens,
        tree,
        errors,
    }
}
