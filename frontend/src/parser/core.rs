use super::error::{ParserError, ParserResult};
use super::token_source::TokenProvider;
use crate::parse_tree::{rules, NodeId, ParseTree};
use crate::token::{Token, TokenType};

pub struct Parser {
    token_provider: TokenProvider,
    pub tree: ParseTree,
    pub errors: Vec<ParserError>,
}

impl Parser {
    pub fn new(tokens: &[Token]) -> Self {
        Parser {
            token_provider: TokenProvider::new(tokens),
            tree: ParseTree::with_capacity(tokens.len() * 2),
            errors: Vec::new(),
        }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.token_provider.peek()
    }

    pub fn peek_kind(&self) -> TokenType {
        self.peek().map(|t| t.kind).unwrap_or(TokenType::EOF)
    }

    pub fn peek_kind_at(&self, pos: usize) -> TokenType {
        self.token_provider.peek_at(pos).map(|t| t.kind).unwrap_or(TokenType::EOF)
    }

    pub fn check(&self, kind: TokenType) -> bool {
        self.peek_kind() == kind
    }

    pub fn check_text(&self, kind: TokenType, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is_text(kind, text))
    }

    /// Consume the current token and record it as a leaf.
    pub fn bump_leaf(&mut self) -> ParserResult<NodeId> {
        match self.token_provider.advance() {
            Some(token) if token.kind != TokenType::EOF => Ok(self.tree.add_token(&token)),
            _ => Err(self.error_here("token")),
        }
    }

    pub fn expect(&mut self, kind: TokenType, expected: &str) -> ParserResult<NodeId> {
        if self.check(kind) {
            self.bump_leaf()
        } else {
            Err(self.error_here(expected))
        }
    }

    pub fn error_here(&self, expected: &str) -> ParserError {
        match self.peek() {
            Some(token) if token.kind != TokenType::EOF => {
                ParserError::unexpected_token(token.position, expected, token.kind, &token.text)
            }
            Some(token) => ParserError::unexpected_eof(token.position, expected),
            None => ParserError::unexpected_eof(
                self.token_provider.last_position().unwrap_or(crate::token::Position::new(1, 1)),
                expected,
            ),
        }
    }

    // program := (func_decl | statement)* EOF
    pub fn parse_program(mut self) -> (ParseTree, Vec<ParserError>) {
        let mut items = vec![];
        while !self.token_provider.at_eof() {
            let item = if self.check(TokenType::Func) {
                super::stmt::parse_func_decl(&mut self)
            } else {
                super::stmt::parse_statement(&mut self)
            };
            match item {
                Ok(node) => items.push(node),
                Err(e) => {
                    self.errors.push(e);
                    self.synchronize();
                }
            }
        }
        if let Some(eof) = self.peek().cloned() {
            items.push(self.tree.add_leaf("EOF", TokenType::EOF, eof.position));
        }
        let root = self.tree.add_rule(rules::START, items);
        self.tree.set_root(root);
        (self.tree, self.errors)
    }

    /// Panic-mode recovery: skip to just after the next `;`, or up to the
    /// next `}` or statement keyword. Always makes progress.
    pub fn synchronize(&mut self) {
        let mut consumed = false;
        loop {
            match self.peek_kind() {
                TokenType::EOF => return,
                TokenType::Semicolon => {
                    self.token_provider.advance();
                    return;
                }
                TokenType::BraceClose | TokenType::Func | TokenType::If | TokenType::While
                | TokenType::Return | TokenType::Print
                    if consumed =>
                {
                    return;
                }
                _ => {
                    self.token_provider.advance();
                    consumed = true;
                }
            }
        }
    }
}
