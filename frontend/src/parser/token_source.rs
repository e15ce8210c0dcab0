use crate::token::{Token, TokenType};

/// Cursor over scanned tokens that hides comments from the parser.
pub struct TokenProvider {
    tokens: Vec<Token>,
    cursor: usize,
}

impl TokenProvider {
    pub fn new(tokens: &[Token]) -> Self {
        let tokens: Vec<Token> = tokens
            .iter()
            .filter(|t| t.kind != TokenType::Comment)
            .cloned()
            .collect();
        TokenProvider { tokens, cursor: 0 }
    }

    /// Peek at the current token without consuming it
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    /// Peek at a token at relative position without consuming
    pub fn peek_at(&self, relative_pos: usize) -> Option<&Token> {
        self.tokens.get(self.cursor + relative_pos)
    }

    /// Consume the current token; the trailing `EOF` is never consumed.
    pub fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned()?;
        if token.kind != TokenType::EOF {
            self.cursor += 1;
        }
        Some(token)
    }

    pub fn at_eof(&self) -> bool {
        self.peek().is_none_or(|t| t.kind == TokenType::EOF)
    }

    /// Position of the last consumed token, used to anchor EOF errors.
    pub fn last_position(&self) -> Option<crate::token::Position> {
        self.cursor
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .or_else(|| self.tokens.last())
            .map(|t| t.position)
    }
}
