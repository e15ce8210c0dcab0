use crate::token::{Position, TokenType};

#[derive(Debug, Clone, PartialEq)]
pub enum ParserErrorKind {
    UnexpectedToken { expected: String, found: TokenType, text: String },
    UnexpectedEof { expected: String },
    InvalidCharacter(char),
    UnterminatedString,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub location: Position,
}

pub type ParserResult<T> = Result<T, ParserError>;

impl ParserError {
    pub fn unexpected_token(location: Position, expected: impl Into<String>, found: TokenType, text: &str) -> Self {
        Self {
            kind: ParserErrorKind::UnexpectedToken {
                expected: expected.into(),
                found,
                text: text.to_string(),
            },
            location,
        }
    }

    pub fn unexpected_eof(location: Position, expected: impl Into<String>) -> Self {
        Self {
            kind: ParserErrorKind::UnexpectedEof { expected: expected.into() },
            location,
        }
    }

    pub fn invalid_character(location: Position, c: char) -> Self {
        Self {
            kind: ParserErrorKind::InvalidCharacter(c),
            location,
        }
    }

    pub fn unterminated_string(location: Position) -> Self {
        Self {
            kind: ParserErrorKind::UnterminatedString,
            location,
        }
    }

    pub fn message(&self) -> String {
        match &self.kind {
            ParserErrorKind::UnexpectedToken { expected, found, text } => {
                format!("Expected {} but found {} '{}'", expected, found, text)
            }
            ParserErrorKind::UnexpectedEof { expected } => {
                format!("Expected {} but reached end of input", expected)
            }
            ParserErrorKind::InvalidCharacter(c) => format!("Invalid character '{}'", c),
            ParserErrorKind::UnterminatedString => "Unterminated string literal".to_string(),
        }
    }
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message())
    }
}

impl std::error::Error for ParserError {}
