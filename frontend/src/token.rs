use std::fmt;
use std::ops::Range;

/// 1-based line/column of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Tokens whose text is meaningful to a reader
    String,
    Bool,
    Comment,
    Comp,
    Double,
    Integer,
    Identifier,
    Oper,

    // Keywords
    Func,
    If,
    Else,
    While,
    Return,
    Print,
    Type,

    // Punctuation
    ParenOpen,
    ParenClose,
    BraceOpen,
    BraceClose,
    BracketOpen,
    BracketClose,
    Comma,
    Semicolon,
    Colon,
    Assign,

    EOF,
}

impl TokenType {
    /// Token kinds whose literal text is shown by the token stream view.
    pub fn carries_text(&self) -> bool {
        matches!(
            self,
            TokenType::String
                | TokenType::Bool
                | TokenType::Comment
                | TokenType::Comp
                | TokenType::Double
                | TokenType::Integer
                | TokenType::Identifier
                | TokenType::Oper
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenType::String => "STRING",
            TokenType::Bool => "BOOL",
            TokenType::Comment => "COMMENT",
            TokenType::Comp => "COMP",
            TokenType::Double => "DOUBLE",
            TokenType::Integer => "INTEGER",
            TokenType::Identifier => "IDENTIFIER",
            TokenType::Oper => "OPER",
            TokenType::Func => "FUNC",
            TokenType::If => "IF",
            TokenType::Else => "ELSE",
            TokenType::While => "WHILE",
            TokenType::Return => "RETURN",
            TokenType::Print => "PRINT",
            TokenType::Type => "TYPE",
            TokenType::ParenOpen => "LPAREN",
            TokenType::ParenClose => "RPAREN",
            TokenType::BraceOpen => "LBRACE",
            TokenType::BraceClose => "RBRACE",
            TokenType::BracketOpen => "LBRACKET",
            TokenType::BracketClose => "RBRACKET",
            TokenType::Comma => "COMMA",
            TokenType::Semicolon => "SEMICOLON",
            TokenType::Colon => "COLON",
            TokenType::Assign => "ASSIGN",
            TokenType::EOF => "EOF",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenType,
    pub text: String,
    pub position: Position,
    pub span: Range<usize>,
}

impl Token {
    pub fn new(kind: TokenType, text: impl Into<String>, position: Position, span: Range<usize>) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
            span,
        }
    }

    pub fn is(&self, kind: TokenType) -> bool {
        self.kind == kind
    }

    pub fn is_text(&self, kind: TokenType, text: &str) -> bool {
        self.kind == kind && self.text == text
    }
}

/// Line rendering used by the token stream view: `TYPE (line:col)` followed
/// by ` : text` for text-bearing kinds.
impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.position)?;
        if self.kind.carries_text() {
            write!(f, " : {}", self.text)?;
        }
        Ok(())
    }
}
