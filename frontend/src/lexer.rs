//! Scanner for the reference grammar, generated by `logos`.
//!
//! Every recognized token is kept, comments included, so the token stream
//! view can show exactly what was scanned. The parser filters comments out
//! through its token source.

use logos::Logos;

use crate::parser::error::ParserError;
use crate::token::{Position, Token, TokenType};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum RawToken {
    #[token("func")]
    Func,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("return")]
    Return,
    #[token("print")]
    Print,
    #[token("int")]
    #[token("double")]
    #[token("bool")]
    #[token("string")]
    Type,
    #[token("true")]
    #[token("false")]
    Bool,

    #[regex(r"[\p{XID_Start}_][\p{XID_Continue}]*")]
    Identifier,
    #[regex(r"[0-9]+")]
    Integer,
    #[regex(r"[0-9]+\.[0-9]+")]
    Double,
    #[regex(r#""(?:[^"\n\\]|\\.)*""#)]
    String,
    // No closing quote before the end of the line.
    #[regex(r#""(?:[^"\n\\]|\\.)*"#)]
    UnterminatedString,
    #[regex(r"//[^\n]*")]
    Comment,

    #[token("==")]
    #[token("!=")]
    #[token("<")]
    #[token("<=")]
    #[token(">")]
    #[token(">=")]
    Comp,
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("!")]
    #[token("&&")]
    #[token("||")]
    Oper,

    #[token("=")]
    Assign,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
}

impl RawToken {
    fn token_type(self) -> Option<TokenType> {
        Some(match self {
            RawToken::Func => TokenType::Func,
            RawToken::If => TokenType::If,
            RawToken::Else => TokenType::Else,
            RawToken::While => TokenType::While,
            RawToken::Return => TokenType::Return,
            RawToken::Print => TokenType::Print,
            RawToken::Type => TokenType::Type,
            RawToken::Bool => TokenType::Bool,
            RawToken::Identifier => TokenType::Identifier,
            RawToken::Integer => TokenType::Integer,
            RawToken::Double => TokenType::Double,
            RawToken::String => TokenType::String,
            RawToken::UnterminatedString => return None,
            RawToken::Comment => TokenType::Comment,
            RawToken::Comp => TokenType::Comp,
            RawToken::Oper => TokenType::Oper,
            RawToken::Assign => TokenType::Assign,
            RawToken::ParenOpen => TokenType::ParenOpen,
            RawToken::ParenClose => TokenType::ParenClose,
            RawToken::BraceOpen => TokenType::BraceOpen,
            RawToken::BraceClose => TokenType::BraceClose,
            RawToken::BracketOpen => TokenType::BracketOpen,
            RawToken::BracketClose => TokenType::BracketClose,
            RawToken::Comma => TokenType::Comma,
            RawToken::Semicolon => TokenType::Semicolon,
            RawToken::Colon => TokenType::Colon,
        })
    }
}

/// Maps byte offsets to 1-based line/column positions; columns count
/// characters, not bytes.
struct LineIndex<'a> {
    input: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(input: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(input.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { input, line_starts }
    }

    fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|start| *start <= offset) - 1;
        let start = self.line_starts[line];
        let column = self.input[start..offset].chars().count() + 1;
        Position::new(line as u32 + 1, column as u32)
    }
}

pub struct Lexer<'a> {
    input: &'a str,
}

/// Output of a full scan: recognized tokens (terminated by `EOF`) and the
/// lexical errors encountered on the way.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<ParserError>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    pub fn tokenize(self) -> ScanResult {
        let lines = LineIndex::new(self.input);
        let mut result = ScanResult::default();
        let mut raw = RawToken::lexer(self.input);

        while let Some(scanned) = raw.next() {
            let span = raw.span();
            let position = lines.position(span.start);
            match scanned.map(RawToken::token_type) {
                Ok(Some(kind)) => result.tokens.push(Token::new(kind, raw.slice(), position, span)),
                Ok(None) => result.errors.push(ParserError::unterminated_string(position)),
                Err(()) => {
                    let c = raw.slice().chars().next().unwrap_or('\0');
                    result.errors.push(ParserError::invalid_character(position, c));
                }
            }
        }

        let end = self.input.len();
        result
            .tokens
            .push(Token::new(TokenType::EOF, "", lines.position(end), end..end));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(input: &str) -> Vec<TokenType> {
        Lexer::new(input).tokenize().tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexer_simple_declaration() {
        assert_eq!(
            kinds("int x = 42;"),
            vec![
                TokenType::Type,
                TokenType::Identifier,
                TokenType::Assign,
                TokenType::Integer,
                TokenType::Semicolon,
                TokenType::EOF
            ]
        );
    }

    #[rstest]
    #[case("==", TokenType::Comp)]
    #[case("!=", TokenType::Comp)]
    #[case("<=", TokenType::Comp)]
    #[case(">", TokenType::Comp)]
    #[case("&&", TokenType::Oper)]
    #[case("||", TokenType::Oper)]
    #[case("!", TokenType::Oper)]
    #[case("%", TokenType::Oper)]
    #[case("3.25", TokenType::Double)]
    #[case("true", TokenType::Bool)]
    #[case("\"a \\\"b\\\"\"", TokenType::String)]
    #[case("// note", TokenType::Comment)]
    fn lexer_single_token(#[case] input: &str, #[case] expected: TokenType) {
        let result = Lexer::new(input).tokenize();
        assert!(result.errors.is_empty());
        assert_eq!(result.tokens[0].kind, expected);
        assert_eq!(result.tokens[0].text, input);
    }

    #[test]
    fn lexer_tracks_line_and_column() {
        let result = Lexer::new("int a;\n  bool b;").tokenize();
        let b = result.tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!(b.position, Position::new(2, 8));
    }

    #[test]
    fn lexer_reports_invalid_character_and_continues() {
        let result = Lexer::new("int a # 1;").tokenize();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, crate::parser::error::ParserErrorKind::InvalidCharacter('#'));
        assert_eq!(result.tokens.last().unwrap().kind, TokenType::EOF);
    }

    #[test]
    fn lexer_reports_unterminated_string() {
        let result = Lexer::new("string s = \"oops\n;").tokenize();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].location, Position::new(1, 12));
    }

    #[test]
    fn string_running_into_end_of_input_is_unterminated() {
        let result = Lexer::new("print(\"abc").tokenize();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, crate::parser::error::ParserErrorKind::UnterminatedString);
        assert_eq!(result.errors[0].location, Position::new(1, 7));
    }

    #[test]
    fn columns_count_characters_not_bytes() {
        let result = Lexer::new("string é = \"ü\"; x").tokenize();
        let x = result.tokens.iter().find(|t| t.text == "x").unwrap();
        assert_eq!(x.position, Position::new(1, 17));
        assert_eq!(x.span, 18..19);
    }

    #[test]
    fn keywords_need_a_word_boundary() {
        assert_eq!(kinds("iffy"), vec![TokenType::Identifier, TokenType::EOF]);
        assert_eq!(kinds("int1"), vec![TokenType::Identifier, TokenType::EOF]);
    }

    #[test]
    fn integer_followed_by_dot_without_digits_is_not_double() {
        let result = Lexer::new("1.").tokenize();
        assert_eq!(result.tokens[0].kind, TokenType::Integer);
        assert_eq!(result.errors.len(), 1);
    }
}
