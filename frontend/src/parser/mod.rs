pub mod core;
pub mod error;
pub mod expr;
pub mod stmt;
pub mod token_source;

#[cfg(test)]
pub mod tests;

pub use self::core::Parser;
pub use error::{ParserError, ParserErrorKind, ParserResult};
