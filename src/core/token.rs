// src/core/token.rs
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals and names
    Identifier(String),
    NumberLiteral(f64),

    // Operators
    Plus,  // +
    Minus, // -
    Star,  // *
    Slash, // /
    Caret, // ^

    // Delimiters
    OpenParen,  // (
    CloseParen, // )
    Comma,      // ,

    // Special
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}
