// src/core/lexer.rs
//! Tokenizer for metric/tensor component expressions.
//!
//! Accepts the arithmetic subset users type into component grids:
//! numbers, coordinate/parameter names, `+ - * / ^` (with `**` as a
//! power alias), parentheses and function calls.

use unicode_ident::{is_xid_continue, is_xid_start};

use crate::core::error::CoreError;
use crate::core::token::{Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, CoreError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                    self.line += 1;
                    self.column = 1;
                }
                '+' => tokens.push(self.single(TokenKind::Plus, "+")),
                '-' => tokens.push(self.single(TokenKind::Minus, "-")),
                '*' => {
                    self.bump();
                    if self.peek() == Some('*') {
                        self.bump();
                        tokens.push(Token { kind: TokenKind::Caret, lexeme: "**".into(), line, column });
                    } else {
                        tokens.push(Token { kind: TokenKind::Star, lexeme: "*".into(), line, column });
                    }
                }
                '/' => tokens.push(self.single(TokenKind::Slash, "/")),
                '^' => tokens.push(self.single(TokenKind::Caret, "^")),
                '(' => tokens.push(self.single(TokenKind::OpenParen, "(")),
                ')' => tokens.push(self.single(TokenKind::CloseParen, ")")),
                ',' => tokens.push(self.single(TokenKind::Comma, ",")),
                c if c.is_ascii_digit() || c == '.' => {
                    tokens.push(self.lex_number(line, column)?);
                }
                c if is_xid_start(c) => {
                    let mut name = String::new();
                    while let Some(c) = self.peek() {
                        if is_xid_continue(c) {
                            name.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token {
                        kind: TokenKind::Identifier(name.clone()),
                        lexeme: name,
                        line,
                        column,
                    });
                }
                other => {
                    return Err(CoreError::parse(
                        format!("unexpected character '{}'", other),
                        line,
                        column,
                    ));
                }
            }
        }
        tokens.push(Token { kind: TokenKind::Eof, lexeme: String::new(), line: self.line, column: self.column });
        Ok(tokens)
    }

    fn lex_number(&mut self, line: usize, column: usize) -> Result<Token, CoreError> {
        let mut text = String::new();
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    text.push(c);
                    self.bump();
                }
                '.' if !seen_dot => {
                    seen_dot = true;
                    text.push(c);
                    self.bump();
                }
                'e' | 'E' => {
                    // exponent only if followed by digit or signed digit
                    let next = self.peek_ahead(1);
                    let next2 = self.peek_ahead(2);
                    let signed = matches!(next, Some('+') | Some('-'))
                        && matches!(next2, Some(d) if d.is_ascii_digit());
                    let bare = matches!(next, Some(d) if d.is_ascii_digit());
                    if signed || bare {
                        text.push(c);
                        self.bump();
                        if signed {
                            text.push(self.peek().unwrap());
                            self.bump();
                        }
                        while let Some(d) = self.peek() {
                            if d.is_ascii_digit() {
                                text.push(d);
                                self.bump();
                            } else {
                                break;
                            }
                        }
                        break;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        let value: f64 = text
            .parse()
            .map_err(|_| CoreError::parse(format!("invalid number literal '{}'", text), line, column))?;
        Ok(Token { kind: TokenKind::NumberLiteral(value), lexeme: text, line, column })
    }

    fn single(&mut self, kind: TokenKind, lexeme: &str) -> Token {
        let tok = Token { kind, lexeme: lexeme.into(), line: self.line, column: self.column };
        self.bump();
        tok
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) {
        if self.pos < self.chars.len() {
            self.pos += 1;
            self.column += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_power_aliases() {
        assert_eq!(kinds("r^2"), kinds("r**2"));
    }

    #[test]
    fn tokenizes_schwarzschild_component() {
        let ks = kinds("-(1 - 2*M/r)");
        assert_eq!(ks.first(), Some(&TokenKind::Minus));
        assert!(ks.contains(&TokenKind::Identifier("M".into())));
        assert!(ks.contains(&TokenKind::Slash));
    }

    #[test]
    fn scientific_notation() {
        let ks = kinds("1.5e-3");
        assert_eq!(ks[0], TokenKind::NumberLiteral(1.5e-3));
    }

    #[test]
    fn rejects_unknown_character() {
        let err = Lexer::new("r @ 2").tokenize().unwrap_err();
        match err {
            CoreError::Parse { line, column, .. } => {
                assert_eq!((line, column), (1, 3));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }
}
