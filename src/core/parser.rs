// src/core/parser.rs
//! Precedence parser for component expressions, producing `Expr` trees.
//!
//! Grammar (highest binding last):
//!   expression := term (('+' | '-') term)*
//!   term       := unary (('*' | '/') unary)*
//!   unary      := ('-' | '+') unary | power
//!   power      := primary ('^' unary)?        // right associative
//!   primary    := number | identifier | identifier '(' expression ')' | '(' expression ')'
//!
//! Unknown identifiers are free parameter symbols; only the fixed set of
//! function names followed by '(' parse as calls.

use crate::core::error::CoreError;
use crate::core::expr::{Expr, Func};
use crate::core::lexer::Lexer;
use crate::core::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

/// Parses a single component expression string.
pub fn parse_expression(source: &str) -> Result<Expr, CoreError> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_full()?;
    Ok(expr)
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        let needs_eof = match tokens.last() {
            Some(t) => !matches!(t.kind, TokenKind::Eof),
            None => true,
        };
        if needs_eof {
            tokens.push(Token { kind: TokenKind::Eof, lexeme: String::new(), line: 0, column: 0 });
        }
        Parser { tokens, pos: 0 }
    }

    /// Parses one expression and requires all input to be consumed.
    pub fn parse_full(&mut self) -> Result<Expr, CoreError> {
        if self.is_at_end() {
            return Err(self.err_here("empty expression"));
        }
        let expr = self.parse_expression()?;
        if !self.is_at_end() {
            return Err(self.err_here(&format!("unexpected trailing input '{}'", self.peek().lexeme)));
        }
        Ok(expr)
    }

    fn parse_expression(&mut self) -> Result<Expr, CoreError> {
        let mut expr = self.parse_term()?;
        loop {
            if self.match_token(&TokenKind::Plus) {
                let rhs = self.parse_term()?;
                expr = Expr::add(expr, rhs);
            } else if self.match_token(&TokenKind::Minus) {
                let rhs = self.parse_term()?;
                expr = Expr::sub(expr, rhs);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, CoreError> {
        let mut expr = self.parse_unary()?;
        loop {
            if self.match_token(&TokenKind::Star) {
                let rhs = self.parse_unary()?;
                expr = Expr::mul(expr, rhs);
            } else if self.match_token(&TokenKind::Slash) {
                let rhs = self.parse_unary()?;
                expr = Expr::div(expr, rhs);
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, CoreError> {
        if self.match_token(&TokenKind::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::neg(inner));
        }
        if self.match_token(&TokenKind::Plus) {
            return self.parse_unary();
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> Result<Expr, CoreError> {
        let base = self.parse_primary()?;
        if self.match_token(&TokenKind::Caret) {
            // right associative; exponent may carry its own unary minus
            let exponent = self.parse_unary()?;
            return Ok(Expr::pow(base, exponent));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Expr, CoreError> {
        let tok = self.advance().clone();
        match tok.kind {
            TokenKind::NumberLiteral(v) => Ok(Expr::num(v)),
            TokenKind::Identifier(name) => {
                if self.check(&TokenKind::OpenParen) {
                    let func = Func::from_name(&name).ok_or_else(|| {
                        CoreError::parse(
                            format!("unknown function '{}'", name),
                            tok.line,
                            tok.column,
                        )
                    })?;
                    self.advance(); // '('
                    let arg = self.parse_expression()?;
                    self.consume(TokenKind::CloseParen, "expected ')' after function argument")?;
                    Ok(Expr::call(func, arg))
                } else {
                    Ok(Expr::sym(name))
                }
            }
            TokenKind::OpenParen => {
                let expr = self.parse_expression()?;
                self.consume(TokenKind::CloseParen, "expected ')'")?;
                Ok(expr)
            }
            _ => Err(CoreError::parse(
                format!("unexpected token '{}'", tok.lexeme),
                tok.line,
                tok.column,
            )),
        }
    }

    /* ── Token utils ─────────────────────────────────────── */
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn previous(&self) -> &Token {
        if self.pos == 0 {
            &self.tokens[0]
        } else {
            &self.tokens[self.pos - 1]
        }
    }

    fn peek(&self) -> &Token {
        // Safe: tokenize always appends Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        !self.is_at_end() && &self.peek().kind == kind
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, kind: TokenKind, msg: &str) -> Result<&Token, CoreError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.err_here(msg))
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn err_here(&self, msg: &str) -> CoreError {
        CoreError::parse(msg, self.peek().line, self.peek().column)
    }
}
