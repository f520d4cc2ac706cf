//! Lexical analyzer

use std::rc::Rc;

use crate::ctx::Context;
use crate::diag::{Position, Reporter};
use crate::token::{Literal, Token, TokenKind};

/// Turn a source string into a sequence of tokens terminated by `Eof`.
///
/// The scanner slides a `[start, current)` window over the source.  Lexical
/// errors are reported to the sink and scanning continues, so one run
/// surfaces every bad character.
pub struct Scanner<'r> {
    chars: Vec<char>,
    start: usize,
    current: usize,
    line: Position,
    // Line of the first character of the token being scanned.
    start_line: Position,
    tokens: Vec<Token>,
    ctx: Rc<Context>,
    reporter: &'r mut Reporter,
}

impl<'r> Scanner<'r> {
    pub fn new(source: &str, ctx: Rc<Context>, reporter: &'r mut Reporter) -> Scanner<'r> {
        Scanner {
            chars: source.chars().collect(),
            start: 0,
            current: 0,
            line: 1,
            start_line: 1,
            tokens: vec![],
            ctx,
            reporter,
        }
    }

    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.scan_token();
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, String::new(), Literal::None, self.line));
        self.tokens
    }

    fn scan_token(&mut self) {
        let ch = self.advance();
        match ch {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            '-' => self.add_token(TokenKind::Minus),
            '+' => self.add_token(TokenKind::Plus),
            ';' => self.add_token(TokenKind::Semicolon),
            '*' => self.add_token(TokenKind::Star),
            '?' => self.add_token(TokenKind::Question),
            ':' => self.add_token(TokenKind::Colon),
            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            '/' => {
                if self.match_char('/') {
                    self.skip_line_comment();
                } else if self.match_char('*') {
                    self.skip_block_comment();
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            ' ' | '\t' | '\r' => (),
            '\n' => self.line += 1,
            '"' => self.scan_string(),
            '0'..='9' => self.scan_number(),
            ch if ch.is_ascii_alphabetic() || ch == '_' => self.scan_identifier(),
            _ => self.reporter.error(self.line, "Unexpected character."),
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Block comments do not nest.
    fn skip_block_comment(&mut self) {
        loop {
            if self.is_at_end() {
                self.reporter.error(self.line, "Unterminated block comment.");
                return;
            }
            let ch = self.advance();
            if ch == '\n' {
                self.line += 1;
            } else if ch == '*' && self.peek() == Some('/') {
                self.advance();
                return;
            }
        }
    }

    /// String literals may span lines; no escape processing.
    fn scan_string(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '"' {
                break;
            }
            if ch == '\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            self.reporter.error(self.line, "Unterminated string.");
            return;
        }
        self.advance(); // closing quote
        let value: String = self.chars[self.start + 1..self.current - 1].iter().collect();
        self.add_literal_token(TokenKind::String, Literal::Str(value));
    }

    /// A trailing `.` without fractional digits is not part of the number.
    fn scan_number(&mut self) {
        while matches!(self.peek(), Some('0'..='9')) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_next(), Some('0'..='9')) {
            self.advance();
            while matches!(self.peek(), Some('0'..='9')) {
                self.advance();
            }
        }
        let lexeme = self.lexeme();
        match lexeme.parse::<f64>() {
            Ok(n) => self.add_literal_token(TokenKind::Number, Literal::Number(n)),
            Err(_) => self.reporter.error(self.start_line, "Invalid number literal."),
        }
    }

    fn scan_identifier(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let lexeme = self.lexeme();
        if let Some(kind) = self.ctx.keyword(&lexeme) {
            self.add_token(kind);
        } else {
            let sym = self.ctx.symbol(&lexeme);
            self.add_literal_token(TokenKind::Identifier, Literal::Ident(sym));
        }
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_literal_token(kind, Literal::None);
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Literal) {
        self.tokens
            .push(Token::new(kind, self.lexeme(), literal, self.start_line));
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.current];
        self.current += 1;
        ch
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.current).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.current + 1).copied()
    }
}
