//! Diagnostics accumulated during scanning and parsing.

use std::fmt;

use crate::token::{Token, TokenKind};

/// Line number (starting at one).
pub type Position = u32;

/// What a diagnostic points at inside its line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locus {
    /// The line as a whole (scanner errors).
    Line,
    /// A specific token, identified by its lexeme.
    Token(String),
    /// The end of input.
    Eof,
}

/// A single scan or parse error pinned to a source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: Position,
    pub locus: Locus,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.locus {
            Locus::Line => write!(f, "[line {}] Error: {}", self.line, self.message),
            Locus::Token(lexeme) => write!(
                f,
                "[line {}] Error at '{}': {}",
                self.line, lexeme, self.message
            ),
            Locus::Eof => write!(f, "[line {}] Error at end: {}", self.line, self.message),
        }
    }
}

/// Error sink shared by the scanner and the parser.
///
/// Diagnostics accumulate so a single run can surface as many user errors as
/// possible; the `had_error` latch decides whether the program may execute.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
}

impl Reporter {
    pub fn new() -> Reporter {
        Reporter::default()
    }

    /// Record an error against a raw line (scanner).
    pub fn error(&mut self, line: Position, message: &str) {
        self.diagnostics.push(Diagnostic {
            line,
            locus: Locus::Line,
            message: message.to_string(),
        });
    }

    /// Record an error against a token (parser).
    pub fn error_at(&mut self, token: &Token, message: &str) {
        let locus = if token.kind == TokenKind::Eof {
            Locus::Eof
        } else {
            Locus::Token(token.lexeme.clone())
        };
        self.diagnostics.push(Diagnostic {
            line: token.line,
            locus,
            message: message.to_string(),
        });
    }

    pub fn had_error(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    #[cfg(test)]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}
