//! API to control the interpreter.

use std::error::Error;
use std::fmt;
use std::io::prelude::*;
use std::rc::Rc;

use log::trace;

use crate::ctx::Context;
use crate::diag::Reporter;
use crate::eval::Evaluator;
use crate::parser::Parser;
use crate::scanner::Scanner;

pub use crate::diag::Diagnostic;
pub use crate::eval::{RuntimeError, RuntimeErrorKind};

/// Tree-walk interpreter for Oxente source text.
///
/// One interpreter keeps one global environment alive, so definitions
/// persist across `eval` calls.  That is what the REPL relies on:
///
/// ```
/// # use oxente::interpreter::{Interpreter, OxenteError};
///
/// let mut output: Vec<u8> = Vec::new();
/// let mut interp = Interpreter::new(&mut output);
///
/// interp.eval("fun greet(name) { print \"hello, \" + name; }")?;
/// interp.eval("greet(\"world\");")?;
/// interp.eval("greet(1 + 2);")?;
///
/// assert_eq!(output, b"hello, world\nhello, 3\n");
/// # Ok::<(), OxenteError>(())
/// ```
#[derive(Debug)]
pub struct Interpreter<'t, W: Write> {
    ctx: Rc<Context>,
    evaluator: Evaluator<'t, W>,
}

/// Errors the interpreter can raise.
#[derive(Debug)]
pub enum OxenteError {
    /// Diagnostics accumulated during lexical or syntactic analysis.  The
    /// program was not executed.
    Parse(Vec<Diagnostic>),

    /// Error occurring during evaluation.
    Runtime(RuntimeError),
}

impl fmt::Display for OxenteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OxenteError::Parse(diagnostics) => {
                for (i, diagnostic) in diagnostics.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", diagnostic)?;
                }
                Ok(())
            }
            OxenteError::Runtime(e) => write!(f, "{}", e),
        }
    }
}

impl Error for OxenteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OxenteError::Parse(_) => None,
            OxenteError::Runtime(e) => Some(e),
        }
    }
}

impl From<RuntimeError> for OxenteError {
    fn from(e: RuntimeError) -> OxenteError {
        OxenteError::Runtime(e)
    }
}

impl<W: Write> Interpreter<'_, W> {
    pub fn new(output: &mut W) -> Interpreter<'_, W> {
        let ctx = Context::new();
        Interpreter {
            ctx: ctx.clone(),
            evaluator: Evaluator::new(output, ctx),
        }
    }

    /// Run `source` against this interpreter's global environment.
    ///
    /// Scan and parse diagnostics are accumulated; if any were raised the
    /// program is not executed and all of them are returned at once.  A
    /// fresh sink per call is what clears the error latches at REPL line
    /// boundaries.
    pub fn eval(&mut self, source: &str) -> Result<(), OxenteError> {
        let mut reporter = Reporter::new();
        trace!("scanning {} bytes of source", source.len());
        let tokens = Scanner::new(source, self.ctx.clone(), &mut reporter).scan_tokens();
        trace!("parsing {} tokens", tokens.len());
        let program = Parser::new(tokens, &mut reporter).parse_program();
        if reporter.had_error() {
            return Err(OxenteError::Parse(reporter.into_diagnostics()));
        }
        trace!("executing {} statements", program.len());
        self.evaluator.eval_program(&program)?;
        Ok(())
    }
}
