//! Shared interpreter context: interned names and the keyword table.

use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::token::TokenKind;

/// State shared by the scanner, parser and evaluator of one interpreter
/// session: the string interner and the keyword-to-token mapping.
///
/// Returned behind an `Rc` because it is threaded through every pipeline
/// stage.
#[derive(Debug)]
pub struct Context {
    symbols: RefCell<HashSet<Symbol>>,
    keywords: HashMap<&'static str, TokenKind>,
}

impl Context {
    pub fn new() -> Rc<Context> {
        Rc::new(Context {
            symbols: RefCell::new(HashSet::new()),
            keywords: KEYWORDS.iter().cloned().collect(),
        })
    }

    /// Intern `name` if needed and return its symbol.
    pub fn symbol(&self, name: &str) -> Symbol {
        let mut symbols = self.symbols.borrow_mut();
        if let Some(sym) = symbols.get(name) {
            sym.clone()
        } else {
            let sym = Symbol(Rc::from(name));
            symbols.insert(sym.clone());
            sym
        }
    }

    /// Return the token kind reserved for `name`, if it is a keyword.
    pub fn keyword(&self, name: &str) -> Option<TokenKind> {
        self.keywords.get(name).copied()
    }
}

/// An interned, immutable name.
///
/// The interner guarantees one allocation per distinct spelling, so symbols
/// compare by address rather than content.
#[derive(Debug, Clone, Hash)]
pub struct Symbol(Rc<str>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

const KEYWORDS: [(&str, TokenKind); 17] = [
    ("and", TokenKind::And),
    ("class", TokenKind::Class),
    ("else", TokenKind::Else),
    ("false", TokenKind::False),
    ("fun", TokenKind::Fun),
    ("for", TokenKind::For),
    ("if", TokenKind::If),
    ("nil", TokenKind::Nil),
    ("or", TokenKind::Or),
    ("print", TokenKind::Print),
    ("return", TokenKind::Return),
    ("super", TokenKind::Super),
    ("this", TokenKind::This),
    ("true", TokenKind::True),
    ("var", TokenKind::Var),
    ("while", TokenKind::While),
    ("break", TokenKind::Break),
];
