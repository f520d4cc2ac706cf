//! Tree-walking evaluator: runtime values, environments and statement
//! execution.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::io::prelude::*;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use thiserror::Error;

use crate::ast::{Expr, Lit, Stmt};
use crate::ctx::{Context, Symbol};
use crate::diag::Position;
use crate::token::{Token, TokenKind};

/// The runtime value domain.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Function(Function),
}

impl Value {
    /// Only `nil` and `false` are falsey.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl From<&Lit> for Value {
    fn from(lit: &Lit) -> Value {
        match lit {
            Lit::Nil => Value::Nil,
            Lit::Bool(b) => Value::Bool(*b),
            Lit::Number(n) => Value::Number(*n),
            Lit::Str(s) => Value::Str(s.clone()),
        }
    }
}

/// Structural equality within a kind; values of distinct kinds are never
/// equal.  Callables compare by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Number(l), Value::Number(r)) => l == r,
            (Value::Str(l), Value::Str(r)) => l == r,
            (Value::Function(l), Value::Function(r)) => l == r,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            // f64's shortest display prints integral values without a
            // fractional part.
            Value::Number(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Function(func) => write!(f, "{}", func),
        }
    }
}

/// A callable value: the native `clock` or a user function carrying its
/// captured environment.
#[derive(Clone)]
pub struct Function(Rc<FunctionImpl>);

struct FunctionImpl {
    name: Symbol,
    body: FunctionBody,
}

enum FunctionBody {
    Native {
        arity: usize,
        call: fn(&[Value]) -> Result<Value, RuntimeErrorKind>,
    },
    User {
        params: Vec<Symbol>,
        body: Vec<Stmt>,
        closure: Rc<Env>,
    },
}

impl Function {
    fn native(
        name: Symbol,
        arity: usize,
        call: fn(&[Value]) -> Result<Value, RuntimeErrorKind>,
    ) -> Function {
        Function(Rc::new(FunctionImpl {
            name,
            body: FunctionBody::Native { arity, call },
        }))
    }

    fn user(name: Symbol, params: Vec<Symbol>, body: Vec<Stmt>, closure: Rc<Env>) -> Function {
        Function(Rc::new(FunctionImpl {
            name,
            body: FunctionBody::User {
                params,
                body,
                closure,
            },
        }))
    }

    pub fn arity(&self) -> usize {
        match &self.0.body {
            FunctionBody::Native { arity, .. } => *arity,
            FunctionBody::User { params, .. } => params.len(),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Function {}

// Shallow by hand: a closure environment may refer back to the function.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.0.name)
            .field("arity", &self.arity())
            .finish()
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.body {
            FunctionBody::Native { .. } => write!(f, "<native fn>"),
            FunctionBody::User { .. } => write!(f, "<fn {}>", self.0.name),
        }
    }
}

/// Errors raised during evaluation.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// An error pinned to the line of the offending token.
    #[error("Runtime Error: {kind} [line {line}]")]
    Source {
        line: Position,
        kind: RuntimeErrorKind,
    },

    /// Failure writing program output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    fn new(line: Position, kind: RuntimeErrorKind) -> RuntimeError {
        RuntimeError::Source { line, kind }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandNotNumber,
    #[error("Operands must be numbers.")]
    OperandsNotNumbers,
    #[error("Operands must be two numbers or two strings.")]
    MixedAddition,
    #[error("Division by zero.")]
    DivByZero,
    #[error("Undefined variable '{0}'.")]
    UndefinedVar(String),
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    BadNumberOfArguments { expected: usize, got: usize },
    #[error("Cannot 'break' across a function boundary.")]
    BreakEscapesFunction,
    #[error("Cannot return from top-level code.")]
    TopLevelReturn,
}

/// How a statement finished: fell through, or started a non-local transfer.
/// `while` absorbs `Break`; a user-function call absorbs `Return`.
#[derive(Debug, PartialEq)]
enum Flow {
    Normal,
    Return(Position, Value),
    Break(Position),
}

/// Executes statements against a global environment, writing `print` output
/// to `output`.
#[derive(Debug)]
pub struct Evaluator<'t, W: Write> {
    output: &'t mut W,
    globals: Rc<Env>,
}

impl<'a, W: Write> Evaluator<'a, W> {
    pub fn new(output: &'a mut W, ctx: Rc<Context>) -> Evaluator<'a, W> {
        let globals = Env::new();
        debug!("defining native function 'clock'");
        let clock = ctx.symbol("clock");
        globals.define(
            &clock,
            Value::Function(Function::native(clock.clone(), 0, native_clock)),
        );
        Evaluator { output, globals }
    }

    /// Run a program in the global environment.  `return` and `break` must
    /// not reach the top level.
    pub fn eval_program(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        let globals = self.globals.clone();
        match self.eval_stmts(stmts, &globals)? {
            Flow::Normal => Ok(()),
            Flow::Return(line, _) => Err(RuntimeError::new(line, RuntimeErrorKind::TopLevelReturn)),
            Flow::Break(line) => Err(RuntimeError::new(
                line,
                RuntimeErrorKind::BreakEscapesFunction,
            )),
        }
    }

    fn eval_stmts(&mut self, stmts: &[Stmt], env: &Rc<Env>) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            match self.eval_stmt(stmt, env)? {
                Flow::Normal => (),
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&mut self, stmt: &Stmt, env: &Rc<Env>) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expression(e) => {
                self.eval_expr(e, env)?;
                Ok(Flow::Normal)
            }
            Stmt::Print(e) => {
                let value = self.eval_expr(e, env)?;
                writeln!(self.output, "{}", value)?;
                Ok(Flow::Normal)
            }
            Stmt::Var(name, init) => {
                let value = match init {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Nil,
                };
                env.define(&name.sym, value);
                Ok(Flow::Normal)
            }
            Stmt::Block(stmts) => self.eval_stmts(stmts, &Env::with_parent(Some(env.clone()))),
            Stmt::If(cond, then_branch, else_branch) => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_stmt(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.eval_stmt(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While(cond, body) => {
                while self.eval_expr(cond, env)?.is_truthy() {
                    match self.eval_stmt(body, env)? {
                        Flow::Normal => (),
                        Flow::Break(_) => break,
                        ret @ Flow::Return(..) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break(keyword) => Ok(Flow::Break(keyword.line)),
            Stmt::Function(name, params, body) => {
                // The *current* environment is captured: that is what makes
                // the function a closure.
                let params = params.iter().map(|p| p.sym.clone()).collect();
                let function =
                    Function::user(name.sym.clone(), params, body.clone(), env.clone());
                env.define(&name.sym, Value::Function(function));
                Ok(Flow::Normal)
            }
            Stmt::Return(keyword, value) => {
                let value = match value {
                    Some(e) => self.eval_expr(e, env)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(keyword.line, value))
            }
        }
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(lit) => Ok(Value::from(lit)),
            Expr::Grouping(inner) => self.eval_expr(inner, env),
            Expr::Unary(op, right) => {
                let right = self.eval_expr(right, env)?;
                match op.kind {
                    TokenKind::Minus => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RuntimeError::new(
                            op.line,
                            RuntimeErrorKind::OperandNotNumber,
                        )),
                    },
                    TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
                    _ => unreachable!("unary operator {:?}", op.kind),
                }
            }
            Expr::Binary(lhs, op, rhs) => {
                let left = self.eval_expr(lhs, env)?;
                let right = self.eval_expr(rhs, env)?;
                binary_op(op, left, right)
            }
            Expr::Ternary(cond, then_e, else_e) => {
                if self.eval_expr(cond, env)?.is_truthy() {
                    self.eval_expr(then_e, env)
                } else {
                    self.eval_expr(else_e, env)
                }
            }
            Expr::Variable(name) => env.get(&name.sym).ok_or_else(|| {
                RuntimeError::new(
                    name.line,
                    RuntimeErrorKind::UndefinedVar(name.sym.name().to_owned()),
                )
            }),
            Expr::Assign(name, value) => {
                let value = self.eval_expr(value, env)?;
                if env.assign(&name.sym, value.clone()) {
                    Ok(value)
                } else {
                    Err(RuntimeError::new(
                        name.line,
                        RuntimeErrorKind::UndefinedVar(name.sym.name().to_owned()),
                    ))
                }
            }
            Expr::Call(callee, paren, args) => {
                let callee = self.eval_expr(callee, env)?;
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push(self.eval_expr(arg, env)?);
                }
                match callee {
                    Value::Function(f) => self.call_function(&f, evaluated, paren.line),
                    _ => Err(RuntimeError::new(paren.line, RuntimeErrorKind::NotCallable)),
                }
            }
        }
    }

    fn call_function(
        &mut self,
        function: &Function,
        args: Vec<Value>,
        line: Position,
    ) -> Result<Value, RuntimeError> {
        if args.len() != function.arity() {
            return Err(RuntimeError::new(
                line,
                RuntimeErrorKind::BadNumberOfArguments {
                    expected: function.arity(),
                    got: args.len(),
                },
            ));
        }
        match &function.0.body {
            FunctionBody::Native { call, .. } => {
                (call)(&args).map_err(|kind| RuntimeError::new(line, kind))
            }
            FunctionBody::User {
                params,
                body,
                closure,
            } => {
                // The frame chains to the captured environment, not to the
                // caller's.
                let frame = Env::with_parent(Some(closure.clone()));
                for (param, value) in params.iter().zip(args) {
                    frame.define(param, value);
                }
                match self.eval_stmts(body, &frame)? {
                    Flow::Normal => Ok(Value::Nil),
                    Flow::Return(_, value) => Ok(value),
                    Flow::Break(line) => Err(RuntimeError::new(
                        line,
                        RuntimeErrorKind::BreakEscapesFunction,
                    )),
                }
            }
        }
    }
}

fn native_clock(_args: &[Value]) -> Result<Value, RuntimeErrorKind> {
    Ok(Value::Number(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before Unix epoch")
            .as_secs_f64(),
    ))
}

fn binary_op(op: &Token, left: Value, right: Value) -> Result<Value, RuntimeError> {
    let line = op.line;
    match op.kind {
        // The left operand was evaluated for its side effects only.
        TokenKind::Comma => Ok(right),
        TokenKind::Plus => match (left, right) {
            (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
            (l, r) if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) => {
                Ok(Value::Str(format!("{}{}", l, r)))
            }
            _ => Err(RuntimeError::new(line, RuntimeErrorKind::MixedAddition)),
        },
        TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
        TokenKind::BangEqual => Ok(Value::Bool(left != right)),
        _ => {
            let (l, r) = match (left, right) {
                (Value::Number(l), Value::Number(r)) => (l, r),
                _ => {
                    return Err(RuntimeError::new(
                        line,
                        RuntimeErrorKind::OperandsNotNumbers,
                    ))
                }
            };
            match op.kind {
                TokenKind::Minus => Ok(Value::Number(l - r)),
                TokenKind::Star => Ok(Value::Number(l * r)),
                TokenKind::Slash => {
                    if r == 0.0 {
                        Err(RuntimeError::new(line, RuntimeErrorKind::DivByZero))
                    } else {
                        Ok(Value::Number(l / r))
                    }
                }
                TokenKind::Greater => Ok(Value::Bool(l > r)),
                TokenKind::GreaterEqual => Ok(Value::Bool(l >= r)),
                TokenKind::Less => Ok(Value::Bool(l < r)),
                TokenKind::LessEqual => Ok(Value::Bool(l <= r)),
                _ => unreachable!("binary operator {:?}", op.kind),
            }
        }
    }
}

/// A lexical scope: bindings plus a link to the enclosing environment.
#[derive(Debug)]
struct Env {
    parent: Option<Rc<Env>>,
    bindings: RefCell<HashMap<Symbol, Value>>,
}

impl Env {
    fn new() -> Rc<Env> {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<Rc<Env>>) -> Rc<Env> {
        Rc::new(Env {
            parent,
            bindings: RefCell::new(HashMap::new()),
        })
    }

    /// Bind in this scope, shadowing any parent binding.  Redefinition in
    /// the same scope is permitted.
    fn define(&self, sym: &Symbol, val: Value) {
        self.bindings.borrow_mut().insert(sym.clone(), val);
    }

    /// Mutate the nearest existing binding.  Returns false when the name is
    /// bound nowhere on the chain; assignment never creates bindings.
    fn assign(&self, sym: &Symbol, val: Value) -> bool {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(sym) {
            *slot = val;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(sym, val),
            None => false,
        }
    }

    fn get(&self, sym: &Symbol) -> Option<Value> {
        match self.bindings.borrow().get(sym) {
            Some(v) => Some(v.clone()),
            None => self.parent.as_ref().and_then(|p| p.get(sym)),
        }
    }
}
