//! Recursive-descent parser with panic-mode recovery.

use crate::ast::{Expr, Ident, Lit, Stmt};
use crate::diag::Reporter;
use crate::token::{Token, TokenKind};

/// Sentinel thrown out of the current declaration on a parse error.  The
/// diagnostic itself has already been handed to the sink by then.
struct ParseFail;

type PResult<T> = Result<T, ParseFail>;

/// One-token-lookahead parser over a scanned token buffer.
///
/// Errors never abort the whole parse: each failed declaration is reported,
/// the parser resynchronises at the next statement boundary, and parsing
/// resumes so a single run surfaces as many syntax errors as possible.
pub struct Parser<'r> {
    tokens: Vec<Token>,
    current: usize,
    // Number of enclosing loops; validates `break`.
    loop_depth: u32,
    reporter: &'r mut Reporter,
}

impl<'r> Parser<'r> {
    pub fn new(tokens: Vec<Token>, reporter: &'r mut Reporter) -> Parser<'r> {
        Parser {
            tokens,
            current: 0,
            loop_depth: 0,
            reporter,
        }
    }

    pub fn parse_program(mut self) -> Vec<Stmt> {
        let mut program = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                program.push(stmt);
            }
        }
        program
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = match self.peek().kind {
            TokenKind::Fun => self.fun_decl(),
            TokenKind::Var => self.var_decl(),
            _ => self.statement(),
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(ParseFail) => {
                self.synchronize();
                None
            }
        }
    }

    /// Parse variable declaration.  Current token is `var`.
    fn var_decl(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.identifier("Expect variable name.")?;
        let init = if self.match_kind(TokenKind::Equal) {
            Some(Box::new(self.expression()?))
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var(name, init))
    }

    /// Parse function declaration.  Current token is `fun`.
    fn fun_decl(&mut self) -> PResult<Stmt> {
        self.advance();
        let name = self.identifier("Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;
        let mut params = vec![];
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= 255 {
                    let at = self.peek().clone();
                    self.reporter
                        .error_at(&at, "Can't have more than 255 parameters.");
                }
                params.push(self.identifier("Expect parameter name.")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;
        let body = self.block_body()?;
        Ok(Stmt::Function(name, params, body))
    }

    fn identifier(&mut self, message: &str) -> PResult<Ident> {
        let token = self.peek().clone();
        if let Some(sym) = token.ident() {
            self.advance();
            Ok(Ident {
                sym,
                line: token.line,
            })
        } else {
            self.reporter.error_at(&token, message);
            Err(ParseFail)
        }
    }

    fn statement(&mut self) -> PResult<Stmt> {
        match self.peek().kind {
            TokenKind::Print => {
                self.advance();
                let expr = Box::new(self.expression()?);
                self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
                Ok(Stmt::Print(expr))
            }
            TokenKind::LeftBrace => {
                self.advance();
                Ok(Stmt::Block(self.block_body()?))
            }
            TokenKind::If => self.if_stmt(),
            TokenKind::While => self.while_stmt(),
            TokenKind::For => self.for_stmt(),
            TokenKind::Return => {
                let keyword = self.advance().clone();
                let value = if self.check(TokenKind::Semicolon) {
                    None
                } else {
                    Some(Box::new(self.expression()?))
                };
                self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
                Ok(Stmt::Return(keyword, value))
            }
            TokenKind::Break => {
                let keyword = self.advance().clone();
                if self.loop_depth == 0 {
                    self.reporter
                        .error_at(&keyword, "Must be inside a loop to use 'break'.");
                }
                self.consume(TokenKind::Semicolon, "Expect ';' after 'break'.")?;
                Ok(Stmt::Break(keyword))
            }
            _ => {
                let expr = Box::new(self.expression()?);
                self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    /// Parse the declarations of a block.  The opening brace has been
    /// consumed already; errors recover inside the block.
    fn block_body(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = vec![];
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(stmts)
    }

    fn if_stmt(&mut self) -> PResult<Stmt> {
        self.advance();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let cond = Box::new(self.expression()?);
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If(cond, then_branch, else_branch))
    }

    fn while_stmt(&mut self) -> PResult<Stmt> {
        self.advance();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let cond = Box::new(self.expression()?);
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        Ok(Stmt::While(cond, Box::new(body?)))
    }

    /// `for` desugars into a block wrapping an equivalent `while` loop.
    fn for_stmt(&mut self) -> PResult<Stmt> {
        self.advance();
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.check(TokenKind::Var) {
            Some(self.var_decl()?)
        } else {
            let expr = Box::new(self.expression()?);
            self.consume(TokenKind::Semicolon, "Expect ';' after loop initializer.")?;
            Some(Stmt::Expression(expr))
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        let mut body = body?;

        if let Some(inc) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(Box::new(inc))]);
        }
        let cond = condition.unwrap_or(Expr::Literal(Lit::Bool(true)));
        let mut desugared = Stmt::While(Box::new(cond), Box::new(body));
        if let Some(init) = initializer {
            desugared = Stmt::Block(vec![init, desugared]);
        }
        Ok(desugared)
    }

    fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        let expr = self.comma()?;
        if self.check(TokenKind::Equal) {
            let equals = self.advance().clone();
            let value = self.assignment()?;
            if let Expr::Variable(name) = expr {
                return Ok(Expr::Assign(name, Box::new(value)));
            }
            // Report and keep parsing; the latch blocks execution anyway.
            self.reporter
                .error_at(&equals, "Invalid assignment target.");
            return Ok(value);
        }
        Ok(expr)
    }

    fn comma(&mut self) -> PResult<Expr> {
        let mut expr = self.ternary()?;
        while self.check(TokenKind::Comma) {
            let op = self.advance().clone();
            let right = self.ternary()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    /// `cond ? then : else`; the else arm associates to the right.
    fn ternary(&mut self) -> PResult<Expr> {
        let cond = self.equality()?;
        if self.match_kind(TokenKind::Question) {
            let then_branch = self.expression()?;
            self.consume(TokenKind::Colon, "Expect ':' in ternary expression.")?;
            let else_branch = self.ternary()?;
            Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then_branch),
                Box::new(else_branch),
            ))
        } else {
            Ok(cond)
        }
    }

    fn equality(&mut self) -> PResult<Expr> {
        let mut expr = self.comparison()?;
        while matches!(self.peek().kind, TokenKind::BangEqual | TokenKind::EqualEqual) {
            let op = self.advance().clone();
            let right = self.comparison()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let mut expr = self.term()?;
        while matches!(
            self.peek().kind,
            TokenKind::Greater | TokenKind::GreaterEqual | TokenKind::Less | TokenKind::LessEqual
        ) {
            let op = self.advance().clone();
            let right = self.term()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn term(&mut self) -> PResult<Expr> {
        let mut expr = self.factor()?;
        while matches!(self.peek().kind, TokenKind::Minus | TokenKind::Plus) {
            let op = self.advance().clone();
            let right = self.factor()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn factor(&mut self) -> PResult<Expr> {
        let mut expr = self.unary()?;
        while matches!(self.peek().kind, TokenKind::Slash | TokenKind::Star) {
            let op = self.advance().clone();
            let right = self.unary()?;
            expr = Expr::Binary(Box::new(expr), op, Box::new(right));
        }
        Ok(expr)
    }

    fn unary(&mut self) -> PResult<Expr> {
        if matches!(self.peek().kind, TokenKind::Bang | TokenKind::Minus) {
            let op = self.advance().clone();
            let right = self.unary()?;
            Ok(Expr::Unary(op, Box::new(right)))
        } else {
            self.call()
        }
    }

    fn call(&mut self) -> PResult<Expr> {
        let mut expr = self.primary()?;
        while self.match_kind(TokenKind::LeftParen) {
            let mut args = vec![];
            if !self.check(TokenKind::RightParen) {
                loop {
                    if args.len() >= 255 {
                        let at = self.peek().clone();
                        self.reporter
                            .error_at(&at, "Can't have more than 255 arguments.");
                    }
                    args.push(self.argument()?);
                    if !self.match_kind(TokenKind::Comma) {
                        break;
                    }
                }
            }
            let paren = self
                .consume(TokenKind::RightParen, "Expect ')' after arguments.")?
                .clone();
            expr = Expr::Call(Box::new(expr), paren, args);
        }
        Ok(expr)
    }

    /// One call argument: assignment is allowed, the sequencing comma is not
    /// (it separates arguments instead).
    fn argument(&mut self) -> PResult<Expr> {
        let expr = self.ternary()?;
        if self.check(TokenKind::Equal) {
            let equals = self.advance().clone();
            let value = self.argument()?;
            if let Expr::Variable(name) = expr {
                return Ok(Expr::Assign(name, Box::new(value)));
            }
            self.reporter
                .error_at(&equals, "Invalid assignment target.");
            return Ok(value);
        }
        Ok(expr)
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Literal(Lit::Nil))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Lit::Bool(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Lit::Bool(false)))
            }
            TokenKind::Number => {
                self.advance();
                match token.literal {
                    crate::token::Literal::Number(n) => Ok(Expr::Literal(Lit::Number(n))),
                    _ => {
                        self.reporter.error_at(&token, "Expect expression.");
                        Err(ParseFail)
                    }
                }
            }
            TokenKind::String => {
                self.advance();
                match token.literal {
                    crate::token::Literal::Str(s) => Ok(Expr::Literal(Lit::Str(s))),
                    _ => {
                        self.reporter.error_at(&token, "Expect expression.");
                        Err(ParseFail)
                    }
                }
            }
            TokenKind::Identifier => {
                let name = self.identifier("Expect expression.")?;
                Ok(Expr::Variable(name))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                Ok(Expr::Grouping(Box::new(expr)))
            }
            // Error productions: a binary operator with no left operand.
            // Consume the right operand at the operator's precedence so one
            // mistake does not cascade.
            TokenKind::BangEqual | TokenKind::EqualEqual => {
                self.missing_lhs(&token);
                self.comparison()?;
                Ok(Expr::Literal(Lit::Nil))
            }
            TokenKind::Greater
            | TokenKind::GreaterEqual
            | TokenKind::Less
            | TokenKind::LessEqual => {
                self.missing_lhs(&token);
                self.term()?;
                Ok(Expr::Literal(Lit::Nil))
            }
            TokenKind::Plus => {
                self.missing_lhs(&token);
                self.factor()?;
                Ok(Expr::Literal(Lit::Nil))
            }
            TokenKind::Slash | TokenKind::Star => {
                self.missing_lhs(&token);
                self.unary()?;
                Ok(Expr::Literal(Lit::Nil))
            }
            _ => {
                self.reporter.error_at(&token, "Expect expression.");
                Err(ParseFail)
            }
        }
    }

    fn missing_lhs(&mut self, token: &Token) {
        self.reporter.error_at(token, "Missing left-hand operand.");
        self.advance();
    }

    /// Discard tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> PResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            self.reporter.error_at(&token, message);
            Err(ParseFail)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Context;
    use crate::scanner::Scanner;
    use crate::token::Literal;
    use std::rc::Rc;

    fn parse_with_ctx(ctx: Rc<Context>, input: &str) -> (Vec<Stmt>, Vec<String>) {
        let mut reporter = Reporter::new();
        let tokens = Scanner::new(input, ctx, &mut reporter).scan_tokens();
        let program = Parser::new(tokens, &mut reporter).parse_program();
        let rendered = reporter
            .into_diagnostics()
            .iter()
            .map(|d| d.to_string())
            .collect();
        (program, rendered)
    }

    fn parse_prg(input: &str) -> Vec<Stmt> {
        let (program, errors) = parse_with_ctx(Context::new(), input);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        program
    }

    fn parse_errors(input: &str) -> Vec<String> {
        parse_with_ctx(Context::new(), input).1
    }

    /// Parse a single expression statement and unwrap the expression.
    fn parse_expr(input: &str) -> Expr {
        parse_expr_with_ctx(Context::new(), input)
    }

    fn parse_expr_with_ctx(ctx: Rc<Context>, input: &str) -> Expr {
        let source = format!("{};", input);
        let (mut program, errors) = parse_with_ctx(ctx, &source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        assert_eq!(program.len(), 1);
        match program.remove(0) {
            Stmt::Expression(e) => *e,
            stmt => panic!("expected expression statement, got {:?}", stmt),
        }
    }

    fn num(n: f64) -> Expr {
        Expr::Literal(Lit::Number(n))
    }

    fn op(kind: TokenKind, lexeme: &str, line: u32) -> Token {
        Token::new(kind, lexeme.to_string(), Literal::None, line)
    }

    fn ident(ctx: &Context, name: &str) -> Ident {
        Ident {
            sym: ctx.symbol(name),
            line: 1,
        }
    }

    #[test]
    fn number() {
        assert_eq!(parse_expr("42"), num(42.0));
    }

    #[test]
    fn literals() {
        assert_eq!(parse_expr("true"), Expr::Literal(Lit::Bool(true)));
        assert_eq!(parse_expr("false"), Expr::Literal(Lit::Bool(false)));
        assert_eq!(parse_expr("nil"), Expr::Literal(Lit::Nil));
        assert_eq!(
            parse_expr("\"hi\""),
            Expr::Literal(Lit::Str("hi".to_string()))
        );
    }

    #[test]
    fn unary_minus_nests() {
        assert_eq!(
            parse_expr("--42"),
            Expr::Unary(
                op(TokenKind::Minus, "-", 1),
                Box::new(Expr::Unary(op(TokenKind::Minus, "-", 1), Box::new(num(42.0))))
            )
        );
    }

    #[test]
    fn bang_is_unary() {
        assert_eq!(
            parse_expr("!true"),
            Expr::Unary(
                op(TokenKind::Bang, "!", 1),
                Box::new(Expr::Literal(Lit::Bool(true)))
            )
        );
    }

    #[test]
    fn addition_is_left_associative() {
        assert_eq!(
            parse_expr("1 + 2 + 3"),
            Expr::Binary(
                Box::new(Expr::Binary(
                    Box::new(num(1.0)),
                    op(TokenKind::Plus, "+", 1),
                    Box::new(num(2.0))
                )),
                op(TokenKind::Plus, "+", 1),
                Box::new(num(3.0))
            )
        );
    }

    #[test]
    fn factors_have_precedence_over_terms() {
        assert_eq!(
            parse_expr("1 + 2 * 3"),
            Expr::Binary(
                Box::new(num(1.0)),
                op(TokenKind::Plus, "+", 1),
                Box::new(Expr::Binary(
                    Box::new(num(2.0)),
                    op(TokenKind::Star, "*", 1),
                    Box::new(num(3.0))
                ))
            )
        );
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        assert_eq!(
            parse_expr("1 < 2 == true"),
            Expr::Binary(
                Box::new(Expr::Binary(
                    Box::new(num(1.0)),
                    op(TokenKind::Less, "<", 1),
                    Box::new(num(2.0))
                )),
                op(TokenKind::EqualEqual, "==", 1),
                Box::new(Expr::Literal(Lit::Bool(true)))
            )
        );
    }

    #[test]
    fn grouping_takes_precedence() {
        assert_eq!(
            parse_expr("2 * (3 + 4)"),
            Expr::Binary(
                Box::new(num(2.0)),
                op(TokenKind::Star, "*", 1),
                Box::new(Expr::Grouping(Box::new(Expr::Binary(
                    Box::new(num(3.0)),
                    op(TokenKind::Plus, "+", 1),
                    Box::new(num(4.0))
                ))))
            )
        );
    }

    #[test]
    fn comma_sequences_and_is_left_associative() {
        assert_eq!(
            parse_expr("1, 2, 3"),
            Expr::Binary(
                Box::new(Expr::Binary(
                    Box::new(num(1.0)),
                    op(TokenKind::Comma, ",", 1),
                    Box::new(num(2.0))
                )),
                op(TokenKind::Comma, ",", 1),
                Box::new(num(3.0))
            )
        );
    }

    #[test]
    fn ternary_else_associates_right() {
        assert_eq!(
            parse_expr("true ? 1 : false ? 2 : 3"),
            Expr::Ternary(
                Box::new(Expr::Literal(Lit::Bool(true))),
                Box::new(num(1.0)),
                Box::new(Expr::Ternary(
                    Box::new(Expr::Literal(Lit::Bool(false))),
                    Box::new(num(2.0)),
                    Box::new(num(3.0))
                ))
            )
        );
    }

    #[test]
    fn assignment_chains_right() {
        let ctx = Context::new();
        assert_eq!(
            parse_expr_with_ctx(ctx.clone(), "a = b = 1"),
            Expr::Assign(
                ident(&ctx, "a"),
                Box::new(Expr::Assign(ident(&ctx, "b"), Box::new(num(1.0))))
            )
        );
    }

    #[test]
    fn assignment_of_comma_sequence() {
        let ctx = Context::new();
        assert_eq!(
            parse_expr_with_ctx(ctx.clone(), "a = 1, 2"),
            Expr::Assign(
                ident(&ctx, "a"),
                Box::new(Expr::Binary(
                    Box::new(num(1.0)),
                    op(TokenKind::Comma, ",", 1),
                    Box::new(num(2.0))
                ))
            )
        );
    }

    #[test]
    fn invalid_assignment_target_is_reported_without_aborting() {
        let errors = parse_errors("1 = 2;");
        assert_eq!(errors, vec!["[line 1] Error at '=': Invalid assignment target."]);
    }

    #[test]
    fn call_with_separate_arguments() {
        let ctx = Context::new();
        let expr = parse_expr_with_ctx(ctx.clone(), "f(1, 2)");
        match expr {
            Expr::Call(callee, _, args) => {
                assert_eq!(*callee, Expr::Variable(ident(&ctx, "f")));
                assert_eq!(args, vec![num(1.0), num(2.0)]);
            }
            e => panic!("expected call, got {:?}", e),
        }
    }

    #[test]
    fn grouped_comma_is_one_argument() {
        let expr = parse_expr("f((1, 2))");
        match expr {
            Expr::Call(_, _, args) => assert_eq!(args.len(), 1),
            e => panic!("expected call, got {:?}", e),
        }
    }

    #[test]
    fn curried_calls() {
        let expr = parse_expr("f()()");
        match expr {
            Expr::Call(callee, _, args) => {
                assert!(args.is_empty());
                assert!(matches!(*callee, Expr::Call(..)));
            }
            e => panic!("expected call, got {:?}", e),
        }
    }

    #[test]
    fn missing_left_operand_is_reported_and_recovered() {
        let (program, errors) = parse_with_ctx(Context::new(), "== 1; print 2;");
        assert_eq!(errors, vec!["[line 1] Error at '==': Missing left-hand operand."]);
        // The bad expression collapses to nil and the next statement parses.
        assert_eq!(program.len(), 2);
        assert_eq!(program[0], Stmt::Expression(Box::new(Expr::Literal(Lit::Nil))));
        assert!(matches!(program[1], Stmt::Print(_)));
    }

    #[test]
    fn var_decl_with_and_without_initializer() {
        let ctx = Context::new();
        let (program, errors) = parse_with_ctx(ctx.clone(), "var foo; var bar = 2;");
        assert!(errors.is_empty());
        assert_eq!(
            program,
            vec![
                Stmt::Var(ident(&ctx, "foo"), None),
                Stmt::Var(ident(&ctx, "bar"), Some(Box::new(num(2.0)))),
            ]
        );
    }

    #[test]
    fn print_stmt() {
        assert_eq!(
            parse_prg("print 1;"),
            vec![Stmt::Print(Box::new(num(1.0)))]
        );
    }

    #[test]
    fn block_with_many_stmts() {
        assert_eq!(
            parse_prg("{ 1; 2; }"),
            vec![Stmt::Block(vec![
                Stmt::Expression(Box::new(num(1.0))),
                Stmt::Expression(Box::new(num(2.0))),
            ])]
        );
    }

    #[test]
    fn if_and_if_else() {
        let program = parse_prg("if (true) 1; if (true) 1; else 2;");
        match &program[0] {
            Stmt::If(_, _, else_branch) => assert!(else_branch.is_none()),
            s => panic!("expected if, got {:?}", s),
        }
        match &program[1] {
            Stmt::If(_, _, else_branch) => assert!(else_branch.is_some()),
            s => panic!("expected if, got {:?}", s),
        }
    }

    #[test]
    fn while_stmt() {
        assert_eq!(
            parse_prg("while (true) 1;"),
            vec![Stmt::While(
                Box::new(Expr::Literal(Lit::Bool(true))),
                Box::new(Stmt::Expression(Box::new(num(1.0)))),
            )]
        );
    }

    #[test]
    fn for_desugars_to_while_in_a_block() {
        let ctx = Context::new();
        let (program, errors) = parse_with_ctx(ctx.clone(), "for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(errors.is_empty());
        assert_eq!(program.len(), 1);
        let outer = match &program[0] {
            Stmt::Block(stmts) => stmts,
            s => panic!("expected block, got {:?}", s),
        };
        assert!(matches!(outer[0], Stmt::Var(..)));
        let (cond, body) = match &outer[1] {
            Stmt::While(cond, body) => (cond, body),
            s => panic!("expected while, got {:?}", s),
        };
        assert!(matches!(**cond, Expr::Binary(..)));
        // Body block runs the original body then the increment.
        match &**body {
            Stmt::Block(stmts) => {
                assert!(matches!(stmts[0], Stmt::Print(_)));
                assert!(matches!(stmts[1], Stmt::Expression(_)));
            }
            s => panic!("expected block body, got {:?}", s),
        }
    }

    #[test]
    fn for_with_empty_clauses() {
        let program = parse_prg("for (;;) break;");
        // No initializer: the loop is not wrapped in an outer block, and the
        // omitted condition becomes `true`.
        assert_eq!(
            program,
            vec![Stmt::While(
                Box::new(Expr::Literal(Lit::Bool(true))),
                Box::new(Stmt::Break(op(TokenKind::Break, "break", 1))),
            )]
        );
    }

    #[test]
    fn break_outside_loop_is_reported() {
        let errors = parse_errors("break;");
        assert_eq!(
            errors,
            vec!["[line 1] Error at 'break': Must be inside a loop to use 'break'."]
        );
    }

    #[test]
    fn break_inside_nested_block_of_loop_is_fine() {
        let program = parse_prg("while (true) { if (true) break; }");
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn return_with_and_without_value() {
        let program = parse_prg("fun f() { return; return 1; }");
        match &program[0] {
            Stmt::Function(_, _, body) => {
                assert!(matches!(&body[0], Stmt::Return(_, None)));
                assert!(matches!(&body[1], Stmt::Return(_, Some(_))));
            }
            s => panic!("expected function, got {:?}", s),
        }
    }

    #[test]
    fn fun_decl_with_params() {
        let ctx = Context::new();
        let (program, errors) = parse_with_ctx(ctx.clone(), "fun add(a, b) { print a + b; }");
        assert!(errors.is_empty());
        match &program[0] {
            Stmt::Function(name, params, body) => {
                assert_eq!(name, &ident(&ctx, "add"));
                assert_eq!(params, &vec![ident(&ctx, "a"), ident(&ctx, "b")]);
                assert_eq!(body.len(), 1);
            }
            s => panic!("expected function, got {:?}", s),
        }
    }

    #[test]
    fn too_many_arguments_is_reported_but_parsing_continues() {
        let args: Vec<String> = (0..=255).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (program, errors) = parse_with_ctx(Context::new(), &source);
        assert_eq!(program.len(), 1);
        assert_eq!(
            errors,
            vec!["[line 1] Error at '255': Can't have more than 255 arguments."]
        );
    }

    #[test]
    fn panic_mode_recovers_at_statement_boundary() {
        let (program, errors) = parse_with_ctx(Context::new(), "var = 1; print 2;");
        assert_eq!(errors, vec!["[line 1] Error at '=': Expect variable name."]);
        assert_eq!(program.len(), 1);
        assert!(matches!(program[0], Stmt::Print(_)));
    }

    #[test]
    fn several_errors_are_all_reported() {
        let (program, errors) = parse_with_ctx(Context::new(), "var = 1;\nvar = 2;\nprint 3;");
        assert_eq!(
            errors,
            vec![
                "[line 1] Error at '=': Expect variable name.",
                "[line 2] Error at '=': Expect variable name.",
            ]
        );
        assert_eq!(program.len(), 1);
        assert!(matches!(program[0], Stmt::Print(_)));
    }

    #[test]
    fn missing_paren_is_reported_at_eof() {
        let errors = parse_errors("(1");
        assert_eq!(
            errors,
            vec!["[line 1] Error at end: Expect ')' after expression."]
        );
    }

    #[test]
    fn reserved_class_keyword_is_rejected() {
        let errors = parse_errors("class Foo {}");
        assert!(!errors.is_empty());
    }

    #[test]
    fn parenthesised_print_is_idempotent() {
        let first = parse_expr("1 + 2 * -3 == (4, 5) ? \"a\" : nil").to_string();
        let second = parse_expr(&first).to_string();
        assert_eq!(first, second);
    }
}
