//! Parser: token stream to AST
//!
//! Hand-written recursive descent. Precedence, high to low: postfix
//! (call, method, subscript), unary negation, `* / %`, `+ -`, relational,
//! `and`, `or`, membership `in` / `not in`, assignment (right-associative).
//!
//! Statement-level `if/elif/else/endif` has no AST node of its own; it is
//! desugared into a `__condition(cond, [then...], [else...])` call, with
//! `elif` chains nesting another `__condition` in the else array.

#[cfg(test)]
mod tests;

use crate::ast::{AddOp, Arguments, CodeBlock, Expr, MulOp, RelOp, Span, Statement, UnaryOp};
use crate::error::{CompileError, Result};
use crate::lexer::Token;

/// Name of the synthetic conditional call produced for if statements
pub const CONDITION_FN: &str = "__condition";

/// Parse a token stream into a code block
pub fn parse(source: &str, tokens: Vec<(Token, Span)>) -> Result<CodeBlock> {
    Parser::new(source, tokens).parse_program()
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<(Token, Span)>) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
        }
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.eat(token) {
            Ok(())
        } else {
            match self.peek() {
                Some(found) => Err(self.err_here(format!("expected `{token}`, found `{found}`"))),
                None => Err(self.err_here(format!("expected `{token}`, found end of input"))),
            }
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&Token::Newline) {
            self.pos += 1;
        }
    }

    fn eat_newline(&mut self) -> bool {
        let ate = self.eat(&Token::Newline);
        if ate {
            self.skip_newlines();
        }
        ate
    }

    fn err_here(&self, message: impl Into<String>) -> CompileError {
        let span = self
            .tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|(_, s)| *s)
            .unwrap_or_default();
        let (line, column) = span.line_col(self.source);
        CompileError::parser(message, line, column, span)
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_program(&mut self) -> Result<CodeBlock> {
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at_end() {
            let expr = self.parse_statement()?;
            statements.push(Statement { expr });
            if !self.at_end() && !self.eat_newline() {
                return Err(self.err_here("expected newline after statement"));
            }
        }
        Ok(CodeBlock { statements })
    }

    fn parse_statement(&mut self) -> Result<Expr> {
        if self.eat(&Token::If) {
            self.parse_if_tail()
        } else {
            self.parse_expression()
        }
    }

    /// Parse the remainder of an if/elif arm: condition, body, and whatever
    /// follows (`elif`, `else`, `endif`). Consumes the closing `endif`.
    fn parse_if_tail(&mut self) -> Result<Expr> {
        let condition = self.parse_expression()?;
        if !self.eat_newline() {
            return Err(self.err_here("expected newline after if condition"));
        }
        let then_body = self.parse_branch_body()?;

        let else_body = if self.eat(&Token::Elif) {
            vec![self.parse_if_tail()?]
        } else if self.eat(&Token::Else) {
            if !self.eat_newline() {
                return Err(self.err_here("expected newline after else"));
            }
            let body = self.parse_branch_body()?;
            self.expect(&Token::Endif)?;
            body
        } else {
            self.expect(&Token::Endif)?;
            Vec::new()
        };

        Ok(Expr::FunctionCall {
            callee: Box::new(Expr::Identifier(CONDITION_FN.into())),
            args: Arguments {
                positional: vec![condition, Expr::Array(then_body), Expr::Array(else_body)],
                keyword: vec![],
            },
        })
    }

    /// Statements until `elif`, `else`, or `endif`
    fn parse_branch_body(&mut self) -> Result<Vec<Expr>> {
        let mut body = Vec::new();
        self.skip_newlines();
        loop {
            match self.peek() {
                None => return Err(self.err_here("unterminated if, expected `endif`")),
                Some(Token::Elif | Token::Else | Token::Endif) => return Ok(body),
                Some(_) => {
                    body.push(self.parse_statement()?);
                    if matches!(self.peek(), Some(Token::Elif | Token::Else | Token::Endif)) {
                        continue;
                    }
                    if !self.eat_newline() {
                        return Err(self.err_here("expected newline after statement"));
                    }
                }
            }
        }
    }

    // ========================================================================
    // Expressions, lowest binding first
    // ========================================================================

    fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let lhs = self.parse_membership()?;
        if self.eat(&Token::Assign) {
            if !matches!(lhs, Expr::Identifier(_)) {
                return Err(self.err_here("assignment target must be an identifier"));
            }
            // Right-associative
            let rhs = self.parse_assignment()?;
            return Ok(Expr::Assignment {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_membership(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_or()?;
        loop {
            let op = if self.eat(&Token::In) {
                RelOp::In
            } else if self.check(&Token::Not) && self.peek_second() == Some(&Token::In) {
                self.pos += 2;
                RelOp::NotIn
            } else if self.check(&Token::Not) {
                return Err(self.err_here("expected `in` after `not`"));
            } else {
                break;
            };
            let rhs = self.parse_or()?;
            lhs = Expr::Relational {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Relational {
                lhs: Box::new(lhs),
                op: RelOp::Or,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_relational()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_relational()?;
            lhs = Expr::Relational {
                lhs: Box::new(lhs),
                op: RelOp::And,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => RelOp::Lt,
                Some(Token::LtEq) => RelOp::Le,
                Some(Token::EqEq) => RelOp::Eq,
                Some(Token::NotEq) => RelOp::Ne,
                Some(Token::GtEq) => RelOp::Ge,
                Some(Token::Gt) => RelOp::Gt,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = Expr::Relational {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => AddOp::Add,
                Some(Token::Minus) => AddOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Additive {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => MulOp::Mul,
                Some(Token::Slash) => MulOp::Div,
                Some(Token::Percent) => MulOp::Mod,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Multiplicative {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        if self.eat(&Token::Minus) {
            let rhs = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                rhs: Box::new(rhs),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::LParen) => {
                    let args = self.parse_arguments()?;
                    expr = Expr::FunctionCall {
                        callee: Box::new(expr),
                        args,
                    };
                }
                Some(Token::Dot) => {
                    self.pos += 1;
                    let name = match self.advance() {
                        Some(Token::Ident(name)) => name,
                        _ => return Err(self.err_here("expected method name after `.`")),
                    };
                    // Bare attribute access is a method call with no arguments
                    let args = if self.check(&Token::LParen) {
                        self.parse_arguments()?
                    } else {
                        Arguments::default()
                    };
                    expr = Expr::MethodCall {
                        receiver: Box::new(expr),
                        name,
                        args,
                    };
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    self.skip_newlines();
                    let index = self.parse_expression()?;
                    self.skip_newlines();
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Subscript {
                        lhs: Box::new(expr),
                        rhs: Box::new(index),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek().cloned() {
            Some(Token::IntLit(n)) => {
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            Some(Token::StringLit(s)) => {
                self.pos += 1;
                Ok(Expr::String(s))
            }
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(Expr::Identifier(name))
            }
            Some(Token::True) => {
                self.pos += 1;
                Ok(Expr::Boolean(true))
            }
            Some(Token::False) => {
                self.pos += 1;
                Ok(Expr::Boolean(false))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                self.skip_newlines();
                let expr = self.parse_expression()?;
                self.skip_newlines();
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBracket) => self.parse_array(),
            Some(Token::LBrace) => self.parse_dict(),
            Some(found) => Err(self.err_here(format!("unexpected token `{found}`"))),
            None => Err(self.err_here("unexpected end of input")),
        }
    }

    fn parse_array(&mut self) -> Result<Expr> {
        self.expect(&Token::LBracket)?;
        let mut elements = Vec::new();
        self.skip_newlines();
        while !self.check(&Token::RBracket) {
            elements.push(self.parse_expression()?);
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&Token::RBracket)?;
        Ok(Expr::Array(elements))
    }

    fn parse_dict(&mut self) -> Result<Expr> {
        self.expect(&Token::LBrace)?;
        let mut pairs = Vec::new();
        self.skip_newlines();
        while !self.check(&Token::RBrace) {
            let key = self.parse_expression()?;
            self.skip_newlines();
            self.expect(&Token::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression()?;
            pairs.push((key, value));
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&Token::RBrace)?;
        Ok(Expr::Dict(pairs))
    }

    fn parse_arguments(&mut self) -> Result<Arguments> {
        self.expect(&Token::LParen)?;
        let mut args = Arguments::default();
        self.skip_newlines();
        while !self.check(&Token::RParen) {
            let expr = self.parse_expression()?;
            self.skip_newlines();
            if self.eat(&Token::Colon) {
                if !matches!(expr, Expr::Identifier(_)) {
                    return Err(self.err_here("keyword argument name must be an identifier"));
                }
                self.skip_newlines();
                let value = self.parse_expression()?;
                args.keyword.push((expr, value));
            } else {
                if !args.keyword.is_empty() {
                    return Err(self.err_here("positional argument after keyword argument"));
                }
                args.positional.push(expr);
            }
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }
}
