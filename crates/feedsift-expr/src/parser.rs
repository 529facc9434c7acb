//! Recursive descent parser for filter expressions.

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::error::{CompileError, CompileResult};
use crate::lexer::{Lexer, PositionedToken, Token};
use crate::value::Value;

/// Maximum nesting depth accepted before the parser gives up.
const MAX_DEPTH: usize = 128;

/// Parser for filter expressions.
///
/// # Grammar
///
/// ```text
/// expression     ::= conditional
/// conditional    ::= or_expr ("?" conditional ":" conditional)?
/// or_expr        ::= and_expr ("||" and_expr)*
/// and_expr       ::= relation ("&&" relation)*
/// relation       ::= addition (relop addition)*
/// relop          ::= "==" | "!=" | "<" | "<=" | ">" | ">=" | "in"
/// addition       ::= multiplication (("+" | "-") multiplication)*
/// multiplication ::= unary (("*" | "/" | "%") unary)*
/// unary          ::= ("!" | "-") unary | member
/// member         ::= primary ("." ident call_args? | "[" expression "]")*
/// primary        ::= literal | ident call_args? | "(" expression ")"
///                  | "[" (expression ("," expression)* ","?)? "]"
/// call_args      ::= "(" (expression ("," expression)*)? ")"
/// ```
///
/// # Operator Precedence (highest to lowest)
///
/// 1. member selection, calls and indexing
/// 2. `!` and unary `-`
/// 3. `*`, `/`, `%`
/// 4. `+`, `-`
/// 5. relations and `in`
/// 6. `&&`
/// 7. `||`
/// 8. `?:` (right-associative)
pub struct Parser {
    tokens: Vec<PositionedToken>,
    position: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    /// Parses an expression string into an unchecked AST.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::EmptyExpression` if the input is blank, or
    /// `CompileError::Syntax` for anything that is not well formed.
    pub fn parse(input: &str) -> CompileResult<Expr> {
        if input.trim().is_empty() {
            return Err(CompileError::EmptyExpression);
        }

        let result = Lexer::new(input).tokenize_with_errors();
        if let Some(error) = result.errors.into_iter().next() {
            return Err(CompileError::syntax(error.position, error.message));
        }
        if result.tokens.is_empty() {
            return Err(CompileError::EmptyExpression);
        }

        let mut parser = Self {
            tokens: result.tokens,
            position: 0,
            end: input.len(),
            depth: 0,
        };
        let expr = parser.parse_expression()?;

        // Check that we consumed all tokens
        if let Some(remaining) = parser.peek_positioned() {
            return Err(CompileError::syntax(
                remaining.position,
                format!("unexpected token '{}'", remaining.token),
            ));
        }

        Ok(expr)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|pt| &pt.token)
    }

    fn peek_positioned(&self) -> Option<&PositionedToken> {
        self.tokens.get(self.position)
    }

    /// Byte offset of the current token, or the end of input.
    fn current_position(&self) -> usize {
        self.peek_positioned().map_or(self.end, |pt| pt.position)
    }

    /// Consumes and returns the current token.
    fn advance(&mut self) -> Option<PositionedToken> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Checks if the current token matches the expected token.
    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    /// Consumes the expected token or reports what was found instead.
    fn expect(&mut self, expected: &Token) -> CompileResult<usize> {
        match self.peek_positioned() {
            Some(pt) if &pt.token == expected => {
                let position = pt.position;
                self.position += 1;
                Ok(position)
            }
            Some(pt) => Err(CompileError::syntax(
                pt.position,
                format!("expected '{}' but found '{}'", expected, pt.token),
            )),
            None => Err(CompileError::syntax(
                self.end,
                format!("expected '{}' but reached end of expression", expected),
            )),
        }
    }

    fn enter(&mut self) -> CompileResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CompileError::syntax(
                self.current_position(),
                "expression is nested too deeply",
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    /// Releases the depth held by the links of a loop-built chain.
    fn leave_chain(&mut self, links: usize) {
        self.depth -= links;
    }

    /// Parses the top-level expression.
    fn parse_expression(&mut self) -> CompileResult<Expr> {
        self.enter()?;
        let expr = self.parse_conditional();
        self.leave();
        expr
    }

    /// Parses `or_expr ("?" conditional ":" conditional)?`
    fn parse_conditional(&mut self) -> CompileResult<Expr> {
        let condition = self.parse_or_expr()?;
        if !self.check(&Token::Question) {
            return Ok(condition);
        }
        let position = self.current_position();
        self.advance(); // consume '?'
        let then = self.parse_expression()?;
        self.expect(&Token::Colon)?;
        let otherwise = self.parse_expression()?;
        Ok(Expr::new(
            ExprKind::Conditional {
                condition: Box::new(condition),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            position,
        ))
    }

    /// Parses OR expressions: `and_expr ("||" and_expr)*`
    fn parse_or_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_and_expr()?;
        let mut links = 0;

        while self.check(&Token::Or) {
            self.enter()?;
            links += 1;
            let position = self.current_position();
            self.advance(); // consume '||'
            let right = self.parse_and_expr()?;
            left = Expr::binary(BinaryOp::Or, left, right, position);
        }

        self.leave_chain(links);
        Ok(left)
    }

    /// Parses AND expressions: `relation ("&&" relation)*`
    fn parse_and_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_relation()?;
        let mut links = 0;

        while self.check(&Token::And) {
            self.enter()?;
            links += 1;
            let position = self.current_position();
            self.advance(); // consume '&&'
            let right = self.parse_relation()?;
            left = Expr::binary(BinaryOp::And, left, right, position);
        }

        self.leave_chain(links);
        Ok(left)
    }

    fn parse_relation(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_addition()?;
        let mut links = 0;

        loop {
            let op = match self.peek() {
                Some(Token::Equal) => BinaryOp::Equal,
                Some(Token::NotEqual) => BinaryOp::NotEqual,
                Some(Token::Less) => BinaryOp::Less,
                Some(Token::LessEqual) => BinaryOp::LessEqual,
                Some(Token::Greater) => BinaryOp::Greater,
                Some(Token::GreaterEqual) => BinaryOp::GreaterEqual,
                Some(Token::In) => BinaryOp::In,
                _ => break,
            };
            self.enter()?;
            links += 1;
            let position = self.current_position();
            self.advance();
            let right = self.parse_addition()?;
            left = Expr::binary(op, left, right, position);
        }

        self.leave_chain(links);
        Ok(left)
    }

    fn parse_addition(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_multiplication()?;
        let mut links = 0;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.enter()?;
            links += 1;
            let position = self.current_position();
            self.advance();
            let right = self.parse_multiplication()?;
            left = Expr::binary(op, left, right, position);
        }

        self.leave_chain(links);
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_unary()?;
        let mut links = 0;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => break,
            };
            self.enter()?;
            links += 1;
            let position = self.current_position();
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right, position);
        }

        self.leave_chain(links);
        Ok(left)
    }

    /// Parses unary expressions: `("!" | "-") unary | member`
    fn parse_unary(&mut self) -> CompileResult<Expr> {
        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            _ => return self.parse_member(),
        };
        let position = self.current_position();
        self.advance();

        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        let operand = operand?;

        // Fold negative numeric literals so `-1` is a constant.
        if op == UnaryOp::Negate {
            match operand.kind {
                ExprKind::Literal(Value::Int(n)) => {
                    return Ok(Expr::new(ExprKind::Literal(Value::Int(-n)), position));
                }
                ExprKind::Literal(Value::Double(n)) => {
                    return Ok(Expr::new(ExprKind::Literal(Value::Double(-n)), position));
                }
                _ => {}
            }
        }
        Ok(Expr::unary(op, operand, position))
    }

    /// Parses selections, method calls and indexing after a primary.
    fn parse_member(&mut self) -> CompileResult<Expr> {
        let mut expr = self.parse_primary()?;
        let mut links = 0;

        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.enter()?;
                    links += 1;
                    self.advance(); // consume '.'
                    let (name, position) = self.expect_ident()?;
                    if self.check(&Token::OpenParen) {
                        let args = self.parse_call_args()?;
                        expr = Expr::new(
                            ExprKind::Call {
                                target: Some(Box::new(expr)),
                                function: name,
                                args,
                            },
                            position,
                        );
                    } else {
                        expr = Expr::new(
                            ExprKind::Select {
                                operand: Box::new(expr),
                                field: name,
                            },
                            position,
                        );
                    }
                }
                Some(Token::OpenBracket) => {
                    self.enter()?;
                    links += 1;
                    let position = self.current_position();
                    self.advance(); // consume '['
                    let index = self.parse_expression()?;
                    self.expect(&Token::CloseBracket)?;
                    expr = Expr::new(
                        ExprKind::Index {
                            operand: Box::new(expr),
                            index: Box::new(index),
                        },
                        position,
                    );
                }
                _ => break,
            }
        }

        self.leave_chain(links);
        Ok(expr)
    }

    fn expect_ident(&mut self) -> CompileResult<(String, usize)> {
        match self.advance() {
            Some(PositionedToken {
                token: Token::Ident(name),
                position,
            }) => Ok((name, position)),
            Some(other) => Err(CompileError::syntax(
                other.position,
                format!("expected a field or method name but found '{}'", other.token),
            )),
            None => Err(CompileError::syntax(
                self.end,
                "expected a field or method name but reached end of expression",
            )),
        }
    }

    /// Parses `"(" (expression ("," expression)*)? ")"`
    fn parse_call_args(&mut self) -> CompileResult<Vec<Expr>> {
        self.expect(&Token::OpenParen)?;
        let mut args = Vec::new();
        if self.check(&Token::CloseParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.check(&Token::Comma) {
                self.advance();
                continue;
            }
            self.expect(&Token::CloseParen)?;
            return Ok(args);
        }
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> CompileResult<Expr> {
        let Some(PositionedToken { token, position }) = self.advance() else {
            return Err(CompileError::syntax(
                self.end,
                "unexpected end of expression",
            ));
        };

        match token {
            Token::Int(n) => Ok(Expr::new(ExprKind::Literal(Value::Int(n)), position)),
            Token::Double(n) => Ok(Expr::new(ExprKind::Literal(Value::Double(n)), position)),
            Token::String(s) => Ok(Expr::new(ExprKind::Literal(Value::String(s)), position)),
            Token::Bool(b) => Ok(Expr::new(ExprKind::Literal(Value::Bool(b)), position)),
            Token::Ident(name) => {
                if self.check(&Token::OpenParen) {
                    let args = self.parse_call_args()?;
                    Ok(Expr::new(
                        ExprKind::Call {
                            target: None,
                            function: name,
                            args,
                        },
                        position,
                    ))
                } else {
                    Ok(Expr::new(ExprKind::Ident(name), position))
                }
            }
            Token::OpenParen => {
                let expr = self.parse_expression()?;
                if !self.check(&Token::CloseParen) {
                    return Err(CompileError::syntax(
                        self.current_position(),
                        format!("unclosed parenthesis opened at position {}", position),
                    ));
                }
                self.advance(); // consume ')'
                Ok(expr)
            }
            Token::OpenBracket => {
                let mut elements = Vec::new();
                while !self.check(&Token::CloseBracket) {
                    elements.push(self.parse_expression()?);
                    if self.check(&Token::Comma) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                self.expect(&Token::CloseBracket)?;
                Ok(Expr::new(ExprKind::List(elements), position))
            }
            other => Err(CompileError::syntax(
                position,
                format!("unexpected token '{}'", other),
            )),
        }
    }
}
