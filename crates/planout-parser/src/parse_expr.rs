//! Expression parsing: Pratt loop, prefix and infix rules, lowerings.
//!
//! Several surface operators have no ops-tree counterpart and are lowered
//! here: `a - b` becomes `sum(a, negative(b))`, `a != b` becomes
//! `not(equals(a, b))`, and a unary minus on a numeric literal folds into
//! the literal itself.

use planout_lexer::TokenKind;
use planout_types::ast::{CallArgs, Expr, LeftRightOp, ValuesOp};

use crate::parser::{precedence_of, Parser, Precedence};

impl<'src> Parser<'src> {
    /// Parse an expression with the Pratt loop.
    ///
    /// Starts at the current token; on return the cursor sits on the first
    /// token after the expression. A semicolon always terminates the loop.
    pub(crate) fn parse_expression(&mut self, min_precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.check(&TokenKind::Semicolon) && min_precedence < precedence_of(&self.cur.kind)
        {
            left = match &self.cur.kind {
                TokenKind::LBracket => self.parse_index_expression(left)?,
                TokenKind::LParen => self.parse_call_expression(left)?,
                _ => self.parse_infix_expression(left)?,
            };
        }

        Some(left)
    }

    // ── Prefix rules ──────────────────────────────────────────────

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.cur.kind.clone() {
            TokenKind::Number(text) => {
                self.advance();
                self.parse_numeric_literal(&text)
            }
            TokenKind::Ident(name) => {
                self.advance();
                Some(Expr::Get(name))
            }
            TokenKind::Str(text) => {
                self.advance();
                Some(Expr::Str(text))
            }
            TokenKind::True => {
                self.advance();
                Some(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Some(Expr::Bool(false))
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr::Null)
            }
            TokenKind::Json(value) => {
                self.advance();
                Some(Expr::Json(value))
            }
            TokenKind::Not => {
                self.advance();
                let operand = self.parse_expression(Precedence::Not)?;
                Some(Expr::Not(Box::new(operand)))
            }
            TokenKind::Minus => self.parse_prefix_minus(),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression(Precedence::Lowest)?;
                self.expect(&TokenKind::RParen)?;
                Some(inner)
            }
            TokenKind::LBracket => {
                self.advance();
                let values = self.parse_expression_list(&TokenKind::RBracket)?;
                Some(Expr::Array(values))
            }
            TokenKind::Error(_) => {
                self.lexing_error();
                None
            }
            other => {
                let message = format!("no prefix parse rule for '{other}'");
                self.error_at_current(message);
                None
            }
        }
    }

    /// A prefix `-` binds at additive precedence, so `-a * b` parses as
    /// `negative(a * b)`. Applied directly to a numeric literal it folds
    /// into the literal.
    fn parse_prefix_minus(&mut self) -> Option<Expr> {
        self.advance();
        let operand = self.parse_expression(Precedence::Sum)?;
        Some(match operand {
            Expr::Int(n) => Expr::Int(-n),
            Expr::Float(f) => Expr::Float(-f),
            other => Expr::Negative(Box::new(other)),
        })
    }

    /// Numbers prefer the integer reading; anything with a fraction or
    /// exponent falls through to the float parse.
    fn parse_numeric_literal(&mut self, text: &str) -> Option<Expr> {
        if let Ok(value) = text.parse::<i64>() {
            return Some(Expr::Int(value));
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Some(Expr::Float(value)),
            _ => {
                self.error_at_current(format!("not a valid number: {text}"));
                None
            }
        }
    }

    // ── Infix rules ───────────────────────────────────────────────

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let op = self.cur.kind.clone();
        let precedence = precedence_of(&op);
        self.advance();
        let right = self.parse_expression(precedence)?;
        self.lower_infix(&op, left, right)
    }

    /// Map a surface operator onto its ops-tree shape.
    fn lower_infix(&mut self, op: &TokenKind, left: Expr, right: Expr) -> Option<Expr> {
        let left_right = |op, left: Expr, right: Expr| Expr::LeftRight {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        let values = |op, left, right| Expr::Values {
            op,
            values: vec![left, right],
        };

        Some(match op {
            TokenKind::Less => left_right(LeftRightOp::Less, left, right),
            TokenKind::LessEq => left_right(LeftRightOp::LessEq, left, right),
            TokenKind::Greater => left_right(LeftRightOp::Greater, left, right),
            TokenKind::GreaterEq => left_right(LeftRightOp::GreaterEq, left, right),
            TokenKind::EqEq => left_right(LeftRightOp::Equals, left, right),
            TokenKind::Slash => left_right(LeftRightOp::Div, left, right),
            TokenKind::Percent => left_right(LeftRightOp::Mod, left, right),
            TokenKind::NotEq => {
                Expr::Not(Box::new(left_right(LeftRightOp::Equals, left, right)))
            }
            TokenKind::Plus => values(ValuesOp::Sum, left, right),
            // Subtraction lowers to addition of the negation; the negation
            // is not folded even for literals.
            TokenKind::Minus => values(ValuesOp::Sum, left, Expr::Negative(Box::new(right))),
            TokenKind::Star => values(ValuesOp::Product, left, right),
            TokenKind::Or => values(ValuesOp::Or, left, right),
            TokenKind::And => values(ValuesOp::And, left, right),
            TokenKind::Coalesce => values(ValuesOp::Coalesce, left, right),
            other => {
                let message = format!("no infix parse rule for '{other}'");
                self.error_at_current(message);
                return None;
            }
        })
    }

    /// `base[index]`
    fn parse_index_expression(&mut self, base: Expr) -> Option<Expr> {
        self.advance(); // `[`
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect(&TokenKind::RBracket)?;
        Some(Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
        })
    }

    /// `callee(args)`; the callee must be a bare identifier. Arguments are
    /// either all positional or all named (`name = expr`).
    fn parse_call_expression(&mut self, callee: Expr) -> Option<Expr> {
        let name = match callee {
            Expr::Get(name) => name,
            _ => {
                self.error_at_current("function-call syntax with non-identifier expression");
                return None;
            }
        };
        self.advance(); // `(`

        if self.eat(&TokenKind::RParen) {
            return Some(Expr::Call {
                name,
                args: CallArgs::None,
            });
        }

        if matches!(self.cur.kind, TokenKind::Ident(_)) && self.peek.kind == TokenKind::Assign {
            let args = self.parse_named_args()?;
            return Some(Expr::Call {
                name,
                args: CallArgs::Named(args),
            });
        }

        let mut args = self.parse_expression_list(&TokenKind::RParen)?;
        let args = match args.len() {
            1 => CallArgs::One(Box::new(args.remove(0))),
            _ => CallArgs::Many(args),
        };
        Some(Expr::Call { name, args })
    }

    /// `name = expr, name = expr, …` up to the closing paren.
    fn parse_named_args(&mut self) -> Option<Vec<(String, Expr)>> {
        let mut args = Vec::new();
        while !self.eat(&TokenKind::RParen) {
            if self.at_end() {
                self.lexing_error();
                if !self.errors.has_errors() {
                    self.error_at_current("EOF while parsing named arguments");
                }
                return None;
            }
            let name = match self.cur.kind.clone() {
                TokenKind::Ident(name) => {
                    self.advance();
                    name
                }
                other => {
                    self.error_at_current(format!("expecting an argument name, got '{other}'"));
                    return None;
                }
            };
            self.expect(&TokenKind::Assign)?;
            let value = self.parse_expression(Precedence::Lowest)?;
            args.push((name, value));
            self.eat(&TokenKind::Comma);
        }
        Some(args)
    }

    /// Comma-separated expressions up to (and including) `close`.
    fn parse_expression_list(&mut self, close: &TokenKind) -> Option<Vec<Expr>> {
        let mut values = Vec::new();
        if self.eat(close) {
            return Some(values);
        }
        values.push(self.parse_expression(Precedence::Lowest)?);
        while self.eat(&TokenKind::Comma) {
            values.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect(close)?;
        Some(values)
    }
}
