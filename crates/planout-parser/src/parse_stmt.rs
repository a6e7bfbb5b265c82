//! Statement parsing: assignment, `return`, `if`/`else` chains, `switch`.

use planout_lexer::TokenKind;
use planout_types::ast::{Case, Conditional, Expr, Stmt};

use crate::parser::{Parser, Precedence};

impl<'src> Parser<'src> {
    /// Parse one statement. The cursor ends up on the first token after it.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match &self.cur.kind {
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Ident(_) => self.parse_assignment_statement(),
            TokenKind::Error(_) => {
                self.lexing_error();
                None
            }
            other => {
                let message = format!("expected a statement, got '{other}'");
                self.error_at_current(message);
                None
            }
        }
    }

    /// `ident (= | <-) expr`; both assignment operators are identical.
    fn parse_assignment_statement(&mut self) -> Option<Stmt> {
        let var = match &self.cur.kind {
            TokenKind::Ident(name) => name.clone(),
            _ => unreachable!("caller checked for an identifier"),
        };
        self.advance();

        if !self.eat(&TokenKind::Assign) && !self.eat(&TokenKind::Arrow) {
            self.error_at_current(format!("expecting '=' or '<-', got '{}'", self.cur.kind));
            return None;
        }

        let value = self.parse_expression(Precedence::Lowest)?;
        Some(Stmt::Assign { var, value })
    }

    /// `return expr`
    fn parse_return_statement(&mut self) -> Option<Stmt> {
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        Some(Stmt::Return { value })
    }

    /// An `if (expr) { block }` chain with optional `else if` and `else`
    /// arms. The trailing `else` compiles to a conditional on the literal
    /// `true`.
    fn parse_if_statement(&mut self) -> Option<Stmt> {
        let mut cases = Vec::new();

        loop {
            self.advance(); // the `if` token
            self.expect(&TokenKind::LParen)?;
            let condition = self.parse_expression(Precedence::Lowest)?;
            self.expect(&TokenKind::RParen)?;
            self.expect(&TokenKind::LBrace)?;
            let consequence = self.parse_block()?;
            cases.push(Conditional {
                condition,
                consequence,
            });

            if !self.eat(&TokenKind::Else) {
                break;
            }

            if self.check(&TokenKind::If) {
                continue;
            }
            if self.eat(&TokenKind::LBrace) {
                let consequence = self.parse_block()?;
                cases.push(Conditional {
                    condition: Expr::Bool(true),
                    consequence,
                });
                break;
            }
            self.error_at_current(format!(
                "expecting 'if' or '{{' after 'else', got '{}'",
                self.cur.kind
            ));
            return None;
        }

        Some(Stmt::Cond { cases })
    }

    /// Statements up to the closing `}`, separated by optional semicolons.
    /// The opening brace has already been consumed.
    fn parse_block(&mut self) -> Option<Vec<Stmt>> {
        let mut seq = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.eat(&TokenKind::RBrace) {
                return Some(seq);
            }
            if self.at_end() {
                self.lexing_error();
                if !self.errors.has_errors() {
                    self.error_at_current("EOF while parsing block statement");
                }
                return None;
            }
            seq.push(self.parse_statement()?);
        }
    }

    /// `switch { expr => stmt; ... }`; an empty switch is legal.
    fn parse_switch_statement(&mut self) -> Option<Stmt> {
        self.advance(); // the `switch` token
        self.expect(&TokenKind::LBrace)?;

        let mut cases = Vec::new();
        loop {
            while self.eat(&TokenKind::Semicolon) {}
            if self.eat(&TokenKind::RBrace) {
                break;
            }
            if self.at_end() {
                self.lexing_error();
                if !self.errors.has_errors() {
                    self.error_at_current("EOF while parsing switch statement");
                }
                return None;
            }
            let condition = self.parse_expression(Precedence::Lowest)?;
            self.expect(&TokenKind::Then)?;
            let result = self.parse_statement()?;
            cases.push(Case {
                condition,
                result: Box::new(result),
            });
        }

        Some(Stmt::Switch { cases })
    }
}
