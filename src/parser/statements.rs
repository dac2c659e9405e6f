//! Statement parsing implementation
//!
//! This module handles parsing of all C statement types:
//!
//! - Variable declarations: `int x = 42, *p = &x;`
//! - Control flow: `if`, `while`, `for`, `do-while`, `switch`
//! - Jump statements: `return`, `break`, `continue`
//! - Compound statements: `{ ... }`
//! - Expression statements and the empty statement `;`
//!
//! # Grammar
//!
//! ```text
//! statement ::= declaration | if_stmt | while_stmt | for_stmt
//!             | do_while_stmt | switch_stmt | return_stmt
//!             | break_stmt | continue_stmt | block | expr_stmt | ";"
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        match self.peek().kind {
            TokenKind::Return => {
                self.advance();
                self.parse_return_statement(loc)
            }
            TokenKind::If => {
                self.advance();
                self.parse_if_statement(loc)
            }
            TokenKind::While => {
                self.advance();
                self.parse_while_statement(loc)
            }
            TokenKind::Do => {
                self.advance();
                self.parse_do_while_statement(loc)
            }
            TokenKind::For => {
                self.advance();
                self.parse_for_statement(loc)
            }
            TokenKind::Switch => {
                self.advance();
                self.parse_switch_statement(loc)
            }
            TokenKind::Break => {
                self.advance();
                self.expect_semicolon("after 'break'")?;
                Ok(Stmt::Break(loc))
            }
            TokenKind::Continue => {
                self.advance();
                self.expect_semicolon("after 'continue'")?;
                Ok(Stmt::Continue(loc))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Stmt::Empty(loc))
            }
            TokenKind::LBrace => {
                self.advance();
                let statements = self.parse_block_statements()?;
                self.expect_rbrace("after block")?;
                Ok(Stmt::Block {
                    statements,
                    location: loc,
                })
            }
            TokenKind::Case | TokenKind::Default => Err(ParseError {
                message: format!("{} label outside of a switch body", self.peek()),
                location: loc,
            }),
            _ if self.is_type_keyword() => self.parse_local_declaration(),
            _ => {
                let expr = self.parse_expression()?;
                self.expect_semicolon("after expression")?;
                Ok(Stmt::Expression(expr))
            }
        }
    }

    /// Parse return statement
    fn parse_return_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let expr = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };

        self.expect_semicolon("after return")?;

        Ok(Stmt::Return {
            expr,
            location: loc,
        })
    }

    /// Parse `( expression )` as used by if/while/switch headers.
    fn parse_condition(&mut self, keyword: &str) -> Result<Expr, ParseError> {
        self.expect_lparen(&format!("after '{}'", keyword))?;
        let condition = self.parse_expression()?;
        self.expect_rparen(&format!("after {} condition", keyword))?;
        Ok(condition)
    }

    /// Parse if statement
    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let condition = self.parse_condition("if")?;
        let then_branch = Box::new(self.parse_statement()?);

        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    /// Parse while statement
    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let condition = self.parse_condition("while")?;
        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::While {
            condition,
            body,
            location: loc,
        })
    }

    /// Parse do-while statement
    fn parse_do_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let body = Box::new(self.parse_statement()?);

        self.expect_token(&TokenKind::While, "after do body")?;
        let condition = self.parse_condition("do-while")?;
        self.expect_semicolon("after do-while")?;

        Ok(Stmt::DoWhile {
            body,
            condition,
            location: loc,
        })
    }

    /// Parse for statement
    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_lparen("after 'for'")?;

        // Init (optional); a declaration consumes its own semicolon
        let init = if self.match_token(&TokenKind::Semicolon) {
            None
        } else if self.is_type_keyword() {
            Some(Box::new(self.parse_local_declaration()?))
        } else {
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for init")?;
            Some(Box::new(Stmt::Expression(expr)))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_semicolon("after for condition")?;

        let increment = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_rparen("after for clauses")?;

        let body = Box::new(self.parse_statement()?);

        Ok(Stmt::For {
            init,
            condition,
            increment,
            body,
            location: loc,
        })
    }

    /// Parse switch statement
    ///
    /// The body is a sequence of `case`/`default` groups; each group owns the
    /// statements up to the next label. Fallthrough between groups is kept.
    fn parse_switch_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let expr = self.parse_condition("switch")?;
        self.expect_lbrace("before switch body")?;

        let mut cases = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            if self.match_token(&TokenKind::Case) {
                let case_loc = self.previous_location();
                let value = self.parse_ternary()?;
                self.expect_token(&TokenKind::Colon, "after case value")?;
                let statements = self.parse_case_statements()?;

                cases.push(CaseNode::Case {
                    value,
                    constant: None,
                    statements,
                    location: case_loc,
                });
            } else if self.match_token(&TokenKind::Default) {
                let default_loc = self.previous_location();
                self.expect_token(&TokenKind::Colon, "after 'default'")?;
                let statements = self.parse_case_statements()?;

                cases.push(CaseNode::Default {
                    statements,
                    location: default_loc,
                });
            } else {
                return Err(self.error_expected("'case' or 'default' in switch body"));
            }
        }

        self.expect_rbrace("after switch body")?;

        Ok(Stmt::Switch {
            expr,
            cases,
            location: loc,
        })
    }

    fn parse_case_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        while !self.check(&TokenKind::Case)
            && !self.check(&TokenKind::Default)
            && !self.check(&TokenKind::RBrace)
            && !self.is_at_end()
        {
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }
}
