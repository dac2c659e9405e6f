//! Expression parsing implementation
//!
//! This module handles parsing of C expressions using precedence climbing
//! for binary operators and recursive descent for other expression forms.
//!
//! # Supported Expressions
//!
//! - Literals: integers, characters, strings
//! - Identifiers
//! - Binary operators: arithmetic, comparison, logical, bitwise
//! - Unary operators: `-`, `+`, `!`, `~`, `&`, `*`, `++`, `--`
//! - Postfix: `[]`, `.`, `->`, `()`, `++`, `--`
//! - Ternary: `? :`
//! - Type casts: `(type)expr`
//! - `sizeof(type)` and `sizeof expr`
//!
//! # Precedence
//!
//! Each binary precedence level is one method; a level parses its operands
//! with the next tighter level and folds left, so all binary operators are
//! left-associative. Assignment and the ternary operator associate right.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

type Level = fn(&mut Parser) -> Result<Expr, ParseError>;

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment or ternary (right-associative)
    pub(crate) fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.parse_ternary()?;
        let loc = self.current_location();

        let compound = match self.peek().kind {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            _ => return Ok(lhs),
        };
        self.advance();

        let lhs = Box::new(lhs);
        let rhs = Box::new(self.parse_assignment()?);
        let kind = match compound {
            Some(op) => ExprKind::CompoundAssignment { op, lhs, rhs },
            None => ExprKind::Assignment { lhs, rhs },
        };
        Ok(Expr::new(kind, loc))
    }

    /// Parse ternary: condition ? true_expr : false_expr
    pub(crate) fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let condition = self.parse_logical_or()?;

        if !self.match_token(&TokenKind::Question) {
            return Ok(condition);
        }

        let loc = self.previous_location();
        let true_expr = Box::new(self.parse_expression()?);
        self.expect_token(&TokenKind::Colon, "in ternary expression")?;
        let false_expr = Box::new(self.parse_ternary()?);

        Ok(Expr::new(
            ExprKind::TernaryOp {
                condition: Box::new(condition),
                true_expr,
                false_expr,
            },
            loc,
        ))
    }

    /// Parse one left-associative binary level.
    fn parse_binary_level(
        &mut self,
        operators: &[(TokenKind, BinOp)],
        operand: Level,
    ) -> Result<Expr, ParseError> {
        let mut left = operand(self)?;

        'outer: loop {
            for (token, op) in operators {
                if self.match_token(token) {
                    let loc = self.previous_location();
                    let right = operand(self)?;
                    left = Expr::new(
                        ExprKind::BinaryOp {
                            op: *op,
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                        loc,
                    );
                    continue 'outer;
                }
            }
            break;
        }

        Ok(left)
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(TokenKind::OrOr, BinOp::Or)], Self::parse_logical_and)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(TokenKind::AndAnd, BinOp::And)], Self::parse_bitwise_or)
    }

    /// Parse bitwise OR (|)
    fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(TokenKind::Pipe, BinOp::BitOr)], Self::parse_bitwise_xor)
    }

    /// Parse bitwise XOR (^)
    fn parse_bitwise_xor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(TokenKind::Caret, BinOp::BitXor)], Self::parse_bitwise_and)
    }

    /// Parse bitwise AND (&)
    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(TokenKind::Amp, BinOp::BitAnd)], Self::parse_equality)
    }

    /// Parse equality (== !=)
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::NotEq, BinOp::Ne)],
            Self::parse_relational,
        )
    }

    /// Parse relational (< <= > >=)
    fn parse_relational(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Le, BinOp::Le),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::Ge, BinOp::Ge),
            ],
            Self::parse_shift,
        )
    }

    /// Parse bitwise shift (<< >>)
    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[(TokenKind::LtLt, BinOp::BitShl), (TokenKind::GtGt, BinOp::BitShr)],
            Self::parse_additive,
        )
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Mod),
            ],
            Self::parse_cast,
        )
    }

    /// Whether the tokens at the cursor are `(` followed by a type keyword.
    /// Without typedefs this decides between a cast and a parenthesized
    /// expression.
    fn at_parenthesized_type(&self) -> bool {
        self.check(&TokenKind::LParen)
            && self
                .peek_ahead(1)
                .is_some_and(|t| Self::starts_type(&t.kind))
    }

    /// Parse `(` type-name `)` after the cursor is known to be on the `(`.
    fn parse_parenthesized_type(&mut self) -> Result<TypeName, ParseError> {
        self.expect_lparen("before type name")?;
        let specs = self.parse_specifiers()?;
        if specs.definition.is_some() {
            return Err(ParseError {
                message: "Type definitions are not allowed in a type name".to_string(),
                location: specs.location,
            });
        }
        let mut target_type = TypeName::new(specs.base);
        while self.match_token(&TokenKind::Star) {
            target_type = target_type.with_pointer();
        }
        self.parse_array_dims(&mut target_type)?;
        self.expect_rparen("after type name")?;
        Ok(target_type)
    }

    /// Parse cast: (type)expr
    fn parse_cast(&mut self) -> Result<Expr, ParseError> {
        if !self.at_parenthesized_type() {
            return self.parse_unary();
        }

        let loc = self.current_location();
        let target_type = self.parse_parenthesized_type()?;
        let expr = Box::new(self.parse_cast()?);
        Ok(Expr::new(ExprKind::Cast { target_type, expr }, loc))
    }

    /// Parse unary (! ~ - + & * ++ -- sizeof)
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        let op = match self.peek().kind {
            TokenKind::Bang => UnOp::Not,
            TokenKind::Tilde => UnOp::BitNot,
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Amp => UnOp::AddrOf,
            TokenKind::Star => UnOp::Deref,
            TokenKind::PlusPlus => UnOp::PreInc,
            TokenKind::MinusMinus => UnOp::PreDec,
            TokenKind::Plus => {
                // Unary plus: just return the operand
                self.advance();
                return self.parse_cast();
            }
            TokenKind::Sizeof => {
                self.advance();
                return self.parse_sizeof(loc);
            }
            _ => return self.parse_postfix(),
        };
        self.advance();

        // ++/-- bind to a unary operand; the rest accept a cast expression
        let operand = if matches!(op, UnOp::PreInc | UnOp::PreDec) {
            self.parse_unary()?
        } else {
            self.parse_cast()?
        };
        Ok(Expr::new(
            ExprKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            loc,
        ))
    }

    /// Parse the operand of `sizeof`: a parenthesized type or a unary expression.
    fn parse_sizeof(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        if self.at_parenthesized_type() {
            let target_type = self.parse_parenthesized_type()?;
            return Ok(Expr::new(ExprKind::SizeofType(target_type), loc));
        }

        let expr = self.parse_unary()?;
        Ok(Expr::new(ExprKind::SizeofExpr(Box::new(expr)), loc))
    }

    /// Parse postfix (++ -- [] . -> ())
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            let loc = self.current_location();

            let kind = if self.match_token(&TokenKind::PlusPlus) {
                ExprKind::UnaryOp {
                    op: UnOp::PostInc,
                    operand: Box::new(expr),
                }
            } else if self.match_token(&TokenKind::MinusMinus) {
                ExprKind::UnaryOp {
                    op: UnOp::PostDec,
                    operand: Box::new(expr),
                }
            } else if self.match_token(&TokenKind::LBracket) {
                let index = Box::new(self.parse_expression()?);
                self.expect_token(&TokenKind::RBracket, "after array index")?;
                ExprKind::ArrayAccess {
                    array: Box::new(expr),
                    index,
                }
            } else if self.match_token(&TokenKind::Dot) {
                let member = self.expect_identifier()?;
                ExprKind::MemberAccess {
                    object: Box::new(expr),
                    member,
                }
            } else if self.match_token(&TokenKind::Arrow) {
                let member = self.expect_identifier()?;
                ExprKind::PointerMemberAccess {
                    object: Box::new(expr),
                    member,
                }
            } else if self.match_token(&TokenKind::LParen) {
                let args = self.parse_argument_list()?;
                self.expect_rparen("after function arguments")?;

                // Calls go through a named function; there are no function pointers
                let name = match expr.kind {
                    ExprKind::Variable { name, .. } => name,
                    _ => {
                        return Err(ParseError {
                            message: "Function call must be on identifier".to_string(),
                            location: loc,
                        })
                    }
                };
                // A call is located at its callee name
                let call = Expr::new(ExprKind::FunctionCall { name, args }, expr.location);
                expr = call;
                continue;
            } else {
                break;
            };

            expr = Expr::new(kind, loc);
        }

        Ok(expr)
    }

    /// Parse argument list: (expr, expr, ...)
    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_assignment()?);

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse primary (literals, identifiers, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        let kind = match &self.peek().kind {
            TokenKind::IntLiteral(n) => ExprKind::IntLiteral(*n),
            TokenKind::CharLiteral(c) => ExprKind::CharLiteral(*c),
            TokenKind::StringLiteral(bytes) => {
                let mut bytes = bytes.clone();
                self.advance();
                // Adjacent literals concatenate
                while let TokenKind::StringLiteral(more) = &self.peek().kind {
                    bytes.extend_from_slice(more);
                    self.advance();
                }
                return Ok(Expr::new(ExprKind::StringLiteral(bytes), loc));
            }
            TokenKind::Ident(name) => ExprKind::Variable {
                name: name.clone(),
                binding: None,
            },
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_rparen("after expression")?;
                return Ok(expr);
            }
            _ => return Err(self.error_expected("expression")),
        };
        self.advance();

        Ok(Expr::new(kind, loc))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn expr(source: &str) -> Expr {
        let wrapped = format!("int main() {{ {}; }}", source);
        let program = Parser::new(&wrapped).unwrap().parse_program().unwrap();
        match &program.declarations[0] {
            Declaration::Function(FunctionDef {
                body: Some(body), ..
            }) => match &body[0] {
                Stmt::Expression(e) => e.clone(),
                other => panic!("Expected expression statement, got {:?}", other),
            },
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_subtraction() {
        let e = expr("a - b - c");
        match e.kind {
            ExprKind::BinaryOp {
                op: BinOp::Sub,
                left,
                ..
            } => assert!(matches!(left.kind, ExprKind::BinaryOp { op: BinOp::Sub, .. })),
            other => panic!("Expected subtraction, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_precedence() {
        // && binds tighter than ||
        let e = expr("a || b && c");
        match e.kind {
            ExprKind::BinaryOp {
                op: BinOp::Or,
                right,
                ..
            } => assert!(matches!(right.kind, ExprKind::BinaryOp { op: BinOp::And, .. })),
            other => panic!("Expected ||, got {:?}", other),
        }
    }

    #[test]
    fn test_postfix_chain() {
        let e = expr("p->next.data[2]++");
        let ExprKind::UnaryOp {
            op: UnOp::PostInc,
            operand,
        } = e.kind
        else {
            panic!("Expected post-increment");
        };
        let ExprKind::ArrayAccess { array, .. } = operand.kind else {
            panic!("Expected indexing");
        };
        let ExprKind::MemberAccess { object, member } = array.kind else {
            panic!("Expected member access");
        };
        assert_eq!(member, "data");
        assert!(matches!(object.kind, ExprKind::PointerMemberAccess { .. }));
    }

    #[test]
    fn test_compound_assignment() {
        let e = expr("x += y * 2");
        assert!(matches!(
            e.kind,
            ExprKind::CompoundAssignment { op: BinOp::Add, .. }
        ));
    }

    #[test]
    fn test_sizeof_forms() {
        assert!(matches!(expr("sizeof(int*)").kind, ExprKind::SizeofType(_)));
        assert!(matches!(expr("sizeof x").kind, ExprKind::SizeofExpr(_)));
        assert!(matches!(expr("sizeof (x)").kind, ExprKind::SizeofExpr(_)));
    }

    #[test]
    fn test_parenthesized_expression_is_not_a_cast() {
        let e = expr("(a) - 1");
        assert!(matches!(e.kind, ExprKind::BinaryOp { op: BinOp::Sub, .. }));
    }

    #[test]
    fn test_ternary_is_right_associative() {
        let e = expr("a ? b : c ? d : e");
        match e.kind {
            ExprKind::TernaryOp { false_expr, .. } => {
                assert!(matches!(false_expr.kind, ExprKind::TernaryOp { .. }))
            }
            other => panic!("Expected ternary, got {:?}", other),
        }
    }

    #[test]
    fn test_call_arguments() {
        let e = expr(r#"printf("%d %d\n", a, b + 1)"#);
        match e.kind {
            ExprKind::FunctionCall { name, args } => {
                assert_eq!(name, "printf");
                assert_eq!(args.len(), 3);
                assert!(matches!(args[0].kind, ExprKind::StringLiteral(_)));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_string_concatenation() {
        let e = expr(r#"puts("ab" "cd")"#);
        let ExprKind::FunctionCall { args, .. } = e.kind else {
            panic!("Expected call");
        };
        assert!(matches!(&args[0].kind, ExprKind::StringLiteral(b) if b == b"abcd"));
    }

    #[test]
    fn test_call_requires_named_callee() {
        // A parenthesized name is still a plain identifier
        assert!(Parser::new("int main() { (f)(1); }")
            .unwrap()
            .parse_program()
            .is_ok());

        let err = Parser::new("int main() { a[0](1); }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("Function call"));
    }
}
