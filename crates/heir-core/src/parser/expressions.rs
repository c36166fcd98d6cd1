//! Expression parsing.
//!
//! Precedence, lowest first:
//!
//! | Level | Operators | Associativity |
//! |-------|-----------|---------------|
//! | assignment | `=` `+=` `-=` `*=` `/=` `//=` `%=` `^=` `&=` `\|=` `~=` `<<=` `>>=` `&&=` `\|\|=` | right |
//! | logical or | `\|\|` | left |
//! | logical and | `&&` | left |
//! | bitwise or | `\|` | left |
//! | bitwise xor | `~` | left |
//! | bitwise and | `&` | left |
//! | equality | `==` `!=` | left |
//! | comparison | `<` `<=` `>` `>=` | left |
//! | shift | `<<` `>>` | left |
//! | additive | `+` `-` | left |
//! | multiplicative | `*` `/` `//` `%` | left |
//! | power | `^` | right |
//! | prefix | `!` `~` `-` `++` `--` | |
//! | postfix | call, `.member`, `[index]` | left |

use super::parser::Parser;
use crate::ast::*;
use crate::diagnostics::{DiagnosticCode, Span};
use crate::lexer::TokenKind;

type Level = fn(&mut Parser) -> Expression;

impl Parser {
    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Expression {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Expression {
        let target = self.parse_logical_or();

        let Some(operator) = assignment_operator(&self.current().kind) else {
            return target;
        };
        self.advance();
        let value = self.parse_assignment();

        let span = target.span.merge(value.span);
        self.expression(
            span,
            ExpressionKind::Assignment {
                target: Box::new(target),
                operator,
                value: Box::new(value),
            },
        )
    }

    fn parse_binary_level(&mut self, next: Level, operator_for: fn(&TokenKind) -> Option<BinaryOperator>) -> Expression {
        let mut left = next(self);

        while let Some(operator) = operator_for(&self.current().kind) {
            self.advance();
            let right = next(self);
            left = self.binary(left, operator, right);
        }

        left
    }

    fn parse_logical_or(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_logical_and, |kind| match kind {
            TokenKind::PipePipe => Some(BinaryOperator::LogicalOr),
            _ => None,
        })
    }

    fn parse_logical_and(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_bitwise_or, |kind| match kind {
            TokenKind::AmpersandAmpersand => Some(BinaryOperator::LogicalAnd),
            _ => None,
        })
    }

    fn parse_bitwise_or(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_bitwise_xor, |kind| match kind {
            TokenKind::Pipe => Some(BinaryOperator::BitwiseOr),
            _ => None,
        })
    }

    fn parse_bitwise_xor(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_bitwise_and, |kind| match kind {
            TokenKind::Tilde => Some(BinaryOperator::BitwiseXor),
            _ => None,
        })
    }

    fn parse_bitwise_and(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_equality, |kind| match kind {
            TokenKind::Ampersand => Some(BinaryOperator::BitwiseAnd),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_comparison, |kind| match kind {
            TokenKind::EqualEqual => Some(BinaryOperator::Equal),
            TokenKind::BangEqual => Some(BinaryOperator::NotEqual),
            _ => None,
        })
    }

    fn parse_comparison(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_shift, |kind| match kind {
            TokenKind::Less => Some(BinaryOperator::Less),
            TokenKind::LessEqual => Some(BinaryOperator::LessEqual),
            TokenKind::Greater => Some(BinaryOperator::Greater),
            TokenKind::GreaterEqual => Some(BinaryOperator::GreaterEqual),
            _ => None,
        })
    }

    fn parse_shift(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_additive, |kind| match kind {
            TokenKind::LessLess => Some(BinaryOperator::ShiftLeft),
            TokenKind::GreaterGreater => Some(BinaryOperator::ShiftRight),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOperator::Add),
            TokenKind::Minus => Some(BinaryOperator::Subtract),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Expression {
        self.parse_binary_level(Parser::parse_power, |kind| match kind {
            TokenKind::Star => Some(BinaryOperator::Multiply),
            TokenKind::Slash => Some(BinaryOperator::Divide),
            TokenKind::SlashSlash => Some(BinaryOperator::IntegerDivide),
            TokenKind::Percent => Some(BinaryOperator::Modulo),
            _ => None,
        })
    }

    fn parse_power(&mut self) -> Expression {
        let left = self.parse_unary();

        if !self.eat(&TokenKind::Caret) {
            return left;
        }
        let right = self.parse_power();
        self.binary(left, BinaryOperator::Power, right)
    }

    fn parse_unary(&mut self) -> Expression {
        let operator = match self.current().kind {
            TokenKind::Minus => UnaryOperator::Negate,
            TokenKind::Bang => UnaryOperator::Not,
            TokenKind::Tilde => UnaryOperator::BitwiseNot,
            TokenKind::PlusPlus => UnaryOperator::Increment,
            TokenKind::MinusMinus => UnaryOperator::Decrement,
            _ => return self.parse_postfix(),
        };

        let start = self.advance().span;
        let operand = self.parse_unary();
        let span = start.merge(operand.span);
        self.expression(
            span,
            ExpressionKind::Unary {
                operator,
                operand: Box::new(operand),
            },
        )
    }

    fn parse_postfix(&mut self) -> Expression {
        let mut expression = self.parse_primary();

        loop {
            match self.current().kind {
                TokenKind::LeftParen => {
                    self.advance();
                    let arguments = self.parse_arguments();
                    let span = expression.span.merge(self.previous_span());
                    expression = self.expression(
                        span,
                        ExpressionKind::Invocation {
                            callee: Box::new(expression),
                            arguments,
                        },
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect_identifier();
                    let span = expression.span.merge(member.span);
                    expression = self.expression(
                        span,
                        ExpressionKind::Member {
                            object: Box::new(expression),
                            member,
                        },
                    );
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression();
                    self.expect(&TokenKind::RightBracket);
                    let span = expression.span.merge(self.previous_span());
                    expression = self.expression(
                        span,
                        ExpressionKind::Element {
                            object: Box::new(expression),
                            index: Box::new(index),
                        },
                    );
                }
                _ => return expression,
            }
        }
    }

    fn parse_arguments(&mut self) -> Vec<Expression> {
        let mut arguments = Vec::new();

        while !self.check(&TokenKind::RightParen) && !self.is_at_end() {
            arguments.push(self.parse_expression());
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RightParen);
        arguments
    }

    fn parse_primary(&mut self) -> Expression {
        let token = self.current().clone();

        let literal = match token.kind {
            TokenKind::Int(n) => Literal::Int(n),
            TokenKind::Float(n) => Literal::Float(n),
            TokenKind::String(s) => Literal::String(s),
            TokenKind::Char(c) => Literal::Char(c),
            TokenKind::Bool(b) => Literal::Bool(b),
            TokenKind::None => Literal::None,
            TokenKind::Identifier(name) => {
                self.advance();
                return self.expression(token.span, ExpressionKind::Identifier(name));
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expression();
                self.expect(&TokenKind::RightParen);
                let span = token.span.merge(self.previous_span());
                return self.expression(span, ExpressionKind::Parenthesized(Box::new(inner)));
            }
            TokenKind::LeftBrace => return self.parse_object_literal(),
            kind => {
                self.diagnostics.error(
                    DiagnosticCode::UnexpectedToken,
                    format!("Unexpected token '{}'", kind),
                    token.span,
                );
                self.advance();
                return self.expression(token.span, ExpressionKind::NoOp);
            }
        };

        self.advance();
        self.expression(token.span, ExpressionKind::Literal(literal))
    }

    fn parse_object_literal(&mut self) -> Expression {
        let start = self.advance().span; // consume '{'
        let mut properties = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            let key = self.parse_object_key();
            self.expect(&TokenKind::Colon);
            let value = self.parse_expression();
            properties.push(ObjectProperty { key, value });

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::RightBrace);
        let span = start.merge(self.previous_span());
        self.expression(span, ExpressionKind::Object(properties))
    }

    fn parse_object_key(&mut self) -> Expression {
        if self.check(&TokenKind::LeftBracket) {
            let start = self.advance().span;
            let inner = self.parse_expression();
            self.expect(&TokenKind::RightBracket);
            let span = start.merge(self.previous_span());
            return self.expression(span, ExpressionKind::Parenthesized(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn binary(&mut self, left: Expression, operator: BinaryOperator, right: Expression) -> Expression {
        let span = left.span.merge(right.span);
        self.expression(
            span,
            ExpressionKind::Binary {
                left: Box::new(left),
                operator,
                right: Box::new(right),
            },
        )
    }

    fn expression(&mut self, span: Span, kind: ExpressionKind) -> Expression {
        Expression {
            id: self.node_id(),
            span,
            kind,
        }
    }
}

fn assignment_operator(kind: &TokenKind) -> Option<AssignmentOperator> {
    let operator = match kind {
        TokenKind::Equal => return Some(AssignmentOperator::Assign),
        TokenKind::PlusEqual => BinaryOperator::Add,
        TokenKind::MinusEqual => BinaryOperator::Subtract,
        TokenKind::StarEqual => BinaryOperator::Multiply,
        TokenKind::SlashEqual => BinaryOperator::Divide,
        TokenKind::SlashSlashEqual => BinaryOperator::IntegerDivide,
        TokenKind::PercentEqual => BinaryOperator::Modulo,
        TokenKind::CaretEqual => BinaryOperator::Power,
        TokenKind::AmpersandEqual => BinaryOperator::BitwiseAnd,
        TokenKind::PipeEqual => BinaryOperator::BitwiseOr,
        TokenKind::TildeEqual => BinaryOperator::BitwiseXor,
        TokenKind::LessLessEqual => BinaryOperator::ShiftLeft,
        TokenKind::GreaterGreaterEqual => BinaryOperator::ShiftRight,
        TokenKind::AmpersandAmpersandEqual => BinaryOperator::LogicalAnd,
        TokenKind::PipePipeEqual => BinaryOperator::LogicalOr,
        _ => return None,
    };
    Some(AssignmentOperator::Compound(operator))
}
