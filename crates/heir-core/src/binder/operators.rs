//! Operator resolution tables.
//!
//! An operator binds to the first table entry whose syntax matches and
//! whose operand types accept the actual operand types.

use super::types::Type;
use crate::ast::{BinaryOperator, UnaryOperator};
use std::sync::LazyLock;

/// Resolved binary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundBinaryOperatorKind {
    /// Numeric addition
    Addition,
    /// Numeric subtraction
    Subtraction,
    /// Numeric multiplication
    Multiplication,
    /// Numeric division
    Division,
    /// Floored integer division
    IntegerDivision,
    /// Remainder
    Modulo,
    /// Exponentiation
    Power,
    /// String concatenation
    Concatenation,
    /// `&`
    BitwiseAnd,
    /// `|`
    BitwiseOr,
    /// `~`
    BitwiseXor,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,
    /// `&&`
    LogicalAnd,
    /// `||`
    LogicalOr,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    Less,
    /// `<=`
    LessOrEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterOrEqual,
}

/// A binary operator resolved against operand types.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundBinaryOperator {
    /// Source operator
    pub syntax: BinaryOperator,
    /// Resolved operation
    pub kind: BoundBinaryOperatorKind,
    /// Accepted left operand type
    pub left: Type,
    /// Accepted right operand type
    pub right: Type,
    /// Result type
    pub result: Type,
}

impl BoundBinaryOperator {
    fn new(
        syntax: BinaryOperator,
        kind: BoundBinaryOperatorKind,
        left: Type,
        right: Type,
        result: Type,
    ) -> Self {
        Self {
            syntax,
            kind,
            left,
            right,
            result,
        }
    }

    /// Finds the operator for `syntax` applied to `left` and `right`.
    pub fn bind(syntax: BinaryOperator, left: &Type, right: &Type) -> Option<BoundBinaryOperator> {
        BINARY_OPERATORS
            .iter()
            .find(|op| {
                op.syntax == syntax
                    && left.is_assignable_to(&op.left)
                    && right.is_assignable_to(&op.right)
            })
            .cloned()
    }
}

/// Resolved unary operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundUnaryOperatorKind {
    /// `-`
    Negation,
    /// `!`
    LogicalNegation,
    /// `~`
    BitwiseNegation,
    /// `++`
    Increment,
    /// `--`
    Decrement,
}

/// A unary operator resolved against its operand type.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundUnaryOperator {
    /// Source operator
    pub syntax: UnaryOperator,
    /// Resolved operation
    pub kind: BoundUnaryOperatorKind,
    /// Accepted operand type
    pub operand: Type,
    /// Result type
    pub result: Type,
}

impl BoundUnaryOperator {
    /// Finds the operator for `syntax` applied to `operand`.
    pub fn bind(syntax: UnaryOperator, operand: &Type) -> Option<BoundUnaryOperator> {
        let (kind, accepted, result) = match syntax {
            UnaryOperator::Negate => (BoundUnaryOperatorKind::Negation, Type::number(), Type::number()),
            UnaryOperator::Not => (BoundUnaryOperatorKind::LogicalNegation, Type::Bool, Type::Bool),
            UnaryOperator::BitwiseNot => (BoundUnaryOperatorKind::BitwiseNegation, Type::Int, Type::Int),
            UnaryOperator::Increment => (BoundUnaryOperatorKind::Increment, Type::number(), Type::number()),
            UnaryOperator::Decrement => (BoundUnaryOperatorKind::Decrement, Type::number(), Type::number()),
        };

        operand.is_assignable_to(&accepted).then(|| BoundUnaryOperator {
            syntax,
            kind,
            operand: accepted,
            result,
        })
    }
}

static BINARY_OPERATORS: LazyLock<Vec<BoundBinaryOperator>> = LazyLock::new(|| {
    use BinaryOperator as S;
    use BoundBinaryOperatorKind as K;

    let number = Type::number;
    let text = || Type::Union(vec![Type::String, Type::Char]);

    vec![
        // Numeric first so `any` operands resolve to arithmetic
        BoundBinaryOperator::new(S::Add, K::Addition, number(), number(), number()),
        BoundBinaryOperator::new(S::Add, K::Concatenation, text(), text(), Type::String),
        BoundBinaryOperator::new(S::Subtract, K::Subtraction, number(), number(), number()),
        BoundBinaryOperator::new(S::Multiply, K::Multiplication, number(), number(), number()),
        BoundBinaryOperator::new(S::Divide, K::Division, number(), number(), number()),
        BoundBinaryOperator::new(S::IntegerDivide, K::IntegerDivision, number(), number(), Type::Int),
        BoundBinaryOperator::new(S::Modulo, K::Modulo, number(), number(), number()),
        BoundBinaryOperator::new(S::Power, K::Power, number(), number(), number()),
        BoundBinaryOperator::new(S::BitwiseAnd, K::BitwiseAnd, Type::Int, Type::Int, Type::Int),
        BoundBinaryOperator::new(S::BitwiseOr, K::BitwiseOr, Type::Int, Type::Int, Type::Int),
        BoundBinaryOperator::new(S::BitwiseXor, K::BitwiseXor, Type::Int, Type::Int, Type::Int),
        BoundBinaryOperator::new(S::ShiftLeft, K::ShiftLeft, Type::Int, Type::Int, Type::Int),
        BoundBinaryOperator::new(S::ShiftRight, K::ShiftRight, Type::Int, Type::Int, Type::Int),
        BoundBinaryOperator::new(S::LogicalAnd, K::LogicalAnd, Type::Bool, Type::Bool, Type::Bool),
        BoundBinaryOperator::new(S::LogicalOr, K::LogicalOr, Type::Bool, Type::Bool, Type::Bool),
        BoundBinaryOperator::new(S::Equal, K::Equal, Type::Any, Type::Any, Type::Bool),
        BoundBinaryOperator::new(S::NotEqual, K::NotEqual, Type::Any, Type::Any, Type::Bool),
        BoundBinaryOperator::new(S::Less, K::Less, number(), number(), Type::Bool),
        BoundBinaryOperator::new(S::LessEqual, K::LessOrEqual, number(), number(), Type::Bool),
        BoundBinaryOperator::new(S::Greater, K::Greater, number(), number(), Type::Bool),
        BoundBinaryOperator::new(S::GreaterEqual, K::GreaterOrEqual, number(), number(), Type::Bool),
    ]
});
