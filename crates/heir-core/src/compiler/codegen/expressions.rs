//! Expression lowering.
//!
//! Every expression leaves exactly one value on the stack. Binary operators
//! are lowered from the binder's resolution; an expression the binder could
//! not resolve becomes a NOOP.

use super::BytecodeGenerator;
use crate::ast::*;
use crate::binder::{BoundBinaryOperatorKind, BoundNode};
use crate::compiler::bytecode::{CallDescriptor, ObjectEntry, OpCode, Operand};
use crate::diagnostics::{DiagnosticCode, Span};
use crate::runtime::value::Value;

impl BytecodeGenerator<'_> {
    pub(super) fn expression(&mut self, expression: &Expression) {
        let origin = expression.span;

        match &expression.kind {
            ExpressionKind::Literal(literal) => self.literal(literal, origin),
            ExpressionKind::Identifier(name) => {
                self.push_name(name, origin);
                self.emit_simple(OpCode::Load, origin);
            }
            ExpressionKind::Parenthesized(inner) => self.expression(inner),
            ExpressionKind::Unary { operator, operand } => self.unary(*operator, operand, origin),
            ExpressionKind::Binary { left, right, .. } => {
                let Some(opcodes) = self.binary_opcodes(expression) else {
                    return;
                };
                self.expression(left);
                self.expression(right);
                for opcode in opcodes {
                    self.emit_simple(*opcode, origin);
                }
            }
            ExpressionKind::Assignment {
                target,
                operator,
                value,
            } => self.assignment(expression, target, *operator, value),
            ExpressionKind::Object(properties) => self.object(properties, origin),
            ExpressionKind::Invocation { callee, arguments } => {
                self.invocation(expression, callee, arguments)
            }
            ExpressionKind::Member { object, member } => {
                self.expression(object);
                self.push_name(&member.name, member.span);
                self.emit_simple(OpCode::Index, origin);
            }
            ExpressionKind::Element { object, index } => {
                self.expression(object);
                self.expression(index);
                self.emit_simple(OpCode::Index, origin);
            }
            ExpressionKind::NoOp => {
                self.emit_simple(OpCode::NoOp, origin);
            }
        }
    }

    fn literal(&mut self, literal: &Literal, origin: Span) {
        let value = match literal {
            Literal::None => {
                self.emit_simple(OpCode::PushNone, origin);
                return;
            }
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(f) => Value::Float(*f),
            Literal::Char(c) => Value::Char(*c),
            Literal::String(s) => Value::String(s.clone()),
        };
        self.emit_operand(OpCode::Push, Operand::Value(value), origin);
    }

    fn unary(&mut self, operator: UnaryOperator, operand: &Expression, origin: Span) {
        let opcode = match operator {
            UnaryOperator::Negate => OpCode::Unm,
            UnaryOperator::Not => OpCode::Not,
            UnaryOperator::BitwiseNot => OpCode::BNot,
            UnaryOperator::Increment => return self.step(operand, OpCode::Add, OpCode::Sub, origin),
            UnaryOperator::Decrement => return self.step(operand, OpCode::Sub, OpCode::Add, origin),
        };
        self.expression(operand);
        self.emit_simple(opcode, origin);
    }

    /// `++x` / `--x`: stores the updated value and leaves the previous one.
    fn step(&mut self, target: &Expression, apply: OpCode, undo: OpCode, origin: Span) {
        let ExpressionKind::Identifier(name) = &target.kind else {
            self.unsupported("increment and decrement require a variable operand", origin);
            return;
        };

        self.push_name(name, target.span);
        self.push_name(name, target.span);
        self.emit_simple(OpCode::Load, target.span);
        self.emit_operand(OpCode::Push, Operand::Value(Value::Int(1)), origin);
        self.emit_simple(apply, origin);
        self.emit_operand(OpCode::Store, Operand::Flag(true), origin);
        self.emit_operand(OpCode::Push, Operand::Value(Value::Int(1)), origin);
        self.emit_simple(undo, origin);
    }

    /// The opcode sequence for a bound binary node, or `None` after
    /// reporting a NOOP.
    fn binary_opcodes(&mut self, node: &Expression) -> Option<&'static [OpCode]> {
        let kind = match self.bound.get(node.id) {
            Some(BoundNode::Binary(bound)) => bound.kind,
            _ => {
                self.unsupported("operator could not be resolved", node.span);
                return None;
            }
        };

        Some(match kind {
            BoundBinaryOperatorKind::Addition => &[OpCode::Add],
            BoundBinaryOperatorKind::Subtraction => &[OpCode::Sub],
            BoundBinaryOperatorKind::Multiplication => &[OpCode::Mul],
            BoundBinaryOperatorKind::Division => &[OpCode::Div],
            BoundBinaryOperatorKind::IntegerDivision => &[OpCode::IDiv],
            BoundBinaryOperatorKind::Modulo => &[OpCode::Mod],
            BoundBinaryOperatorKind::Power => &[OpCode::Pow],
            BoundBinaryOperatorKind::Concatenation => &[OpCode::Concat],
            BoundBinaryOperatorKind::BitwiseAnd => &[OpCode::BAnd],
            BoundBinaryOperatorKind::BitwiseOr => &[OpCode::BOr],
            BoundBinaryOperatorKind::BitwiseXor => &[OpCode::BXor],
            BoundBinaryOperatorKind::ShiftLeft => &[OpCode::BShl],
            BoundBinaryOperatorKind::ShiftRight => &[OpCode::BShr],
            BoundBinaryOperatorKind::LogicalAnd => &[OpCode::And],
            BoundBinaryOperatorKind::LogicalOr => &[OpCode::Or],
            BoundBinaryOperatorKind::Equal => &[OpCode::Eq],
            BoundBinaryOperatorKind::NotEqual => &[OpCode::Eq, OpCode::Not],
            BoundBinaryOperatorKind::Less => &[OpCode::Lt],
            BoundBinaryOperatorKind::LessOrEqual => &[OpCode::Lte],
            // a > b  is  !(a <= b)
            BoundBinaryOperatorKind::Greater => &[OpCode::Lte, OpCode::Not],
            BoundBinaryOperatorKind::GreaterOrEqual => &[OpCode::Lt, OpCode::Not],
        })
    }

    fn assignment(
        &mut self,
        node: &Expression,
        target: &Expression,
        operator: AssignmentOperator,
        value: &Expression,
    ) {
        let ExpressionKind::Identifier(name) = &target.kind else {
            self.unsupported("assignment target must be a variable", target.span);
            return;
        };

        match operator {
            AssignmentOperator::Assign => {
                self.push_name(name, target.span);
                self.expression(value);
            }
            AssignmentOperator::Compound(_) => {
                let Some(opcodes) = self.binary_opcodes(node) else {
                    return;
                };
                self.push_name(name, target.span);
                self.push_name(name, target.span);
                self.emit_simple(OpCode::Load, target.span);
                self.expression(value);
                for opcode in opcodes {
                    self.emit_simple(*opcode, node.span);
                }
            }
        }
        self.emit_operand(OpCode::Store, Operand::Flag(true), node.span);
    }

    fn object(&mut self, properties: &[ObjectProperty], origin: Span) {
        let entries = properties
            .iter()
            .map(|property| {
                let key = self.nested(|generator| match &property.key.kind {
                    // `{ a: 1 }` keys are names, not lookups
                    ExpressionKind::Identifier(name) => {
                        generator.push_name(name, property.key.span);
                    }
                    _ => generator.expression(&property.key),
                });
                let value = self.nested(|generator| generator.expression(&property.value));
                ObjectEntry { key, value }
            })
            .collect();

        self.emit_operand(OpCode::PushObject, Operand::Object(entries), origin);
    }

    fn invocation(&mut self, node: &Expression, callee: &Expression, arguments: &[Expression]) {
        let parameter_names = match self.bound.get(node.id) {
            Some(BoundNode::Invocation { parameter_names }) => parameter_names.clone(),
            _ => Vec::new(),
        };

        self.expression(callee);

        let argument_code = self.nested(|generator| {
            for argument in arguments {
                generator.expression(argument);
            }
        });

        self.emit_operand(
            OpCode::Call,
            Operand::Call(CallDescriptor {
                instruction_count: argument_code.len(),
                parameter_names,
            }),
            node.span,
        );
        for instruction in argument_code {
            self.emit(instruction);
        }
    }

    fn unsupported(&mut self, message: &str, origin: Span) {
        self.diagnostics
            .error(DiagnosticCode::UnsupportedOperator, message, origin);
        self.emit_simple(OpCode::NoOp, origin);
    }
}
