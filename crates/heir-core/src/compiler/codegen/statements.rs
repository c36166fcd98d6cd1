//! Statement lowering.
//!
//! | Statement | Bytecode |
//! |-----------|----------|
//! | expression | the expression; its value stays on the stack |
//! | `let x = v` | `PUSH "x"`, v (or `PUSHNONE`), `STORE false` |
//! | `fn f(..) ..` | `PUSH "f"`, `PROC`, `STORE false` |
//! | `{ .. }` | `BEGINSCOPE`, statements, `ENDSCOPE` |
//! | `return v` | v (or `PUSHNONE`), `RETURN` |
//!
//! ## If chains
//!
//! ```text
//! if c1 b1 else if c2 b2 else b3
//!
//!   [c1]
//!   JNZ -> L1
//!   [c2]          ; else part, generated recursively
//!   JNZ -> L2
//!   [b3]
//!   JMP -> E2
//! L2:
//!   [b2]
//! E2:
//!   JMP -> E1
//! L1:
//!   [b1]
//! E1:
//! ```

use super::BytecodeGenerator;
use crate::ast::*;
use crate::compiler::bytecode::{Instruction, OpCode, Operand, ProcDescriptor};
use crate::diagnostics::Span;
use crate::runtime::value::Value;
use std::rc::Rc;

impl BytecodeGenerator<'_> {
    pub(super) fn statement(&mut self, statement: &Statement) {
        let origin = statement.span;

        match &statement.kind {
            StatementKind::Expression(expression) => self.expression(expression),
            StatementKind::Variable(declaration) => {
                self.push_name(&declaration.name.name, declaration.name.span);
                match &declaration.initializer {
                    Some(initializer) => self.expression(initializer),
                    None => {
                        self.emit_simple(OpCode::PushNone, origin);
                    }
                }
                self.emit_operand(OpCode::Store, Operand::Flag(false), origin);
            }
            StatementKind::Function(function) => self.function_declaration(function, origin),
            StatementKind::Block(statements) => {
                self.emit_simple(OpCode::BeginScope, origin);
                for statement in statements {
                    self.statement(statement);
                }
                self.emit_simple(OpCode::EndScope, origin);
            }
            StatementKind::If(if_stmt) => self.if_statement(if_stmt, origin),
            StatementKind::Return(value) => {
                match value {
                    Some(value) => self.expression(value),
                    None => {
                        self.emit_simple(OpCode::PushNone, origin);
                    }
                }
                self.emit_simple(OpCode::Return, origin);
            }
            StatementKind::NoOp => {
                self.emit_simple(OpCode::NoOp, origin);
            }
        }
    }

    fn function_declaration(&mut self, function: &FunctionDeclaration, origin: Span) {
        let body = self.nested(|generator| {
            for statement in &function.body {
                generator.statement(statement);
            }
            generator.emit_simple(OpCode::Exit, origin);
        });

        let descriptor = ProcDescriptor {
            name: function.name.name.clone(),
            parameters: function
                .parameters
                .iter()
                .map(|p| p.name.name.clone())
                .collect(),
            body: body.into(),
        };

        self.push_name(&function.name.name, function.name.span);
        self.emit_operand(OpCode::Proc, Operand::Proc(Rc::new(descriptor)), origin);
        self.emit_operand(OpCode::Store, Operand::Flag(false), origin);
    }

    fn if_statement(&mut self, if_stmt: &IfStatement, origin: Span) {
        self.expression(&if_stmt.condition);
        let jump_to_body = self.emit_jump(OpCode::Jnz, origin);

        if let Some(else_branch) = &if_stmt.else_branch {
            self.statement(else_branch);
        }
        let jump_to_end = self.emit_jump(OpCode::Jmp, origin);

        self.patch_jump(jump_to_body);
        self.statement(&if_stmt.body);
        self.patch_jump(jump_to_end);
    }

    pub(super) fn push_name(&mut self, name: &str, origin: Span) {
        self.emit(Instruction::with_operand(
            OpCode::Push,
            Operand::Value(Value::String(name.to_string())),
            origin,
        ));
    }
}
