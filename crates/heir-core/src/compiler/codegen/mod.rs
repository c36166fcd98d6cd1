//! Code generation from the syntax tree to bytecode.
//!
//! `BytecodeGenerator` walks a [`SyntaxTree`] together with the binder's
//! [`BoundTree`] and emits a flat instruction stream.
//!
//! - `statements` - declarations, blocks, `if` chains, `return`
//! - `expressions` - literals, operators, assignments, objects, calls
//!
//! Jumps are emitted with an empty operand and patched to an absolute index
//! once the code they skip has been generated. Every stream ends with EXIT,
//! so "jump to the end" is always a valid index.

mod expressions;
mod statements;

#[cfg(test)]
mod tests;

use crate::ast::SyntaxTree;
use crate::binder::BoundTree;
use crate::compiler::bytecode::{Bytecode, Instruction, OpCode, Operand};
use crate::diagnostics::{DiagnosticBag, Span};

/// Lowers a bound syntax tree to bytecode.
pub struct BytecodeGenerator<'a> {
    bound: &'a BoundTree,
    diagnostics: DiagnosticBag,
    instructions: Vec<Instruction>,
}

impl<'a> BytecodeGenerator<'a> {
    /// Creates a generator reporting to `diagnostics`.
    pub fn new(bound: &'a BoundTree, diagnostics: DiagnosticBag) -> Self {
        Self {
            bound,
            diagnostics,
            instructions: Vec::new(),
        }
    }

    /// Generates the whole program. Never fails; problems become NOOPs and
    /// diagnostics.
    pub fn generate(mut self, tree: &SyntaxTree) -> Bytecode {
        let reported = self.diagnostics.len();

        for statement in &tree.statements {
            self.statement(statement);
        }
        self.emit(Instruction::simple(OpCode::Exit, tree.span));

        tracing::debug!(
            instructions = self.instructions.len(),
            diagnostics = self.diagnostics.len() - reported,
            "generated bytecode"
        );

        Bytecode::new(self.instructions, self.diagnostics)
    }

    /// Adds an instruction and returns its index.
    fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    fn emit_simple(&mut self, opcode: OpCode, origin: Span) -> usize {
        self.emit(Instruction::simple(opcode, origin))
    }

    fn emit_operand(&mut self, opcode: OpCode, operand: Operand, origin: Span) -> usize {
        self.emit(Instruction::with_operand(opcode, operand, origin))
    }

    /// Emits a jump whose target is filled in by `patch_jump`.
    fn emit_jump(&mut self, opcode: OpCode, origin: Span) -> usize {
        self.emit_simple(opcode, origin)
    }

    /// Points the jump at `index` to the next instruction to be emitted.
    fn patch_jump(&mut self, index: usize) {
        let target = self.instructions.len();
        self.instructions[index].operand = Some(Operand::Index(target));
    }

    /// Runs `generate` against an empty buffer and returns what it emitted.
    fn nested(&mut self, generate: impl FnOnce(&mut Self)) -> Vec<Instruction> {
        let saved = std::mem::take(&mut self.instructions);
        generate(self);
        std::mem::replace(&mut self.instructions, saved)
    }
}
