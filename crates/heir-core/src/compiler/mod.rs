//! Bytecode compiler.
//!
//! Lowers a bound syntax tree into the flat instruction stream executed by
//! the VM.
//!
//! # Module Structure
//!
//! - `bytecode`: Instructions, operands and the bytecode container
//! - `codegen`: Code generation from the syntax tree

pub mod bytecode;
pub mod codegen;

pub use bytecode::{
    Bytecode, CallDescriptor, Instruction, ObjectEntry, OpCode, Operand, ProcDescriptor,
};
pub use codegen::BytecodeGenerator;
