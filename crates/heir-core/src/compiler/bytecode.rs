//! Bytecode definitions.

use crate::diagnostics::{DiagnosticBag, Span};
use crate::runtime::value::Value;
use std::fmt::{self, Write as _};
use std::ops::Index;
use std::rc::Rc;

/// A generated program: an ordered instruction stream plus the diagnostics
/// sink shared with every stage that touched it.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    instructions: Vec<Instruction>,
    diagnostics: DiagnosticBag,
}

impl Bytecode {
    /// Wraps an instruction stream.
    pub fn new(instructions: Vec<Instruction>, diagnostics: DiagnosticBag) -> Self {
        Self {
            instructions,
            diagnostics,
        }
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if there are no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Gets the instruction at `index`.
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    /// Iterates the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// The instruction stream.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The shared diagnostics sink.
    pub fn diagnostics(&self) -> &DiagnosticBag {
        &self.diagnostics
    }

    /// Checks that every jump in this stream and every nested stream targets
    /// an index inside its own stream.
    ///
    /// Returns the offending `(index, target)` pairs.
    pub fn validate_jumps(&self) -> Vec<(usize, Option<usize>)> {
        let mut errors = Vec::new();
        collect_bad_jumps(&self.instructions, &mut errors);
        errors
    }

    /// Renders a human-readable listing of the program.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        disassemble_into(&mut out, &self.instructions, 0);
        out
    }
}

impl Index<usize> for Bytecode {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        &self.instructions[index]
    }
}

impl<'a> IntoIterator for &'a Bytecode {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

fn collect_bad_jumps(instructions: &[Instruction], errors: &mut Vec<(usize, Option<usize>)>) {
    for (index, instruction) in instructions.iter().enumerate() {
        if instruction.opcode.is_jump() {
            match instruction.operand {
                Some(Operand::Index(target)) if target < instructions.len() => {}
                Some(Operand::Index(target)) => errors.push((index, Some(target))),
                _ => errors.push((index, None)),
            }
        }
        match &instruction.operand {
            Some(Operand::Object(entries)) => {
                for entry in entries {
                    collect_bad_jumps(&entry.key, errors);
                    collect_bad_jumps(&entry.value, errors);
                }
            }
            Some(Operand::Proc(proc)) => collect_bad_jumps(&proc.body, errors),
            _ => {}
        }
    }
}

fn disassemble_into(out: &mut String, instructions: &[Instruction], depth: usize) {
    let pad = depth * 4;
    for (index, instruction) in instructions.iter().enumerate() {
        let _ = write!(out, "{:pad$}{:04}  {:<10}", "", index, instruction.opcode.to_string());
        match &instruction.operand {
            None => {}
            Some(Operand::Object(entries)) => {
                let _ = writeln!(out, " {} entries", entries.len());
                for (n, entry) in entries.iter().enumerate() {
                    let _ = writeln!(out, "{:pad$}  key {}:", "", n, pad = pad + 4);
                    disassemble_into(out, &entry.key, depth + 2);
                    let _ = writeln!(out, "{:pad$}  value {}:", "", n, pad = pad + 4);
                    disassemble_into(out, &entry.value, depth + 2);
                }
                continue;
            }
            Some(Operand::Proc(proc)) => {
                let _ = writeln!(out, " {}({})", proc.name, proc.parameters.join(", "));
                disassemble_into(out, &proc.body, depth + 1);
                continue;
            }
            Some(operand) => {
                let _ = write!(out, " {}", operand);
            }
        }
        out.push('\n');
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
    /// Source location of the node that produced this instruction
    pub origin: Span,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode, origin: Span) -> Self {
        Self {
            opcode,
            operand: None,
            origin,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand, origin: Span) -> Self {
        Self {
            opcode,
            operand: Some(operand),
            origin,
        }
    }

    /// The jump target, if the operand is an index.
    pub fn target(&self) -> Option<usize> {
        match self.operand {
            Some(Operand::Index(target)) => Some(target),
            _ => None,
        }
    }
}

/// Instruction operands. The shape depends on the opcode.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Literal value (PUSH)
    Value(Value),
    /// Absolute jump target (JMP, JNZ, JZ)
    Index(usize),
    /// Ordered key/value instruction lists (PUSHOBJECT)
    Object(Vec<ObjectEntry>),
    /// Call descriptor (CALL)
    Call(CallDescriptor),
    /// Compiled function (PROC)
    Proc(Rc<ProcDescriptor>),
    /// Re-push flag (STORE)
    Flag(bool),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Value(Value::String(s)) => write!(f, "{:?}", s),
            Operand::Value(Value::Char(c)) => write!(f, "{:?}", c),
            Operand::Value(value) => write!(f, "{}", value),
            Operand::Index(target) => write!(f, "-> {:04}", target),
            Operand::Object(entries) => write!(f, "{} entries", entries.len()),
            Operand::Call(call) => write!(
                f,
                "{} arg instr ({})",
                call.instruction_count,
                call.parameter_names.join(", ")
            ),
            Operand::Proc(proc) => write!(f, "{}({})", proc.name, proc.parameters.join(", ")),
            Operand::Flag(flag) => write!(f, "{}", flag),
        }
    }
}

/// One key/value pair of an object literal, each side compiled on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectEntry {
    /// Instructions producing the key
    pub key: Vec<Instruction>,
    /// Instructions producing the value
    pub value: Vec<Instruction>,
}

/// Operand of a CALL instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct CallDescriptor {
    /// Number of argument instructions following the CALL
    pub instruction_count: usize,
    /// Parameter names resolved by the binder (may be empty)
    pub parameter_names: Vec<String>,
}

/// Operand of a PROC instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcDescriptor {
    /// Function name
    pub name: String,
    /// Parameter names
    pub parameters: Vec<String>,
    /// Function body, terminated by EXIT
    pub body: Rc<[Instruction]>,
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // Stack
    /// Push the operand value
    Push,
    /// Push none
    PushNone,
    /// Build an object from nested key/value bytecode
    PushObject,
    /// Discard the top of the stack
    Pop,
    /// Swap the two topmost values
    Swap,
    /// Duplicate the top of the stack
    Dup,

    // Arithmetic
    /// Addition
    Add,
    /// Subtraction
    Sub,
    /// Multiplication
    Mul,
    /// Division
    Div,
    /// Floored integer division
    IDiv,
    /// Remainder
    Mod,
    /// Exponentiation
    Pow,
    /// Unary minus
    Unm,
    /// String concatenation
    Concat,

    // Bitwise
    /// Bitwise and
    BAnd,
    /// Bitwise or
    BOr,
    /// Bitwise xor
    BXor,
    /// Bitwise not
    BNot,
    /// Shift left
    BShl,
    /// Shift right
    BShr,

    // Logical
    /// Logical and
    And,
    /// Logical or
    Or,
    /// Logical not
    Not,

    // Comparison
    /// Equality without coercion
    Eq,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,

    // Variables and access
    /// Pop a name and push its value
    Load,
    /// Pop a value and a name and bind them
    Store,
    /// Pop a key and a target and push `target[key]`
    Index,

    // Scopes
    /// Enter a lexical scope
    BeginScope,
    /// Leave the current lexical scope
    EndScope,

    // Control flow
    /// Unconditional jump
    Jmp,
    /// Jump if the popped value is truthy
    Jnz,
    /// Jump if the popped value is falsy
    Jz,

    // Functions
    /// Call the popped function with the following argument instructions
    Call,
    /// Push a function value
    Proc,
    /// Return the popped value
    Return,

    // Misc
    /// Stop execution
    Exit,
    /// Do nothing
    NoOp,
}

impl OpCode {
    /// Returns true for JMP, JNZ and JZ.
    pub fn is_jump(&self) -> bool {
        matches!(self, OpCode::Jmp | OpCode::Jnz | OpCode::Jz)
    }

    /// The uppercase mnemonic.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Push => "PUSH",
            OpCode::PushNone => "PUSHNONE",
            OpCode::PushObject => "PUSHOBJECT",
            OpCode::Pop => "POP",
            OpCode::Swap => "SWAP",
            OpCode::Dup => "DUP",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::IDiv => "IDIV",
            OpCode::Mod => "MOD",
            OpCode::Pow => "POW",
            OpCode::Unm => "UNM",
            OpCode::Concat => "CONCAT",
            OpCode::BAnd => "BAND",
            OpCode::BOr => "BOR",
            OpCode::BXor => "BXOR",
            OpCode::BNot => "BNOT",
            OpCode::BShl => "BSHL",
            OpCode::BShr => "BSHR",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Not => "NOT",
            OpCode::Eq => "EQ",
            OpCode::Lt => "LT",
            OpCode::Lte => "LTE",
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Index => "INDEX",
            OpCode::BeginScope => "BEGINSCOPE",
            OpCode::EndScope => "ENDSCOPE",
            OpCode::Jmp => "JMP",
            OpCode::Jnz => "JNZ",
            OpCode::Jz => "JZ",
            OpCode::Call => "CALL",
            OpCode::Proc => "PROC",
            OpCode::Return => "RETURN",
            OpCode::Exit => "EXIT",
            OpCode::NoOp => "NOOP",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(instructions: Vec<Instruction>) -> Bytecode {
        Bytecode::new(instructions, DiagnosticBag::new())
    }

    #[test]
    fn test_validate_jumps() {
        let span = Span::default();
        let ok = program(vec![
            Instruction::with_operand(OpCode::Jmp, Operand::Index(1), span),
            Instruction::simple(OpCode::Exit, span),
        ]);
        assert!(ok.validate_jumps().is_empty());

        let bad = program(vec![
            Instruction::with_operand(OpCode::Jmp, Operand::Index(5), span),
            Instruction::simple(OpCode::Jnz, span),
            Instruction::simple(OpCode::Exit, span),
        ]);
        assert_eq!(bad.validate_jumps(), vec![(0, Some(5)), (1, None)]);
    }

    #[test]
    fn test_validate_jumps_in_nested_streams() {
        let span = Span::default();
        let body: Rc<[Instruction]> =
            vec![Instruction::with_operand(OpCode::Jz, Operand::Index(9), span)].into();
        let bad = program(vec![
            Instruction::with_operand(
                OpCode::Proc,
                Operand::Proc(Rc::new(ProcDescriptor {
                    name: "f".into(),
                    parameters: vec![],
                    body,
                })),
                span,
            ),
            Instruction::simple(OpCode::Exit, span),
        ]);
        assert_eq!(bad.validate_jumps(), vec![(0, Some(9))]);
    }

    #[test]
    fn test_disassemble() {
        let span = Span::default();
        let bytecode = program(vec![
            Instruction::with_operand(OpCode::Push, Operand::Value(Value::Int(1)), span),
            Instruction::with_operand(OpCode::Push, Operand::Value(Value::from("a")), span),
            Instruction::with_operand(OpCode::Jmp, Operand::Index(3), span),
            Instruction::simple(OpCode::Exit, span),
        ]);
        let listing = bytecode.disassemble();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("0000  PUSH"));
        assert!(lines[0].ends_with(" 1"));
        assert!(lines[1].ends_with("\"a\""));
        assert!(lines[2].ends_with("-> 0003"));
        assert_eq!(lines[3].trim_end(), "0003  EXIT");
    }
}
