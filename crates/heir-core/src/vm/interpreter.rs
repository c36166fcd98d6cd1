//! The bytecode interpreter.

use std::cell::Cell;
use std::rc::Rc;

use super::coercion::{self, CoercionError};
use crate::compiler::bytecode::{Bytecode, CallDescriptor, Instruction, ObjectEntry, OpCode, Operand};
use crate::diagnostics::{DiagnosticBag, DiagnosticCode, Span};
use crate::runtime::function::Function;
use crate::runtime::object::ObjectValue;
use crate::runtime::scope::Scope;
use crate::runtime::value::Value;

/// Interpreter limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmOptions {
    /// Maximum nesting of function calls.
    pub max_call_depth: usize,
    /// Maximum number of dispatched instructions, counting nested
    /// interpreters. `None` is unlimited.
    pub step_limit: Option<u64>,
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            step_limit: None,
        }
    }
}

/// An evaluation stack entry: a value and the source of the instruction
/// that produced it.
#[derive(Debug, Clone)]
struct Frame {
    origin: Span,
    value: Value,
}

/// What the dispatch loop does after an instruction.
enum Flow {
    Next,
    Goto(usize),
    Exit,
    Return(Value),
}

/// A fatal condition. The diagnostic has already been reported.
struct Fatal;

type Step = Result<Flow, Fatal>;

/// A stack machine executing one instruction stream.
///
/// Nested interpreters (object literal entries, call arguments, function
/// bodies) share the diagnostics bag and the step budget but own their stack
/// and scope chain.
pub struct VirtualMachine<'a> {
    instructions: &'a [Instruction],
    diagnostics: DiagnosticBag,
    root: Scope,
    scope: Scope,
    scope_depth: usize,
    stack: Vec<Frame>,
    pointer: usize,
    depth: usize,
    options: VmOptions,
    steps: Rc<Cell<u64>>,
}

impl<'a> VirtualMachine<'a> {
    /// Creates an interpreter for `bytecode` over `scope`, reporting to the
    /// bytecode's diagnostics bag.
    pub fn new(bytecode: &'a Bytecode, scope: Scope) -> Self {
        Self::with_options(bytecode, scope, VmOptions::default())
    }

    /// Creates an interpreter with explicit limits.
    pub fn with_options(bytecode: &'a Bytecode, scope: Scope, options: VmOptions) -> Self {
        Self::nested(
            bytecode.instructions(),
            bytecode.diagnostics().clone(),
            scope,
            0,
            options,
            Rc::new(Cell::new(0)),
        )
    }

    fn nested(
        instructions: &'a [Instruction],
        diagnostics: DiagnosticBag,
        scope: Scope,
        depth: usize,
        options: VmOptions,
        steps: Rc<Cell<u64>>,
    ) -> Self {
        Self {
            instructions,
            diagnostics,
            root: scope.clone(),
            scope,
            scope_depth: 0,
            stack: Vec::new(),
            pointer: 0,
            depth,
            options,
            steps,
        }
    }

    /// Runs the program from the start, in the scope the interpreter was
    /// created with.
    ///
    /// Returns the value of a RETURN, otherwise the top of the stack, or none
    /// when the stack is empty. Problems are reported to the diagnostics bag
    /// and never abort the host.
    pub fn evaluate(&mut self) -> Value {
        self.pointer = 0;
        self.stack.clear();
        self.scope = self.root.clone();
        self.scope_depth = 0;

        tracing::debug!(
            instructions = self.instructions.len(),
            depth = self.depth,
            "evaluate"
        );

        let value = match self.run() {
            Some(value) => value,
            None => self.stack.last().map(|f| f.value.clone()).unwrap_or_default(),
        };

        tracing::debug!(result = %value, stack = self.stack.len(), "evaluate finished");
        value
    }

    /// The scope currently active, inner blocks included.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    fn run(&mut self) -> Option<Value> {
        let instructions = self.instructions;

        while let Some(instruction) = instructions.get(self.pointer) {
            if self.exhausted(instruction.origin) {
                return None;
            }

            tracing::trace!(
                pointer = self.pointer,
                opcode = %instruction.opcode,
                stack = self.stack.len(),
                "dispatch"
            );

            match self.step(instruction) {
                Ok(Flow::Next) => self.pointer += 1,
                Ok(Flow::Goto(target)) => self.pointer = target,
                Ok(Flow::Return(value)) => return Some(value),
                Ok(Flow::Exit) | Err(Fatal) => return None,
            }
        }

        None
    }

    /// Charges one step against the shared budget.
    fn exhausted(&self, origin: Span) -> bool {
        let Some(limit) = self.options.step_limit else {
            return false;
        };

        let taken = self.steps.get() + 1;
        self.steps.set(taken);
        if taken <= limit {
            return false;
        }
        // Only the first interpreter to run out reports it
        if taken == limit + 1 {
            self.diagnostics.error(
                DiagnosticCode::StepLimitExceeded,
                format!("Step limit of {} instructions exceeded", limit),
                origin,
            );
        }
        true
    }

    fn step(&mut self, instruction: &'a Instruction) -> Step {
        let origin = instruction.origin;

        match instruction.opcode {
            OpCode::Push => match &instruction.operand {
                Some(Operand::Value(value)) => self.push(value.clone(), origin),
                _ => return self.malformed(instruction),
            },
            OpCode::PushNone => self.push(Value::None, origin),
            OpCode::PushObject => match &instruction.operand {
                Some(Operand::Object(entries)) => {
                    let object = self.build_object(entries);
                    self.push(Value::from(object), origin);
                }
                _ => return self.malformed(instruction),
            },
            OpCode::Pop => {
                self.pop(origin)?;
            }
            OpCode::Swap => {
                let top = self.pop(origin)?;
                let below = self.pop(origin)?;
                self.stack.push(top);
                self.stack.push(below);
            }
            OpCode::Dup => {
                let top = self.pop(origin)?;
                self.stack.push(top.clone());
                self.stack.push(top);
            }

            OpCode::Add => self.arithmetic(origin, |a, b| a + b)?,
            OpCode::Sub => self.arithmetic(origin, |a, b| a - b)?,
            OpCode::Mul => self.arithmetic(origin, |a, b| a * b)?,
            OpCode::Div => self.arithmetic(origin, |a, b| a / b)?,
            OpCode::Mod => self.arithmetic(origin, |a, b| a % b)?,
            OpCode::Pow => self.arithmetic(origin, f64::powf)?,
            OpCode::IDiv => self.binary(origin, |a, b| {
                let (a, b) = (coercion::to_float(a)?, coercion::to_float(b)?);
                if b == 0.0 {
                    return Err(CoercionError::DivisionByZero);
                }
                coercion::float_to_integer((a / b).floor()).map(Value::Int)
            })?,
            OpCode::Unm => self.unary(origin, |v| coercion::to_float(v).map(|f| Value::Float(-f)))?,
            OpCode::Concat => self.binary(origin, |a, b| {
                let mut s = coercion::to_string(a);
                s.push_str(&coercion::to_string(b));
                Ok(Value::String(s))
            })?,

            OpCode::BAnd => self.bitwise(origin, |a, b| a & b)?,
            OpCode::BOr => self.bitwise(origin, |a, b| a | b)?,
            OpCode::BXor => self.bitwise(origin, |a, b| a ^ b)?,
            OpCode::BShl => self.bitwise(origin, |a, b| a.wrapping_shl((b & 63) as u32))?,
            OpCode::BShr => self.bitwise(origin, |a, b| a.wrapping_shr((b & 63) as u32))?,
            OpCode::BNot => self.unary(origin, |v| coercion::to_integer(v).map(|i| Value::Int(!i)))?,

            OpCode::And => self.logical(origin, |a, b| a && b)?,
            OpCode::Or => self.logical(origin, |a, b| a || b)?,
            OpCode::Not => self.unary(origin, |v| coercion::to_bool(v).map(|b| Value::Bool(!b)))?,

            OpCode::Eq => self.binary(origin, |a, b| Ok(Value::Bool(a == b)))?,
            OpCode::Lt => self.comparison(origin, |a, b| a < b)?,
            OpCode::Lte => self.comparison(origin, |a, b| a <= b)?,

            OpCode::Load => {
                let name = self.pop(origin)?;
                if let Some(name) = self.name(&name) {
                    let value = self.scope.lookup(name);
                    self.push(value, origin);
                }
            }
            OpCode::Store => {
                let repush = match &instruction.operand {
                    None | Some(Operand::Flag(true)) => true,
                    Some(Operand::Flag(false)) => false,
                    Some(_) => return self.malformed(instruction),
                };
                let value = self.pop(origin)?;
                let name = self.pop(origin)?;
                if let Some(name) = self.name(&name) {
                    self.scope.assign(name, value.value.clone());
                    if repush {
                        self.push(value.value, origin);
                    }
                }
            }
            OpCode::Index => {
                let key = self.pop(origin)?;
                let target = self.pop(origin)?;
                match target.value.as_object() {
                    Some(object) => {
                        let value = object.get(&key.value).cloned().unwrap_or_default();
                        self.push(value, origin);
                    }
                    None => self.diagnostics.error(
                        DiagnosticCode::NotIndexable,
                        format!("Value of type '{}' cannot be indexed", target.value.type_name()),
                        target.origin,
                    ),
                }
            }

            OpCode::BeginScope => {
                self.scope = Scope::with_enclosing(&self.scope);
                self.scope_depth += 1;
            }
            OpCode::EndScope => match self.scope.enclosing() {
                Some(enclosing) if self.scope_depth > 0 => {
                    self.scope = enclosing;
                    self.scope_depth -= 1;
                }
                _ => self.diagnostics.warning(
                    DiagnosticCode::UnbalancedScope,
                    "ENDSCOPE without a matching BEGINSCOPE",
                    origin,
                ),
            },

            OpCode::Jmp => return self.jump_target(instruction).map(Flow::Goto),
            OpCode::Jnz | OpCode::Jz => {
                let target = self.jump_target(instruction)?;
                let condition = self.pop(origin)?;
                match coercion::to_bool(&condition.value) {
                    Ok(truthy) if truthy == (instruction.opcode == OpCode::Jnz) => {
                        return Ok(Flow::Goto(target));
                    }
                    Ok(_) => {}
                    Err(err) => self.coercion_failed(err, condition.origin),
                }
            }

            OpCode::Call => match &instruction.operand {
                Some(Operand::Call(call)) => return self.call(call, origin),
                _ => return self.malformed(instruction),
            },
            OpCode::Proc => match &instruction.operand {
                Some(Operand::Proc(proc)) => {
                    let function = Function {
                        name: proc.name.clone(),
                        parameters: proc.parameters.clone(),
                        body: Rc::clone(&proc.body),
                        closure: self.scope.clone(),
                    };
                    self.push(Value::Function(Rc::new(function)), origin);
                }
                _ => return self.malformed(instruction),
            },
            OpCode::Return => {
                let value = self.stack.pop().map(|f| f.value).unwrap_or_default();
                return Ok(Flow::Return(value));
            }
            OpCode::Exit => return Ok(Flow::Exit),
            OpCode::NoOp => {}
        }

        Ok(Flow::Next)
    }

    // ==================== Stack ====================

    fn push(&mut self, value: Value, origin: Span) {
        self.stack.push(Frame { origin, value });
    }

    fn pop(&mut self, origin: Span) -> Result<Frame, Fatal> {
        match self.stack.pop() {
            Some(frame) => Ok(frame),
            None => {
                self.diagnostics.error(
                    DiagnosticCode::StackCorruption,
                    format!("Stack underflow at instruction {}", self.pointer),
                    origin,
                );
                Err(Fatal)
            }
        }
    }

    /// The string held by a LOAD/STORE name frame.
    fn name<'f>(&self, frame: &'f Frame) -> Option<&'f str> {
        let name = frame.value.as_str();
        if name.is_none() {
            self.diagnostics.error(
                DiagnosticCode::StackCorruption,
                format!("Expected a variable name, found {}", frame.value.type_name()),
                frame.origin,
            );
        }
        name
    }

    // ==================== Operators ====================

    /// Pops the right then the left operand and pushes `op(left, right)`.
    /// A coercion failure pushes nothing.
    fn binary<F>(&mut self, origin: Span, op: F) -> Result<(), Fatal>
    where
        F: FnOnce(&Value, &Value) -> Result<Value, CoercionError>,
    {
        let right = self.pop(origin)?;
        let left = self.pop(origin)?;

        match op(&left.value, &right.value) {
            Ok(value) => self.push(value, right.origin),
            Err(err) => self.coercion_failed(err, origin),
        }
        Ok(())
    }

    fn unary<F>(&mut self, origin: Span, op: F) -> Result<(), Fatal>
    where
        F: FnOnce(&Value) -> Result<Value, CoercionError>,
    {
        let operand = self.pop(origin)?;

        match op(&operand.value) {
            Ok(value) => self.push(value, origin),
            Err(err) => self.coercion_failed(err, operand.origin),
        }
        Ok(())
    }

    fn arithmetic(&mut self, origin: Span, op: impl FnOnce(f64, f64) -> f64) -> Result<(), Fatal> {
        self.binary(origin, |a, b| {
            Ok(Value::Float(op(coercion::to_float(a)?, coercion::to_float(b)?)))
        })
    }

    fn bitwise(&mut self, origin: Span, op: impl FnOnce(i64, i64) -> i64) -> Result<(), Fatal> {
        self.binary(origin, |a, b| {
            Ok(Value::Int(op(coercion::to_integer(a)?, coercion::to_integer(b)?)))
        })
    }

    fn logical(&mut self, origin: Span, op: impl FnOnce(bool, bool) -> bool) -> Result<(), Fatal> {
        self.binary(origin, |a, b| {
            Ok(Value::Bool(op(coercion::to_bool(a)?, coercion::to_bool(b)?)))
        })
    }

    fn comparison(&mut self, origin: Span, op: impl FnOnce(f64, f64) -> bool) -> Result<(), Fatal> {
        self.binary(origin, |a, b| {
            Ok(Value::Bool(op(coercion::to_float(a)?, coercion::to_float(b)?)))
        })
    }

    fn coercion_failed(&self, err: CoercionError, origin: Span) {
        self.diagnostics
            .error(DiagnosticCode::InvalidCoercion, err.to_string(), origin);
    }

    // ==================== Control flow ====================

    fn jump_target(&self, instruction: &Instruction) -> Result<usize, Fatal> {
        match instruction.target() {
            Some(target) if target < self.instructions.len() => Ok(target),
            target => {
                let message = match target {
                    Some(target) => format!(
                        "Jump target {} is outside the program (length {})",
                        target,
                        self.instructions.len()
                    ),
                    None => format!("{} requires an integer jump target", instruction.opcode),
                };
                self.diagnostics
                    .error(DiagnosticCode::InvalidJumpTarget, message, instruction.origin);
                Err(Fatal)
            }
        }
    }

    fn malformed(&self, instruction: &Instruction) -> Step {
        let message = match &instruction.operand {
            Some(operand) => format!("{} cannot take the operand '{}'", instruction.opcode, operand),
            None => format!("{} requires an operand", instruction.opcode),
        };
        self.diagnostics
            .error(DiagnosticCode::MalformedInstruction, message, instruction.origin);
        Err(Fatal)
    }

    fn child(&self, instructions: &'a [Instruction], scope: Scope, depth: usize) -> VirtualMachine<'a> {
        VirtualMachine::nested(
            instructions,
            self.diagnostics.clone(),
            scope,
            depth,
            self.options,
            Rc::clone(&self.steps),
        )
    }

    /// Runs every key and value list in its own interpreter, in order.
    fn build_object(&self, entries: &'a [ObjectEntry]) -> ObjectValue {
        let pairs: Vec<(Value, Value)> = entries
            .iter()
            .map(|entry| {
                let key = self
                    .child(&entry.key, Scope::with_enclosing(&self.scope), self.depth)
                    .evaluate();
                let value = self
                    .child(&entry.value, Scope::with_enclosing(&self.scope), self.depth)
                    .evaluate();
                (key, value)
            })
            .collect();

        ObjectValue::from_pairs(pairs)
    }

    fn call(&mut self, call: &CallDescriptor, origin: Span) -> Step {
        let callee = self.pop(origin)?;

        let instructions = self.instructions;
        let start = self.pointer + 1;
        let argument_code = start
            .checked_add(call.instruction_count)
            .and_then(|end| instructions.get(start..end));
        let Some(argument_code) = argument_code else {
            self.diagnostics.error(
                DiagnosticCode::MalformedInstruction,
                format!(
                    "CALL expects {} argument instructions but only {} remain",
                    call.instruction_count,
                    instructions.len().saturating_sub(start)
                ),
                origin,
            );
            return Err(Fatal);
        };
        let resume = Flow::Goto(start + argument_code.len());

        let mut arguments = self.child(argument_code, self.scope.clone(), self.depth);
        arguments.run();
        let arguments: Vec<Value> = arguments.stack.into_iter().map(|f| f.value).collect();

        let Value::Function(function) = &callee.value else {
            self.diagnostics.error(
                DiagnosticCode::NotCallable,
                format!("Value of type '{}' is not callable", callee.value.type_name()),
                callee.origin,
            );
            return Ok(resume);
        };

        if self.depth + 1 > self.options.max_call_depth {
            self.diagnostics.error(
                DiagnosticCode::CallDepthExceeded,
                format!(
                    "Call to '{}' exceeds the maximum call depth of {}",
                    function.name, self.options.max_call_depth
                ),
                origin,
            );
            self.push(Value::None, origin);
            return Ok(resume);
        }

        let result = self.invoke(function, &call.parameter_names, arguments);
        self.push(result, origin);
        Ok(resume)
    }

    fn invoke(&self, function: &Function, parameter_names: &[String], arguments: Vec<Value>) -> Value {
        tracing::debug!(
            function = %function.name,
            arity = function.arity(),
            arguments = arguments.len(),
            depth = self.depth + 1,
            "call"
        );

        let names: &[String] = if parameter_names.is_empty() {
            &function.parameters
        } else {
            parameter_names
        };

        let locals = Scope::with_enclosing(&function.closure);
        let mut arguments = arguments.into_iter();
        for name in names {
            locals.define(name.as_str(), arguments.next().unwrap_or_default());
        }

        VirtualMachine::nested(
            &function.body,
            self.diagnostics.clone(),
            locals,
            self.depth + 1,
            self.options,
            Rc::clone(&self.steps),
        )
        .evaluate()
    }
}
