//! Heir function representation.

use super::scope::Scope;
use crate::compiler::bytecode::Instruction;
use std::fmt;
use std::rc::Rc;

/// A function value produced by a PROC instruction.
///
/// The function captures the scope that was active when the PROC executed.
pub struct Function {
    /// The function name
    pub name: String,
    /// The parameter names
    pub parameters: Vec<String>,
    /// The compiled body, terminated by EXIT
    pub body: Rc<[Instruction]>,
    /// The captured scope
    pub closure: Scope,
}

impl Function {
    /// Returns the arity (number of parameters).
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

// The closure scope usually contains the function itself.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}
