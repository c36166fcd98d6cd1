//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - Dispatch loop, call convention and limits
//! - `coercion` - Conversions applied by arithmetic, bitwise, logical and
//!   comparison opcodes

pub mod coercion;
mod interpreter;

pub use coercion::CoercionError;
pub use interpreter::{VirtualMachine, VmOptions};
