//! Runtime types: values, composite objects, functions and scopes.

pub mod function;
pub mod object;
pub mod scope;
pub mod value;

pub use function::Function;
pub use object::ObjectValue;
pub use scope::Scope;
pub use value::Value;
