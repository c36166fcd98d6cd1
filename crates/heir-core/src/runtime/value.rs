//! Heir value representation.

use super::function::Function;
use super::object::ObjectValue;
use std::fmt;
use std::rc::Rc;

/// A Heir runtime value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// none
    #[default]
    None,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// IEEE 754 double
    Float(f64),
    /// A single character
    Char(char),
    /// String
    String(String),
    /// Ordered key/value aggregate
    Object(Rc<ObjectValue>),
    /// Function created by a `fn` declaration
    Function(Rc<Function>),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // NaN is never equal to itself
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is none.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the object payload, if this is an object.
    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// The name of the value's runtime type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Char(_) => "char",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    write!(f, "{}", if *n > 0.0 { "inf" } else { "-inf" })
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Char(c) => write!(f, "{}", c),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(object) => write!(f, "{}", object),
            Value::Function(function) => write!(f, "<fn {}>", function.name),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectValue> for Value {
    fn from(object: ObjectValue) -> Self {
        Value::Object(Rc::new(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::None.to_string(), "none");
        assert_eq!(Value::Int(69).to_string(), "69");
        assert_eq!(Value::Float(3.0).to_string(), "3");
        assert_eq!(Value::Float(69.42).to_string(), "69.42");
        assert_eq!(Value::Float(f64::NAN).to_string(), "NaN");
        assert_eq!(Value::Char('a').to_string(), "a");
        assert_eq!(Value::from("abc").to_string(), "abc");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_equality_is_structural_without_coercion() {
        assert_eq!(Value::Int(1), Value::Int(1));
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::from("1"), Value::Int(1));
        assert_ne!(Value::Float(f64::NAN), Value::Float(f64::NAN));

        let a = Value::from(ObjectValue::from_pairs(vec![(Value::from("a"), Value::Int(1))]));
        let b = Value::from(ObjectValue::from_pairs(vec![(Value::from("a"), Value::Int(1))]));
        assert_eq!(a, b);
    }
}
