//! Value coercions shared by every opcode of a class.
//!
//! | target  | accepted                                                   |
//! |---------|------------------------------------------------------------|
//! | float   | none (0), bool (1/0), int, float, numeric string           |
//! | integer | none, bool, int, char (code point), integral string, float |
//! | boolean | none (false), bool, int/float (nonzero), "true"/"false"    |
//! | string  | anything, via `Display`                                    |

use crate::runtime::value::Value;
use num_traits::ToPrimitive;
use thiserror::Error;

/// A value that cannot take part in an operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    /// No conversion exists from this value to the target type.
    #[error("cannot convert {found} '{value}' to {target}")]
    Unconvertible {
        /// Runtime type of the value
        found: &'static str,
        /// Display form of the value
        value: String,
        /// Requested type
        target: &'static str,
    },
    /// The conversion exists but the result does not fit.
    #[error("{value} is out of range for {target}")]
    OutOfRange {
        /// Display form of the value
        value: String,
        /// Requested type
        target: &'static str,
    },
    /// Integer division or remainder by zero.
    #[error("division by zero")]
    DivisionByZero,
}

impl CoercionError {
    fn unconvertible(value: &Value, target: &'static str) -> Self {
        CoercionError::Unconvertible {
            found: value.type_name(),
            value: value.to_string(),
            target,
        }
    }
}

/// Coerces to a float.
pub fn to_float(value: &Value) -> Result<f64, CoercionError> {
    match value {
        Value::None => Ok(0.0),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| CoercionError::unconvertible(value, "float")),
        _ => Err(CoercionError::unconvertible(value, "float")),
    }
}

/// Coerces to a 64-bit integer. Floats round half to even.
pub fn to_integer(value: &Value) -> Result<i64, CoercionError> {
    match value {
        Value::None => Ok(0),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int(i) => Ok(*i),
        Value::Char(c) => Ok(i64::from(u32::from(*c))),
        Value::Float(f) => float_to_integer(f.round_ties_even()),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| CoercionError::unconvertible(value, "int")),
        _ => Err(CoercionError::unconvertible(value, "int")),
    }
}

/// Checked float to integer cast. NaN and infinities are out of range.
pub fn float_to_integer(value: f64) -> Result<i64, CoercionError> {
    value.to_i64().ok_or_else(|| CoercionError::OutOfRange {
        value: Value::Float(value).to_string(),
        target: "int",
    })
}

/// Coerces to a boolean.
pub fn to_bool(value: &Value) -> Result<bool, CoercionError> {
    match value {
        Value::None => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Int(i) => Ok(*i != 0),
        Value::Float(f) => Ok(*f != 0.0),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(CoercionError::unconvertible(value, "bool")),
    }
}

/// Converts to the display string.
pub fn to_string(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::object::ObjectValue;

    #[test]
    fn test_to_float() {
        assert_eq!(to_float(&Value::None), Ok(0.0));
        assert_eq!(to_float(&Value::Bool(true)), Ok(1.0));
        assert_eq!(to_float(&Value::Int(3)), Ok(3.0));
        assert_eq!(to_float(&Value::from(" 2.5 ")), Ok(2.5));
        assert!(to_float(&Value::from("abc")).is_err());
        assert!(to_float(&Value::Char('a')).is_err());
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(to_integer(&Value::Char('A')), Ok(65));
        assert_eq!(to_integer(&Value::Float(2.5)), Ok(2));
        assert_eq!(to_integer(&Value::Float(3.5)), Ok(4));
        assert_eq!(to_integer(&Value::from("42")), Ok(42));
        assert!(to_integer(&Value::from("4.2")).is_err());
        assert!(matches!(
            to_integer(&Value::Float(f64::NAN)),
            Err(CoercionError::OutOfRange { .. })
        ));
        assert!(to_integer(&Value::Float(1e300)).is_err());
    }

    #[test]
    fn test_to_bool() {
        assert_eq!(to_bool(&Value::None), Ok(false));
        assert_eq!(to_bool(&Value::Int(2)), Ok(true));
        assert_eq!(to_bool(&Value::Float(0.0)), Ok(false));
        assert_eq!(to_bool(&Value::from("TRUE")), Ok(true));
        assert_eq!(to_bool(&Value::from("False")), Ok(false));
        assert!(to_bool(&Value::from("yes")).is_err());
        assert!(to_bool(&Value::from(ObjectValue::new())).is_err());
    }

    #[test]
    fn test_error_message() {
        let err = to_float(&Value::from("abc")).unwrap_err();
        assert_eq!(err.to_string(), "cannot convert string 'abc' to float");
    }
}
