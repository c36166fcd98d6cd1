//! Static types used by the binder.

use crate::ast::{TypeRef, TypeRefKind};
use std::fmt;

/// A static type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `char`
    Char,
    /// `none`
    None,
    /// Object literal values
    Object,
    /// Function values
    Function,
    /// Unknown; compatible with everything
    Any,
    /// `a | b`
    Union(Vec<Type>),
}

impl Type {
    /// `int | float`
    pub fn number() -> Type {
        Type::Union(vec![Type::Int, Type::Float])
    }

    /// Resolves a type name.
    pub fn from_name(name: &str) -> Option<Type> {
        let ty = match name {
            "int" => Type::Int,
            "float" => Type::Float,
            "bool" => Type::Bool,
            "string" => Type::String,
            "char" => Type::Char,
            "none" => Type::None,
            "object" => Type::Object,
            "function" => Type::Function,
            "number" => Type::number(),
            "any" => Type::Any,
            _ => return None,
        };
        Some(ty)
    }

    /// Resolves an annotation, returning the names that could not be resolved.
    pub fn from_ref(type_ref: &TypeRef) -> (Type, Vec<String>) {
        match &type_ref.kind {
            TypeRefKind::Named(name) => match Type::from_name(name) {
                Some(ty) => (ty, Vec::new()),
                None => (Type::Any, vec![name.clone()]),
            },
            TypeRefKind::Union(members) => {
                let mut types = Vec::new();
                let mut unknown = Vec::new();
                for member in members {
                    let (ty, missing) = Type::from_ref(member);
                    types.push(ty);
                    unknown.extend(missing);
                }
                (Type::Union(types), unknown)
            }
        }
    }

    /// Returns true if a value of type `self` may be stored where `target`
    /// is expected.
    ///
    /// Unions on the source side are accepted if any member fits, which
    /// keeps `number` results usable where `int` is expected.
    pub fn is_assignable_to(&self, target: &Type) -> bool {
        match (self, target) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Union(members), _) => members.iter().any(|m| m.is_assignable_to(target)),
            (_, Type::Union(members)) => members.iter().any(|m| self.is_assignable_to(m)),
            _ => self == target,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Bool => write!(f, "bool"),
            Type::String => write!(f, "string"),
            Type::Char => write!(f, "char"),
            Type::None => write!(f, "none"),
            Type::Object => write!(f, "object"),
            Type::Function => write!(f, "function"),
            Type::Any => write!(f, "any"),
            Type::Union(members) => {
                let names: Vec<String> = members.iter().map(Type::to_string).collect();
                write!(f, "{}", names.join(" | "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignability() {
        assert!(Type::Int.is_assignable_to(&Type::Int));
        assert!(!Type::Float.is_assignable_to(&Type::Int));
        assert!(Type::Int.is_assignable_to(&Type::number()));
        assert!(Type::number().is_assignable_to(&Type::Int));
        assert!(Type::Any.is_assignable_to(&Type::String));
        assert!(Type::String.is_assignable_to(&Type::Any));
        assert!(!Type::String.is_assignable_to(&Type::number()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::number().to_string(), "int | float");
        assert_eq!(Type::None.to_string(), "none");
    }
}
