//! The composite object value.

use super::value::Value;
use std::fmt;

/// An ordered key/value aggregate, the only aggregate runtime type.
///
/// Keys are arbitrary values; insertion order is preserved for display and
/// iteration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectValue {
    entries: Vec<(Value, Value)>,
}

impl ObjectValue {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an object from evaluated pairs.
    ///
    /// A repeated key overwrites the earlier value but keeps its position.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mut object = Self::new();
        for (key, value) in pairs {
            object.insert(key, value);
        }
        object
    }

    /// Inserts or replaces an entry.
    pub fn insert(&mut self, key: Value, value: Value) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Gets the value stored under `key`.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the object has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "{{}}");
        }

        writeln!(f, "{{")?;
        for (index, (key, value)) in self.entries.iter().enumerate() {
            write!(f, "{:width$}[{}]: ", "", key, width = (depth + 1) * 2)?;
            match value {
                Value::Object(nested) => nested.write_indented(f, depth + 1)?,
                other => write!(f, "{}", other)?,
            }
            if index + 1 < self.entries.len() {
                write!(f, ",")?;
            }
            writeln!(f)?;
        }
        write!(f, "{:width$}}}", "", width = depth * 2)
    }
}

impl fmt::Display for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}
