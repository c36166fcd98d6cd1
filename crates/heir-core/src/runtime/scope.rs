//! Lexical scopes for variable binding.

use super::value::Value;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A lexical scope: name to value bindings chained to an enclosing scope.
///
/// `Scope` is a shared handle. Cloning it yields another reference to the
/// same bindings, which is how closures and nested interpreters observe
/// each other's updates.
#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<RefCell<Bindings>>,
}

#[derive(Default)]
struct Bindings {
    values: FxHashMap<String, Value>,
    enclosing: Option<Scope>,
}

impl Scope {
    /// Creates a new global scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new scope nested inside `enclosing`.
    pub fn with_enclosing(enclosing: &Scope) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Bindings {
                values: FxHashMap::default(),
                enclosing: Some(enclosing.clone()),
            })),
        }
    }

    /// Returns the enclosing scope, if any.
    pub fn enclosing(&self) -> Option<Scope> {
        self.inner.borrow().enclosing.clone()
    }

    /// Creates or overwrites a binding in this scope only.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.inner.borrow_mut().values.insert(name.into(), value);
    }

    /// Mutates the nearest binding of `name` in the chain.
    ///
    /// Falls back to defining it here when the name is not declared anywhere.
    pub fn assign(&self, name: &str, value: Value) {
        match self.resolve(name) {
            Some(owner) => {
                owner.inner.borrow_mut().values.insert(name.to_string(), value);
            }
            None => self.define(name, value),
        }
    }

    /// Looks `name` up through the chain; unresolved names are none.
    pub fn lookup(&self, name: &str) -> Value {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            let bindings = scope.inner.borrow();
            if let Some(value) = bindings.values.get(name) {
                return value.clone();
            }
            current = bindings.enclosing.clone();
        }
        Value::None
    }

    /// Returns true if `name` is bound anywhere in the chain.
    pub fn is_declared(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Names bound directly in this scope, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.borrow().values.keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns true if both handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn resolve(&self, name: &str) -> Option<Scope> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if scope.inner.borrow().values.contains_key(name) {
                return Some(scope);
            }
            current = scope.enclosing();
        }
        None
    }
}

// Bindings may hold functions whose closure is this very scope.
impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("names", &self.names())
            .field("has_enclosing", &self.inner.borrow().enclosing.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_lookup() {
        let scope = Scope::new();
        scope.define("x", Value::Int(1));
        assert_eq!(scope.lookup("x"), Value::Int(1));
        assert_eq!(scope.lookup("missing"), Value::None);
        assert!(!scope.is_declared("missing"));
    }

    #[test]
    fn test_lookup_delegates_to_enclosing() {
        let global = Scope::new();
        global.define("x", Value::Int(1));
        let block = Scope::with_enclosing(&global);

        assert_eq!(block.lookup("x"), Value::Int(1));
        assert!(block.enclosing().is_some_and(|s| s.ptr_eq(&global)));
    }

    #[test]
    fn test_assign_mutates_nearest_binding() {
        let global = Scope::new();
        global.define("x", Value::Int(1));
        let block = Scope::with_enclosing(&global);

        block.assign("x", Value::Int(2));
        assert_eq!(global.lookup("x"), Value::Int(2));
        assert!(block.names().is_empty());
    }

    #[test]
    fn test_assign_undeclared_defines_locally() {
        let global = Scope::new();
        let block = Scope::with_enclosing(&global);

        block.assign("y", Value::Int(3));
        assert_eq!(block.lookup("y"), Value::Int(3));
        assert_eq!(global.lookup("y"), Value::None);
    }

    #[test]
    fn test_define_shadows_enclosing() {
        let global = Scope::new();
        global.define("x", Value::Int(1));
        let block = Scope::with_enclosing(&global);
        block.define("x", Value::Int(5));

        assert_eq!(block.lookup("x"), Value::Int(5));
        assert_eq!(global.lookup("x"), Value::Int(1));
    }
}
