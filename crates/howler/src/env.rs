//! Lexically scoped environments for the tree-walking pipeline.

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::value::Value;

/// Shared handle to an [`Environment`].
///
/// Closures hold a strong reference to their defining environment, so an
/// environment lives as long as any closure created inside it. A function
/// that is bound in the same environment it captures forms a cycle and is
/// reclaimed only at process exit; host memory management is all the garbage
/// collection there is.
pub type Env = Rc<RefCell<Environment>>;

/// A name→value table with an optional outer scope.
#[derive(Debug, Default)]
pub struct Environment {
    store: AHashMap<String, Value>,
    outer: Option<Env>,
}

impl Environment {
    /// Creates a fresh top-level environment.
    #[must_use]
    pub fn new() -> Env {
        Rc::new(RefCell::new(Self::default()))
    }

    /// Creates an environment whose lookups fall back to `outer`.
    #[must_use]
    pub fn new_enclosed(outer: Env) -> Env {
        Rc::new(RefCell::new(Self {
            store: AHashMap::new(),
            outer: Some(outer),
        }))
    }

    /// Looks up `name`, consulting outer scopes until found.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.store.get(name) {
            Some(value) => Some(value.clone()),
            None => self
                .outer
                .as_ref()
                .and_then(|outer| outer.borrow().get(name)),
        }
    }

    /// Binds `name` in this innermost scope.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.store.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let env = Environment::new();
        env.borrow_mut().set("a", Value::Integer(1));
        assert_eq!(env.borrow().get("a"), Some(Value::Integer(1)));
        assert_eq!(env.borrow().get("b"), None);
    }

    #[test]
    fn test_enclosed_lookup_falls_outward() {
        let outer = Environment::new();
        outer.borrow_mut().set("a", Value::Integer(1));
        let inner = Environment::new_enclosed(outer.clone());
        inner.borrow_mut().set("b", Value::Integer(2));

        assert_eq!(inner.borrow().get("a"), Some(Value::Integer(1)));
        assert_eq!(inner.borrow().get("b"), Some(Value::Integer(2)));
        assert_eq!(outer.borrow().get("b"), None);
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let outer = Environment::new();
        outer.borrow_mut().set("a", Value::Integer(1));
        let inner = Environment::new_enclosed(outer.clone());
        inner.borrow_mut().set("a", Value::Integer(2));

        assert_eq!(inner.borrow().get("a"), Some(Value::Integer(2)));
        assert_eq!(outer.borrow().get("a"), Some(Value::Integer(1)));
    }
}
