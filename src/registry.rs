//! Method registry
//!
//! Maps method names to functions bound to a target type. A registry is built
//! once when a target is wrapped; it is the target's whole invocable surface as
//! far as a dispatcher is concerned.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::MethodResult;
use crate::spec::GrammarSpec;
use crate::value::Value;

/// A method callable on `T` with positional arguments
pub type Method<T> = Arc<dyn Fn(&mut T, &[Value]) -> MethodResult<Value> + Send + Sync>;

/// Name → method table for one target type
pub struct MethodRegistry<T> {
    methods: HashMap<String, Method<T>>,
}

impl<T> MethodRegistry<T> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register (or replace) a method
    pub fn register<F>(&mut self, name: impl Into<String>, method: F)
    where
        F: Fn(&mut T, &[Value]) -> MethodResult<Value> + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), Arc::new(method));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&mut T, &[Value]) -> MethodResult<Value> + Send + Sync + 'static,
    {
        self.register(name, method);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Method<T>> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<T> Default for MethodRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for MethodRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            methods: self.methods.clone(),
        }
    }
}

impl<T> fmt::Debug for MethodRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.names())
            .finish()
    }
}

/// Types that can enumerate their own invocable surface
pub trait Invocable: Sized {
    fn method_registry() -> MethodRegistry<Self>;
}

/// Types that declare the grammar their methods must be called in.
///
/// The grammar accessor itself is never part of the method registry.
pub trait Chainable {
    fn chain_of_command(&self) -> GrammarSpec;
}
