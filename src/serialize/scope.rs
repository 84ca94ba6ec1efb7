//! Scopes hold loop-local variable bindings.
use serde_json::{Map, Value};

/// One level of local bindings; loop bodies push and pop these.
#[derive(Debug, Default)]
pub struct Scope {
    locals: Map<String, Value>,
}

impl Scope {
    /// An empty scope.
    pub fn new() -> Self {
        Default::default()
    }

    /// Bind a local variable.
    pub fn set_local(&mut self, name: &str, value: Value) {
        self.locals.insert(name.to_string(), value);
    }

    /// Look up a local variable.
    pub fn local(&self, name: &str) -> Option<&Value> {
        self.locals.get(name)
    }
}
