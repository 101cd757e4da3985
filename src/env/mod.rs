//! Execution environment: the typed variable bag shared by a host and a
//! running program.
//!
//! `Obj` spans render values from here, `Class` spans resolve their class or
//! object by name, and labeled `Sample` spans write their output back.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::class::{ClassFactory, HoloClass};

/// A value bound in a [`HoloEnv`].
#[derive(Clone)]
pub enum Value {
    Text(String),
    Record(serde_json::Value),
    /// A constructible class, instantiated once per class span.
    Class(Arc<dyn ClassFactory>),
    /// A ready-made object, bound to class spans as-is.
    Object(Arc<dyn HoloClass>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Record(_) => "record",
            Value::Class(_) => "class",
            Value::Object(_) => "object",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Record(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Text used when the value is injected into the transcript. `None` for
    /// null records and for classes.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Record(serde_json::Value::Null) => None,
            Value::Record(serde_json::Value::String(s)) => Some(s.clone()),
            Value::Record(record) => Some(record.to_string()),
            Value::Class(_) => None,
            Value::Object(object) => object.describe(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Value::Record(r) => f.debug_tuple("Record").field(r).finish(),
            Value::Class(c) => f.debug_tuple("Class").field(&c.class_name()).finish(),
            Value::Object(o) => f.debug_tuple("Object").field(&o.class_name()).finish(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(record: serde_json::Value) -> Self {
        Value::Record(record)
    }
}

/// String-keyed environment, pre-seeded by the host before execution.
#[derive(Clone, Default)]
pub struct HoloEnv {
    vars: HashMap<String, Value>,
    start_hook: Option<Arc<dyn HoloClass>>,
}

impl HoloEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set_text(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.vars.insert(name.into(), Value::Text(text.into()));
    }

    pub fn set_record(&mut self, name: impl Into<String>, record: serde_json::Value) {
        self.vars.insert(name.into(), Value::Record(record));
    }

    /// Register a class under its own name.
    pub fn register_class(&mut self, factory: Arc<dyn ClassFactory>) {
        let name = factory.class_name().to_string();
        self.vars.insert(name, Value::Class(factory));
    }

    /// Bind a ready-made object under `name`.
    pub fn register_object(&mut self, name: impl Into<String>, object: Arc<dyn HoloClass>) {
        self.vars.insert(name.into(), Value::Object(object));
    }

    /// Object notified (`on_start`) each time a program starts executing.
    pub fn set_start_hook(&mut self, hook: Arc<dyn HoloClass>) {
        self.start_hook = Some(hook);
    }

    pub fn start_hook(&self) -> Option<&Arc<dyn HoloClass>> {
        self.start_hook.as_ref()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.vars.get(name).and_then(Value::as_text)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl fmt::Debug for HoloEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoloEnv")
            .field("vars", &self.vars)
            .field("start_hook", &self.start_hook.as_ref().map(|h| h.class_name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_and_record_values() {
        let mut env = HoloEnv::new();
        env.set_text("code", "fn main() {}");
        env.set_record("meta", json!({"lines": 1}));
        env.set("name", "holo");

        assert_eq!(env.text("code"), Some("fn main() {}"));
        assert_eq!(env.text("name"), Some("holo"));
        assert_eq!(env.text("meta"), None);
        assert_eq!(env.get("meta").unwrap().render().as_deref(), Some(r#"{"lines":1}"#));
        assert_eq!(env.len(), 3);
    }

    #[test]
    fn null_record_does_not_render() {
        assert!(Value::Record(serde_json::Value::Null).render().is_none());
        assert_eq!(
            Value::Record(json!("plain")).render().as_deref(),
            Some("plain")
        );
    }

    #[test]
    fn remove_and_contains() {
        let mut env = HoloEnv::new().with("a", "1");
        assert!(env.contains("a"));
        assert!(env.remove("a").is_some());
        assert!(!env.contains("a"));
        assert!(env.is_empty());
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::from("x").type_name(), "text");
        assert_eq!(Value::from(json!(1)).type_name(), "record");
    }
}
