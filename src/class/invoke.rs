//! Invocation protocol: how the engine reaches into host objects.
//!
//! Lifecycle hooks are called through [`invoke`] with `optional = true`:
//! failures are counted on the [`Holophore`] and treated as "no effect".
//! Named methods walk [`HoloClass::parent`] until one of them handles the
//! name.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use crate::env::Value;
use crate::error::{HoloError, HoloResult};
use crate::holoware::{Span, SpanArgs};
use crate::holophore::Holophore;

use super::HoloClass;

/// Arguments for a construction or named call.
///
/// Parameters are filled in order: the next positional argument, then the
/// keyword argument of the same name, then the caller's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallArgs {
    positional: VecDeque<String>,
    keyword: BTreeMap<String, String>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positional(mut self, value: impl Into<String>) -> Self {
        self.positional.push_back(value.into());
        self
    }

    pub fn with_keyword(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    /// Fill the parameter `name`.
    pub fn take(&mut self, name: &str) -> Option<String> {
        self.positional
            .pop_front()
            .or_else(|| self.keyword.get(name).cloned())
    }

    pub fn take_or(&mut self, name: &str, default: impl Into<String>) -> String {
        self.take(name).unwrap_or_else(|| default.into())
    }

    pub fn keyword(&self, name: &str) -> Option<&str> {
        self.keyword.get(name).map(String::as_str)
    }

    /// Positional arguments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }
}

impl From<&SpanArgs> for CallArgs {
    fn from(args: &SpanArgs) -> Self {
        Self {
            positional: args.positional.iter().cloned().collect(),
            keyword: args.keyword.clone(),
        }
    }
}

/// A call into a bound object.
#[derive(Debug, Clone)]
pub enum Call {
    /// Post-construction adjustment; may yield a replacement object.
    Init,
    /// Inline rendering; yields text.
    Render,
    /// End of life.
    End,
    Named { method: String, args: CallArgs },
}

impl Call {
    pub fn named(method: impl Into<String>, args: CallArgs) -> Self {
        Call::Named {
            method: method.into(),
            args,
        }
    }

    pub fn method_name(&self) -> &str {
        match self {
            Call::Init => "on_init",
            Call::Render => "on_render",
            Call::End => "on_end",
            Call::Named { method, .. } => method,
        }
    }
}

/// Invoke `call` on `target`. With `optional`, any error is swallowed,
/// counted on the holophore and reported as `Ok(None)`.
pub async fn invoke(
    phore: &mut Holophore,
    target: &Arc<dyn HoloClass>,
    span: &Span,
    call: Call,
    optional: bool,
) -> HoloResult<Option<Value>> {
    let method = call.method_name().to_string();
    let result = match call {
        Call::Init => target
            .on_init(phore, span)
            .await
            .map(|replacement| replacement.map(Value::Object)),
        Call::Render => target
            .on_render(phore, span)
            .await
            .map(|text| text.map(Value::Text)),
        Call::End => target.on_end(phore, span).await.map(|()| None),
        Call::Named { method, mut args } => call_named(phore, target, span, &method, &mut args).await,
    };

    match result {
        Ok(value) => Ok(value),
        Err(err) if optional => {
            phore.note_soft_error(target.class_name(), &method, &err);
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

async fn call_named(
    phore: &mut Holophore,
    target: &Arc<dyn HoloClass>,
    span: &Span,
    method: &str,
    args: &mut CallArgs,
) -> HoloResult<Option<Value>> {
    let mut current = Some(target.clone());
    while let Some(object) = current {
        match object.call(method, phore, span, args).await {
            Err(HoloError::MissingMethod { .. }) => current = object.parent(),
            other => return other,
        }
    }
    Err(HoloError::MissingMethod {
        class_name: target.class_name().to_string(),
        method: method.to_string(),
    })
}

/// Produce the object bound to a class span from its environment value.
///
/// Factories are asked to construct from the span's arguments, then without
/// arguments; ready-made objects are bound as they are.
pub fn construct(
    phore: &mut Holophore,
    class_name: &str,
    value: &Value,
    span: &Span,
) -> HoloResult<Arc<dyn HoloClass>> {
    let factory = match value {
        Value::Object(object) => return Ok(object.clone()),
        Value::Class(factory) => factory,
        Value::Text(_) | Value::Record(_) => {
            return Err(HoloError::NotBindable(class_name.to_string()))
        }
    };

    match factory.construct(CallArgs::from(&span.args)) {
        Ok(Some(object)) => return Ok(object),
        Ok(None) => {}
        Err(err) => phore.note_soft_error(class_name, "construct", &err),
    }
    match factory.construct_default() {
        Ok(Some(object)) => return Ok(object),
        Ok(None) => {}
        Err(err) => phore.note_soft_error(class_name, "construct_default", &err),
    }
    Err(HoloError::NotConstructible(class_name.to_string()))
}
