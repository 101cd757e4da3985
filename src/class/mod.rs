//! Class spans: host-provided objects bound to `<|ClassName|>` positions in a
//! program.
//!
//! A host registers either a [`ClassFactory`] (instantiated once per class
//! span when its program starts) or a ready-made [`HoloClass`] object in the
//! environment under the class name. Every hook has a no-op default, so an
//! implementation only overrides the extension points it cares about.
//!
//! | Hook | When |
//! |------|------|
//! | `on_start` | a program starts (environment start hook only) |
//! | `on_init` | right after binding; may return a replacement object |
//! | `on_render` | the span is reached; non-empty text is emitted inline |
//! | `on_end` | the program that bound the object finishes |
//! | `call` | named methods reached through [`invoke::invoke`] |

pub mod invoke;

pub use invoke::{construct, invoke, Call, CallArgs};

use std::sync::Arc;

use async_trait::async_trait;

use crate::env::Value;
use crate::error::{HoloError, HoloResult};
use crate::holoware::{Holoware, Span};
use crate::holophore::Holophore;

#[async_trait]
pub trait HoloClass: Send + Sync {
    fn class_name(&self) -> &str;

    /// Text used when the object itself is referenced by an `Obj` span.
    fn describe(&self) -> Option<String> {
        None
    }

    /// Object consulted for named methods this one does not define.
    fn parent(&self) -> Option<Arc<dyn HoloClass>> {
        None
    }

    async fn on_start(&self, _phore: &mut Holophore, _ware: &Holoware) -> HoloResult<()> {
        Ok(())
    }

    async fn on_init(
        &self,
        _phore: &mut Holophore,
        _span: &Span,
    ) -> HoloResult<Option<Arc<dyn HoloClass>>> {
        Ok(None)
    }

    async fn on_render(&self, _phore: &mut Holophore, _span: &Span) -> HoloResult<Option<String>> {
        Ok(None)
    }

    async fn on_end(&self, _phore: &mut Holophore, _span: &Span) -> HoloResult<()> {
        Ok(())
    }

    /// Named method entry point. Implementations match on `method` and
    /// return `MissingMethod` for names they do not handle.
    async fn call(
        &self,
        method: &str,
        _phore: &mut Holophore,
        _span: &Span,
        _args: &mut CallArgs,
    ) -> HoloResult<Option<Value>> {
        Err(HoloError::MissingMethod {
            class_name: self.class_name().to_string(),
            method: method.to_string(),
        })
    }
}

/// Constructs class instances for class spans.
pub trait ClassFactory: Send + Sync {
    fn class_name(&self) -> &str;

    /// Construct from the span's tag arguments. `Ok(None)` declines and falls
    /// back to [`construct_default`](Self::construct_default).
    fn construct(&self, args: CallArgs) -> HoloResult<Option<Arc<dyn HoloClass>>>;

    fn construct_default(&self) -> HoloResult<Option<Arc<dyn HoloClass>>> {
        Ok(None)
    }
}

/// [`ClassFactory`] backed by a closure.
pub struct ClassFn<F> {
    name: String,
    f: F,
}

impl<F> ClassFn<F>
where
    F: Fn(CallArgs) -> HoloResult<Arc<dyn HoloClass>> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> ClassFactory for ClassFn<F>
where
    F: Fn(CallArgs) -> HoloResult<Arc<dyn HoloClass>> + Send + Sync,
{
    fn class_name(&self) -> &str {
        &self.name
    }

    fn construct(&self, args: CallArgs) -> HoloResult<Option<Arc<dyn HoloClass>>> {
        (self.f)(args).map(Some)
    }
}
