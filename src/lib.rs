//! # holoware
//!
//! A tag-based language for scripting multi-turn model rollouts. A `.hol`
//! program interleaves literal text with `<|...|>` tags that switch the
//! speaking role, request a model sample, splice environment values, bind
//! host-provided objects and mark context boundaries. Running a program
//! produces a [`Rollout`]: the ordered, role-attributed fragments that make
//! up the conversation, each tagged as frozen prompt text or reinforced
//! model output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use holoware::{FnSampler, HoloEnv, Holoware, SampleFuture};
//!
//! # async fn demo() -> holoware::HoloResult<()> {
//! let ware = Holoware::parse(
//!     "<|x_x|>You answer in JSON.\n<|o_o|>Pick a number.\n<|@_@:answer <>json|>",
//! )?;
//! let sampler = Arc::new(FnSampler::new(|_rollout, _request| {
//!     Box::pin(async { Ok(Some("{\"n\": 7}".to_string())) }) as SampleFuture
//! }));
//!
//! let phore = ware.run(HoloEnv::new(), sampler).await?;
//! assert_eq!(phore.env.text("answer"), Some("{\"n\": 7}"));
//! println!("{}", phore.rollout.text());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`holoware`] | Tag grammar, span model and parser producing an immutable [`Holoware`] |
//! | [`holophore`] | Per-invocation execution context and the span execution engine |
//! | [`class`] | Host object traits (`HoloClass`, `ClassFactory`) and the invocation protocol |
//! | [`env`] | Typed environment values read and written by running spans |
//! | [`rollout`] | Fragments, contexts and the rollout record |
//! | [`sampler`] | The async sampling capability supplied by the host |
//! | [`loader`] | Search-path resolution and a cache of parsed programs |
//! | [`vfs`] | Storage backends for program sources (memory, native) |
//! | [`config`] | Search paths and sampler failure policy |
//! | [`error`] | `HoloError` with thiserror |
//! | [`types`] | `Role` |

pub mod class;
pub mod config;
pub mod env;
pub mod error;
pub mod holophore;
pub mod holoware;
pub mod loader;
pub mod rollout;
pub mod sampler;
pub mod types;
pub mod vfs;

pub use class::{Call, CallArgs, ClassFactory, ClassFn, HoloClass};
pub use config::{HoloConfig, SamplerErrorPolicy};
pub use env::{HoloEnv, Value};
pub use error::{HoloError, HoloResult};
pub use holophore::Holophore;
pub use holoware::{Holoware, ParseOptions, ProgramKey, Span, SpanArgs, SpanId, SpanKey, SpanKind};
pub use loader::HolowareLoader;
pub use rollout::{ChatMessage, Context, Frag, FragType, Rollout};
pub use sampler::{FnSampler, SampleFuture, SampleRequest, Sampler};
pub use types::Role;
