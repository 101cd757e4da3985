//! Holoware: an immutable, parsed program.
//!
//! A program is an ordered sequence of [`Span`]s. Parsing is pure: the
//! resulting tree is never mutated by execution, so a single `Arc<Holoware>`
//! can be run by any number of concurrent invocations, each with its own
//! [`Holophore`].

pub mod parser;
pub mod span;
pub mod tag;

pub use parser::ParseOptions;
pub use span::{ProgramKey, Span, SpanArgs, SpanId, SpanKey, SpanKind};

use std::path::PathBuf;
use std::sync::Arc;

use crate::env::HoloEnv;
use crate::error::HoloResult;
use crate::holophore::{self, Holophore};
use crate::sampler::Sampler;

/// Equality compares content only: parsing one source twice yields equal
/// programs with different keys.
#[derive(Debug, Clone)]
pub struct Holoware {
    /// Name the program was loaded under.
    pub name: Option<String>,
    pub source_path: Option<PathBuf>,
    pub spans: Vec<Span>,
    key: ProgramKey,
}

impl Default for Holoware {
    fn default() -> Self {
        Self::from_spans(Vec::new())
    }
}

impl PartialEq for Holoware {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.source_path == other.source_path && self.spans == other.spans
    }
}

impl Holoware {
    /// A program with a fresh key.
    pub fn from_spans(spans: Vec<Span>) -> Self {
        Self::with_key(ProgramKey::fresh(), spans)
    }

    /// Nested bodies share the key of the parse that produced them.
    pub(crate) fn with_key(key: ProgramKey, spans: Vec<Span>) -> Self {
        Self {
            name: None,
            source_path: None,
            spans,
            key,
        }
    }

    /// Parse a top-level program.
    pub fn parse(source: &str) -> HoloResult<Self> {
        parser::parse(source)
    }

    pub fn parse_with(source: &str, options: ParseOptions) -> HoloResult<Self> {
        parser::parse_with(source, options)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn key(&self) -> ProgramKey {
        self.key
    }

    /// Key under which a holophore records bindings and fragments of `id`.
    pub fn span_key(&self, id: SpanId) -> SpanKey {
        SpanKey::new(self.key, id)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.spans.iter()
    }

    /// Find a span by id, searching class bodies too.
    pub fn find(&self, id: SpanId) -> Option<&Span> {
        self.spans.iter().find_map(|span| {
            if span.id == id {
                Some(span)
            } else {
                span.body().and_then(|body| body.find(id))
            }
        })
    }

    /// Class spans of this program, excluding those inside bodies.
    pub fn class_spans(&self) -> impl Iterator<Item = &Span> {
        self.spans.iter().filter(|span| span.class_name().is_some())
    }

    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.source_path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<anonymous>".to_string())
    }

    /// Execute this program against an existing holophore.
    ///
    /// Used by hosts that run several programs into one rollout, and by
    /// class hooks that run sub-programs of their own.
    pub async fn invoke(&self, phore: &mut Holophore) -> HoloResult<()> {
        holophore::execute(self, phore).await
    }

    /// Execute this program with a fresh holophore and return it.
    pub async fn run(&self, env: HoloEnv, sampler: Arc<dyn Sampler>) -> HoloResult<Holophore> {
        let mut phore = Holophore::new(env, sampler);
        self.invoke(&mut phore).await?;
        Ok(phore)
    }
}

impl<'a> IntoIterator for &'a Holoware {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
