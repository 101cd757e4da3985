//! Span data model: one parsed unit of a Holoware program.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::Role;

use super::Holoware;

/// Stable identity of a span within one parse (nested bodies included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanId(pub u32);

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of one parse. Shared by a program and every nested body, and
/// kept by clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramKey(u64);

impl ProgramKey {
    /// A key no other parse in this process has.
    pub fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A span's identity across programs: span ids only repeat between parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpanKey {
    pub program: ProgramKey,
    pub span: SpanId,
}

impl SpanKey {
    pub fn new(program: ProgramKey, span: SpanId) -> Self {
        Self { program, span }
    }
}

impl fmt::Display for SpanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.program.0, self.span)
    }
}

/// Bare and `key=value` arguments carried by a tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanArgs {
    pub positional: Vec<String>,
    pub keyword: BTreeMap<String, String>,
}

impl SpanArgs {
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.keyword.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpanKind {
    /// Literal text emitted verbatim.
    Text { content: String },
    /// Switches the active speaker role.
    Ego { role: Role },
    /// Model sampling point, optionally bracketed by `<fence>...</fence>`.
    Sample { fence: Option<String> },
    /// Inline rendering of environment variables.
    Obj { var_ids: Vec<String> },
    /// Extension point bound to a host class, with an optional indented body.
    Class {
        class_name: String,
        body: Option<Holoware>,
    },
    /// Ends the current context and starts a new one.
    ContextReset { is_training_boundary: bool },
}

impl SpanKind {
    pub fn name(&self) -> &'static str {
        match self {
            SpanKind::Text { .. } => "text",
            SpanKind::Ego { .. } => "ego",
            SpanKind::Sample { .. } => "sample",
            SpanKind::Obj { .. } => "obj",
            SpanKind::Class { .. } => "class",
            SpanKind::ContextReset { .. } => "context_reset",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub id: SpanId,
    pub label: Option<String>,
    pub args: SpanArgs,
    pub kind: SpanKind,
}

impl Span {
    pub fn new(id: SpanId, kind: SpanKind) -> Self {
        Self {
            id,
            label: None,
            args: SpanArgs::default(),
            kind,
        }
    }

    pub fn with_label(mut self, label: Option<String>) -> Self {
        self.label = label;
        self
    }

    pub fn with_args(mut self, args: SpanArgs) -> Self {
        self.args = args;
        self
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, SpanKind::Text { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            SpanKind::Text { content } => Some(content),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<&str> {
        match &self.kind {
            SpanKind::Class { class_name, .. } => Some(class_name),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&Holoware> {
        match &self.kind {
            SpanKind::Class { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SpanKind::Text { content } => write!(f, "Text({content:?})"),
            SpanKind::Ego { role } => write!(f, "Ego({role})"),
            SpanKind::Sample { fence } => match fence {
                Some(fence) => write!(f, "Sample(<>{fence})"),
                None => write!(f, "Sample"),
            },
            SpanKind::Obj { var_ids } => write!(f, "Obj({})", var_ids.join("|")),
            SpanKind::Class { class_name, body } => match body {
                Some(body) => write!(f, "Class({class_name}, {} spans)", body.len()),
                None => write!(f, "Class({class_name})"),
            },
            SpanKind::ContextReset {
                is_training_boundary,
            } => write!(f, "ContextReset(train={is_training_boundary})"),
        }?;
        if let Some(label) = &self.label {
            write!(f, ":{label}")?;
        }
        Ok(())
    }
}
