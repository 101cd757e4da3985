use thiserror::Error;

use crate::holoware::SpanId;

#[derive(Error, Debug)]
pub enum HoloError {
    #[error("Syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("Cannot have {span} span before an ego")]
    Ordering { span: String },

    #[error("Unknown class: {0}")]
    UnknownClass(String),

    #[error("Class {0} could not be constructed")]
    NotConstructible(String),

    #[error("Environment value {0} is not a class or object")]
    NotBindable(String),

    #[error("Span not found: {0}")]
    SpanNotFound(SpanId),

    #[error("Nothing to do for class span {class_name} ({span_id})")]
    NothingToDo { class_name: String, span_id: SpanId },

    #[error("Missing method: {class_name}.{method}")]
    MissingMethod { class_name: String, method: String },

    #[error("Sampler error: {0}")]
    Sampler(String),

    #[error("Holoware not found: {name} (searched {searched:?})")]
    NotFound { name: String, searched: Vec<String> },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl HoloError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        HoloError::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Errors that abort parsing rather than execution.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, HoloError::Syntax { .. } | HoloError::Ordering { .. })
    }
}

pub type HoloResult<T> = Result<T, HoloError>;
