//! Tag grammar: tokenizes the interior of a `<|...|>` tag and classifies it
//! into spans.

use crate::error::{HoloError, HoloResult};
use crate::types::Role;

use super::span::{SpanArgs, SpanKind};

/// Two-character shorthand introducing a fence: `<>think`.
const FENCE_SHORTHAND: &str = "<>";
/// Keyword spelling of the fence: `fence=think`.
const FENCE_KEY: &str = "fence";

const TRAINING_RESET: &str = "+++";
const PLAIN_RESETS: [&str; 2] = ["===", "---"];

/// A tokenized tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub base: String,
    pub label: Option<String>,
    pub fence: Option<String>,
    pub args: SpanArgs,
}

impl Tag {
    /// Tokenize a tag interior. `offset` is the tag's position in the source,
    /// used for error reporting.
    pub fn parse(inner: &str, offset: usize) -> HoloResult<Self> {
        let tokens = tokenize(inner);
        let mut tag = Tag::default();
        let Some((first, rest)) = tokens.split_first() else {
            return Ok(tag);
        };

        match first.split_once(':') {
            Some((base, label)) => {
                tag.base = base.to_string();
                let label = label.trim();
                if !label.is_empty() {
                    tag.label = Some(label.to_string());
                }
            }
            None => tag.base = first.to_string(),
        }

        for token in rest {
            if let Some(fence) = token.strip_prefix(FENCE_SHORTHAND) {
                if fence.is_empty() {
                    return Err(HoloError::syntax(
                        offset,
                        format!("empty fence attribute in tag <|{inner}|>"),
                    ));
                }
                tag.fence = Some(unquote(fence).to_string());
            } else if let Some((key, value)) = token.split_once('=') {
                if key == FENCE_KEY {
                    let value = unquote(value);
                    if value.is_empty() {
                        return Err(HoloError::syntax(
                            offset,
                            format!("empty fence attribute in tag <|{inner}|>"),
                        ));
                    }
                    tag.fence = Some(value.to_string());
                } else {
                    tag.args
                        .keyword
                        .insert(key.to_string(), unquote(value).to_string());
                }
            } else {
                tag.args.positional.push(unquote(token).to_string());
            }
        }
        Ok(tag)
    }

    /// Classify the tag into zero, one or two span kinds. The returned args
    /// and label belong to the last kind in the list.
    pub fn into_kinds(self) -> Vec<(SpanKind, Option<String>, SpanArgs)> {
        let Tag {
            base,
            label,
            fence,
            args,
        } = self;

        let ego = Role::from_alias(&base)
            .or_else(|| fence.as_ref().map(|_| Role::from(base.as_str())));
        if let Some(role) = ego {
            if args.is_empty() && fence.is_none() {
                return vec![(SpanKind::Ego { role }, label, args)];
            }
            return vec![
                (SpanKind::Ego { role }, None, SpanArgs::default()),
                (SpanKind::Sample { fence }, label, args),
            ];
        }

        if base == TRAINING_RESET {
            return vec![(
                SpanKind::ContextReset {
                    is_training_boundary: true,
                },
                label,
                args,
            )];
        }
        if PLAIN_RESETS.contains(&base.as_str()) {
            return vec![(
                SpanKind::ContextReset {
                    is_training_boundary: false,
                },
                label,
                args,
            )];
        }

        match base.chars().next() {
            Some(c) if c.is_uppercase() => vec![(
                SpanKind::Class {
                    class_name: base,
                    body: None,
                },
                label,
                args,
            )],
            Some(_) => {
                let var_ids: Vec<String> = base
                    .split('|')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from)
                    .collect();
                vec![(SpanKind::Obj { var_ids }, label, args)]
            }
            None => Vec::new(),
        }
    }
}

/// Split on whitespace, keeping single- or double-quoted runs inside one token.
pub fn tokenize(inner: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut token_start: Option<usize> = None;
    let mut quote: Option<char> = None;

    for (i, c) in inner.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                if token_start.is_none() {
                    token_start = Some(i);
                }
            }
            None if c.is_whitespace() => {
                if let Some(start) = token_start.take() {
                    tokens.push(&inner[start..i]);
                }
            }
            None => {
                if token_start.is_none() {
                    token_start = Some(i);
                }
            }
        }
    }
    if let Some(start) = token_start {
        tokens.push(&inner[start..]);
    }
    tokens
}

/// Strip one pair of matching outer quotes.
fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
