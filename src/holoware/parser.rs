//! Holoware parser.
//!
//! Scans source text for `<|...|>` tags, emits text runs and tag spans through
//! an append-with-merge normalization step, and parses indented blocks that
//! follow class tags as nested programs.
//!
//! ```text
//! <|x_x|>You are a terse code reviewer.
//! <|o_o|>Review this:
//! <|code|>
//! <|Critic depth=2|>
//!     <|@_@:notes <>review|>
//! <|+++|>
//! ```

use crate::error::{HoloError, HoloResult};
use crate::types::Role;

use super::span::{ProgramKey, Span, SpanArgs, SpanId, SpanKind};
use super::tag::Tag;
use super::Holoware;

const OPEN: &str = "<|";
const CLOSE: &str = "|>";

/// Parser options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Insert an `Ego(system)` at the start when text or a role-dependent span
    /// would otherwise come before any ego. Used for top-level programs.
    pub seed_system: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { seed_system: true }
    }
}

/// Parse a top-level program.
pub fn parse(source: &str) -> HoloResult<Holoware> {
    parse_with(source, ParseOptions::default())
}

pub fn parse_with(source: &str, options: ParseOptions) -> HoloResult<Holoware> {
    let key = ProgramKey::fresh();
    let mut next_id = 0;
    let mut parser = HolowareParser::new(key, &mut next_id, options.seed_system, None);
    parser.parse(source)?;
    Ok(Holoware::with_key(key, parser.finish()))
}

struct HolowareParser<'c> {
    spans: Vec<Span>,
    ego: Option<Role>,
    /// Set after a class body switched roles: the role at this point depends on
    /// whether the body runs, so the next ego tag is always kept.
    ego_uncertain: bool,
    seed_system: bool,
    key: ProgramKey,
    next_id: &'c mut u32,
}

impl<'c> HolowareParser<'c> {
    fn new(key: ProgramKey, next_id: &'c mut u32, seed_system: bool, ego: Option<Role>) -> Self {
        Self {
            key,
            spans: Vec::new(),
            ego,
            ego_uncertain: false,
            seed_system,
            next_id,
        }
    }

    fn alloc_id(&mut self) -> SpanId {
        let id = SpanId(*self.next_id);
        *self.next_id += 1;
        id
    }

    fn parse(&mut self, source: &str) -> HoloResult<()> {
        let source = strip_comments(source);
        let mut cursor = 0;

        while let Some(start) = find_unescaped(&source, cursor) {
            self.push_text(&source[cursor..start])?;

            let inner_start = start + OPEN.len();
            let close = source[inner_start..]
                .find(CLOSE)
                .map(|i| inner_start + i)
                .ok_or_else(|| HoloError::syntax(start, "unclosed tag"))?;
            let tag = Tag::parse(&source[inner_start..close], start)?;
            cursor = close + CLOSE.len();

            let before = self.spans.len();
            for (kind, label, args) in tag.into_kinds() {
                self.push(kind, label, args)?;
            }

            let appended_class = self.spans.len() > before
                && self
                    .spans
                    .last()
                    .is_some_and(|span| matches!(span.kind, SpanKind::Class { .. }));
            if appended_class {
                if let Some((block, end)) = indented_block(&source, cursor) {
                    let body = self.parse_body(&block)?;
                    if let Some(SpanKind::Class { body: slot, .. }) =
                        self.spans.last_mut().map(|span| &mut span.kind)
                    {
                        *slot = Some(body);
                    }
                    cursor = end;
                }
            }
        }

        self.push_text(&source[cursor..])
    }

    fn parse_body(&mut self, block: &str) -> HoloResult<Holoware> {
        let parent_ego = self.ego.clone();
        let (spans, body_ego) = {
            let mut nested = HolowareParser::new(self.key, &mut *self.next_id, false, parent_ego.clone());
            nested.parse(block)?;
            let ego = nested.ego.clone();
            (nested.finish(), ego)
        };
        if body_ego != parent_ego {
            self.ego = body_ego.or(parent_ego);
            self.ego_uncertain = true;
        }
        Ok(Holoware::with_key(self.key, spans))
    }

    fn push_text(&mut self, raw: &str) -> HoloResult<()> {
        if raw.is_empty() {
            return Ok(());
        }
        self.push(
            SpanKind::Text {
                content: unescape(raw),
            },
            None,
            SpanArgs::default(),
        )
    }

    /// Append a span, applying normalization.
    fn push(&mut self, kind: SpanKind, label: Option<String>, args: SpanArgs) -> HoloResult<()> {
        let kind = match kind {
            SpanKind::Ego { role } => {
                if self.ego.as_ref() == Some(&role) && !self.ego_uncertain {
                    return Ok(());
                }
                self.ego = Some(role.clone());
                self.ego_uncertain = false;
                SpanKind::Ego { role }
            }
            SpanKind::ContextReset {
                is_training_boundary,
            } => {
                self.ego = None;
                self.ego_uncertain = false;
                SpanKind::ContextReset {
                    is_training_boundary,
                }
            }
            SpanKind::Text { content } => {
                let after_tag = self.spans.last().is_some_and(|span| !span.is_text());
                let content = if after_tag {
                    content.trim_start()
                } else {
                    content.as_str()
                };
                if content.trim().is_empty() {
                    return Ok(());
                }
                if let Some(SpanKind::Text { content: prev }) =
                    self.spans.last_mut().map(|span| &mut span.kind)
                {
                    prev.push_str(content);
                    return Ok(());
                }
                if self.ego.is_none() {
                    self.seed_implicit_system();
                }
                SpanKind::Text {
                    content: content.to_string(),
                }
            }
            kind @ (SpanKind::Class { .. } | SpanKind::Obj { .. } | SpanKind::Sample { .. }) => {
                if self.ego.is_none() {
                    self.seed_implicit_system();
                }
                if self.ego.is_none() {
                    return Err(HoloError::Ordering {
                        span: kind.name().to_string(),
                    });
                }
                kind
            }
        };

        let id = self.alloc_id();
        self.spans
            .push(Span::new(id, kind).with_label(label).with_args(args));
        Ok(())
    }

    /// Insert `Ego(system)` at position 0 when nothing has set a role yet.
    fn seed_implicit_system(&mut self) {
        if !self.seed_system {
            return;
        }
        let has_role = self.spans.iter().any(|span| {
            matches!(
                span.kind,
                SpanKind::Ego { .. } | SpanKind::ContextReset { .. }
            )
        });
        if has_role {
            return;
        }
        let id = self.alloc_id();
        self.spans
            .insert(0, Span::new(id, SpanKind::Ego { role: Role::System }));
        self.ego = Some(Role::System);
    }

    fn finish(mut self) -> Vec<Span> {
        if self.seed_system {
            let first_text = self.spans.iter().position(|span| {
                span.text().is_some_and(|content| !content.trim().is_empty())
            });
            if let Some(first_text) = first_text {
                let has_role = self.spans[..first_text].iter().any(|span| {
                    matches!(
                        span.kind,
                        SpanKind::Ego { .. } | SpanKind::ContextReset { .. }
                    )
                });
                if !has_role {
                    let id = self.alloc_id();
                    self.spans
                        .insert(0, Span::new(id, SpanKind::Ego { role: Role::System }));
                }
            }
        }
        merge_adjacent_text(self.spans)
    }
}

fn merge_adjacent_text(spans: Vec<Span>) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if let (Some(SpanKind::Text { content: prev }), SpanKind::Text { content }) =
            (merged.last_mut().map(|last| &mut last.kind), &span.kind)
        {
            prev.push_str(content);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// Drop every line whose trimmed content starts with `#`.
pub(crate) fn strip_comments(source: &str) -> String {
    source
        .split_inclusive('\n')
        .filter(|line| !line.trim_start().starts_with('#'))
        .collect()
}

/// Position of the next `<|` not escaped by an odd run of backslashes.
fn find_unescaped(source: &str, from: usize) -> Option<usize> {
    let mut search = from;
    loop {
        let idx = search + source[search..].find(OPEN)?;
        let backslashes = source.as_bytes()[..idx]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        if backslashes % 2 == 0 {
            return Some(idx);
        }
        search = idx + OPEN.len();
    }
}

/// `\\` becomes `\` and `\<|` becomes `<|`; other backslashes are kept.
pub(crate) fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find('\\') {
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        if let Some(stripped) = after.strip_prefix('\\') {
            out.push('\\');
            rest = stripped;
        } else if let Some(stripped) = after.strip_prefix(OPEN) {
            out.push_str(OPEN);
            rest = stripped;
        } else {
            out.push('\\');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Collect the indented block that starts on the line after `from`.
///
/// Returns the dedented block and the source position just past its last
/// non-blank line, or `None` when the tag is followed by more content on its
/// own line or the next non-blank line is not indented.
fn indented_block(source: &str, from: usize) -> Option<(String, usize)> {
    let rest = &source[from..];
    let line_end = rest.find('\n')?;
    if !rest[..line_end].trim().is_empty() {
        return None;
    }

    let mut pos = from + line_end + 1;
    let mut indent: Option<usize> = None;
    let mut lines: Vec<&str> = Vec::new();
    let mut kept = 0;
    let mut end = pos;

    while pos < source.len() {
        let next = source[pos..]
            .find('\n')
            .map(|i| pos + i + 1)
            .unwrap_or(source.len());
        let line = source[pos..next].trim_end_matches(['\n', '\r']);

        if !line.trim().is_empty() {
            let width = indent_width(line);
            match indent {
                None if width == 0 => return None,
                None => indent = Some(width),
                Some(required) if width < required => break,
                Some(_) => {}
            }
            kept = lines.len() + 1;
            end = next;
        }
        lines.push(line);
        pos = next;
    }

    let indent = indent?;
    let mut block = String::new();
    for line in &lines[..kept] {
        if line.trim().is_empty() {
            block.push('\n');
        } else {
            block.push_str(&line[indent.min(indent_width(line))..]);
            block.push('\n');
        }
    }
    Some((block, end))
}
