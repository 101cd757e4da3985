//! Span dispatcher: one handler per span variant, each a side effect on the
//! holophore.

use crate::class::{invoke, Call};
use crate::config::SamplerErrorPolicy;
use crate::env::Value;
use crate::error::{HoloError, HoloResult};
use crate::holoware::{Holoware, Span, SpanKey, SpanKind};
use crate::rollout::FragType;
use crate::sampler::SampleRequest;
use crate::types::Role;

use super::Holophore;

/// What the engine does after a span has been dispatched.
pub(crate) enum Step<'a> {
    Next,
    /// Execute a class body as a sub-program, then continue.
    Enter(&'a Holoware),
}

pub(crate) async fn dispatch<'a>(
    phore: &mut Holophore,
    key: SpanKey,
    span: &'a Span,
) -> HoloResult<Step<'a>> {
    tracing::trace!(span = %span, role = %phore.role(), "dispatch");
    match &span.kind {
        SpanKind::Text { content } => {
            phore.add_frozen(content.as_str());
        }
        SpanKind::Ego { role } => phore.set_role(role.clone()),
        SpanKind::Obj { var_ids } => render_objs(phore, var_ids),
        SpanKind::Sample { fence } => sample(phore, span, fence.as_deref()).await?,
        SpanKind::ContextReset {
            is_training_boundary,
        } => {
            // The context before the first reset counts even when empty.
            phore.rollout.ensure_context();
            phore.rollout.new_context().is_training_boundary = *is_training_boundary;
            phore.set_role(Role::System);
        }
        SpanKind::Class { class_name, body } => {
            let object = phore
                .binding(key)
                .cloned()
                .ok_or(HoloError::SpanNotFound(span.id))?;
            let rendered = invoke(phore, &object, span, Call::Render, true).await?;
            match rendered {
                Some(Value::Text(text)) if !text.is_empty() => phore.add_frozen(text),
                _ => match body {
                    Some(body) => return Ok(Step::Enter(body)),
                    None => {
                        return Err(HoloError::NothingToDo {
                            class_name: class_name.clone(),
                            span_id: span.id,
                        })
                    }
                },
            }
        }
    }
    Ok(Step::Next)
}

fn render_objs(phore: &mut Holophore, var_ids: &[String]) {
    for id in var_ids {
        let Some(rendered) = phore.env.get(id).and_then(Value::render) else {
            tracing::debug!(var = %id, "obj variable missing or not renderable");
            continue;
        };
        phore.add_frozen(format!("<obj id={id}>\n"));
        phore.add_frozen(rendered);
        phore.add_frozen("\n</obj>\n");
    }
}

async fn sample(phore: &mut Holophore, span: &Span, fence: Option<&str>) -> HoloResult<()> {
    let wrapper = fence.map(|f| (format!("<{f}>"), format!("</{f}>")));
    let mut request = SampleRequest::new(phore.role().clone()).with_args(span.args.clone());
    if let Some((open, close)) = &wrapper {
        phore.add_frozen(open.as_str());
        request.stops.push(close.clone());
    }

    let raw = match phore.sample(&request).await {
        Ok(text) => text.unwrap_or_default(),
        Err(err) => match phore.config().sampler_errors {
            SamplerErrorPolicy::Propagate => return Err(err),
            SamplerErrorPolicy::Empty => {
                phore.note_soft_error("sampler", "sample", &err);
                String::new()
            }
        },
    };

    let mut text = raw.clone();
    if let Some((_, close)) = &wrapper {
        if !text.ends_with(close.as_str()) {
            text.push_str(close);
        }
    }
    phore.add_frag(FragType::Reinforced, text);

    if let Some(label) = &span.label {
        let stored = strip_fence(&raw, wrapper.as_ref()).trim().to_string();
        phore.env.set_text(label.as_str(), stored);
    }
    Ok(())
}

/// Remove one `<fence>`/`</fence>` wrapper from sampled text.
fn strip_fence<'t>(text: &'t str, wrapper: Option<&(String, String)>) -> &'t str {
    let Some((open, close)) = wrapper else {
        return text;
    };
    let text = text.trim();
    let text = text.strip_prefix(open.as_str()).unwrap_or(text);
    text.strip_suffix(close.as_str()).unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapper(f: &str) -> (String, String) {
        (format!("<{f}>"), format!("</{f}>"))
    }

    #[test]
    fn strip_fence_removes_one_wrapper() {
        let w = wrapper("json");
        assert_eq!(strip_fence("<json>{}</json>", Some(&w)), "{}");
        assert_eq!(strip_fence("{}</json>", Some(&w)), "{}");
        assert_eq!(strip_fence("  {} ", Some(&w)), "{}");
        assert_eq!(strip_fence("<json><json>x</json></json>", Some(&w)), "<json>x</json>");
    }

    #[test]
    fn strip_fence_without_fence_is_identity() {
        assert_eq!(strip_fence(" raw ", None), " raw ");
    }
}
