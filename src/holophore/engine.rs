//! Execution engine. Runs a program through Start, Bind, Run and End.
//!
//! Class bodies are entered by pushing a new frame instead of recursing, so
//! nesting depth is bounded by memory rather than the async call stack.

use crate::class::{construct, invoke, Call};
use crate::env::Value;
use crate::error::{HoloError, HoloResult};
use crate::holoware::{Holoware, Span};

use super::dispatch::{dispatch, Step};
use super::Holophore;

/// One program being executed.
struct Frame<'a> {
    ware: &'a Holoware,
    pos: usize,
    /// Class spans whose objects this frame bound and must end.
    bound: Vec<&'a Span>,
}

/// Execute `ware` against `phore`.
///
/// The caller's current span is restored afterwards, so a hook may run a
/// sub-program mid-dispatch. On a fatal error the active program stack is
/// restored to its depth on entry; end hooks are not run.
pub(crate) async fn execute(ware: &Holoware, phore: &mut Holophore) -> HoloResult<()> {
    let depth = phore.active_programs().len();
    let outer_span = phore.current_span();
    let result = run(ware, phore).await;
    if let Err(err) = &result {
        tracing::debug!(program = %ware.display_name(), error = %err, "program aborted");
        phore.truncate_active(depth);
    }
    phore.set_current_span(outer_span);
    result
}

async fn run(ware: &Holoware, phore: &mut Holophore) -> HoloResult<()> {
    let mut stack = vec![enter(ware, phore).await?];

    loop {
        let Some(frame) = stack.last_mut() else {
            break;
        };
        let current = frame.ware;
        let pos = frame.pos;
        frame.pos += 1;

        let Some(span) = current.spans.get(pos) else {
            if let Some(done) = stack.pop() {
                exit(done, phore).await?;
            }
            continue;
        };

        let key = current.span_key(span.id);
        phore.set_current_span(Some(key));
        let step = dispatch(phore, key, span).await;
        phore.set_current_span(None);

        if let Step::Enter(body) = step? {
            let frame = enter(body, phore).await?;
            stack.push(frame);
        }
    }
    Ok(())
}

/// Start and Bind.
async fn enter<'a>(ware: &'a Holoware, phore: &mut Holophore) -> HoloResult<Frame<'a>> {
    let name = ware.display_name();
    tracing::debug!(program = %name, spans = ware.len(), "program start");
    phore.push_active(name);

    if let Some(hook) = phore.env.start_hook().cloned() {
        if let Err(err) = hook.on_start(phore, ware).await {
            phore.note_soft_error(hook.class_name(), "on_start", &err);
        }
    }

    let mut bound = Vec::new();
    for span in ware.class_spans() {
        let Some(class_name) = span.class_name() else {
            continue;
        };
        let key = ware.span_key(span.id);
        if phore.is_bound(key) {
            continue;
        }

        let value = phore
            .env
            .get(class_name)
            .cloned()
            .ok_or_else(|| HoloError::UnknownClass(class_name.to_string()))?;
        let mut object = construct(phore, class_name, &value, span)?;
        if let Some(Value::Object(replacement)) =
            invoke(phore, &object, span, Call::Init, true).await?
        {
            object = replacement;
        }

        phore.bind(key, object);
        tracing::debug!(class = class_name, span = %key, "bound class span");
        bound.push(span);
    }

    Ok(Frame { ware, pos: 0, bound })
}

/// End.
async fn exit(frame: Frame<'_>, phore: &mut Holophore) -> HoloResult<()> {
    for span in frame.bound {
        let Some(object) = phore.binding(frame.ware.span_key(span.id)).cloned() else {
            continue;
        };
        invoke(phore, &object, span, Call::End, true).await?;
    }
    phore.pop_active();
    tracing::debug!(program = %frame.ware.display_name(), "program end");
    Ok(())
}
