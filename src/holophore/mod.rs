//! Holophore: the per-invocation execution context.
//!
//! Owns everything that changes while a program runs: the environment, the
//! rollout being recorded, objects bound to class spans, the fragments each
//! span produced, the active role and the span currently executing. A
//! [`Holoware`](crate::holoware::Holoware) itself is never mutated, so one
//! program can drive any number of holophores concurrently.

mod dispatch;
mod engine;

pub(crate) use engine::execute;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::class::HoloClass;
use crate::config::HoloConfig;
use crate::env::HoloEnv;
use crate::error::{HoloError, HoloResult};
use crate::holoware::SpanKey;
use crate::rollout::{Frag, FragType, Rollout};
use crate::sampler::{SampleRequest, Sampler};
use crate::types::Role;

pub struct Holophore {
    pub env: HoloEnv,
    pub rollout: Rollout,
    span_bindings: HashMap<SpanKey, Arc<dyn HoloClass>>,
    span_fragments: HashMap<SpanKey, Vec<Frag>>,
    current_role: Role,
    current_span: Option<SpanKey>,
    error_count: usize,
    /// Names of the programs currently executing, outermost first.
    active: Vec<String>,
    sampler: Arc<dyn Sampler>,
    config: HoloConfig,
}

impl Holophore {
    pub fn new(env: HoloEnv, sampler: Arc<dyn Sampler>) -> Self {
        Self {
            env,
            rollout: Rollout::new(),
            span_bindings: HashMap::new(),
            span_fragments: HashMap::new(),
            current_role: Role::System,
            current_span: None,
            error_count: 0,
            active: Vec::new(),
            sampler,
            config: HoloConfig::default(),
        }
    }

    pub fn with_config(mut self, config: HoloConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &HoloConfig {
        &self.config
    }

    // ─── Role & Span ────────────────────────────────────────────────────

    pub fn role(&self) -> &Role {
        &self.current_role
    }

    pub fn set_role(&mut self, role: Role) {
        self.current_role = role;
    }

    /// The span being dispatched, if any.
    pub fn current_span(&self) -> Option<SpanKey> {
        self.current_span
    }

    pub(crate) fn set_current_span(&mut self, key: Option<SpanKey>) {
        self.current_span = key;
    }

    /// Programs currently executing, outermost first.
    pub fn active_programs(&self) -> &[String] {
        &self.active
    }

    pub(crate) fn push_active(&mut self, name: String) {
        self.active.push(name);
    }

    pub(crate) fn pop_active(&mut self) {
        self.active.pop();
    }

    pub(crate) fn truncate_active(&mut self, depth: usize) {
        self.active.truncate(depth);
    }

    // ─── Bindings ───────────────────────────────────────────────────────

    /// Object bound to a class span. Keys come from
    /// [`Holoware::span_key`](crate::holoware::Holoware::span_key).
    pub fn binding(&self, key: SpanKey) -> Option<&Arc<dyn HoloClass>> {
        self.span_bindings.get(&key)
    }

    pub fn is_bound(&self, key: SpanKey) -> bool {
        self.span_bindings.contains_key(&key)
    }

    /// Bind `object` to a span. An existing binding is kept.
    pub(crate) fn bind(&mut self, key: SpanKey, object: Arc<dyn HoloClass>) -> &Arc<dyn HoloClass> {
        self.span_bindings.entry(key).or_insert(object)
    }

    pub fn bound_count(&self) -> usize {
        self.span_bindings.len()
    }

    // ─── Fragments ──────────────────────────────────────────────────────

    /// Append a fragment under the current role, attributed to the current span.
    pub fn add_frag(&mut self, kind: FragType, text: impl Into<String>) {
        let frag = self
            .rollout
            .add_fragment(self.current_role.clone(), kind, text)
            .clone();
        if let Some(key) = self.current_span {
            self.span_fragments.entry(key).or_default().push(frag);
        }
    }

    pub fn add_frozen(&mut self, text: impl Into<String>) {
        self.add_frag(FragType::Frozen, text);
    }

    pub fn add_reinforced(&mut self, text: impl Into<String>) {
        self.add_frag(FragType::Reinforced, text);
    }

    /// Fragments produced while `key` was the current span.
    pub fn fragments_of(&self, key: SpanKey) -> &[Frag] {
        self.span_fragments
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    // ─── Sampling ───────────────────────────────────────────────────────

    /// Ask the sampler to continue the rollout.
    pub async fn sample(&self, request: &SampleRequest) -> HoloResult<Option<String>> {
        self.sampler.sample(&self.rollout, request).await
    }

    // ─── Diagnostics ────────────────────────────────────────────────────

    /// Count of swallowed errors from optional hooks and downgraded sampler
    /// failures.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub(crate) fn note_soft_error(&mut self, target: &str, hook: &str, err: &HoloError) {
        self.error_count += 1;
        tracing::warn!(target_object = target, hook, error = %err, "optional hook failed");
    }

    pub fn into_rollout(self) -> Rollout {
        self.rollout
    }
}

impl fmt::Debug for Holophore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Holophore")
            .field("env", &self.env)
            .field("rollout", &self.rollout)
            .field("bindings", &self.span_bindings.len())
            .field("current_role", &self.current_role)
            .field("current_span", &self.current_span)
            .field("error_count", &self.error_count)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holoware::{Holoware, SpanId};
    use async_trait::async_trait;

    struct EchoSampler;

    #[async_trait]
    impl Sampler for EchoSampler {
        async fn sample(&self, rollout: &Rollout, _: &SampleRequest) -> HoloResult<Option<String>> {
            Ok(Some(rollout.text()))
        }
    }

    fn phore() -> Holophore {
        Holophore::new(HoloEnv::new(), Arc::new(EchoSampler))
    }

    #[test]
    fn defaults_to_system_role() {
        let phore = phore();
        assert_eq!(phore.role(), &Role::System);
        assert!(phore.current_span().is_none());
        assert_eq!(phore.error_count(), 0);
    }

    #[test]
    fn frags_are_indexed_by_current_span() {
        let mut phore = phore();
        let ware = Holoware::default();
        let other = Holoware::default();
        phore.set_role(Role::User);
        phore.set_current_span(Some(ware.span_key(SpanId(4))));
        phore.add_frozen("hello");
        phore.set_current_span(None);
        phore.add_frozen("untracked");

        assert_eq!(phore.fragments_of(ware.span_key(SpanId(4))).len(), 1);
        assert_eq!(phore.fragments_of(ware.span_key(SpanId(4)))[0].role, Role::User);
        assert!(phore.fragments_of(ware.span_key(SpanId(5))).is_empty());
        assert!(phore.fragments_of(other.span_key(SpanId(4))).is_empty());
        assert_eq!(phore.rollout.frag_count(), 2);
    }

    #[tokio::test]
    async fn sample_sees_rollout() {
        let mut phore = phore();
        phore.add_frozen("so far");
        let out = phore.sample(&SampleRequest::default()).await.unwrap();
        assert_eq!(out.as_deref(), Some("so far"));
    }

    #[test]
    fn soft_errors_are_counted() {
        let mut phore = phore();
        phore.note_soft_error("Critic", "on_end", &HoloError::Sampler("x".into()));
        assert_eq!(phore.error_count(), 1);
    }

    #[test]
    fn active_stack() {
        let mut phore = phore();
        phore.push_active("outer".into());
        phore.push_active("inner".into());
        assert_eq!(phore.active_programs(), ["outer", "inner"]);
        phore.pop_active();
        assert_eq!(phore.active_programs(), ["outer"]);
    }
}
