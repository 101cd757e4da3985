//! Sampling capability consumed by `Sample` spans.
//!
//! The engine never talks to a model provider directly: a host supplies a
//! [`Sampler`] that, given the rollout so far and the stop sequences derived
//! from the span's fence, returns generated text (or nothing).

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::error::HoloResult;
use crate::holoware::SpanArgs;
use crate::rollout::Rollout;
use crate::types::Role;

/// Everything a sampler needs besides the transcript itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleRequest {
    pub stops: Vec<String>,
    /// Role the sampled text will be attributed to.
    pub role: Role,
    /// Tag arguments of the `Sample` span (`max_tokens=64`, ...).
    pub args: SpanArgs,
}

impl SampleRequest {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stops.push(stop.into());
        self
    }

    pub fn with_args(mut self, args: SpanArgs) -> Self {
        self.args = args;
        self
    }
}

#[async_trait]
pub trait Sampler: Send + Sync {
    /// Generate a continuation of `rollout`. `Ok(None)` means nothing was
    /// produced and is recorded as empty text.
    async fn sample(&self, rollout: &Rollout, request: &SampleRequest)
        -> HoloResult<Option<String>>;
}

pub type SampleFuture = Pin<Box<dyn Future<Output = HoloResult<Option<String>>> + Send>>;

/// Adapts a closure returning a boxed future into a [`Sampler`].
///
/// The closure receives owned copies so the future can outlive the borrow.
pub struct FnSampler<F> {
    f: F,
}

impl<F> FnSampler<F>
where
    F: Fn(Rollout, SampleRequest) -> SampleFuture + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Sampler for FnSampler<F>
where
    F: Fn(Rollout, SampleRequest) -> SampleFuture + Send + Sync,
{
    async fn sample(
        &self,
        rollout: &Rollout,
        request: &SampleRequest,
    ) -> HoloResult<Option<String>> {
        (self.f)(rollout.clone(), request.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_sampler_sees_rollout_and_stops() {
        let sampler = FnSampler::new(|rollout: Rollout, request: SampleRequest| {
            Box::pin(async move {
                Ok(Some(format!(
                    "{} frags, stops={:?}",
                    rollout.frag_count(),
                    request.stops
                )))
            }) as SampleFuture
        });
        let rollout = Rollout::new();
        let request = SampleRequest::new(Role::Assistant).with_stop("</x>");
        let out = sampler.sample(&rollout, &request).await.unwrap();
        assert_eq!(out.as_deref(), Some("0 frags, stops=[\"</x>\"]"));
    }

    #[test]
    fn request_builder() {
        let mut args = SpanArgs::default();
        args.keyword.insert("max_tokens".into(), "32".into());
        let request = SampleRequest::new(Role::User).with_args(args);
        assert_eq!(request.args.get("max_tokens"), Some("32"));
        assert!(request.stops.is_empty());
    }
}
