//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::HoloResult;

/// What a `Sample` span does when the sampler returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerErrorPolicy {
    /// Abort the invocation with the sampler's error.
    #[default]
    Propagate,
    /// Count the failure and continue as if the sampler produced empty text.
    Empty,
}

/// Configuration shared by the loader and the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoloConfig {
    /// Directories searched, in order, when loading a program by name.
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<String>,
    #[serde(default)]
    pub sampler_errors: SamplerErrorPolicy,
}

fn default_search_paths() -> Vec<String> {
    vec!["prompts".into(), "hol".into()]
}

impl Default for HoloConfig {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            sampler_errors: SamplerErrorPolicy::default(),
        }
    }
}

impl HoloConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> HoloResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_search_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sampler_errors(mut self, policy: SamplerErrorPolicy) -> Self {
        self.sampler_errors = policy;
        self
    }
}
