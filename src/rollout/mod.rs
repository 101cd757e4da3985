//! Rollout recorder: the transcript a program execution builds, organized
//! into contexts (turn sequences) of role-tagged fragments.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HoloResult;
use crate::types::Role;

/// Whether a fragment is fixed template text or attributed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragType {
    /// Templated text; never attributed to the model.
    Frozen,
    /// Sampled text, eligible for training signal.
    Reinforced,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frag {
    pub role: Role,
    pub kind: FragType,
    pub text: String,
}

impl Frag {
    pub fn new(role: Role, kind: FragType, text: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            text: text.into(),
        }
    }

    pub fn frozen(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, FragType::Frozen, text)
    }

    pub fn reinforced(role: Role, text: impl Into<String>) -> Self {
        Self::new(role, FragType::Reinforced, text)
    }
}

/// One role-merged turn, as handed to chat-style sampling backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub frags: Vec<Frag>,
    /// Set when the context was opened by a training-boundary reset.
    #[serde(default)]
    pub is_training_boundary: bool,
}

impl Context {
    pub fn text(&self) -> String {
        self.frags.iter().map(|f| f.text.as_str()).collect()
    }

    /// Consecutive fragments of the same role merged into one message.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages: Vec<ChatMessage> = Vec::new();
        for frag in &self.frags {
            match messages.last_mut() {
                Some(last) if last.role == frag.role => last.content.push_str(&frag.text),
                _ => messages.push(ChatMessage {
                    role: frag.role.clone(),
                    content: frag.text.clone(),
                }),
            }
        }
        messages
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rollout {
    pub id: String,
    pub contexts: Vec<Context>,
}

impl Default for Rollout {
    fn default() -> Self {
        Self::new()
    }
}

impl Rollout {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            contexts: Vec::new(),
        }
    }

    /// Start a new context and make it current.
    pub fn new_context(&mut self) -> &mut Context {
        self.contexts.push(Context::default());
        let last = self.contexts.len() - 1;
        &mut self.contexts[last]
    }

    /// Current context, creating the first one if none exists yet.
    pub fn ensure_context(&mut self) -> &mut Context {
        if self.contexts.is_empty() {
            self.contexts.push(Context::default());
        }
        let last = self.contexts.len() - 1;
        &mut self.contexts[last]
    }

    pub fn add_fragment(&mut self, role: Role, kind: FragType, text: impl Into<String>) -> &Frag {
        let context = self.ensure_context();
        context.frags.push(Frag::new(role, kind, text));
        &context.frags[context.frags.len() - 1]
    }

    pub fn current(&self) -> Option<&Context> {
        self.contexts.last()
    }

    pub fn frags(&self) -> impl Iterator<Item = &Frag> {
        self.contexts.iter().flat_map(|c| c.frags.iter())
    }

    pub fn frag_count(&self) -> usize {
        self.contexts.iter().map(|c| c.frags.len()).sum()
    }

    /// Text of the current context.
    pub fn text(&self) -> String {
        self.current().map(Context::text).unwrap_or_default()
    }

    /// Concatenated text of every reinforced fragment, in order.
    pub fn reinforced_text(&self) -> String {
        self.frags()
            .filter(|f| f.kind == FragType::Reinforced)
            .map(|f| f.text.as_str())
            .collect()
    }

    /// Messages of the current context.
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        self.current().map(Context::to_messages).unwrap_or_default()
    }

    pub fn to_json(&self) -> HoloResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> HoloResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
