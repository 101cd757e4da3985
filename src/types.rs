use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Role ───────────────────────────────────────────────────────────────────

/// Speaker role ("ego") for a stretch of the transcript.
///
/// Serializes as its lowercase name; unknown names round-trip as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    #[default]
    System,
    User,
    Assistant,
    Custom(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Custom(name) => name,
        }
    }

    /// Resolve an ego tag alias to its role. Returns `None` for anything that is
    /// not one of the fixed aliases.
    pub fn from_alias(alias: &str) -> Option<Role> {
        match alias {
            "x_x" | "system" => Some(Role::System),
            "o_o" | "user" => Some(Role::User),
            "@_@" | "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        match name {
            "system" => Role::System,
            "user" => Role::User,
            "assistant" => Role::Assistant,
            other => Role::Custom(other.to_string()),
        }
    }
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        Role::from(name.as_str())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
