//! Message types for oracle communication.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Role of a message sent to the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions and context.
    System,
    /// The user's request.
    User,
    /// A previous model response.
    Assistant,
}

impl Role {
    /// Returns the role as a string for API requests.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single role-tagged message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Creates a new message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// What the oracle made of a natural-language request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    /// SQL text, untrusted until the query executor has classified it.
    pub sql: String,
    /// Report path proposed by the oracle, if any.
    pub path: Option<PathBuf>,
}

impl Translation {
    /// Creates a translation without a proposed path.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            path: None,
        }
    }

    /// Sets the proposed report path.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}
