use serde::{Deserialize, Serialize};

use crate::Role;

/// A request to be sent to the backend.
///
/// Serializes to `{"messages": [{"role": ..., "content": ...}, ...]}`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The history messages, oldest first.
    pub messages: Vec<ChatMessage>,
}

/// A message in the request payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The author of the message.
    pub role: Role,
    /// The text content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    #[inline]
    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[inline]
    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
