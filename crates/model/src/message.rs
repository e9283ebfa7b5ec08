use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human on this side of the conversation.
    User,
    /// The backend agent.
    Assistant,
}

impl Role {
    /// Returns the wire name of this role.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A part of the message content.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
}

/// The reason why an assistant message has completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// The stream ended normally.
    Stop,
}

/// The lifecycle status of a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageStatus {
    /// The message is still receiving text.
    Running,
    /// The message has received all of its text.
    Complete {
        /// Why the message completed.
        reason: FinishReason,
    },
    /// The turn was cancelled, the message keeps whatever text it had.
    Cancelled,
    /// The turn failed before the stream could finish.
    Failed {
        /// A human readable description of the failure.
        error: String,
    },
}

impl MessageStatus {
    /// Returns `true` if the message may still be replaced.
    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, MessageStatus::Running)
    }
}

/// A message snapshot in the conversation.
///
/// Messages are never mutated after they have been published. A running
/// assistant message is superseded by a new `Message` value carrying the
/// same id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Message {
    /// The opaque identifier, stable across snapshots of the same message.
    pub id: String,
    /// The author of this message.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
    /// Lifecycle status.
    pub status: MessageStatus,
    /// When the message was first created.
    pub created_at: SystemTime,
}

impl Message {
    /// Returns the concatenated text of all text parts.
    pub fn text(&self) -> String {
        let mut text = String::new();
        for part in &self.content {
            match part {
                ContentPart::Text { text: t } => text.push_str(t),
            }
        }
        text
    }
}
