//! Conversation-related types.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use a2a_chat_model::{
    ChatMessage, ContentPart, FinishReason, Message, MessageStatus, Role,
};

/// An immutable view of the conversation at some point in time.
pub type Snapshot = Arc<[Message]>;

/// Which part of the history is forwarded to the backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HistoryMode {
    /// Every user message and every completed assistant message. Use this
    /// for backends that keep no state between calls.
    #[default]
    Full,
    /// Only the message that started the turn. Use this for backends that
    /// keep the history themselves.
    LatestOnly,
}

/// Represents a conversation.
///
/// The message list only grows, except that the most recent assistant
/// message is replaced while it is running. At most one message is
/// running at a time.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    next_seq: u64,
}

impl Conversation {
    /// Creates an empty conversation.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages in order.
    #[inline]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Takes a snapshot of the current messages.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        Arc::from(self.messages.as_slice())
    }

    /// Returns the running assistant message, if any.
    #[inline]
    pub fn running(&self) -> Option<&Message> {
        self.messages.last().filter(|msg| msg.status.is_running())
    }

    /// Appends a complete user message and returns it.
    pub fn push_user(&mut self, input: &str) -> &Message {
        let msg = self.new_message(Role::User, input, complete_status());
        self.messages.push(msg);
        &self.messages[self.messages.len() - 1]
    }

    /// Appends an empty, running assistant message.
    ///
    /// Returns `None` if another message is still running.
    pub fn push_placeholder(&mut self) -> Option<&Message> {
        if self.running().is_some() {
            return None;
        }
        let msg =
            self.new_message(Role::Assistant, "", MessageStatus::Running);
        self.messages.push(msg);
        self.messages.last()
    }

    /// Replaces the running message with one carrying `text`.
    ///
    /// Returns `false` if no message is running.
    pub fn update_running(&mut self, text: &str) -> bool {
        self.replace_running(MessageStatus::Running, Some(text))
    }

    /// Replaces the running message with a completed one.
    pub fn complete_running(&mut self, text: &str) -> bool {
        self.replace_running(complete_status(), Some(text))
    }

    /// Replaces the running message with a cancelled one, keeping the
    /// text received so far.
    pub fn cancel_running(&mut self) -> bool {
        self.replace_running(MessageStatus::Cancelled, None)
    }

    /// Replaces the running message with a failed one, keeping the text
    /// received so far.
    pub fn fail_running<S: Into<String>>(&mut self, error: S) -> bool {
        let status = MessageStatus::Failed {
            error: error.into(),
        };
        self.replace_running(status, None)
    }

    /// Builds the history messages for the next request.
    pub fn history(&self, mode: HistoryMode) -> Vec<ChatMessage> {
        let to_chat_message = |msg: &Message| ChatMessage {
            role: msg.role,
            content: msg.text(),
        };
        match mode {
            HistoryMode::Full => self
                .messages
                .iter()
                .filter(|msg| match msg.role {
                    Role::User => true,
                    Role::Assistant => {
                        matches!(msg.status, MessageStatus::Complete { .. })
                    }
                })
                .map(to_chat_message)
                .collect(),
            HistoryMode::LatestOnly => self
                .messages
                .iter()
                .rev()
                .find(|msg| msg.role == Role::User)
                .map(to_chat_message)
                .into_iter()
                .collect(),
        }
    }

    fn replace_running(
        &mut self,
        status: MessageStatus,
        text: Option<&str>,
    ) -> bool {
        let Some(tail) = self.messages.last_mut() else {
            return false;
        };
        if !tail.status.is_running() {
            return false;
        }
        // Swap in a whole new message, snapshots taken earlier keep
        // their own copy of the old one.
        let content = match text {
            Some(text) => text_content(text),
            None => tail.content.clone(),
        };
        *tail = Message {
            id: tail.id.clone(),
            role: tail.role,
            content,
            status,
            created_at: tail.created_at,
        };
        true
    }

    fn new_message(
        &mut self,
        role: Role,
        text: &str,
        status: MessageStatus,
    ) -> Message {
        let created_at = SystemTime::now();
        let millis = created_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let seq = self.next_seq;
        self.next_seq += 1;
        Message {
            id: format!("{}-{millis}-{seq}", role.as_str()),
            role,
            content: text_content(text),
            status,
            created_at,
        }
    }
}

#[inline]
fn text_content(text: &str) -> Vec<ContentPart> {
    vec![ContentPart::Text {
        text: text.to_owned(),
    }]
}

#[inline]
fn complete_status() -> MessageStatus {
    MessageStatus::Complete {
        reason: FinishReason::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_lifecycle() {
        let mut conversation = Conversation::new();
        let user_id = conversation.push_user("Hi").id.clone();
        let assistant_id = conversation.push_placeholder().unwrap().id.clone();
        assert_ne!(user_id, assistant_id);
        assert!(user_id.starts_with("user-"));
        assert!(assistant_id.starts_with("assistant-"));

        let before = conversation.snapshot();
        assert!(conversation.update_running("Hel"));
        assert!(conversation.update_running("Hello"));
        assert!(conversation.complete_running("Hello"));

        let msgs = conversation.messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].id, assistant_id);
        assert_eq!(msgs[1].text(), "Hello");
        assert_eq!(
            msgs[1].status,
            MessageStatus::Complete {
                reason: FinishReason::Stop
            }
        );

        // Earlier snapshots are not affected by replacements.
        assert_eq!(before[1].text(), "");
        assert_eq!(before[1].status, MessageStatus::Running);
    }

    #[test]
    fn test_finished_messages_are_frozen() {
        let mut conversation = Conversation::new();
        conversation.push_user("Hi");
        conversation.push_placeholder().unwrap();
        assert!(conversation.update_running("partial"));
        assert!(conversation.cancel_running());

        assert!(!conversation.update_running("more"));
        assert!(!conversation.complete_running("more"));
        assert!(!conversation.fail_running("boom"));

        let tail = conversation.messages().last().unwrap();
        assert_eq!(tail.text(), "partial");
        assert_eq!(tail.status, MessageStatus::Cancelled);
    }

    #[test]
    fn test_single_running_message() {
        let mut conversation = Conversation::new();
        conversation.push_user("Hi");
        assert!(conversation.push_placeholder().is_some());
        assert!(conversation.push_placeholder().is_none());
        assert!(conversation.fail_running("Request failed"));
        assert!(conversation.running().is_none());
        assert!(conversation.push_placeholder().is_some());
    }

    #[test]
    fn test_history() {
        let mut conversation = Conversation::new();
        conversation.push_user("Hi");
        conversation.push_placeholder();
        conversation.complete_running("Hello!");
        conversation.push_user("Tell me a joke");
        conversation.push_placeholder();
        conversation.update_running("Why");
        conversation.cancel_running();
        conversation.push_user("Never mind");
        conversation.push_placeholder();

        assert_eq!(
            conversation.history(HistoryMode::Full),
            vec![
                ChatMessage::user("Hi"),
                ChatMessage::assistant("Hello!"),
                ChatMessage::user("Tell me a joke"),
                ChatMessage::user("Never mind"),
            ]
        );
        assert_eq!(
            conversation.history(HistoryMode::LatestOnly),
            vec![ChatMessage::user("Never mind")]
        );
        assert!(Conversation::new().history(HistoryMode::Full).is_empty());
    }
}
