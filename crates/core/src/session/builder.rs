use a2a_chat_model::{ChatTransport, Message};

use super::Session;
use crate::conversation::HistoryMode;
use crate::dispatcher::Dispatcher;

pub(crate) type UpdateFn = Box<dyn Fn(&[Message]) + Send + Sync>;
pub(crate) type IdleFn = Box<dyn Fn() + Send + Sync>;

/// [`Session`] builder.
pub struct SessionBuilder {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) history_mode: HistoryMode,
    pub(crate) extract_json_text: bool,
    pub(crate) on_update: Vec<UpdateFn>,
    pub(crate) on_idle: Option<IdleFn>,
}

impl SessionBuilder {
    /// Creates a new builder with the specified transport.
    #[inline]
    pub fn with_transport<T: ChatTransport + 'static>(transport: T) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport),
            history_mode: HistoryMode::default(),
            extract_json_text: false,
            on_update: vec![],
            on_idle: None,
        }
    }

    /// Sets which part of the history is sent with each request.
    #[inline]
    pub fn with_history_mode(mut self, history_mode: HistoryMode) -> Self {
        self.history_mode = history_mode;
        self
    }

    /// Enables unwrapping of replies that arrive as serialized JSON
    /// messages. See [`crate::extract_json_text`].
    #[inline]
    pub fn with_json_text_extraction(mut self, enabled: bool) -> Self {
        self.extract_json_text = enabled;
        self
    }

    /// Attaches a callback to be invoked with the whole message list
    /// every time the conversation changes.
    ///
    /// The callback runs on the session task, it should return quickly.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl Fn(&[Message]) + Send + Sync + 'static,
    ) -> Self {
        self.on_update.push(Box::new(on_update));
        self
    }

    /// Attaches a callback to be invoked when the session is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Builds the session and spawns its task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[inline]
    pub fn build(self) -> Session {
        Session::spawn_from_builder(self)
    }
}
