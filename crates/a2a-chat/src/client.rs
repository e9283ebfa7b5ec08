use a2a_chat_core::{HistoryMode, Session, SessionBuilder, Snapshot, Turn};
use a2a_chat_http::{
    Error as HttpError, HealthStatus, HttpConfig, HttpTransport, ModelList,
};
use a2a_chat_model::Message;
use tokio::sync::watch;

/// A chat client builder.
///
/// See [`ChatClient`].
pub struct ChatClientBuilder {
    transport: HttpTransport,
    session_builder: SessionBuilder,
}

impl ChatClientBuilder {
    /// Creates a client builder with a specified configuration.
    ///
    /// When the configuration carries a conversation id, the backend is
    /// assumed to keep the history itself and only the latest input is
    /// sent with each request.
    pub fn with_config(config: HttpConfig) -> Self {
        let history_mode = if config.conversation_id().is_some() {
            HistoryMode::LatestOnly
        } else {
            HistoryMode::Full
        };
        let transport = HttpTransport::new(config);
        let session_builder = SessionBuilder::with_transport(transport.clone())
            .with_history_mode(history_mode);
        Self {
            transport,
            session_builder,
        }
    }

    /// Creates a client builder configured from the environment.
    ///
    /// See [`a2a_chat_http::HttpConfigBuilder::from_env`].
    #[inline]
    pub fn from_env() -> Self {
        Self::with_config(HttpConfig::from_env())
    }

    /// Overrides which part of the history is sent with each request.
    #[inline]
    pub fn with_history_mode(mut self, history_mode: HistoryMode) -> Self {
        self.session_builder =
            self.session_builder.with_history_mode(history_mode);
        self
    }

    /// Enables unwrapping of replies that arrive as serialized JSON
    /// messages.
    #[inline]
    pub fn with_json_text_extraction(mut self, enabled: bool) -> Self {
        self.session_builder =
            self.session_builder.with_json_text_extraction(enabled);
        self
    }

    /// Attaches a callback to be invoked when the conversation changes.
    #[inline]
    pub fn on_update(
        mut self,
        on_update: impl Fn(&[Message]) + Send + Sync + 'static,
    ) -> Self {
        self.session_builder = self.session_builder.on_update(on_update);
        self
    }

    /// Attaches a callback to be invoked when the client is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.session_builder = self.session_builder.on_idle(on_idle);
        self
    }

    /// Builds a new client.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn build(self) -> ChatClient {
        let session = self.session_builder.build();
        ChatClient {
            session,
            transport: self.transport,
        }
    }
}

/// A chat client, like a window that displays messages and has an input
/// box.
///
/// It is basically a wrapper around [`Session`], plus the supplemental
/// endpoints of the backend.
#[derive(Clone)]
pub struct ChatClient {
    session: Session,
    transport: HttpTransport,
}

impl ChatClient {
    /// Sends a message to the backend. See [`Session::submit`].
    #[inline]
    pub fn submit<S: Into<String>>(&self, input: S) -> Turn {
        self.session.submit(input)
    }

    /// Cancels the running turn, if any.
    #[inline]
    pub fn cancel(&self) {
        self.session.cancel();
    }

    /// Returns a receiver that observes every published snapshot.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.session.subscribe()
    }

    /// Returns the latest snapshot of the conversation.
    #[inline]
    pub fn messages(&self) -> Snapshot {
        self.session.messages()
    }

    /// Returns the underlying session.
    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Returns the configuration of the transport.
    #[inline]
    pub fn config(&self) -> &HttpConfig {
        self.transport.config()
    }

    /// Asks the backend whether it is ready.
    #[inline]
    pub async fn health(&self) -> Result<HealthStatus, HttpError> {
        self.transport.health().await
    }

    /// Lists the models the backend can use.
    #[inline]
    pub async fn list_models(&self) -> Result<ModelList, HttpError> {
        self.transport.list_models().await
    }

    /// Asks the backend to forget the configured conversation.
    ///
    /// Returns `false` without contacting the backend if no conversation
    /// id is configured. The local message list is not affected.
    pub async fn reset_conversation(&self) -> Result<bool, HttpError> {
        let Some(conversation_id) = self.config().conversation_id() else {
            debug!("no conversation id, nothing to reset");
            return Ok(false);
        };
        self.transport.reset_conversation(conversation_id).await?;
        Ok(true)
    }
}
