//! A transport that talks to an A2A backend over HTTP.
//!
//! Messages are posted as JSON and the reply is streamed back as
//! server-sent events. Decoding the events is left to the caller.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod body;
mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use a2a_chat_model::{
    ChatRequest, ChatTransport, ChatTransportError, ErrorKind,
};
use mime::Mime;
use reqwest::{Client, Response, StatusCode, header};

pub use body::HttpBody;
pub use config::{DEFAULT_ENDPOINT, HttpConfig, HttpConfigBuilder};
pub use proto::{HealthStatus, ModelList};

/// Error type for [`HttpTransport`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    status: Option<u16>,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
            status: None,
        }
    }

    fn config(message: impl Into<String>) -> Self {
        Self::new(message, ErrorKind::Other)
    }

    // The reason phrase sent by the server is not kept by the client, so
    // the message carries the canonical reason for the status code.
    fn from_status(status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or_default();
        Self {
            message: format!("Request failed: {} {reason}", status.as_u16())
                .trim_end()
                .to_owned(),
            kind: ErrorKind::Transport,
            status: Some(status.as_u16()),
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            ErrorKind::Protocol
        } else {
            ErrorKind::Transport
        };
        Self {
            message: format!("{err}"),
            kind,
            status: err.status().map(|status| status.as_u16()),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ChatTransportError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[inline]
    fn status(&self) -> Option<u16> {
        self.status
    }
}

/// A transport that posts messages to an A2A backend.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    config: Arc<HttpConfig>,
}

impl HttpTransport {
    /// Creates a new `HttpTransport` with the given configuration.
    #[inline]
    pub fn new(config: HttpConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration.
    #[inline]
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// Asks the backend whether it is ready.
    pub async fn health(&self) -> Result<HealthStatus, Error> {
        let url = proto::health_url(&self.config)?;
        trace!("checking health: {url}");
        let resp = self.client.get(url).send().await;
        let resp = check_status(resp)?;
        resp.json().await.map_err(Error::from_reqwest)
    }

    /// Lists the models the backend can use.
    pub async fn list_models(&self) -> Result<ModelList, Error> {
        let url = proto::models_url(&self.config)?;
        trace!("listing models: {url}");
        let resp = self.client.get(url).send().await;
        let resp = check_status(resp)?;
        resp.json().await.map_err(Error::from_reqwest)
    }

    /// Asks the backend to forget the history of a conversation.
    pub async fn reset_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<(), Error> {
        let url = proto::conversation_url(&self.config, conversation_id)?;
        debug!("resetting conversation: {url}");
        let resp = self.client.delete(url).send().await;
        check_status(resp)?;
        Ok(())
    }
}

fn check_status(
    resp: Result<Response, reqwest::Error>,
) -> Result<Response, Error> {
    let resp = resp.map_err(Error::from_reqwest)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(Error::from_status(status));
    }
    Ok(resp)
}

impl ChatTransport for HttpTransport {
    type Error = Error;
    type Body = HttpBody;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static
    {
        let resp_fut = proto::messages_url(&self.config).map(|url| {
            self.client
                .post(url)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "text/event-stream")
                .json(req)
                .send()
        });

        async move {
            let resp = check_status(resp_fut?.await)?;
            // A zero-length 2xx body is an empty stream, only these
            // statuses come without a body at all.
            if matches!(
                resp.status(),
                StatusCode::NO_CONTENT | StatusCode::RESET_CONTENT
            ) {
                return Err(Error::new("No response body", ErrorKind::Protocol));
            }

            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok());
            let is_event_stream = content_type
                .and_then(|v| v.parse().ok())
                .map(|m: Mime| {
                    m.essence_str() == mime::TEXT_EVENT_STREAM.essence_str()
                })
                .unwrap_or(false);
            if !is_event_stream {
                // Some backends stream without announcing it, keep reading.
                warn!("unexpected content type: {content_type:?}");
            }

            Ok(HttpBody::from_response(resp))
        }
    }
}
