use std::error::Error as StdError;
use std::fmt::{self, Display};

use a2a_chat_model::{ChatTransportError, ErrorKind};

/// Error type for a failed turn.
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
    status: Option<u16>,
    source: Option<Box<dyn ChatTransportError>>,
}

impl Error {
    pub(crate) fn transport<E: ChatTransportError>(err: E) -> Self {
        Self {
            message: err.to_string(),
            kind: err.kind(),
            status: err.status(),
            source: Some(Box::new(err)),
        }
    }

    pub(crate) fn session_closed() -> Self {
        Self {
            message: "the session has been closed".to_owned(),
            kind: ErrorKind::Other,
            status: None,
            source: None,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the status code the backend answered with, if any.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.status
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

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
