use std::error::Error;

use bytes::Bytes;

use crate::ChatRequest;
use crate::error::ErrorKind;

/// The error type for a chat transport.
pub trait ChatTransportError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;

    /// Returns the status code the backend answered with, if any.
    fn status(&self) -> Option<u16> {
        None
    }
}

/// A type that delivers a request to the backend and hands back the
/// streamed response body.
///
/// Once the transport is created, it should behave like a stateless
/// object. It can still have internal state (connection pools and the
/// like), but callers should not rely on it.
pub trait ChatTransport: Send + Sync {
    /// The error type that may be returned by the transport.
    type Error: ChatTransportError;

    /// The response body type for this transport.
    type Body: ResponseBody<Error = Self::Error>;

    /// Sends a request to the backend.
    ///
    /// The returned future resolves once the response head has arrived.
    /// Dropping the future aborts the request.
    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static;
}

/// A streamed response body.
///
/// Dropping the body releases the underlying connection, so callers
/// that stop reading early don't need any extra cleanup.
pub trait ResponseBody: Send + 'static {
    /// The error type that may be returned while reading.
    type Error: ChatTransportError;

    /// Reads the next chunk of the body.
    ///
    /// Returns `Ok(None)` at the end of the stream. Chunk boundaries carry
    /// no meaning, they may split lines and even characters.
    ///
    /// # Cancel safety
    ///
    /// Implementations must be cancel safe: dropping the future before it
    /// completes must not lose data that a later call would return.
    fn next_chunk(
        &mut self,
    ) -> impl Future<Output = Result<Option<Bytes>, Self::Error>> + Send;
}
