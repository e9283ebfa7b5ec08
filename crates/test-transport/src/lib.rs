//! A local fake transport for testing purpose.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::{pending, ready};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use a2a_chat_model::{
    ChatRequest, ChatTransport, ChatTransportError, ErrorKind, ResponseBody,
};
use bytes::Bytes;
use tokio::time::sleep;

pub use preset::*;

/// Error type for [`TestTransport`].
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
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
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

/// The body of a [`PresetResponse`].
pub struct TestBody {
    chunks: VecDeque<Bytes>,
    delay: Duration,
    read_error: bool,
    hang: bool,
}

impl ResponseBody for TestBody {
    type Error = crate::Error;

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, Self::Error> {
        sleep(self.delay).await;
        if let Some(chunk) = self.chunks.pop_front() {
            return Ok(Some(chunk));
        }
        if self.hang {
            pending::<()>().await;
        }
        if self.read_error {
            return Err(Error::new("connection reset", ErrorKind::Other));
        }
        Ok(None)
    }
}

/// A local fake transport for testing purpose.
///
/// Before sending requests, you need to add the preset responses. The
/// n-th request gets the n-th response, no matter what it contains. If
/// there are not enough responses, an error will be returned.
///
/// Clones share the request counter and the recorded requests, so a
/// test can keep a clone around to inspect what has been sent. Add all
/// responses before cloning.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestTransport {
    responses: Vec<PresetResponse>,
    delay: Option<Duration>,
    next_idx: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
}

impl TestTransport {
    /// Adds a response for the next unanswered request.
    #[inline]
    pub fn add_response(&mut self, preset: PresetResponse) {
        self.responses.push(preset);
    }

    /// Sets the delay before every chunk.
    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn respond(&self, req: &ChatRequest) -> Result<TestBody, Error> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(req.clone());
        }

        let idx = self.next_idx.fetch_add(1, Ordering::Relaxed);
        let Some(preset) = self.responses.get(idx) else {
            return Err(Error::new("no enough responses", ErrorKind::Other));
        };

        match &preset.head {
            PresetHead::Ok => {}
            PresetHead::Status { code, text } => {
                return Err(Error {
                    message: format!("Request failed: {code} {text}"),
                    kind: ErrorKind::Transport,
                    status: Some(*code),
                });
            }
            PresetHead::NoBody => {
                return Err(Error::new("No response body", ErrorKind::Protocol));
            }
        }

        let chunks = preset
            .chunks
            .iter()
            .map(|chunk| match chunk {
                PresetChunk::Text(text) => Bytes::from(text.clone()),
                PresetChunk::Bytes(bytes) => Bytes::from(bytes.clone()),
            })
            .collect();
        Ok(TestBody {
            chunks,
            delay: self.delay.unwrap_or(Duration::from_millis(1)),
            read_error: preset.read_error,
            hang: preset.hang,
        })
    }
}

impl ChatTransport for TestTransport {
    type Error = crate::Error;
    type Body = TestBody;

    fn send_request(
        &self,
        req: &ChatRequest,
    ) -> impl Future<Output = Result<Self::Body, Self::Error>> + Send + 'static
    {
        ready(self.respond(req))
    }
}

#[cfg(test)]
mod tests {
    use a2a_chat_model::ChatMessage;

    use super::*;

    async fn collect_body(mut body: TestBody) -> Result<String, Error> {
        let mut raw = Vec::new();
        while let Some(chunk) = body.next_chunk().await? {
            raw.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    #[tokio::test]
    async fn test_send_request() {
        let mut transport = TestTransport::default();
        transport.add_response(PresetResponse::with_frames(["Hello, ", "world!"]));
        transport.add_response(
            PresetResponse::empty().with_status(429, "Too Many Requests"),
        );
        transport.add_response(PresetResponse::without_body());

        let req = ChatRequest {
            messages: vec![ChatMessage::user("Hi")],
        };
        let body = transport.send_request(&req).await.unwrap();
        assert_eq!(
            collect_body(body).await.unwrap(),
            "data: Hello, \n\ndata: world!\n\ndata: [DONE]\n\n"
        );

        let err = transport.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.to_string(), "Request failed: 429 Too Many Requests");

        let err = transport.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = transport.send_request(&req).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Other);

        assert_eq!(transport.clone().requests(), vec![req; 4]);
    }

    #[tokio::test]
    async fn test_read_error() {
        let mut transport = TestTransport::default();
        transport.add_response(
            PresetResponse::with_chunks(["data: x\n"]).with_read_error(),
        );
        let req = ChatRequest { messages: vec![] };
        let body = transport.send_request(&req).await.unwrap();
        assert_eq!(collect_body(body).await.unwrap_err().kind(), ErrorKind::Other);
    }
}
