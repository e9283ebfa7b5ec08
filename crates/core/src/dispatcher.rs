use std::pin::Pin;
use std::sync::Arc;

use a2a_chat_model::{ChatRequest, ChatTransport};
use tokio::select;
use tracing::Instrument;

use crate::accumulator::{Fold, ResponseAccumulator};
use crate::cancel::CancelToken;
use crate::error::Error;
use crate::io::FrameReader;

type DispatchResult = Result<TurnOutcome, Error>;
type BoxedDispatchFuture = Pin<Box<dyn Future<Output = DispatchResult> + Send>>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ChatRequest, CancelToken, Box<dyn Fn(&str) + Send + 'static>)
        -> BoxedDispatchFuture + Send + Sync
>;

/// How a turn ended, with the text accumulated until then.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TurnOutcome {
    /// The stream ended and the full text has been received.
    Completed(String),
    /// The turn was cancelled before the stream ended.
    Cancelled(String),
}

impl TurnOutcome {
    /// Returns the accumulated text.
    #[inline]
    pub fn text(&self) -> &str {
        match self {
            TurnOutcome::Completed(text) | TurnOutcome::Cancelled(text) => {
                text
            }
        }
    }
}

/// A wrapper around a transport that runs one turn at a time: it sends
/// the request, decodes the streamed body and accumulates the text.
///
/// The transport type is erased, so that the session doesn't need a
/// generic parameter.
#[derive(Clone)]
pub struct Dispatcher {
    handler_fn: HandlerFn,
}

impl Dispatcher {
    /// Creates a dispatcher over the given transport.
    #[inline]
    pub fn new<T: ChatTransport + 'static>(transport: T) -> Self {
        let handler_fn: HandlerFn =
            Arc::new(move |req, cancel, on_text| {
                trace!("sending a request: {req:?}");
                let fut = transport.send_request(&req);
                Box::pin(
                    run_turn::<T>(fut, cancel, on_text)
                        .instrument(trace_span!("dispatch")),
                )
            });
        Self { handler_fn }
    }

    /// Sends a request and streams the response.
    ///
    /// `on_text` is called with the whole accumulated text every time a
    /// frame adds to it. The body is released before this method
    /// returns, whatever the outcome.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe, dropping the future drops the request.
    /// Firing `cancel` has the same effect but reports the partial text
    /// as [`TurnOutcome::Cancelled`].
    #[inline]
    pub async fn dispatch(
        &self,
        req: ChatRequest,
        cancel: CancelToken,
        on_text: impl Fn(&str) + Send + 'static,
    ) -> DispatchResult {
        (self.handler_fn)(req, cancel, Box::new(on_text)).await
    }
}

async fn run_turn<T: ChatTransport>(
    send_fut: impl Future<Output = Result<T::Body, T::Error>> + Send,
    mut cancel: CancelToken,
    on_text: Box<dyn Fn(&str) + Send + 'static>,
) -> DispatchResult {
    let body = select! {
        biased;

        _ = cancel.cancelled() => {
            debug!("cancelled before the response arrived");
            return Ok(TurnOutcome::Cancelled(String::new()));
        }
        resp = send_fut => {
            resp.map_err(|err| {
                error!("got an error: {err:?}");
                Error::transport(err)
            })?
        }
    };

    trace!("start receiving frames");

    let mut reader = FrameReader::new(body);
    let mut acc = ResponseAccumulator::new();
    loop {
        let frame = select! {
            biased;

            _ = cancel.cancelled() => {
                debug!("cancelled while streaming");
                return Ok(TurnOutcome::Cancelled(acc.finish()));
            }
            frame = reader.next_frame() => frame,
        };
        let frame = match frame {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(Error::transport(err));
            }
        };
        trace!("got a frame: {frame:?}");

        match acc.push(&frame) {
            Fold::Appended => on_text(acc.text()),
            Fold::Skipped => {}
            Fold::Done => {
                // Whatever follows the sentinel is not content, so there is
                // no point in reading the rest of the body.
                break;
            }
        }
    }

    trace!("finished a turn");

    Ok(TurnOutcome::Completed(acc.finish()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use a2a_chat_model::{ChatMessage, ErrorKind};
    use a2a_chat_test_transport::{PresetResponse, TestTransport};

    use super::*;
    use crate::cancel;

    fn hello_request() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::user("Hi")],
        }
    }

    #[tokio::test]
    async fn test_dispatch() {
        let mut transport = TestTransport::default();
        transport.add_response(PresetResponse::with_frames(["Hel", "lo"]));
        transport.add_response(PresetResponse::with_chunks([
            "data: He",
            "llo\n",
        ]));
        let dispatcher = Dispatcher::new(transport.clone());

        for _ in 0..2 {
            let updates = Arc::new(Mutex::new(Vec::new()));
            let (_handle, token) = cancel::channel();
            let outcome = dispatcher
                .dispatch(hello_request(), token, {
                    let updates = Arc::clone(&updates);
                    move |text| updates.lock().unwrap().push(text.to_owned())
                })
                .await
                .unwrap();
            assert_eq!(outcome, TurnOutcome::Completed("Hello".to_owned()));
            assert_eq!(updates.lock().unwrap().last().unwrap(), "Hello");
        }
        assert_eq!(transport.requests(), vec![hello_request(); 2]);
    }

    #[tokio::test]
    async fn test_updates_follow_accepted_frames() {
        let mut transport = TestTransport::default();
        transport.add_response(PresetResponse::with_chunks([
            "data: Hel\n\ndata: \n\ndata: lo\n\ndata: [DONE]\n\ndata: x\n",
        ]));
        let dispatcher = Dispatcher::new(transport);

        let updates = Arc::new(Mutex::new(Vec::new()));
        let (_handle, token) = cancel::channel();
        let outcome = dispatcher
            .dispatch(hello_request(), token, {
                let updates = Arc::clone(&updates);
                move |text| updates.lock().unwrap().push(text.to_owned())
            })
            .await
            .unwrap();
        assert_eq!(outcome.text(), "Hello");
        assert_eq!(*updates.lock().unwrap(), ["Hel", "Hello"]);
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let mut transport = TestTransport::default();
        transport.add_response(PresetResponse::empty());
        let dispatcher = Dispatcher::new(transport);
        let (_handle, token) = cancel::channel();
        let outcome = dispatcher
            .dispatch(hello_request(), token, |_| {})
            .await
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Completed(String::new()));
    }

    #[tokio::test]
    async fn test_error_handling() {
        let mut transport = TestTransport::default();
        transport.add_response(
            PresetResponse::with_frames(["never"])
                .with_status(503, "Service Unavailable"),
        );
        transport.add_response(PresetResponse::without_body());
        let dispatcher = Dispatcher::new(transport);

        let (_handle, token) = cancel::channel();
        let err = dispatcher
            .dispatch(hello_request(), token.clone(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status(), Some(503));

        let err = dispatcher
            .dispatch(hello_request(), token.clone(), |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        // Ran out of preset responses.
        let err = dispatcher
            .dispatch(hello_request(), token, |_| {})
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[tokio::test]
    async fn test_cancel_while_streaming() {
        let mut transport = TestTransport::default();
        transport.set_delay(Duration::from_millis(5));
        transport.add_response(
            PresetResponse::with_chunks(["data: partial\n"]).hanging(),
        );
        let dispatcher = Dispatcher::new(transport);

        let (handle, token) = cancel::channel();
        let (text_tx, mut text_rx) = tokio::sync::mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            dispatcher
                .dispatch(hello_request(), token, move |text| {
                    text_tx.send(text.to_owned()).ok();
                })
                .await
        });

        assert_eq!(text_rx.recv().await.unwrap(), "partial");
        handle.cancel();
        let outcome = tokio::time::timeout(Duration::from_millis(500), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Cancelled("partial".to_owned()));
    }

    #[tokio::test]
    async fn test_cancel_before_response() {
        let mut transport = TestTransport::default();
        transport.add_response(PresetResponse::with_frames(["unused"]));
        let dispatcher = Dispatcher::new(transport);

        let (handle, token) = cancel::channel();
        handle.cancel();
        let outcome = dispatcher
            .dispatch(hello_request(), token, |_| {
                panic!("no text expected");
            })
            .await
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Cancelled(String::new()));
    }
}
