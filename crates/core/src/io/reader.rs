use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use a2a_chat_model::ResponseBody;
use futures_util::Stream;
use pin_project_lite::pin_project;

use super::{Frame, FrameDecoder};

/// A type for reading [`Frame`]s from a response body.
///
/// The reader owns the body, dropping the reader releases it.
pub struct FrameReader<B> {
    body: B,
    decoder: FrameDecoder,
    ready: VecDeque<Frame>,
    eof: bool,
}

impl<B: ResponseBody> FrameReader<B> {
    /// Creates a reader over the given body.
    #[inline]
    pub fn new(body: B) -> Self {
        Self {
            body,
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            eof: false,
        }
    }

    /// Reads the next frame, or `None` at the end of stream.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe as long as the body is. Decoded frames
    /// are queued inside the reader, a dropped call loses nothing.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, B::Error> {
        loop {
            if let Some(frame) = self.ready.pop_front() {
                return Ok(Some(frame));
            }
            if self.eof {
                return Ok(None);
            }

            match self.body.next_chunk().await? {
                Some(bytes) => {
                    trace!("got a chunk of {} bytes", bytes.len());
                    self.decoder.decode(&bytes, &mut self.ready);
                }
                None => {
                    trace!("reached end of stream");
                    self.decoder.finish(&mut self.ready);
                    self.eof = true;
                }
            }
        }
    }

    /// Converts this reader into a [`Stream`] of frames.
    #[inline]
    pub fn into_stream(self) -> FrameStream<B> {
        FrameStream::new(self)
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextFrame<B> = (
    Result<Option<Frame>, <B as ResponseBody>::Error>,
    FrameReader<B>,
);

pin_project! {
    /// A lazy, finite stream of frames.
    ///
    /// The stream ends after the body is exhausted or after the first
    /// error, and can't be restarted.
    pub struct FrameStream<B: ResponseBody> {
        next_frame_fut: Option<PinnedFuture<NextFrame<B>>>,
    }
}

impl<B: ResponseBody> FrameStream<B> {
    fn new(reader: FrameReader<B>) -> Self {
        Self {
            next_frame_fut: Some(Box::pin(next_frame(reader))),
        }
    }
}

impl<B: ResponseBody> Stream for FrameStream<B> {
    type Item = Result<Frame, B::Error>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let Some(next_frame_fut) = this.next_frame_fut else {
            return Poll::Ready(None);
        };
        let (result, reader) = ready!(next_frame_fut.as_mut().poll(cx));
        match result {
            Ok(Some(frame)) => {
                // More frames may follow, queue up the next read.
                *this.next_frame_fut = Some(Box::pin(next_frame(reader)));
                Poll::Ready(Some(Ok(frame)))
            }
            Ok(None) => {
                *this.next_frame_fut = None;
                Poll::Ready(None)
            }
            Err(err) => {
                *this.next_frame_fut = None;
                Poll::Ready(Some(Err(err)))
            }
        }
    }
}

async fn next_frame<B: ResponseBody>(
    mut reader: FrameReader<B>,
) -> NextFrame<B> {
    let result = reader.next_frame().await;
    (result, reader)
}
