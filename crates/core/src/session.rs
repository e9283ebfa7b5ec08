mod builder;
mod state;

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use crate::conversation::Snapshot;
use crate::dispatcher::TurnOutcome;
use crate::error::Error;
pub use builder::SessionBuilder;
use state::{Command, SessionState};

/// A chat session, which owns a conversation and runs its turns against
/// a transport.
///
/// The session lives in its own task. Turns are run one at a time:
/// inputs submitted while a turn is running are queued and started, in
/// order, once the session becomes idle. Every change of the
/// conversation is published as a [`Snapshot`].
///
/// The task stops once every handle to the session has been dropped,
/// cancelling the running turn if there is one.
#[derive(Clone)]
pub struct Session {
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot_rx: watch::Receiver<Snapshot>,
}

impl Session {
    /// Submits a user input.
    ///
    /// The returned [`Turn`] resolves when the reply has been received
    /// completely, has been cancelled or has failed. Dropping it doesn't
    /// cancel anything.
    pub fn submit<S: Into<String>>(&self, input: S) -> Turn {
        let (reply_tx, reply_rx) = oneshot::channel();
        let cmd = Command::Submit {
            input: input.into(),
            reply_tx,
        };
        if self.cmd_tx.send(cmd).is_err() {
            warn!("session task has gone, the input is dropped");
        }
        Turn { reply_rx }
    }

    /// Cancels the running turn, if any.
    ///
    /// The running message is marked as cancelled and keeps the text it
    /// has received so far. Queued inputs are not affected.
    #[inline]
    pub fn cancel(&self) {
        self.cmd_tx.send(Command::Cancel).ok();
    }

    /// Returns a receiver that observes every published snapshot.
    #[inline]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_rx.clone()
    }

    /// Returns the latest snapshot of the conversation.
    #[inline]
    pub fn messages(&self) -> Snapshot {
        self.snapshot_rx.borrow().clone()
    }
}

impl Session {
    fn spawn_from_builder(builder: SessionBuilder) -> Self {
        let SessionBuilder {
            dispatcher,
            history_mode,
            extract_json_text,
            on_update,
            on_idle,
        } = builder;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());

        let state = SessionState::new(
            dispatcher,
            history_mode,
            extract_json_text,
            snapshot_tx,
            event_tx,
            on_update,
            on_idle,
        );
        tokio::spawn(
            state::run_session(state, cmd_rx, event_rx)
                .instrument(trace_span!("session")),
        );

        Self {
            cmd_tx,
            snapshot_rx,
        }
    }
}

type TurnResult = Result<TurnOutcome, Error>;

pin_project! {
    /// A future that resolves when a submitted turn ends.
    pub struct Turn {
        #[pin]
        reply_rx: oneshot::Receiver<TurnResult>,
    }
}

impl Future for Turn {
    type Output = TurnResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<TurnResult> {
        let this = self.project();
        match ready!(this.reply_rx.poll(cx)) {
            Ok(result) => Poll::Ready(result),
            Err(_) => Poll::Ready(Err(Error::session_closed())),
        }
    }
}
