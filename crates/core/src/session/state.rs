use std::collections::VecDeque;

use a2a_chat_model::{ChatRequest, Message};
use tokio::select;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use super::TurnResult;
use super::builder::{IdleFn, UpdateFn};
use crate::accumulator::extract_json_text;
use crate::cancel::{self, CancelHandle};
use crate::conversation::{Conversation, HistoryMode, Snapshot};
use crate::dispatcher::{Dispatcher, TurnOutcome};
use crate::error::Error;

/// Commands sent by the session handles.
#[derive(Debug)]
pub enum Command {
    Submit {
        input: String,
        reply_tx: oneshot::Sender<TurnResult>,
    },
    Cancel,
}

/// Reports sent by the turn tasks.
#[derive(Debug)]
pub enum Event {
    Progress { turn_id: u64, text: String },
    Finished { turn_id: u64, result: TurnResult },
}

struct PendingInput {
    input: String,
    reply_tx: oneshot::Sender<TurnResult>,
}

struct ActiveTurn {
    id: u64,
    // Dropping the handle cancels the turn task as well.
    cancel: CancelHandle,
    reply_tx: oneshot::Sender<TurnResult>,
}

pub struct SessionState {
    dispatcher: Dispatcher,
    conversation: Conversation,
    history_mode: HistoryMode,
    extract_json_text: bool,
    pending_inputs: VecDeque<PendingInput>,
    active_turn: Option<ActiveTurn>,
    next_turn_id: u64,
    snapshot_tx: watch::Sender<Snapshot>,
    event_tx: mpsc::UnboundedSender<Event>,
    on_update: Vec<UpdateFn>,
    on_idle: Option<IdleFn>,
}

impl SessionState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatcher: Dispatcher,
        history_mode: HistoryMode,
        extract_json_text: bool,
        snapshot_tx: watch::Sender<Snapshot>,
        event_tx: mpsc::UnboundedSender<Event>,
        on_update: Vec<UpdateFn>,
        on_idle: Option<IdleFn>,
    ) -> Self {
        Self {
            dispatcher,
            conversation: Conversation::new(),
            history_mode,
            extract_json_text,
            pending_inputs: Default::default(),
            active_turn: None,
            next_turn_id: 1,
            snapshot_tx,
            event_tx,
            on_update,
            on_idle,
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit { input, reply_tx } => {
                if self.active_turn.is_some() {
                    // A turn is running, the input will be picked up once
                    // it ends.
                    debug!("turn in progress, input queued");
                    self.pending_inputs
                        .push_back(PendingInput { input, reply_tx });
                    return;
                }
                self.start_turn(input, reply_tx);
            }
            Command::Cancel => self.cancel_turn(),
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Progress { turn_id, text } => {
                if !self.is_active(turn_id) {
                    trace!("discard progress of stale turn {turn_id}");
                    return;
                }
                if self.conversation.update_running(&text) {
                    self.publish();
                }
            }
            Event::Finished { turn_id, result } => {
                if !self.is_active(turn_id) {
                    trace!("discard result of stale turn {turn_id}");
                    return;
                }
                let Some(turn) = self.active_turn.take() else {
                    return;
                };
                self.finish_turn(turn, result);
                self.process_next_input();
            }
        }
    }

    fn start_turn(
        &mut self,
        input: String,
        reply_tx: oneshot::Sender<TurnResult>,
    ) {
        self.conversation.push_user(&input);
        self.publish();
        if self.conversation.push_placeholder().is_none() {
            warn!("another message is still running");
        }
        self.publish();

        let request = ChatRequest {
            messages: self.conversation.history(self.history_mode),
        };
        let (cancel, token) = cancel::channel();
        let turn_id = self.next_turn_id;
        self.next_turn_id += 1;
        self.active_turn = Some(ActiveTurn {
            id: turn_id,
            cancel,
            reply_tx,
        });
        debug!("started turn {turn_id}");

        let dispatcher = self.dispatcher.clone();
        let event_tx = self.event_tx.clone();
        tokio::spawn(
            async move {
                let progress_tx = event_tx.clone();
                let result = dispatcher
                    .dispatch(request, token, move |text| {
                        progress_tx
                            .send(Event::Progress {
                                turn_id,
                                text: text.to_owned(),
                            })
                            .ok();
                    })
                    .await;
                event_tx.send(Event::Finished { turn_id, result }).ok();
            }
            .instrument(debug_span!("turn", id = turn_id)),
        );
    }

    fn finish_turn(&mut self, turn: ActiveTurn, result: TurnResult) {
        let result = match result {
            Ok(TurnOutcome::Completed(text)) => {
                let text = if self.extract_json_text {
                    extract_json_text(&text).unwrap_or(text)
                } else {
                    text
                };
                self.conversation.complete_running(&text);
                debug!("turn {} completed", turn.id);
                Ok(TurnOutcome::Completed(text))
            }
            Ok(TurnOutcome::Cancelled(text)) => {
                self.conversation.cancel_running();
                debug!("turn {} cancelled", turn.id);
                Ok(TurnOutcome::Cancelled(text))
            }
            Err(err) => {
                warn!("turn {} failed: {err}", turn.id);
                self.conversation.fail_running(err.message());
                Err(err)
            }
        };
        self.publish();
        turn.reply_tx.send(result).ok();
    }

    fn cancel_turn(&mut self) {
        let Some(turn) = self.active_turn.take() else {
            debug!("no turn to cancel");
            return;
        };
        turn.cancel.cancel();

        // Settle the message right away, later reports from the turn task
        // are stale and will be discarded.
        let text = self
            .conversation
            .running()
            .map(Message::text)
            .unwrap_or_default();
        self.finish_turn(turn, Ok(TurnOutcome::Cancelled(text)));
        self.process_next_input();
    }

    fn process_next_input(&mut self) {
        if self.active_turn.is_some() {
            return;
        }
        if let Some(PendingInput { input, reply_tx }) =
            self.pending_inputs.pop_front()
        {
            self.start_turn(input, reply_tx);
        } else if let Some(on_idle) = &self.on_idle {
            // Nothing to process, so we can invoke the idle callback.
            on_idle();
        }
    }

    #[inline]
    fn is_active(&self, turn_id: u64) -> bool {
        self.active_turn
            .as_ref()
            .is_some_and(|turn| turn.id == turn_id)
    }

    fn publish(&self) {
        let snapshot = self.conversation.snapshot();
        for on_update in &self.on_update {
            on_update(&snapshot);
        }
        self.snapshot_tx.send_replace(snapshot);
    }

    fn shutdown(&mut self) {
        if let Some(turn) = self.active_turn.take() {
            turn.cancel.cancel();
            if self.conversation.cancel_running() {
                self.publish();
            }
            turn.reply_tx.send(Err(Error::session_closed())).ok();
        }
    }
}

pub async fn run_session(
    mut state: SessionState,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    mut event_rx: mpsc::UnboundedReceiver<Event>,
) {
    debug!("started");
    loop {
        select! {
            biased;

            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    // Every handle has been dropped.
                    break;
                };
                trace!("received command: {cmd:?}");
                state.handle_command(cmd);
            }
            event = event_rx.recv() => {
                let Some(event) = event else {
                    break;
                };
                trace!("received event: {event:?}");
                state.handle_event(event);
            }
        }
    }
    state.shutdown();
    debug!("will terminate");
}
