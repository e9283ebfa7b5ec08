//! Core logic of the chat client: decoding the streamed reply, folding it
//! into text, and projecting every step onto the conversation.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod accumulator;
pub mod cancel;
pub mod conversation;
mod dispatcher;
mod error;
pub mod io;
mod session;

pub use accumulator::{ResponseAccumulator, extract_json_text};
pub use conversation::{Conversation, HistoryMode, Snapshot};
pub use dispatcher::{Dispatcher, TurnOutcome};
pub use error::Error;
pub use session::{Session, SessionBuilder, Turn};
