//! Decoding of the streamed response body.

mod decoder;
mod reader;

pub use decoder::{DONE_SENTINEL, Frame, FrameDecoder};
pub use reader::{FrameReader, FrameStream};
