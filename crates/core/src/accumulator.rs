//! Folding frames into the response text.

use serde_json::Value;

use crate::io::Frame;

/// What the accumulator did with a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Fold {
    /// The payload was appended to the text.
    Appended,
    /// The frame carried nothing to append.
    Skipped,
    /// The frame was the end-of-stream sentinel.
    Done,
}

/// Accumulates frame payloads into a single text buffer.
///
/// Payloads are concatenated as they are, no separator is inserted
/// between two frames. Blank frames are skipped, and nothing is appended
/// once the sentinel has been seen.
#[derive(Clone, Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
    done: bool,
}

impl ResponseAccumulator {
    /// Creates an empty accumulator.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a frame into the buffer.
    pub fn push(&mut self, frame: &Frame) -> Fold {
        if self.done || frame.is_blank() {
            return Fold::Skipped;
        }
        if frame.is_done() {
            self.done = true;
            return Fold::Done;
        }
        self.text.push_str(frame.payload());
        Fold::Appended
    }

    /// Returns the text accumulated so far.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns `true` once the sentinel has been seen.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consumes the accumulator and returns the final text.
    #[inline]
    pub fn finish(self) -> String {
        self.text
    }
}

/// Extracts the text from a response that turned out to be JSON.
///
/// Some backends send the whole reply as a serialized message instead of
/// plain text. The following shapes are understood:
///
/// - an array of parts, where the `text` of every `{"type": "text"}` part
///   is joined with a single space;
/// - an object with a non-empty `text` field.
///
/// Returns `None` if `text` is not JSON, or is JSON of any other shape.
pub fn extract_json_text(text: &str) -> Option<String> {
    let value = serde_json::from_str::<Value>(text).ok()?;
    match value {
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter(|part| {
                    part.get("type").and_then(Value::as_str) == Some("text")
                })
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .filter(|text| !text.is_empty())
                .collect();
            Some(texts.join(" "))
        }
        Value::Object(obj) => obj
            .get("text")
            .and_then(Value::as_str)
            .filter(|text| !text.is_empty())
            .map(ToOwned::to_owned),
        _ => None,
    }
}
