use serde::{Deserialize, Serialize};

/// A chunk of a preset response body.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetChunk {
    /// A chunk of UTF-8 text.
    #[serde(rename = "text")]
    Text(String),
    /// Raw bytes, which may split a character or be invalid UTF-8.
    #[serde(rename = "bytes")]
    Bytes(Vec<u8>),
}

impl From<&str> for PresetChunk {
    #[inline]
    fn from(value: &str) -> Self {
        PresetChunk::Text(value.to_owned())
    }
}

impl From<String> for PresetChunk {
    #[inline]
    fn from(value: String) -> Self {
        PresetChunk::Text(value)
    }
}

impl From<&[u8]> for PresetChunk {
    #[inline]
    fn from(value: &[u8]) -> Self {
        PresetChunk::Bytes(value.to_vec())
    }
}

/// How the response head should look.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresetHead {
    /// A successful response with a body.
    #[default]
    Ok,
    /// A non-success status.
    Status {
        /// The status code.
        code: u16,
        /// The status text.
        text: String,
    },
    /// A successful response without a body.
    NoBody,
}

/// The preset response for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// How the response head should look.
    #[serde(default)]
    pub head: PresetHead,
    /// Body chunks, delivered one per read.
    pub chunks: Vec<PresetChunk>,
    /// If set, reading past the last chunk fails instead of ending the
    /// stream.
    #[serde(default)]
    pub read_error: bool,
    /// If set, reading past the last chunk never completes.
    #[serde(default)]
    pub hang: bool,
}

impl PresetResponse {
    /// Creates a successful response with an empty body.
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a `PresetResponse` with the specified body chunks.
    #[inline]
    pub fn with_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<PresetChunk>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Creates a `PresetResponse` that sends every payload as its own
    /// event, followed by the `[DONE]` sentinel.
    #[inline]
    pub fn with_frames<I, S>(payloads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let chunks = payloads
            .into_iter()
            .map(|payload| format!("data: {}\n\n", payload.as_ref()))
            .chain(["data: [DONE]\n\n".to_owned()]);
        Self::with_chunks(chunks)
    }

    /// Makes the request fail with the given status.
    #[inline]
    pub fn with_status<S: Into<String>>(mut self, code: u16, text: S) -> Self {
        self.head = PresetHead::Status {
            code,
            text: text.into(),
        };
        self
    }

    /// Creates a successful response that carries no body.
    #[inline]
    pub fn without_body() -> Self {
        Self {
            head: PresetHead::NoBody,
            ..Default::default()
        }
    }

    /// Makes reading fail after the last chunk.
    #[inline]
    pub fn with_read_error(mut self) -> Self {
        self.read_error = true;
        self
    }

    /// Makes the body stall after the last chunk.
    #[inline]
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::with_chunks([
            PresetChunk::from("data: caf"),
            PresetChunk::from(&b"\xc3"[..]),
            PresetChunk::from(&b"\xa9\n"[..]),
        ])
        .with_status(502, "Bad Gateway")
        .hanging();

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
    }

    #[test]
    fn test_with_frames() {
        let response = PresetResponse::with_frames(["a", "b"]);
        assert_eq!(
            response.chunks,
            vec![
                PresetChunk::from("data: a\n\n"),
                PresetChunk::from("data: b\n\n"),
                PresetChunk::from("data: [DONE]\n\n"),
            ]
        );
        assert_eq!(response.head, PresetHead::Ok);
    }
}
