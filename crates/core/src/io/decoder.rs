/// The payload that marks the logical end of a response.
pub const DONE_SENTINEL: &str = "[DONE]";

const DATA_PREFIX: &str = "data: ";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The payload of one `data: ` line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame(String);

impl Frame {
    /// Creates a frame with the given payload.
    #[inline]
    pub fn new<S: Into<String>>(payload: S) -> Self {
        Self(payload.into())
    }

    /// Returns the raw payload, exactly as it appeared after the prefix.
    #[inline]
    pub fn payload(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this frame carries the end-of-stream sentinel.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.0.trim() == DONE_SENTINEL
    }

    /// Returns `true` if the payload has no content besides whitespace.
    #[inline]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// A push decoder that turns raw body bytes into [`Frame`]s.
///
/// Bytes can be fed in arbitrarily sized pieces, the decoder keeps both
/// the incomplete trailing line and any incomplete UTF-8 sequence until
/// the rest arrives. Invalid UTF-8 is replaced with `U+FFFD` instead of
/// failing the stream, and a byte order mark at the very start is dropped.
///
/// Lines are split on `\n` only. For each line, we only handle the
/// `data: ` field, other lines are dropped silently.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: String,
    utf8_buf: Vec<u8>,
    bom_checked: bool,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk of bytes and pushes every completed frame to `out`.
    pub fn decode<E: Extend<Frame>>(&mut self, bytes: &[u8], out: &mut E) {
        self.push_bytes(bytes);

        // Everything before the last line feed is complete, the rest stays
        // in the buffer until more data (or the end of stream) arrives.
        let Some(last_eol) = self.buf.rfind('\n') else {
            return;
        };
        out.extend(self.buf[..last_eol].split('\n').filter_map(parse_line));
        self.buf.drain(..=last_eol);
    }

    /// Flushes the pending state at the end of stream.
    ///
    /// The last line may be a complete `data: ` line without a trailing
    /// line feed, so it goes through the same filter once more.
    pub fn finish<E: Extend<Frame>>(&mut self, out: &mut E) {
        if !self.utf8_buf.is_empty() {
            let rest = String::from_utf8_lossy(&self.utf8_buf).into_owned();
            self.buf.push_str(&rest);
            self.utf8_buf.clear();
        }
        out.extend(self.buf.split('\n').filter_map(parse_line));
        self.buf.clear();
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty() && self.utf8_buf.is_empty()
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        self.utf8_buf.extend_from_slice(bytes);

        if !self.bom_checked {
            if self.utf8_buf.len() < UTF8_BOM.len()
                && UTF8_BOM.starts_with(&self.utf8_buf)
            {
                // Could still be a split BOM, or nothing at all yet.
                return;
            }
            if self.utf8_buf.starts_with(UTF8_BOM) {
                self.utf8_buf.drain(..UTF8_BOM.len());
            }
            self.bom_checked = true;
        }

        let mut input = &self.utf8_buf[..];
        loop {
            match str::from_utf8(input) {
                Ok(text) => {
                    self.buf.push_str(text);
                    input = &[];
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    self.buf.push_str(&String::from_utf8_lossy(valid));
                    let Some(invalid_len) = err.error_len() else {
                        // An incomplete sequence at the end, wait for the
                        // next chunk to complete it.
                        input = rest;
                        break;
                    };
                    warn!("invalid utf-8 sequence in response body");
                    self.buf.push(char::REPLACEMENT_CHARACTER);
                    input = &rest[invalid_len..];
                }
            }
        }

        let consumed = self.utf8_buf.len() - input.len();
        self.utf8_buf.drain(..consumed);
    }
}

#[inline]
fn parse_line(line: &str) -> Option<Frame> {
    line.strip_prefix(DATA_PREFIX).map(Frame::new)
}
