//! Message framing over a TCP byte stream.
//!
//! Outbound messages are one JSON object per line. Inbound bytes are parsed
//! more leniently so that peers which write bare JSON objects with no
//! delimiter keep working: whatever has been buffered is parsed, an object
//! cut short by the end of the buffer waits for more bytes, and junk in
//! front of the next `{` is skipped.

use serde::Serialize;
use serde_json::Value;

/// Upper bound on buffered bytes that have not yet formed a complete object.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("message is not JSON")]
    NotJson,
    #[error("malformed JSON: {0}")]
    Malformed(String),
    #[error("message exceeds {limit} bytes without completing")]
    Oversized { limit: usize },
}

/// Serializes a message as a single newline-terminated JSON line.
pub fn encode_frame<T: Serialize>(message: &T) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(message)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Incremental decoder turning received bytes into JSON objects.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    max_len: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_limit(MAX_FRAME_LEN)
    }

    pub fn with_limit(max_len: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_len,
        }
    }

    /// Appends freshly read bytes to the pending buffer.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Pops the next complete JSON object from the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. On error the offending
    /// bytes are dropped, so calling again continues with whatever follows.
    pub fn next_frame(&mut self) -> Result<Option<Value>, FrameError> {
        let Some(start) = self.buffer.iter().position(|b| !b.is_ascii_whitespace()) else {
            self.buffer.clear();
            return Ok(None);
        };

        let Some(open) = self.buffer[start..]
            .iter()
            .position(|&b| b == b'{')
            .map(|offset| start + offset)
        else {
            self.buffer.clear();
            return Err(FrameError::NotJson);
        };
        self.buffer.drain(..open);

        let (parsed, consumed) = {
            let mut stream = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            let parsed = stream.next();
            (parsed, stream.byte_offset())
        };

        match parsed {
            Some(Ok(value)) => {
                self.buffer.drain(..consumed);
                Ok(Some(value))
            }
            Some(Err(e)) if e.is_eof() => {
                if self.buffer.len() > self.max_len {
                    self.buffer.clear();
                    return Err(FrameError::Oversized {
                        limit: self.max_len,
                    });
                }
                Ok(None)
            }
            Some(Err(e)) => {
                self.discard_malformed();
                Err(FrameError::Malformed(e.to_string()))
            }
            None => Ok(None),
        }
    }

    // Drops the broken object: through the end of its line when the peer
    // delimits with newlines, otherwise up to the next opening brace.
    fn discard_malformed(&mut self) {
        let cut = self
            .buffer
            .iter()
            .position(|&b| b == b'\n')
            .map(|newline| newline + 1)
            .or_else(|| {
                self.buffer
                    .iter()
                    .skip(1)
                    .position(|&b| b == b'{')
                    .map(|offset| offset + 1)
            })
            .unwrap_or(self.buffer.len());
        self.buffer.drain(..cut);
    }
}
