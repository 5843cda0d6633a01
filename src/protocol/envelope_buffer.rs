//! Envelope buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` to hold bytes read from stdin until a complete
//! top-level bencode structure is available. Each call to
//! [`EnvelopeBuffer::try_next`] yields at most one envelope:
//!
//! - `Ok(Some(message))` - a complete envelope was consumed
//! - `Ok(None)` - more input is needed
//! - `Err(..)` - a malformed envelope was consumed and discarded
//!
//! # Example
//!
//! ```
//! use sqlpod::protocol::EnvelopeBuffer;
//!
//! let mut buffer = EnvelopeBuffer::new();
//! buffer.extend(b"d2:op8:desc");
//! assert!(buffer.try_next().unwrap().is_none());
//!
//! buffer.extend(b"ribee");
//! let message = buffer.try_next().unwrap().unwrap();
//! assert_eq!(message.op, "describe");
//! ```

use bytes::{Buf, BytesMut};

use super::bencode::{self, DecodeError};
use super::message::Message;
use crate::error::{PodError, Result};

/// Default maximum size of a single envelope (64 MiB).
pub const DEFAULT_MAX_ENVELOPE_SIZE: usize = 64 * 1024 * 1024;

/// Buffer for incoming bytes that extracts whole envelopes.
pub struct EnvelopeBuffer {
    /// Accumulated bytes from stdin reads.
    buffer: BytesMut,
    /// Maximum allowed envelope size.
    max_envelope_size: usize,
}

impl EnvelopeBuffer {
    /// Create a new buffer with the default size limit.
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_ENVELOPE_SIZE)
    }

    /// Create a new buffer with a custom envelope size limit.
    pub fn with_max_size(max_envelope_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(64 * 1024),
            max_envelope_size,
        }
    }

    /// Append bytes read from the stream.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to extract one envelope from the buffer.
    ///
    /// On a decode error the offending bytes have already been dropped, so
    /// the next call starts at a fresh position in the stream.
    pub fn try_next(&mut self) -> Result<Option<Message>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match bencode::decode(&self.buffer, self.max_envelope_size) {
            Ok((value, used)) => {
                self.buffer.advance(used);
                if used > self.max_envelope_size {
                    return Err(self.too_large(used));
                }
                Message::from_bencode(&value).map(Some)
            }
            Err(DecodeError::Incomplete) => {
                if self.buffer.len() > self.max_envelope_size {
                    let len = self.buffer.len();
                    self.buffer.clear();
                    return Err(self.too_large(len));
                }
                Ok(None)
            }
            Err(DecodeError::Invalid { at, reason }) => {
                let skipped = self.skip_malformed(at);
                Err(PodError::EnvelopeDecode(format!(
                    "malformed envelope at byte {at}: {reason} ({skipped} bytes skipped)"
                )))
            }
        }
    }

    /// Drop bytes through `at`, then up to the next `d` that starts a
    /// complete or still-incomplete envelope. Returns the number dropped.
    fn skip_malformed(&mut self, at: usize) -> usize {
        let mut cut = (at + 1).min(self.buffer.len());
        loop {
            while cut < self.buffer.len() && self.buffer[cut] != b'd' {
                cut += 1;
            }
            if cut == self.buffer.len() {
                break;
            }
            match bencode::decode(&self.buffer[cut..], self.max_envelope_size) {
                Err(DecodeError::Invalid { .. }) => cut += 1,
                Ok(_) | Err(DecodeError::Incomplete) => break,
            }
        }
        self.buffer.advance(cut);
        cut
    }

    fn too_large(&self, size: usize) -> PodError {
        PodError::EnvelopeDecode(format!(
            "envelope size {size} exceeds maximum {}",
            self.max_envelope_size
        ))
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for EnvelopeBuffer {
    fn default() -> Self {
        Self::new()
    }
}
