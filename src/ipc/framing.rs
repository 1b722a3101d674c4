//! Wire codec for the daemon's IPC socket (spec §4.9, §6 "IPC wire format
//! (bit-exact)").
//!
//! ```text
//! offset size  field
//! 0      7     magic = "polyipc"
//! 7      1     version = 0
//! 8      4     size (u32 LE)
//! 12     1     type (u8)
//! 13     size  payload (bytes)
//! ```
//!
//! This is a close cousin of the teacher's own `socket/framing.rs`
//! `[u32 len][u8 type][payload]` shape, ported to the spec's exact header
//! layout and incremental `HEADER -> PAYLOAD -> HEADER`/`CLOSED` state
//! machine (same "feed bytes, drain complete messages" technique as the
//! teacher's `FrameDecoder::feed`).

use thiserror::Error;

/// Literal magic prefixing every message header.
pub const MAGIC: &[u8; 7] = b"polyipc";
/// Only wire version this decoder accepts.
pub const VERSION: u8 = 0;
/// Total fixed header size in bytes.
pub const HEADER_SIZE: usize = 13;
/// Maximum payload size before a message is rejected (spec §7: "payload
/// size exceeding a 1 MiB limit -> close").
pub const MAX_PAYLOAD_SIZE: u32 = 1024 * 1024;

/// Message type constants (spec §3 "IPC Message", §6).
pub mod message_type {
    /// Successful response.
    pub const OK: u8 = 0;
    /// A `cmd` request (global bar command).
    pub const CMD: u8 = 1;
    /// An `action` request (`#module.action[.data]`).
    pub const ACTION: u8 = 2;
    /// Error response.
    pub const ERR: u8 = 255;
}

/// A fully decoded IPC message: `(version, type, payload)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Wire version the message was framed with (always [`VERSION`] today).
    pub version: u8,
    /// One of the [`message_type`] constants.
    pub msg_type: u8,
    /// Raw payload bytes, `size` long.
    pub payload: Vec<u8>,
}

/// Errors a [`Decoder`] can return. Per §7 the decoder is single-use after
/// any of these: subsequent `feed` calls return
/// [`DecodeError::Closed`](DecodeError::Closed) without reprocessing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Header's first 7 bytes didn't match [`MAGIC`].
    #[error("bad magic in IPC header")]
    BadMagic,
    /// Header's version byte wasn't [`VERSION`].
    #[error("unsupported IPC version {0}")]
    UnsupportedVersion(u8),
    /// Declared payload size exceeded [`MAX_PAYLOAD_SIZE`].
    #[error("IPC payload too large ({0} bytes, max {MAX_PAYLOAD_SIZE})")]
    PayloadTooLarge(u32),
    /// The decoder already failed and is no longer accepting input.
    #[error("decoder is closed after a prior error")]
    Closed,
}

/// Decoder state between `feed` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Accumulating the 13-byte header.
    Header,
    /// Header parsed; accumulating `size` payload bytes.
    Payload { msg_type: u8, size: u32 },
    /// A prior error poisoned the decoder; no further messages are produced.
    Closed,
}

/// Incremental decoder: feed arbitrary byte chunks, get back every message
/// that became complete as a result (spec §4.9: "partial reads across
/// arbitrary byte boundaries must assemble correctly").
#[derive(Debug)]
pub struct Decoder {
    state: State,
    buf: Vec<u8>,
}

impl Decoder {
    /// A fresh decoder in the `HEADER` state.
    pub fn new() -> Self {
        Self { state: State::Header, buf: Vec::new() }
    }

    /// Feed `bytes` into the decoder, returning every message that
    /// completed. On the first error the decoder transitions to `CLOSED`
    /// and every later call returns `Err(DecodeError::Closed)` immediately.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Message>, DecodeError> {
        if self.state == State::Closed {
            return Err(DecodeError::Closed);
        }
        self.buf.extend_from_slice(bytes);
        let mut messages = Vec::new();
        loop {
            match self.state {
                State::Closed => unreachable!("checked above"),
                State::Header => {
                    if self.buf.len() < HEADER_SIZE {
                        break;
                    }
                    if &self.buf[0..7] != MAGIC {
                        self.state = State::Closed;
                        return Err(DecodeError::BadMagic);
                    }
                    let version = self.buf[7];
                    if version != VERSION {
                        self.state = State::Closed;
                        return Err(DecodeError::UnsupportedVersion(version));
                    }
                    let size = u32::from_le_bytes([self.buf[8], self.buf[9], self.buf[10], self.buf[11]]);
                    if size > MAX_PAYLOAD_SIZE {
                        self.state = State::Closed;
                        return Err(DecodeError::PayloadTooLarge(size));
                    }
                    let msg_type = self.buf[12];
                    self.buf.drain(..HEADER_SIZE);
                    self.state = State::Payload { msg_type, size };
                }
                State::Payload { msg_type, size } => {
                    let size = size as usize;
                    if self.buf.len() < size {
                        break;
                    }
                    let payload = self.buf.drain(..size).collect();
                    messages.push(Message { version: VERSION, msg_type, payload });
                    self.state = State::Header;
                }
            }
        }
        Ok(messages)
    }

    /// Whether a header or partial payload is buffered but not yet
    /// yielded as a [`Message`].
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode one `(type, payload)` pair into `[header|payload]` wire bytes.
///
/// `decode(encode(t, p))` round-trips to `(VERSION, t, p)` (spec §8).
pub fn encode(msg_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(MAGIC);
    buf.push(VERSION);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.push(msg_type);
    buf.extend_from_slice(payload);
    buf
}
