//! Fixed-size frame encoding/decoding and client frame classification.
//!
//! ```text
//! Frame (both directions)
//! -----------------------
//! [0..256] : text, NUL-padded. Bytes after the first NUL are ignored.
//!
//! Client -> server classification (first bytes of the frame):
//!   0x00               disconnect
//!   "00".."24"         move to that cell
//!   "25".."99"         malformed move, ignored
//!   '@' ...            broadcast chat (marker stripped)
//!   anything else      direct chat to the paired opponent
//!
//! Server -> client:
//!   text frames (board lines, notices, chat, outcomes)
//!   all-zero frame     sentinel: the segment ended, disconnect
//! ```
//!
//! This module works on **one frame per buffer**. Reading exactly
//! [`FRAME_LEN`] bytes off the stream is the transport's job.

use std::fmt;

use game_core::BOARD_CELLS;

use crate::wire_types::{BROADCAST_MARKER, FRAME_LEN};

/// Errors that can arise when decoding a frame.
#[derive(Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer than `FRAME_LEN` bytes were available (short read).
    Truncated(usize),
    /// More bytes than fit in one frame.
    Oversized(usize),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Truncated(n) => {
                write!(f, "Frame truncated: got {} bytes, expected {}", n, FRAME_LEN)
            }
            ProtocolError::Oversized(n) => {
                write!(f, "Frame oversized: got {} bytes, expected {}", n, FRAME_LEN)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// One protocol message.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// The all-zero frame. Also the client's disconnect request.
    pub fn sentinel() -> Self {
        Frame([0u8; FRAME_LEN])
    }

    /// Build a text frame. Text longer than the frame is truncated so
    /// that at least one trailing NUL remains.
    pub fn from_text(text: &str) -> Self {
        Frame::from_raw(text.as_bytes())
    }

    /// Build a frame from raw bytes, truncating and NUL-padding.
    pub fn from_raw(bytes: &[u8]) -> Self {
        let mut buf = [0u8; FRAME_LEN];
        let n = bytes.len().min(FRAME_LEN - 1);
        buf[..n].copy_from_slice(&bytes[..n]);
        Frame(buf)
    }

    /// Decode a frame read off the wire. The buffer must be exactly one frame.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < FRAME_LEN {
            return Err(ProtocolError::Truncated(buf.len()));
        }
        if buf.len() > FRAME_LEN {
            return Err(ProtocolError::Oversized(buf.len()));
        }

        let mut out = [0u8; FRAME_LEN];
        out.copy_from_slice(buf);
        Ok(Frame(out))
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.0[0] == 0
    }

    /// Bytes up to (not including) the first NUL.
    pub fn payload(&self) -> &[u8] {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(FRAME_LEN);
        &self.0[..end]
    }

    /// Payload as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(self.payload()).into_owned()
    }
}

impl From<[u8; FRAME_LEN]> for Frame {
    fn from(buf: [u8; FRAME_LEN]) -> Self {
        Frame(buf)
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame").field(&self.text()).finish()
    }
}

/// Classified client -> server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// All-zero first byte.
    Disconnect,

    /// Two ASCII digits naming a cell 00–24.
    Move(usize),

    /// Two ASCII digits outside the board (25–99). Consumed and ignored.
    InvalidMove,

    /// Leading broadcast marker; text excludes the marker.
    Broadcast(String),

    /// Anything else: chat for the paired opponent.
    Direct(String),
}

/// Classify a frame received from a client.
pub fn classify(frame: &Frame) -> ClientFrame {
    let bytes = frame.as_bytes();

    if bytes[0] == 0 {
        return ClientFrame::Disconnect;
    }

    if let Some(cell) = parse_move(bytes[0], bytes[1]) {
        return if cell < BOARD_CELLS {
            ClientFrame::Move(cell)
        } else {
            ClientFrame::InvalidMove
        };
    }

    if bytes[0] == BROADCAST_MARKER {
        let text = String::from_utf8_lossy(&frame.payload()[1..]).into_owned();
        return ClientFrame::Broadcast(text);
    }

    ClientFrame::Direct(frame.text())
}

fn parse_move(first: u8, second: u8) -> Option<usize> {
    if first.is_ascii_digit() && second.is_ascii_digit() {
        Some(usize::from(first - b'0') * 10 + usize::from(second - b'0'))
    } else {
        None
    }
}
