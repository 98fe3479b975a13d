//! Low-level wire constants.
//!
//! There is no length prefix, no version byte and no checksum: every
//! logical message in either direction is exactly [`FRAME_LEN`] bytes,
//! NUL-padded text. Framing is purely positional.

/// Size of every frame, both directions.
pub const FRAME_LEN: usize = 256;

/// Leading byte that turns a client frame into broadcast chat.
pub const BROADCAST_MARKER: u8 = b'@';

/// Longest nickname kept by the server, in bytes.
pub const MAX_NICKNAME_LEN: usize = 63;

/// Prompt sent to each side of a fresh pairing.
pub const NICKNAME_PROMPT: &str = "Your nickname: ";

/// Sent to the mover after a move that did not end the game.
pub const WAITING_FOR_OPPONENT: &str = "Waiting for opponent to move";

/// Sent after the board render.
pub const INSTRUCTIONS: &str = "You can make move by typing number from 00 to 24.\n\
Chat all simply by preceding your message with @ or chat directly to your opponent";

/// Sent to a connection rejected because every registry slot is taken.
pub const SERVER_FULL: &str = "Server is full, try again later";
