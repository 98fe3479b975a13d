//! game-protocol
//!
//! Wire-level encoding/decoding for the five-in-a-line server.
//!
//! - [`frame_codec`] : fixed 256-byte frames and client classification
//! - [`text_codec`]  : board render, chat and outcome lines

pub mod wire_types;
pub mod frame_codec;
pub mod text_codec;

pub use frame_codec::{classify, ClientFrame, Frame, ProtocolError};
pub use wire_types::FRAME_LEN;
