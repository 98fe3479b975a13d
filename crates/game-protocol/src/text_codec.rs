//! Human-readable text carried inside frames.
//!
//! Board render (five frames, then the instructions frame):
//!
//! ```text
//! X | - | - | - | -	 00 | 01 | 02 | 03 | 04
//! - | O | - | - | -	 05 | 06 | 07 | 08 | 09
//! ...
//! ```
//!
//! Chat line:
//!   `[nickname]: text`
//!
//! Outcome lines (also the first line of each log record):
//! - Win:       `#<ts> player: <winner> won against player: <loser>`
//! - Tie:       `#<ts> player: <a> tied with player: <b>`
//! - Abandoned: `#<ts> player: <leaver> versus player: <survivor> undecided`

use game_core::{Board, Outcome, BOARD_SIDE};

use crate::frame_codec::Frame;
use crate::wire_types::{INSTRUCTIONS, MAX_NICKNAME_LEN};

/// Render one board row plus its cell-index legend.
pub fn format_board_row(board: &Board, row: usize) -> String {
    let cells = board
        .rows()
        .nth(row)
        .map(|r| {
            r.iter()
                .map(|c| (c.as_byte() as char).to_string())
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .unwrap_or_default();

    let legend = (0..BOARD_SIDE)
        .map(|col| format!("{:02}", row * BOARD_SIDE + col))
        .collect::<Vec<_>>()
        .join(" | ");

    format!("{}\t {}", cells, legend)
}

/// The full board render: one frame per row followed by the instructions.
pub fn board_frames(board: &Board) -> Vec<Frame> {
    let mut frames: Vec<Frame> = (0..BOARD_SIDE)
        .map(|row| Frame::from_text(&format_board_row(board, row)))
        .collect();
    frames.push(Frame::from_text(INSTRUCTIONS));
    frames
}

/// `[nickname]: text`
pub fn format_chat(nickname: &str, text: &str) -> String {
    format!("[{}]: {}", nickname, text)
}

/// Outcome line for the wire and the log. `timestamp` is preformatted
/// by the caller so this crate stays clock-free.
pub fn format_outcome(outcome: &Outcome, timestamp: &str) -> String {
    match outcome {
        Outcome::Won { winner, loser } => {
            format!("#{} player: {} won against player: {}", timestamp, winner, loser)
        }
        Outcome::Tie { first, second } => {
            format!("#{} player: {} tied with player: {}", timestamp, first, second)
        }
        Outcome::Abandoned { leaver, survivor } => format!(
            "#{} player: {} versus player: {} undecided",
            timestamp, leaver, survivor
        ),
    }
}

/// Extract a nickname from the handshake frame: payload up to the first
/// NUL, cut to [`MAX_NICKNAME_LEN`] bytes on a char boundary.
pub fn parse_nickname(frame: &Frame) -> String {
    let text = frame.text();
    if text.len() <= MAX_NICKNAME_LEN {
        return text;
    }

    let mut end = MAX_NICKNAME_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

/// Turn one line of keyboard input into a client frame.
///
/// Carriage returns and newlines become NUL, so the frame text ends where
/// the line ended.
pub fn encode_line(line: &str) -> Frame {
    let filtered: Vec<u8> = line
        .bytes()
        .map(|b| if b == b'\r' || b == b'\n' { 0 } else { b })
        .collect();
    Frame::from_raw(&filtered)
}
