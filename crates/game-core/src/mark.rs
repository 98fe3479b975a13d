//! Mark (X / O) placed on the board by the two sides of a pairing.

/// Symbol a player writes onto the board.
///
/// `X` is "mark A": the side that finished the nickname handshake first
/// and therefore owns the first move. `O` is "mark B".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// Both marks, in the order they are evaluated after a move.
    pub const ALL: [Mark; 2] = [Mark::X, Mark::O];

    /// The byte written to the wire and to the outcome log.
    pub fn as_byte(self) -> u8 {
        match self {
            Mark::X => b'X',
            Mark::O => b'O',
        }
    }

    /// Try to parse from the wire byte (`b'X'` / `b'O'`, case-sensitive).
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'X' => Some(Mark::X),
            b'O' => Some(Mark::O),
            _ => None,
        }
    }
}
