//! Error types for the game core.
//!
//! Rejected moves are a normal part of play (the server discards them
//! silently), so this error is mostly useful for logging and tests.

use std::fmt;

/// Why a move could not be applied to a board.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// The cell index is outside 0–24.
    OutOfRange(usize),

    /// The cell already holds a mark.
    Occupied(usize),
}

impl fmt::Display for MoveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveError::OutOfRange(i) => write!(f, "cell {} is outside the board", i),
            MoveError::Occupied(i) => write!(f, "cell {} is already occupied", i),
        }
    }
}

impl std::error::Error for MoveError {}
