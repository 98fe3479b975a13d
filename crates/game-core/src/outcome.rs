//! Terminal outcomes of a game.
//!
//! These are transport-agnostic: the protocol crate turns them into
//! outcome lines for the wire and for the log file.

use crate::board::BoardState;

/// How a pairing ended.
///
/// Nicknames are carried directly so the logger can format a record
/// without going back to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The mover completed a line.
    Won { winner: String, loser: String },

    /// The board filled up with no complete line.
    Tie { first: String, second: String },

    /// One side disconnected (or the server shut down) mid-game.
    Abandoned { leaver: String, survivor: String },
}

impl Outcome {
    /// Outcome after `mover` played against `opponent`, if the board is terminal.
    ///
    /// Only the mover can have completed a line on their own move, so a
    /// win is always attributed to them.
    pub fn after_move(state: BoardState, mover: &str, opponent: &str) -> Option<Self> {
        match state {
            BoardState::InProgress => None,
            BoardState::Won(_) => Some(Outcome::Won {
                winner: mover.to_string(),
                loser: opponent.to_string(),
            }),
            BoardState::Tie => Some(Outcome::Tie {
                first: mover.to_string(),
                second: opponent.to_string(),
            }),
        }
    }

    pub fn abandoned(leaver: impl Into<String>, survivor: impl Into<String>) -> Self {
        Outcome::Abandoned {
            leaver: leaver.into(),
            survivor: survivor.into(),
        }
    }

    /// Both nicknames, in record order.
    pub fn players(&self) -> (&str, &str) {
        match self {
            Outcome::Won { winner, loser } => (winner, loser),
            Outcome::Tie { first, second } => (first, second),
            Outcome::Abandoned { leaver, survivor } => (leaver, survivor),
        }
    }
}
