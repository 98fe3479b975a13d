//! game-core
//!
//! Pure game logic:
//! - marks (X / O)
//! - the 5x5 board and its win/tie rules
//! - terminal outcomes

pub mod mark;
pub mod board;
pub mod outcome;
pub mod error;

pub use mark::Mark;
pub use board::{Board, BoardState, Cell, BOARD_CELLS, BOARD_SIDE, EMPTY_CELL};
pub use outcome::Outcome;
pub use error::MoveError;
