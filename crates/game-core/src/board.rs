//! 5x5 game board with five-in-a-line win detection.
//!
//! Cells are indexed 0–24 in row-major order:
//!
//! ```text
//! 00 01 02 03 04
//! 05 06 07 08 09
//! 10 11 12 13 14
//! 15 16 17 18 19
//! 20 21 22 23 24
//! ```
//!
//! A mark wins only when it fills an entire row, an entire column, or one
//! of the two full-length diagonals. Partial runs never win.

use crate::error::MoveError;
use crate::mark::Mark;

/// Width and height of the board.
pub const BOARD_SIDE: usize = 5;

/// Number of cells on the board.
pub const BOARD_CELLS: usize = BOARD_SIDE * BOARD_SIDE;

/// Byte used for an empty cell on the wire and in the outcome log.
pub const EMPTY_CELL: u8 = b'-';

/// Every winning line: 5 rows, 5 columns, 2 diagonals.
const WIN_LINES: [[usize; BOARD_SIDE]; 12] = [
    [0, 1, 2, 3, 4],
    [5, 6, 7, 8, 9],
    [10, 11, 12, 13, 14],
    [15, 16, 17, 18, 19],
    [20, 21, 22, 23, 24],
    [0, 5, 10, 15, 20],
    [1, 6, 11, 16, 21],
    [2, 7, 12, 17, 22],
    [3, 8, 13, 18, 23],
    [4, 9, 14, 19, 24],
    [0, 6, 12, 18, 24],
    [4, 8, 12, 16, 20],
];

/// A single board cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Marked(Mark),
}

impl Cell {
    pub fn as_byte(self) -> u8 {
        match self {
            Cell::Empty => EMPTY_CELL,
            Cell::Marked(mark) => mark.as_byte(),
        }
    }

    pub fn is_empty(self) -> bool {
        self == Cell::Empty
    }
}

/// Result of evaluating a board after a move.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardState {
    /// Empty cells remain and nobody has a full line.
    InProgress,
    /// The given mark owns a complete row, column or diagonal.
    Won(Mark),
    /// No empty cell remains and no line is complete.
    Tie,
}

impl BoardState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BoardState::InProgress)
    }
}

/// One board per pairing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    /// Create an all-empty board.
    pub fn new() -> Self {
        Board::default()
    }

    /// Build a board from its 25-byte wire/log representation.
    ///
    /// Returns `None` if any byte is not `-`, `X` or `O`.
    pub fn from_bytes(bytes: &[u8; BOARD_CELLS]) -> Option<Self> {
        let mut board = Board::new();
        for (cell, &b) in board.cells.iter_mut().zip(bytes.iter()) {
            *cell = if b == EMPTY_CELL {
                Cell::Empty
            } else {
                Cell::Marked(Mark::from_byte(b)?)
            };
        }
        Some(board)
    }

    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.cells
    }

    /// Write `mark` into `index`.
    ///
    /// The board is left untouched when the index is out of range or the
    /// cell is already occupied.
    pub fn place(&mut self, index: usize, mark: Mark) -> Result<(), MoveError> {
        let cell = self
            .cells
            .get_mut(index)
            .ok_or(MoveError::OutOfRange(index))?;

        if !cell.is_empty() {
            return Err(MoveError::Occupied(index));
        }

        *cell = Cell::Marked(mark);
        Ok(())
    }

    /// True if `mark` fills a complete row, column or full diagonal.
    pub fn is_winner(&self, mark: Mark) -> bool {
        let target = Cell::Marked(mark);
        WIN_LINES
            .iter()
            .any(|line| line.iter().all(|&i| self.cells[i] == target))
    }

    /// True if no empty cell remains.
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }

    /// Evaluate both marks, then the tie condition.
    pub fn state(&self) -> BoardState {
        for mark in Mark::ALL {
            if self.is_winner(mark) {
                return BoardState::Won(mark);
            }
        }

        if self.is_full() {
            BoardState::Tie
        } else {
            BoardState::InProgress
        }
    }

    /// Raw 25-byte snapshot (`-`, `X`, `O`), as written to the outcome log.
    pub fn to_bytes(&self) -> [u8; BOARD_CELLS] {
        let mut out = [EMPTY_CELL; BOARD_CELLS];
        for (b, cell) in out.iter_mut().zip(self.cells.iter()) {
            *b = cell.as_byte();
        }
        out
    }

    /// Iterate over the five rows.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(BOARD_SIDE)
    }
}
