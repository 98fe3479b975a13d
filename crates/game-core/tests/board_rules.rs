// crates/game-core/tests/board_rules.rs
use game_core::{Board, BoardState, Cell, Mark, MoveError, Outcome, BOARD_CELLS};

fn board_with(x_cells: &[usize], o_cells: &[usize]) -> Board {
    let mut board = Board::new();
    for &i in x_cells {
        board.place(i, Mark::X).expect("free cell");
    }
    for &i in o_cells {
        board.place(i, Mark::O).expect("free cell");
    }
    board
}

#[test]
fn main_diagonal_wins_for_x_only() {
    let board = board_with(&[0, 6, 12, 18, 24], &[]);

    assert!(board.is_winner(Mark::X));
    assert!(!board.is_winner(Mark::O));
    assert_eq!(board.state(), BoardState::Won(Mark::X));
}

#[test]
fn anti_diagonal_wins() {
    let board = board_with(&[1, 2], &[4, 8, 12, 16, 20]);
    assert_eq!(board.state(), BoardState::Won(Mark::O));
}

#[test]
fn every_row_and_column_wins() {
    for k in 0..5 {
        let row: Vec<usize> = (0..5).map(|c| k * 5 + c).collect();
        let col: Vec<usize> = (0..5).map(|r| r * 5 + k).collect();

        assert!(board_with(&row, &[]).is_winner(Mark::X), "row {} should win", k);
        assert!(board_with(&[], &col).is_winner(Mark::O), "column {} should win", k);
    }
}

#[test]
fn four_in_a_line_is_not_a_win() {
    let board = board_with(&[0, 1, 2, 3], &[5, 6, 7, 8]);

    assert!(!board.is_winner(Mark::X));
    assert!(!board.is_winner(Mark::O));
    assert_eq!(board.state(), BoardState::InProgress);
}

#[test]
fn full_board_without_line_is_tie() {
    // Rows alternate XXOOX / OOXXO so no row, column or diagonal is uniform.
    let layout = b"XXOOXOOXXOXXOOXOOXXOXXOOX";
    let board = Board::from_bytes(layout).expect("valid layout");

    assert!(board.is_full());
    assert!(!board.is_winner(Mark::X));
    assert!(!board.is_winner(Mark::O));
    assert_eq!(board.state(), BoardState::Tie);
}

#[test]
fn last_cell_counts_towards_tie() {
    let mut layout = *b"XXOOXOOXXOXXOOXOOXXOXXOO-";
    let board = Board::from_bytes(&layout).expect("valid layout");
    assert_eq!(board.state(), BoardState::InProgress);

    layout[24] = b'X';
    let board = Board::from_bytes(&layout).expect("valid layout");
    assert_eq!(board.state(), BoardState::Tie);
}

#[test]
fn win_takes_precedence_over_full_board() {
    // Top row is all X and every other cell is filled.
    let layout = b"XXXXXOOXXOXXOOXOOXXOXOOXO";
    let board = Board::from_bytes(layout).expect("valid layout");

    assert!(board.is_full());
    assert_eq!(board.state(), BoardState::Won(Mark::X));
}

#[test]
fn occupied_cell_is_rejected_and_board_unchanged() {
    let mut board = board_with(&[12], &[]);
    let before = board.clone();

    assert_eq!(board.place(12, Mark::O), Err(MoveError::Occupied(12)));
    assert_eq!(board, before);
    assert_eq!(board.cell(12), Some(Cell::Marked(Mark::X)));
}

#[test]
fn out_of_range_cell_is_rejected() {
    let mut board = Board::new();
    assert_eq!(board.place(BOARD_CELLS, Mark::X), Err(MoveError::OutOfRange(25)));
    assert_eq!(board, Board::new());
}

#[test]
fn byte_snapshot_matches_log_format() {
    let board = board_with(&[0, 24], &[6]);
    let bytes = board.to_bytes();

    assert_eq!(&bytes, b"X-----O-----------------X");
    assert_eq!(Board::from_bytes(&bytes), Some(board));
}

#[test]
fn unknown_bytes_are_refused() {
    let mut layout = [b'-'; BOARD_CELLS];
    layout[3] = b'x';
    assert_eq!(Board::from_bytes(&layout), None);
}

#[test]
fn new_board_is_empty() {
    let board = Board::new();
    assert!(board.cells().iter().all(|c| c.is_empty()));
    assert_eq!(board.state(), BoardState::InProgress);
}

#[test]
fn rows_follow_row_major_order() {
    let board = board_with(&[5, 9], &[]);
    let second: Vec<Cell> = board.rows().nth(1).expect("row 1").to_vec();

    assert_eq!(second[0], Cell::Marked(Mark::X));
    assert_eq!(second[4], Cell::Marked(Mark::X));
    assert_eq!(board.rows().count(), 5);
}

#[test]
fn outcome_after_move_names_the_mover() {
    assert_eq!(Outcome::after_move(BoardState::InProgress, "a", "b"), None);
    assert_eq!(
        Outcome::after_move(BoardState::Won(Mark::O), "bob", "alice"),
        Some(Outcome::Won {
            winner: "bob".into(),
            loser: "alice".into()
        })
    );
    assert_eq!(
        Outcome::after_move(BoardState::Tie, "bob", "alice").map(|o| o.players().0.to_string()),
        Some("bob".to_string())
    );
}

#[test]
fn mark_helpers() {
    assert_eq!(Mark::from_byte(b'O'), Some(Mark::O));
    assert_eq!(Mark::from_byte(b'-'), None);
    assert_eq!(Mark::X.as_byte(), b'X');
}
