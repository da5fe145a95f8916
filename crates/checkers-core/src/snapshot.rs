//! Compact text snapshots of a position.
//!
//! Format: eight '/'-separated rows of eight cell characters, a space, and
//! the side to move. Cells: `.` empty, `o`/`O` player-1 man/king, `x`/`X`
//! player-2 man/king; the side to move is `o` or `x`. Example (starting
//! position, player 1 to move):
//!
//! `x.x.x.x./.x.x.x.x/x.x.x.x./......../......../o.o.o.o./.o.o.o.o/o.o.o.o. o`
//!
//! This is the form matches and move-log entries persist; piece counts are
//! re-derived on decode so they can never drift from the board.

use thiserror::Error;

use crate::board::{self, Board, Piece, Player, Position};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot must be 8 rows of 8 cells plus a side to move")]
    Malformed,
    #[error("unexpected cell character '{0}'")]
    BadCell(char),
    #[error("unexpected side-to-move character '{0}'")]
    BadTurn(char),
    #[error("piece on light square at index {0}")]
    LightSquare(usize),
}

fn cell_char(piece: Option<Piece>) -> char {
    match piece {
        None => '.',
        Some(Piece { owner: Player::One, king: false }) => 'o',
        Some(Piece { owner: Player::One, king: true }) => 'O',
        Some(Piece { owner: Player::Two, king: false }) => 'x',
        Some(Piece { owner: Player::Two, king: true }) => 'X',
    }
}

fn cell_from_char(c: char) -> Result<Option<Piece>, SnapshotError> {
    match c {
        '.' => Ok(None),
        'o' => Ok(Some(Piece::man(Player::One))),
        'O' => Ok(Some(Piece::king(Player::One))),
        'x' => Ok(Some(Piece::man(Player::Two))),
        'X' => Ok(Some(Piece::king(Player::Two))),
        other => Err(SnapshotError::BadCell(other)),
    }
}

pub fn encode(position: &Position) -> String {
    let mut out = String::with_capacity(74);
    for row in 0..8 {
        if row > 0 {
            out.push('/');
        }
        for col in 0..8 {
            out.push(cell_char(position.board.get(board::index_at(row, col))));
        }
    }
    out.push(' ');
    out.push(match position.turn {
        Player::One => 'o',
        Player::Two => 'x',
    });
    out
}

pub fn decode(text: &str) -> Result<Position, SnapshotError> {
    let (cells, turn) = text.rsplit_once(' ').ok_or(SnapshotError::Malformed)?;

    let turn = match turn {
        "o" => Player::One,
        "x" => Player::Two,
        other => {
            let c = other.chars().next().ok_or(SnapshotError::Malformed)?;
            return Err(SnapshotError::BadTurn(c));
        }
    };

    let rows: Vec<&str> = cells.split('/').collect();
    if rows.len() != 8 || rows.iter().any(|r| r.chars().count() != 8) {
        return Err(SnapshotError::Malformed);
    }

    let mut board = Board::empty();
    for (row, row_text) in rows.iter().enumerate() {
        for (col, c) in row_text.chars().enumerate() {
            let index = board::index_at(row, col);
            let cell = cell_from_char(c)?;
            if cell.is_some() && !board::is_dark(index) {
                return Err(SnapshotError::LightSquare(index));
            }
            board.set(index, cell);
        }
    }

    Ok(Position::new(board, turn))
}
