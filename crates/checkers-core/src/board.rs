//! Board, piece, and position types.
//!
//! The board is a fixed 64-cell array in row-major order (row = index / 8,
//! col = index % 8). Pieces live only on the dark squares, where row + col is
//! even; the starting layout puts player 2 on rows 0–2 and player 1 on
//! rows 5–7, twelve pieces each.

use serde::{Deserialize, Serialize};

pub const CELLS: usize = 64;
pub const PIECES_PER_SIDE: u8 = 12;

pub fn row(index: usize) -> usize {
    index / 8
}

pub fn col(index: usize) -> usize {
    index % 8
}

pub fn index_at(row: usize, col: usize) -> usize {
    row * 8 + col
}

/// Dark (playable) squares.
pub fn is_dark(index: usize) -> bool {
    (row(index) + col(index)) % 2 == 0
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Player {
    One = 1,
    Two = 2,
}

impl Player {
    pub fn opponent(self) -> Self {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }

    /// Row delta this player's men advance in. Player 1 starts on the high
    /// rows and moves toward row 0.
    pub fn forward(self) -> i8 {
        match self {
            Player::One => -1,
            Player::Two => 1,
        }
    }

    /// Landing on this row crowns a man.
    pub fn promotion_row(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 7,
        }
    }

    fn side_index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }
}

impl From<Player> for u8 {
    fn from(player: Player) -> u8 {
        player as u8
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            other => Err(format!("player must be 1 or 2, got {other}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub owner: Player,
    pub king: bool,
}

impl Piece {
    pub fn man(owner: Player) -> Self {
        Piece { owner, king: false }
    }

    pub fn king(owner: Player) -> Self {
        Piece { owner, king: true }
    }
}

/// 64-cell board. Copy on purpose: the capture search takes a scratch copy
/// and mutates it with an explicit undo per branch instead of re-cloning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Board {
    cells: [Option<Piece>; CELLS],
}

impl Board {
    pub fn empty() -> Self {
        Board { cells: [None; CELLS] }
    }

    /// Standard starting layout: twelve men per side on the dark squares of
    /// rows 0–2 (player 2) and rows 5–7 (player 1).
    pub fn starting() -> Self {
        let mut board = Board::empty();
        for index in 0..CELLS {
            if !is_dark(index) {
                continue;
            }
            match row(index) {
                0..=2 => board.cells[index] = Some(Piece::man(Player::Two)),
                5..=7 => board.cells[index] = Some(Piece::man(Player::One)),
                _ => {}
            }
        }
        board
    }

    pub fn get(&self, index: usize) -> Option<Piece> {
        self.cells[index]
    }

    pub fn set(&mut self, index: usize, piece: Option<Piece>) {
        self.cells[index] = piece;
    }

    pub fn count(&self, player: Player) -> u8 {
        self.cells
            .iter()
            .filter(|c| c.map_or(false, |p| p.owner == player))
            .count() as u8
    }

    /// Indices of `player`'s pieces, ascending.
    pub fn pieces_of(&self, player: Player) -> Vec<usize> {
        (0..CELLS)
            .filter(|&i| self.cells[i].map_or(false, |p| p.owner == player))
            .collect()
    }
}

/// A board plus whose turn it is. Piece counts are carried alongside the
/// board and must always match the live count; the executor maintains them
/// per capture and they are the terminal-condition signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Position {
    pub board: Board,
    pub turn: Player,
    remaining: [u8; 2],
}

impl Position {
    /// Builds a position, deriving piece counts from the board.
    pub fn new(board: Board, turn: Player) -> Self {
        let remaining = [board.count(Player::One), board.count(Player::Two)];
        Position { board, turn, remaining }
    }

    pub fn starting() -> Self {
        Position::new(Board::starting(), Player::One)
    }

    pub fn pieces_remaining(&self, player: Player) -> u8 {
        self.remaining[player.side_index()]
    }

    pub(crate) fn note_capture(&mut self, victim: Player) {
        self.remaining[victim.side_index()] -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_math_is_row_major() {
        assert_eq!(row(52), 6);
        assert_eq!(col(52), 4);
        assert_eq!(index_at(6, 4), 52);
        assert_eq!(index_at(0, 0), 0);
        assert_eq!(index_at(7, 7), 63);
    }

    #[test]
    fn starting_board_has_twelve_per_side_on_dark_squares() {
        let board = Board::starting();
        assert_eq!(board.count(Player::One), PIECES_PER_SIDE);
        assert_eq!(board.count(Player::Two), PIECES_PER_SIDE);
        for index in 0..CELLS {
            if let Some(piece) = board.get(index) {
                assert!(is_dark(index), "piece on light square {index}");
                assert!(!piece.king);
                match piece.owner {
                    Player::One => assert!(row(index) >= 5),
                    Player::Two => assert!(row(index) <= 2),
                }
            }
        }
    }

    #[test]
    fn position_derives_counts_from_board() {
        let mut board = Board::empty();
        board.set(18, Some(Piece::man(Player::One)));
        board.set(27, Some(Piece::king(Player::Two)));
        board.set(36, Some(Piece::man(Player::Two)));
        let position = Position::new(board, Player::One);
        assert_eq!(position.pieces_remaining(Player::One), 1);
        assert_eq!(position.pieces_remaining(Player::Two), 2);
    }
}
