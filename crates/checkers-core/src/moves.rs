//! Move application: capture-path resolution, promotion, turn handover.

use thiserror::Error;

use crate::board::{self, Player, Position};
use crate::movegen;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("illegal move from {from} to {to}")]
    IllegalMove { from: usize, to: usize },
}

/// Result of applying one move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedMove {
    pub position: Position,
    /// Indices of pieces removed by this move, in hop order, each exactly
    /// once.
    pub captured: Vec<usize>,
}

/// Applies the move `from → to` for the side to move.
///
/// `to` must be a destination `legal_moves` produced for `from`; anything
/// else (a simple move while a capture is forced, an opponent's piece, an
/// empty cell) is an `IllegalMove`. When `to` is a capture destination the
/// concrete path is re-resolved with the generator's fixed direction order;
/// when several paths reach the same landing the first one found wins, even
/// if another captures more pieces.
pub fn apply_move(position: &Position, from: usize, to: usize) -> Result<AppliedMove, RulesError> {
    let legal = movegen::legal_moves(position);
    let reachable = legal.get(&from).map_or(false, |dests| dests.contains(&to));
    if !reachable {
        return Err(RulesError::IllegalMove { from, to });
    }
    let Some(piece) = position.board.get(from) else {
        return Err(RulesError::IllegalMove { from, to });
    };

    let mut next = *position;
    let mut captured: Vec<usize> = Vec::new();

    if movegen::capture_destinations(&position.board, from).contains(&to) {
        let path = movegen::find_capture_path(&position.board, from, to)
            .ok_or(RulesError::IllegalMove { from, to })?;
        for index in path {
            if !captured.contains(&index) {
                captured.push(index);
            }
        }
        for &index in &captured {
            next.board.set(index, None);
            next.note_capture(piece.owner.opponent());
        }
    }

    next.board.set(from, None);
    let mut landed = piece;
    if !landed.king && board::row(to) == landed.owner.promotion_row() {
        landed.king = true;
    }
    next.board.set(to, Some(landed));
    next.turn = piece.owner.opponent();

    debug_assert_eq!(
        next.pieces_remaining(Player::One),
        next.board.count(Player::One)
    );
    debug_assert_eq!(
        next.pieces_remaining(Player::Two),
        next.board.count(Player::Two)
    );

    Ok(AppliedMove { position: next, captured })
}

/// Whether the position is over for the side to move: out of pieces or out
/// of moves. The player who just moved wins in either case.
pub fn is_terminal(position: &Position) -> bool {
    position.pieces_remaining(position.turn) == 0 || movegen::is_stuck(position)
}
