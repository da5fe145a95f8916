//! Uniform-random move selection.
//!
//! The service never evaluates move quality; the only automated mover it
//! offers picks uniformly over every `(piece, destination)` pair the
//! generator allows, which inherits the forced-capture rule for free.

use rand::Rng;

use crate::board::Position;
use crate::movegen;

/// Picks a uniformly random legal `(from, to)` pair for the side to move,
/// or `None` if the position has no legal move.
pub fn random_move<R: Rng>(position: &Position, rng: &mut R) -> Option<(usize, usize)> {
    let legal = movegen::legal_moves(position);
    let total: usize = legal.values().map(Vec::len).sum();
    if total == 0 {
        return None;
    }
    let mut pick = rng.gen_range(0..total);
    for (&from, destinations) in &legal {
        if pick < destinations.len() {
            return Some((from, destinations[pick]));
        }
        pick -= destinations.len();
    }
    unreachable!("pick is bounded by the destination total")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Piece, Player};
    use crate::moves;

    #[test]
    fn picked_move_is_always_legal() {
        let mut rng = rand::thread_rng();
        let start = Position::starting();
        for _ in 0..50 {
            let (from, to) = random_move(&start, &mut rng).expect("opening move");
            assert!(moves::apply_move(&start, from, to).is_ok());
        }
    }

    #[test]
    fn forced_capture_is_respected() {
        let mut board = Board::empty();
        board.set(43, Some(Piece::man(Player::One)));
        board.set(47, Some(Piece::man(Player::One)));
        board.set(34, Some(Piece::man(Player::Two)));
        let position = Position::new(board, Player::One);

        let mut rng = rand::thread_rng();
        for _ in 0..20 {
            // The only legal move is the jump 43 -> 25.
            assert_eq!(random_move(&position, &mut rng), Some((43, 25)));
        }
    }

    #[test]
    fn dead_position_yields_none() {
        let mut board = Board::empty();
        board.set(63, Some(Piece::man(Player::Two)));
        let position = Position::new(board, Player::Two);
        assert_eq!(random_move(&position, &mut rand::thread_rng()), None);
    }
}
