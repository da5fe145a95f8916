//! Stake arithmetic and lifecycle guards, kept pure so they are testable
//! without a database.
//!
//! GameLifecycle decides *whether* and *how much* is owed; the wallet ledger
//! moves the money.

use checkers_core::board::PIECES_PER_SIDE;

/// Each player escrows their stake for a full side of pieces.
pub fn escrow_amount(stake_per_piece: i64) -> i64 {
    stake_per_piece * PIECES_PER_SIDE as i64
}

/// Platform fee on the whole pot (both escrows), in basis points.
pub fn pot_fee(stake_per_piece: i64, fee_bps: i64) -> i64 {
    escrow_amount(stake_per_piece) * 2 * fee_bps / 10_000
}

/// Win, resignation, and timeout all pay the winner the pot minus the fee.
pub fn winner_payout(stake_per_piece: i64, platform_fee: i64) -> i64 {
    escrow_amount(stake_per_piece) * 2 - platform_fee
}

/// An accepted draw refunds each escrow minus half the fee.
pub fn draw_refund(stake_per_piece: i64, platform_fee: i64) -> i64 {
    escrow_amount(stake_per_piece) - platform_fee / 2
}

/// Cancellation is allowed while neither player has completed a full round.
pub fn cancel_window_open(current_ply: i32) -> bool {
    current_ply <= 2
}

/// Takeback needs two plies on the log to roll back.
pub fn takeback_window_open(current_ply: i32) -> bool {
    current_ply > 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escrow_covers_a_full_side() {
        assert_eq!(escrow_amount(10), 120);
    }

    #[test]
    fn fee_is_taken_from_the_pot() {
        // 5% of a 240 pot
        assert_eq!(pot_fee(10, 500), 12);
        assert_eq!(winner_payout(10, pot_fee(10, 500)), 228);
    }

    #[test]
    fn draw_splits_the_fee() {
        let fee = pot_fee(10, 500);
        assert_eq!(draw_refund(10, fee), 114);
        // Two refunds plus the fee account for the whole pot.
        assert_eq!(draw_refund(10, fee) * 2 + fee, escrow_amount(10) * 2);
    }

    #[test]
    fn ply_windows() {
        assert!(cancel_window_open(1));
        assert!(cancel_window_open(2));
        assert!(!cancel_window_open(3));

        assert!(!takeback_window_open(2));
        assert!(takeback_window_open(3));
    }
}
