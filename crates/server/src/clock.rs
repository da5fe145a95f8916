//! Turn-clock negotiation and charging.
//!
//! A clock decrements only while the match is active, it is that player's
//! turn, and the opening ply pair is behind us. Who performs the decrement
//! is negotiated from live presence; the arithmetic itself always runs on
//! server timestamps.

use chrono::{DateTime, Utc};

use checkers_core::Player;

/// The first ply pair is untimed to absorb connection setup latency.
pub const UNTIMED_PLIES: i32 = 2;

/// Who is responsible for writing clock decrements right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Driver {
    Player(Player),
    Sweep,
}

/// Both present: the player on turn drives, keeping their UI latency low.
/// One present: that player covers both clocks. None: the sweep owns it.
pub fn driver_for(turn: Player, p1_present: bool, p2_present: bool) -> Driver {
    match (p1_present, p2_present) {
        (true, true) => Driver::Player(turn),
        (true, false) => Driver::Player(Player::One),
        (false, true) => Driver::Player(Player::Two),
        (false, false) => Driver::Sweep,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Charge {
    pub player1_remaining: i32,
    pub player2_remaining: i32,
    /// Set when the running clock reached zero with this charge.
    pub timed_out: Option<Player>,
}

/// Decrement the running clock by the server-side elapsed seconds since the
/// last tick. Clamps at zero and reports the timeout; the caller resolves it
/// through the usual conditional update.
pub fn charge(
    turn: Player,
    current_ply: i32,
    player1_remaining: i32,
    player2_remaining: i32,
    last_tick: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Charge {
    let mut out = Charge {
        player1_remaining,
        player2_remaining,
        timed_out: None,
    };
    if current_ply <= UNTIMED_PLIES {
        return out;
    }
    let Some(last_tick) = last_tick else {
        return out;
    };

    let elapsed = (now - last_tick).num_seconds().clamp(0, i32::MAX as i64) as i32;
    let remaining = match turn {
        Player::One => &mut out.player1_remaining,
        Player::Two => &mut out.player2_remaining,
    };
    *remaining = (*remaining - elapsed).max(0);
    if *remaining == 0 {
        out.timed_out = Some(turn);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn driver_negotiation() {
        assert_eq!(
            driver_for(Player::One, true, true),
            Driver::Player(Player::One)
        );
        assert_eq!(
            driver_for(Player::Two, true, true),
            Driver::Player(Player::Two)
        );
        // The absent player may be on the clock; the present one drives.
        assert_eq!(
            driver_for(Player::Two, true, false),
            Driver::Player(Player::One)
        );
        assert_eq!(
            driver_for(Player::One, false, true),
            Driver::Player(Player::Two)
        );
        assert_eq!(driver_for(Player::One, false, false), Driver::Sweep);
    }

    #[test]
    fn only_the_running_clock_decrements() {
        let now = Utc::now();
        let charged = charge(Player::Two, 5, 300, 300, Some(now - Duration::seconds(7)), now);
        assert_eq!(charged.player1_remaining, 300);
        assert_eq!(charged.player2_remaining, 293);
        assert_eq!(charged.timed_out, None);
    }

    #[test]
    fn opening_ply_pair_is_untimed() {
        let now = Utc::now();
        let charged = charge(
            Player::One,
            2,
            300,
            300,
            Some(now - Duration::seconds(120)),
            now,
        );
        assert_eq!(charged.player1_remaining, 300);
        assert_eq!(charged.player2_remaining, 300);
    }

    #[test]
    fn clock_clamps_at_zero_and_reports_timeout() {
        let now = Utc::now();
        let charged = charge(
            Player::One,
            9,
            10,
            300,
            Some(now - Duration::seconds(45)),
            now,
        );
        assert_eq!(charged.player1_remaining, 0);
        assert_eq!(charged.timed_out, Some(Player::One));
    }

    #[test]
    fn backwards_tick_charges_nothing() {
        let now = Utc::now();
        let charged = charge(Player::One, 9, 60, 60, Some(now + Duration::seconds(5)), now);
        assert_eq!(charged.player1_remaining, 60);
        assert_eq!(charged.timed_out, None);
    }
}
