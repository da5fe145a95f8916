//! Match records and the conditional updates behind every lifecycle
//! transition.
//!
//! Each mutating function here is a guarded `UPDATE` that returns whether it
//! won: zero rows affected means another session got there first, and the
//! caller surfaces `StaleTransition` instead of double-applying.

use sqlx::PgExecutor;

use checkers_core::Player;

use crate::error::AppError;

pub const STATUS_WAITING: &str = "waiting";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_CANCELLED: &str = "cancelled";

const MATCH_COLUMNS: &str = "id, game_type, player1_id, player2_id, status, stake_per_piece, \
     platform_fee, time_limit_seconds, player1_time_remaining, player2_time_remaining, \
     current_ply, turn, board_state, winner_id, last_timer_tick, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MatchRecord {
    pub id: i64,
    pub game_type: String,
    pub player1_id: i64,
    pub player2_id: Option<i64>,
    pub status: String,
    pub stake_per_piece: i64,
    pub platform_fee: i64,
    pub time_limit_seconds: i32,
    pub player1_time_remaining: i32,
    pub player2_time_remaining: i32,
    pub current_ply: i32,
    pub turn: i16,
    pub board_state: String,
    pub winner_id: Option<i64>,
    pub last_timer_tick: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl MatchRecord {
    /// Which side a player id sits on, if they are in this match.
    pub fn side_of(&self, player_id: i64) -> Option<Player> {
        if player_id == self.player1_id {
            Some(Player::One)
        } else if self.player2_id == Some(player_id) {
            Some(Player::Two)
        } else {
            None
        }
    }

    pub fn player_id_of(&self, side: Player) -> Option<i64> {
        match side {
            Player::One => Some(self.player1_id),
            Player::Two => self.player2_id,
        }
    }

    pub fn turn_player(&self) -> Result<Player, AppError> {
        Player::try_from(self.turn as u8)
            .map_err(|_| AppError::InvalidState(format!("Match {} holds an invalid turn", self.id)))
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn create<'e, E: PgExecutor<'e>>(
    executor: E,
    game_type: &str,
    player1_id: i64,
    stake_per_piece: i64,
    platform_fee: i64,
    time_limit_seconds: i32,
    board_state: &str,
) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as(
        r#"INSERT INTO matches (
            game_type, player1_id, status, stake_per_piece, platform_fee,
            time_limit_seconds, player1_time_remaining, player2_time_remaining,
            board_state
        ) VALUES ($1, $2, 'waiting', $3, $4, $5, $5, $5, $6)
        RETURNING id"#,
    )
    .bind(game_type)
    .bind(player1_id)
    .bind(stake_per_piece)
    .bind(platform_fee)
    .bind(time_limit_seconds)
    .bind(board_state)
    .fetch_one(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(row.0)
}

/// Insert a match that starts life `active` with both seats taken and the
/// clocks already running. Used by rematch acceptance.
#[allow(clippy::too_many_arguments)]
pub async fn create_active<'e, E: PgExecutor<'e>>(
    executor: E,
    game_type: &str,
    player1_id: i64,
    player2_id: i64,
    stake_per_piece: i64,
    platform_fee: i64,
    time_limit_seconds: i32,
    board_state: &str,
) -> Result<i64, AppError> {
    let row: (i64,) = sqlx::query_as(
        r#"INSERT INTO matches (
            game_type, player1_id, player2_id, status, stake_per_piece, platform_fee,
            time_limit_seconds, player1_time_remaining, player2_time_remaining,
            board_state, last_timer_tick
        ) VALUES ($1, $2, $3, 'active', $4, $5, $6, $6, $6, $7, NOW())
        RETURNING id"#,
    )
    .bind(game_type)
    .bind(player1_id)
    .bind(player2_id)
    .bind(stake_per_piece)
    .bind(platform_fee)
    .bind(time_limit_seconds)
    .bind(board_state)
    .fetch_one(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(row.0)
}

pub async fn get<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
) -> Result<Option<MatchRecord>, AppError> {
    sqlx::query_as::<_, MatchRecord>(&format!(
        "SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"
    ))
    .bind(match_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::Sqlx)
}

/// Open seats matching the joiner's criteria, oldest first, never the
/// joiner's own matches.
pub async fn find_waiting<'e, E: PgExecutor<'e>>(
    executor: E,
    game_type: &str,
    stake_per_piece: i64,
    time_limit_seconds: i32,
    exclude_player: i64,
) -> Result<Vec<i64>, AppError> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"SELECT id FROM matches
           WHERE status = 'waiting'
             AND player2_id IS NULL
             AND game_type = $1
             AND stake_per_piece = $2
             AND time_limit_seconds = $3
             AND player1_id <> $4
           ORDER BY id
           LIMIT 10"#,
    )
    .bind(game_type)
    .bind(stake_per_piece)
    .bind(time_limit_seconds)
    .bind(exclude_player)
    .fetch_all(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// The join transition. The `status = 'waiting' AND player2_id IS NULL`
/// guard is the sole race-prevention mechanism: of two simultaneous joiners
/// exactly one update sticks.
pub async fn try_join<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    player2_id: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE matches SET
            player2_id = $2,
            status = 'active',
            last_timer_tick = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'waiting' AND player2_id IS NULL"#,
    )
    .bind(match_id)
    .bind(player2_id)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

/// Persist an accepted move. Guarded on the expected ply and the submitter's
/// turn so a racing second submission for the same ply is a no-op.
pub async fn record_move<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    expected_ply: i32,
    submitter: Player,
    board_state: &str,
    next_turn: Player,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE matches SET
            board_state = $4,
            current_ply = current_ply + 1,
            turn = $5,
            last_timer_tick = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'active' AND current_ply = $2 AND turn = $3"#,
    )
    .bind(match_id)
    .bind(expected_ply)
    .bind(submitter as i16)
    .bind(board_state)
    .bind(next_turn as i16)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

/// Terminal transition to `completed`. `winner_id = NULL` records a draw.
/// The `status = 'active'` guard resolves every terminal trigger exactly
/// once.
pub async fn complete<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    winner_id: Option<i64>,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE matches SET
            status = 'completed',
            winner_id = $2,
            updated_at = NOW()
        WHERE id = $1 AND status = 'active'"#,
    )
    .bind(match_id)
    .bind(winner_id)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

pub async fn cancel_waiting<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE matches SET
            status = 'cancelled',
            platform_fee = 0,
            updated_at = NOW()
        WHERE id = $1 AND status = 'waiting'"#,
    )
    .bind(match_id)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

/// Cancel an active match while neither player has completed a full round.
pub async fn cancel_active_early<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE matches SET
            status = 'cancelled',
            platform_fee = 0,
            updated_at = NOW()
        WHERE id = $1 AND status = 'active' AND current_ply <= 2"#,
    )
    .bind(match_id)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

/// Write freshly computed clock values. Server time only; the caller derives
/// them from `last_timer_tick`, never from a client-submitted duration.
pub async fn charge_time<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    player1_time_remaining: i32,
    player2_time_remaining: i32,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE matches SET
            player1_time_remaining = $2,
            player2_time_remaining = $3,
            last_timer_tick = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'active'"#,
    )
    .bind(match_id)
    .bind(player1_time_remaining)
    .bind(player2_time_remaining)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

/// Takeback acceptance: restore the stored snapshot from two plies ago and
/// hand the turn back to the requester.
pub async fn rollback_two_plies<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    expected_ply: i32,
    board_state: &str,
    turn: Player,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE matches SET
            board_state = $3,
            current_ply = current_ply - 2,
            turn = $4,
            last_timer_tick = NOW(),
            updated_at = NOW()
        WHERE id = $1 AND status = 'active' AND current_ply = $2 AND current_ply > 2"#,
    )
    .bind(match_id)
    .bind(expected_ply)
    .bind(board_state)
    .bind(turn as i16)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_for_player<'e, E: PgExecutor<'e>>(
    executor: E,
    player_id: i64,
    status: Option<&str>,
) -> Result<Vec<MatchRecord>, AppError> {
    let records = if let Some(status) = status {
        sqlx::query_as::<_, MatchRecord>(&format!(
            r#"SELECT {MATCH_COLUMNS} FROM matches
               WHERE (player1_id = $1 OR player2_id = $1) AND status = $2
               ORDER BY updated_at DESC"#
        ))
        .bind(player_id)
        .bind(status)
        .fetch_all(executor)
        .await
    } else {
        sqlx::query_as::<_, MatchRecord>(&format!(
            r#"SELECT {MATCH_COLUMNS} FROM matches
               WHERE player1_id = $1 OR player2_id = $1
               ORDER BY updated_at DESC"#
        ))
        .bind(player_id)
        .fetch_all(executor)
        .await
    };

    records.map_err(AppError::Sqlx)
}

/// Active matches whose timer tick has gone stale; the sweep reconciles
/// these when no client is connected to drive the clock.
pub async fn stale_active<'e, E: PgExecutor<'e>>(
    executor: E,
    idle_cutoff: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<MatchRecord>, AppError> {
    sqlx::query_as::<_, MatchRecord>(&format!(
        r#"SELECT {MATCH_COLUMNS} FROM matches
           WHERE status = 'active'
             AND last_timer_tick IS NOT NULL
             AND last_timer_tick < $1
           ORDER BY last_timer_tick"#
    ))
    .bind(idle_cutoff)
    .fetch_all(executor)
    .await
    .map_err(AppError::Sqlx)
}
