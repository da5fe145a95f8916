//! Terminal transitions with their money movement, run inside the caller's
//! transaction so a lost race or a failed credit rolls back together.
//!
//! Every function returns whether the conditional state change won; `false`
//! means another session resolved the match first and nothing was paid.

use sqlx::{Postgres, Transaction};

use crate::db::matches::{self, MatchRecord, STATUS_ACTIVE, STATUS_WAITING};
use crate::db::wallet;
use crate::engine;
use crate::error::AppError;

/// Win, resignation, or timeout: complete the match and pay the winner the
/// pot minus the platform fee.
pub async fn complete_with_winner(
    tx: &mut Transaction<'_, Postgres>,
    record: &MatchRecord,
    winner_id: i64,
) -> Result<bool, AppError> {
    if !matches::complete(&mut **tx, record.id, Some(winner_id)).await? {
        return Ok(false);
    }
    let payout = engine::winner_payout(record.stake_per_piece, record.platform_fee);
    wallet::credit(&mut **tx, winner_id, payout).await?;
    tracing::info!(
        "Match {} completed, winner {} paid {}",
        record.id,
        winner_id,
        payout
    );
    Ok(true)
}

/// Accepted draw: complete with no winner and refund both stakes minus the
/// already-escrowed fee.
pub async fn complete_draw(
    tx: &mut Transaction<'_, Postgres>,
    record: &MatchRecord,
) -> Result<bool, AppError> {
    let Some(player2_id) = record.player2_id else {
        return Err(AppError::InvalidState(format!(
            "Match {} has no second player to draw with",
            record.id
        )));
    };
    if !matches::complete(&mut **tx, record.id, None).await? {
        return Ok(false);
    }
    let refund = engine::draw_refund(record.stake_per_piece, record.platform_fee);
    wallet::credit(&mut **tx, record.player1_id, refund).await?;
    wallet::credit(&mut **tx, player2_id, refund).await?;
    tracing::info!("Match {} drawn, each player refunded {}", record.id, refund);
    Ok(true)
}

/// Cancellation: full refund to every joined player, fee zeroed. Allowed
/// while the match is waiting, or active with no completed round.
pub async fn cancel_with_refund(
    tx: &mut Transaction<'_, Postgres>,
    record: &MatchRecord,
) -> Result<bool, AppError> {
    let escrow = engine::escrow_amount(record.stake_per_piece);
    match record.status.as_str() {
        STATUS_WAITING => {
            if !matches::cancel_waiting(&mut **tx, record.id).await? {
                return Ok(false);
            }
            wallet::credit(&mut **tx, record.player1_id, escrow).await?;
        }
        STATUS_ACTIVE => {
            if !engine::cancel_window_open(record.current_ply) {
                return Err(AppError::InvalidState(format!(
                    "Match {} can no longer be cancelled",
                    record.id
                )));
            }
            if !matches::cancel_active_early(&mut **tx, record.id).await? {
                return Ok(false);
            }
            wallet::credit(&mut **tx, record.player1_id, escrow).await?;
            if let Some(player2_id) = record.player2_id {
                wallet::credit(&mut **tx, player2_id, escrow).await?;
            }
        }
        other => {
            return Err(AppError::InvalidState(format!(
                "Match {} is {other} and cannot be cancelled",
                record.id
            )));
        }
    }
    tracing::info!("Match {} cancelled, stakes refunded", record.id);
    Ok(true)
}
