//! Background timer sweep.
//!
//! Matches with no connected clients still have to run out of time. On a
//! fixed interval the sweep picks up every active match whose timer tick has
//! gone stale, charges the elapsed seconds from server time, and resolves
//! timeouts through the same conditional updates the client paths use, so a
//! race with a late move can never double-resolve.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;

use crate::clock;
use crate::config::Config;
use crate::db::matches;
use crate::error::AppError;
use crate::presence::PresenceRegistry;
use crate::settle;

pub async fn run(pool: PgPool, presence: Arc<PresenceRegistry>, config: Config) {
    let interval_seconds = config.sweep_interval_seconds;
    let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
    tracing::info!("Timer sweep running every {interval_seconds}s");
    loop {
        interval.tick().await;
        presence.prune();
        match sweep_once(&pool, &presence, interval_seconds as i64).await {
            Ok(0) => {}
            Ok(n) => tracing::info!("Sweep reconciled {n} matches"),
            Err(e) => tracing::warn!("Timer sweep failed: {e}"),
        }
    }
}

/// One reconciliation pass. Returns how many matches were charged.
pub async fn sweep_once(
    pool: &PgPool,
    presence: &PresenceRegistry,
    min_idle_seconds: i64,
) -> Result<usize, AppError> {
    let now = Utc::now();
    let cutoff = now - chrono::Duration::seconds(min_idle_seconds);
    let stale = matches::stale_active(pool, cutoff).await?;

    let mut charged_count = 0;
    for record in stale {
        let p1_present = presence.is_present(record.id, record.player1_id);
        let p2_present = record
            .player2_id
            .is_some_and(|p| presence.is_present(record.id, p));
        if p1_present || p2_present {
            // A connected client drives this clock.
            continue;
        }

        let turn = match record.turn_player() {
            Ok(turn) => turn,
            Err(e) => {
                tracing::warn!("Skipping match {}: {e}", record.id);
                continue;
            }
        };
        let charge = clock::charge(
            turn,
            record.current_ply,
            record.player1_time_remaining,
            record.player2_time_remaining,
            record.last_timer_tick,
            now,
        );

        let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
        if !matches::charge_time(
            &mut *tx,
            record.id,
            charge.player1_remaining,
            charge.player2_remaining,
        )
        .await?
        {
            // A late client move resolved the match first.
            continue;
        }
        if let Some(loser) = charge.timed_out {
            if let Some(winner_id) = record.player_id_of(loser.opponent()) {
                if settle::complete_with_winner(&mut tx, &record, winner_id).await? {
                    tracing::info!(
                        "Match {} timed out with both players absent, winner {}",
                        record.id,
                        winner_id
                    );
                }
            }
        }
        tx.commit().await.map_err(AppError::Sqlx)?;
        charged_count += 1;
    }

    Ok(charged_count)
}
