use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;

use checkers_core::Player;

use crate::clock::{self, Driver};
use crate::db::matches::STATUS_ACTIVE;
use crate::error::AppError;
use crate::presence::PresenceRegistry;
use crate::routes::matches::{load_match, PlayerRequest};
use crate::settle;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    /// Who currently owns clock decrements: "player1", "player2", or
    /// "sweep".
    pub driver: String,
}

fn driver_label(driver: Driver) -> String {
    match driver {
        Driver::Player(Player::One) => "player1".to_string(),
        Driver::Player(Player::Two) => "player2".to_string(),
        Driver::Sweep => "sweep".to_string(),
    }
}

/// Presence heartbeat. Renegotiates and reports the clock driver so clients
/// know whether they are expected to tick.
pub async fn heartbeat(
    Extension(pool): Extension<PgPool>,
    Extension(registry): Extension<Arc<PresenceRegistry>>,
    Path(match_id): Path<i64>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<PresenceResponse>, AppError> {
    let record = load_match(&pool, match_id).await?;
    if record.side_of(req.player).is_none() {
        return Err(AppError::BadRequest(format!(
            "Player {} is not in match {match_id}",
            req.player
        )));
    }
    registry.heartbeat(match_id, req.player);

    let turn = record.turn_player()?;
    let p1_present = registry.is_present(match_id, record.player1_id);
    let p2_present = record
        .player2_id
        .is_some_and(|p| registry.is_present(match_id, p));
    Ok(Json(PresenceResponse {
        driver: driver_label(clock::driver_for(turn, p1_present, p2_present)),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickResponse {
    pub player1_time_remaining: i32,
    pub player2_time_remaining: i32,
    pub status: String,
    pub winner: Option<i64>,
}

/// Client-driven clock tick. The submitter must be the negotiated driver;
/// the decrement itself comes from server time since `last_timer_tick`, so
/// a manipulated client can change cadence but never the amounts.
pub async fn tick(
    Extension(pool): Extension<PgPool>,
    Extension(registry): Extension<Arc<PresenceRegistry>>,
    Path(match_id): Path<i64>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<TickResponse>, AppError> {
    let record = load_match(&pool, match_id).await?;
    if record.status != STATUS_ACTIVE {
        return Err(AppError::InvalidState(format!(
            "Match {match_id} is not active"
        )));
    }
    let Some(side) = record.side_of(req.player) else {
        return Err(AppError::BadRequest(format!(
            "Player {} is not in match {match_id}",
            req.player
        )));
    };

    // A tick is also proof of life.
    registry.heartbeat(match_id, req.player);

    let turn = record.turn_player()?;
    let p1_present = registry.is_present(match_id, record.player1_id);
    let p2_present = record
        .player2_id
        .is_some_and(|p| registry.is_present(match_id, p));
    if clock::driver_for(turn, p1_present, p2_present) != Driver::Player(side) {
        return Err(AppError::InvalidState(
            "Another session drives this clock".into(),
        ));
    }

    let charged = clock::charge(
        turn,
        record.current_ply,
        record.player1_time_remaining,
        record.player2_time_remaining,
        record.last_timer_tick,
        Utc::now(),
    );

    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    if !crate::db::matches::charge_time(
        &mut *tx,
        match_id,
        charged.player1_remaining,
        charged.player2_remaining,
    )
    .await?
    {
        return Err(AppError::StaleTransition(
            "Match was resolved before the tick applied".into(),
        ));
    }
    if let Some(loser) = charged.timed_out {
        if let Some(winner_id) = record.player_id_of(loser.opponent()) {
            settle::complete_with_winner(&mut tx, &record, winner_id).await?;
        }
    }
    tx.commit().await.map_err(AppError::Sqlx)?;

    let record = load_match(&pool, match_id).await?;
    Ok(Json(TickResponse {
        player1_time_remaining: record.player1_time_remaining,
        player2_time_remaining: record.player2_time_remaining,
        status: record.status.clone(),
        winner: record.winner_id,
    }))
}
