use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use checkers_core::{ai, movegen, moves, snapshot, Position};

use crate::config::Config;
use crate::db::matches::{self, MatchRecord, STATUS_ACTIVE, STATUS_WAITING};
use crate::db::{moves as move_log, wallet};
use crate::engine;
use crate::error::AppError;
use crate::settle;

pub const GAME_TYPE_CHECKERS: &str = "checkers";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMatchRequest {
    pub player: i64,
    pub stake_per_piece: i64,
    pub time_limit_seconds: i32,
    pub game_type: Option<String>,
}

#[derive(Deserialize)]
pub struct PlayerRequest {
    pub player: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub player: i64,
    pub from: usize,
    pub to: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResponse {
    pub id: i64,
    pub game_type: String,
    pub player1: i64,
    pub player2: Option<i64>,
    pub status: String,
    pub stake_per_piece: i64,
    pub platform_fee: i64,
    pub time_limit_seconds: i32,
    pub player1_time_remaining: i32,
    pub player2_time_remaining: i32,
    pub current_ply: i32,
    pub turn: u8,
    pub board_state: String,
    pub winner: Option<i64>,
    pub last_timer_tick: Option<String>,
    pub created_at: String,
}

pub fn match_to_response(m: &MatchRecord) -> MatchResponse {
    MatchResponse {
        id: m.id,
        game_type: m.game_type.clone(),
        player1: m.player1_id,
        player2: m.player2_id,
        status: m.status.clone(),
        stake_per_piece: m.stake_per_piece,
        platform_fee: m.platform_fee,
        time_limit_seconds: m.time_limit_seconds,
        player1_time_remaining: m.player1_time_remaining,
        player2_time_remaining: m.player2_time_remaining,
        current_ply: m.current_ply,
        turn: m.turn as u8,
        board_state: m.board_state.clone(),
        winner: m.winner_id,
        last_timer_tick: m.last_timer_tick.map(|t| t.to_rfc3339()),
        created_at: m.created_at.to_rfc3339(),
    }
}

fn validate_criteria(req: &CreateMatchRequest) -> Result<String, AppError> {
    if req.stake_per_piece <= 0 {
        return Err(AppError::BadRequest("Stake must be positive".into()));
    }
    if req.time_limit_seconds <= 0 {
        return Err(AppError::BadRequest("Time limit must be positive".into()));
    }
    let game_type = req
        .game_type
        .clone()
        .unwrap_or_else(|| GAME_TYPE_CHECKERS.to_string());
    if game_type != GAME_TYPE_CHECKERS {
        return Err(AppError::BadRequest(format!(
            "Unsupported game type: {game_type}"
        )));
    }
    Ok(game_type)
}

pub async fn load_match(pool: &PgPool, match_id: i64) -> Result<MatchRecord, AppError> {
    matches::get(pool, match_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Match {match_id} not found")))
}

/// Create a new waiting match, escrowing the creator's stake in the same
/// transaction.
pub async fn create_match(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let game_type = validate_criteria(&req)?;

    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    let match_id = create_waiting_match(&mut tx, &config, &req, &game_type).await?;
    tx.commit().await.map_err(AppError::Sqlx)?;

    tracing::info!("Match {} created by player {}", match_id, req.player);
    let record = load_match(&pool, match_id).await?;
    Ok(Json(match_to_response(&record)))
}

async fn create_waiting_match(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    config: &Config,
    req: &CreateMatchRequest,
    game_type: &str,
) -> Result<i64, AppError> {
    wallet::ensure_account(&mut **tx, req.player).await?;
    wallet::escrow(&mut **tx, req.player, engine::escrow_amount(req.stake_per_piece)).await?;
    matches::create(
        &mut **tx,
        game_type,
        req.player,
        req.stake_per_piece,
        engine::pot_fee(req.stake_per_piece, config.platform_fee_bps),
        req.time_limit_seconds,
        &snapshot::encode(&Position::starting()),
    )
    .await
}

/// Matchmaking: join a waiting match with identical criteria, or create a
/// new one. A lost join race just falls through to the next candidate.
pub async fn matchmake(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Json(req): Json<CreateMatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let game_type = validate_criteria(&req)?;

    let candidates = matches::find_waiting(
        &pool,
        &game_type,
        req.stake_per_piece,
        req.time_limit_seconds,
        req.player,
    )
    .await?;

    for candidate in candidates {
        let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
        wallet::ensure_account(&mut *tx, req.player).await?;
        wallet::escrow(&mut *tx, req.player, engine::escrow_amount(req.stake_per_piece)).await?;
        if matches::try_join(&mut *tx, candidate, req.player).await? {
            tx.commit().await.map_err(AppError::Sqlx)?;
            tracing::info!("Player {} matched into match {}", req.player, candidate);
            let record = load_match(&pool, candidate).await?;
            return Ok(Json(match_to_response(&record)));
        }
        // Another joiner won this seat; release the escrow and try the next.
        tx.rollback().await.map_err(AppError::Sqlx)?;
    }

    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    let match_id = create_waiting_match(&mut tx, &config, &req, &game_type).await?;
    tx.commit().await.map_err(AppError::Sqlx)?;

    tracing::info!(
        "No open seat for player {}, created match {}",
        req.player,
        match_id
    );
    let record = load_match(&pool, match_id).await?;
    Ok(Json(match_to_response(&record)))
}

/// Join one specific waiting match. Losing the race is a 409, not a new
/// match.
pub async fn join_match(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let record = load_match(&pool, match_id).await?;
    if record.player1_id == req.player {
        return Err(AppError::BadRequest("Cannot join your own match".into()));
    }
    if record.status != STATUS_WAITING {
        return Err(AppError::InvalidState(format!(
            "Match {match_id} is not waiting for an opponent"
        )));
    }

    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    wallet::ensure_account(&mut *tx, req.player).await?;
    wallet::escrow(&mut *tx, req.player, engine::escrow_amount(record.stake_per_piece)).await?;
    if !matches::try_join(&mut *tx, match_id, req.player).await? {
        // Escrow rolls back with the transaction.
        return Err(AppError::StaleTransition(format!(
            "Match {match_id} was taken by another player"
        )));
    }
    tx.commit().await.map_err(AppError::Sqlx)?;

    tracing::info!("Player {} joined match {}", req.player, match_id);
    let record = load_match(&pool, match_id).await?;
    Ok(Json(match_to_response(&record)))
}

pub async fn get_match(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
) -> Result<Json<MatchResponse>, AppError> {
    let record = load_match(&pool, match_id).await?;
    Ok(Json(match_to_response(&record)))
}

#[derive(Deserialize)]
pub struct ListMatchesQuery {
    pub player: i64,
    pub status: Option<String>,
}

pub async fn list_matches(
    Extension(pool): Extension<PgPool>,
    Query(query): Query<ListMatchesQuery>,
) -> Result<Json<Vec<MatchResponse>>, AppError> {
    let records = matches::list_for_player(&pool, query.player, query.status.as_deref()).await?;
    Ok(Json(records.iter().map(match_to_response).collect()))
}

#[derive(Deserialize)]
pub struct LegalMovesQuery {
    pub player: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalMovesResponse {
    pub turn: u8,
    /// Destination indices keyed by piece index; empty when the requester is
    /// not on turn.
    pub moves: BTreeMap<usize, Vec<usize>>,
}

/// Legal moves for the side to move, so clients can render movable pieces
/// without re-implementing the rules.
pub async fn legal_moves(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
    Query(query): Query<LegalMovesQuery>,
) -> Result<Json<LegalMovesResponse>, AppError> {
    let record = load_match(&pool, match_id).await?;
    let position = snapshot::decode(&record.board_state)?;

    let moves = match query.player {
        Some(player) if record.side_of(player) != Some(position.turn) => BTreeMap::new(),
        _ => movegen::legal_moves(&position),
    };

    Ok(Json(LegalMovesResponse {
        turn: position.turn.into(),
        moves,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RandomMoveResponse {
    pub from: usize,
    pub to: usize,
}

/// A uniformly random legal move for the side to move.
pub async fn random_move(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
) -> Result<Json<RandomMoveResponse>, AppError> {
    let record = load_match(&pool, match_id).await?;
    if record.status != STATUS_ACTIVE {
        return Err(AppError::InvalidState(format!(
            "Match {match_id} is not active"
        )));
    }
    let position = snapshot::decode(&record.board_state)?;
    let (from, to) = ai::random_move(&position, &mut rand::thread_rng())
        .ok_or_else(|| AppError::InvalidState("No legal move in this position".into()))?;
    Ok(Json(RandomMoveResponse { from, to }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub accepted: bool,
    pub board_state: String,
    pub next_turn: u8,
    pub captured: Vec<usize>,
    pub status: String,
    pub winner: Option<i64>,
}

/// The move transition: validate against the rules engine, persist through
/// the ply-guarded update, log the pre-move snapshot, and resolve a
/// terminal position in the same transaction.
pub async fn submit_move(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<MoveResponse>, AppError> {
    if req.from >= checkers_core::board::CELLS || req.to >= checkers_core::board::CELLS {
        return Err(AppError::BadRequest("Cell index out of range".into()));
    }

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

    let position = snapshot::decode(&record.board_state)?;
    if position.turn != side {
        return Err(AppError::IllegalMove("It is not your turn".into()));
    }

    let applied = moves::apply_move(&position, req.from, req.to)?;
    let next_board = snapshot::encode(&applied.position);

    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    if !matches::record_move(
        &mut *tx,
        match_id,
        record.current_ply,
        side,
        &next_board,
        applied.position.turn,
    )
    .await?
    {
        return Err(AppError::StaleTransition(
            "Another move was applied first".into(),
        ));
    }
    move_log::append(
        &mut *tx,
        match_id,
        record.current_ply,
        req.player,
        req.from as i32,
        req.to as i32,
        !applied.captured.is_empty(),
        &record.board_state,
    )
    .await?;

    let mut status = STATUS_ACTIVE.to_string();
    let mut winner = None;
    if moves::is_terminal(&applied.position) {
        if settle::complete_with_winner(&mut tx, &record, req.player).await? {
            status = matches::STATUS_COMPLETED.to_string();
            winner = Some(req.player);
        }
    }
    tx.commit().await.map_err(AppError::Sqlx)?;

    Ok(Json(MoveResponse {
        accepted: true,
        board_state: next_board,
        next_turn: applied.position.turn.into(),
        captured: applied.captured,
        status,
        winner,
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveLogResponse {
    pub ply: i32,
    pub player: i64,
    pub from_index: i32,
    pub to_index: i32,
    pub captured: bool,
    pub board_before: String,
    pub created_at: String,
}

pub async fn list_moves(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
) -> Result<Json<Vec<MoveLogResponse>>, AppError> {
    load_match(&pool, match_id).await?;
    let rows = move_log::list(&pool, match_id).await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| MoveLogResponse {
                ply: row.ply,
                player: row.player_id,
                from_index: row.from_index,
                to_index: row.to_index,
                captured: row.captured,
                board_before: row.board_before,
                created_at: row.created_at.to_rfc3339(),
            })
            .collect(),
    ))
}

/// Resignation is single-party and immediate: the other player wins.
pub async fn resign(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<MatchResponse>, AppError> {
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
    let winner_id = record
        .player_id_of(side.opponent())
        .ok_or_else(|| AppError::InvalidState("No opponent to resign to".into()))?;

    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    if !settle::complete_with_winner(&mut tx, &record, winner_id).await? {
        return Err(AppError::StaleTransition(
            "Match was already resolved".into(),
        ));
    }
    tx.commit().await.map_err(AppError::Sqlx)?;

    tracing::info!("Player {} resigned match {}", req.player, match_id);
    let record = load_match(&pool, match_id).await?;
    Ok(Json(match_to_response(&record)))
}

/// Cancel a waiting match, or an active one with no completed round; all
/// escrowed stakes come back in full.
pub async fn cancel(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
    Json(req): Json<PlayerRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let record = load_match(&pool, match_id).await?;
    if record.side_of(req.player).is_none() {
        return Err(AppError::BadRequest(format!(
            "Player {} is not in match {match_id}",
            req.player
        )));
    }

    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    if !settle::cancel_with_refund(&mut tx, &record).await? {
        return Err(AppError::StaleTransition(
            "Match state changed before the cancel applied".into(),
        ));
    }
    tx.commit().await.map_err(AppError::Sqlx)?;

    let record = load_match(&pool, match_id).await?;
    Ok(Json(match_to_response(&record)))
}
