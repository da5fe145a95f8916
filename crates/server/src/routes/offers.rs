use axum::{extract::Path, Extension, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use checkers_core::{snapshot, Position};

use crate::config::Config;
use crate::db::matches::{self, STATUS_ACTIVE, STATUS_COMPLETED};
use crate::db::offers::{self, OfferRow};
use crate::db::{moves as move_log, wallet};
use crate::engine;
use crate::error::AppError;
use crate::routes::matches::{load_match, match_to_response, MatchResponse};
use crate::settle;

#[derive(Deserialize)]
pub struct CreateOfferRequest {
    pub player: i64,
    pub kind: String,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub player: i64,
    pub accept: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferResponse {
    pub id: i64,
    pub match_id: i64,
    pub kind: String,
    pub from_player: i64,
    pub to_player: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondResponse {
    pub offer: OfferResponse,
    /// The match the acceptance acted on: the drawn/rolled-back match, or
    /// the freshly created one for a rematch.
    pub match_state: Option<MatchResponse>,
}

fn offer_to_response(o: &OfferRow) -> OfferResponse {
    OfferResponse {
        id: o.id,
        match_id: o.match_id,
        kind: o.kind.clone(),
        from_player: o.from_player,
        to_player: o.to_player,
        status: o.status.clone(),
        created_at: o.created_at.to_rfc3339(),
    }
}

/// Open a draw, takeback, or rematch offer toward the opponent.
pub async fn create_offer(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<Json<OfferResponse>, AppError> {
    let record = load_match(&pool, match_id).await?;
    let Some(side) = record.side_of(req.player) else {
        return Err(AppError::BadRequest(format!(
            "Player {} is not in match {match_id}",
            req.player
        )));
    };
    let Some(opponent) = record.player_id_of(side.opponent()) else {
        return Err(AppError::InvalidState(
            "No opponent to make an offer to".into(),
        ));
    };

    match req.kind.as_str() {
        offers::KIND_DRAW => {
            if record.status != STATUS_ACTIVE {
                return Err(AppError::InvalidState(
                    "Draw offers need an active match".into(),
                ));
            }
        }
        offers::KIND_TAKEBACK => {
            if record.status != STATUS_ACTIVE {
                return Err(AppError::InvalidState(
                    "Takeback requests need an active match".into(),
                ));
            }
            if !engine::takeback_window_open(record.current_ply) {
                return Err(AppError::InvalidState(
                    "Not enough moves played to take back".into(),
                ));
            }
        }
        offers::KIND_REMATCH => {
            if record.status != STATUS_COMPLETED {
                return Err(AppError::InvalidState(
                    "Rematch offers need a completed match".into(),
                ));
            }
        }
        other => {
            return Err(AppError::BadRequest(format!("Unknown offer kind: {other}")));
        }
    }

    let offer_id = offers::create(&pool, match_id, &req.kind, req.player, opponent).await?;
    tracing::info!(
        "Player {} opened a {} offer on match {}",
        req.player,
        req.kind,
        match_id
    );
    let offer = offers::get(&pool, offer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer {offer_id} not found")))?;
    Ok(Json(offer_to_response(&offer)))
}

pub async fn list_offers(
    Extension(pool): Extension<PgPool>,
    Path(match_id): Path<i64>,
) -> Result<Json<Vec<OfferResponse>>, AppError> {
    load_match(&pool, match_id).await?;
    let rows = offers::list_for_match(&pool, match_id).await?;
    Ok(Json(rows.iter().map(offer_to_response).collect()))
}

/// Resolve a pending offer. Acceptance runs the gated side effect in one
/// transaction with the offer flip, so a lost race leaves nothing half-done.
pub async fn respond(
    Extension(pool): Extension<PgPool>,
    Extension(config): Extension<Config>,
    Path(offer_id): Path<i64>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<RespondResponse>, AppError> {
    let offer = offers::get(&pool, offer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer {offer_id} not found")))?;
    if offer.to_player != req.player {
        return Err(AppError::BadRequest(
            "Only the offer's recipient can respond".into(),
        ));
    }
    if offer.status != offers::STATUS_PENDING {
        return Err(AppError::StaleTransition(
            "Offer was already resolved".into(),
        ));
    }

    if !req.accept {
        let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
        if !offers::resolve(&mut *tx, offer_id, offers::STATUS_DECLINED).await? {
            return Err(AppError::StaleTransition(
                "Offer was already resolved".into(),
            ));
        }
        tx.commit().await.map_err(AppError::Sqlx)?;
        let offer = refreshed_offer(&pool, offer_id).await?;
        return Ok(Json(RespondResponse {
            offer,
            match_state: None,
        }));
    }

    let result = match offer.kind.as_str() {
        offers::KIND_DRAW => accept_draw(&pool, &offer).await,
        offers::KIND_TAKEBACK => accept_takeback(&pool, &offer).await,
        offers::KIND_REMATCH => accept_rematch(&pool, &config, &offer).await,
        other => Err(AppError::InvalidState(format!(
            "Unknown offer kind: {other}"
        ))),
    };

    match result {
        Ok(match_state) => {
            let offer = refreshed_offer(&pool, offer_id).await?;
            Ok(Json(RespondResponse {
                offer,
                match_state: Some(match_state),
            }))
        }
        Err(AppError::InsufficientFunds) => {
            // A rematch neither side can fund dies as a decline.
            let _ = offers::resolve(&pool, offer_id, offers::STATUS_DECLINED).await;
            Err(AppError::InsufficientFunds)
        }
        Err(e) => Err(e),
    }
}

async fn refreshed_offer(pool: &PgPool, offer_id: i64) -> Result<OfferResponse, AppError> {
    let offer = offers::get(pool, offer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Offer {offer_id} not found")))?;
    Ok(offer_to_response(&offer))
}

async fn accept_draw(pool: &PgPool, offer: &OfferRow) -> Result<MatchResponse, AppError> {
    let record = load_match(pool, offer.match_id).await?;

    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    if !offers::resolve(&mut *tx, offer.id, offers::STATUS_ACCEPTED).await? {
        return Err(AppError::StaleTransition(
            "Offer was already resolved".into(),
        ));
    }
    if !settle::complete_draw(&mut tx, &record).await? {
        return Err(AppError::StaleTransition(
            "Match was already resolved".into(),
        ));
    }
    tx.commit().await.map_err(AppError::Sqlx)?;

    let record = load_match(pool, offer.match_id).await?;
    Ok(match_to_response(&record))
}

/// Roll the match back two plies to the requester's turn, restoring the
/// snapshot stored on the move-log entry.
async fn accept_takeback(pool: &PgPool, offer: &OfferRow) -> Result<MatchResponse, AppError> {
    let record = load_match(pool, offer.match_id).await?;
    if record.status != STATUS_ACTIVE {
        return Err(AppError::InvalidState(
            "Takeback needs an active match".into(),
        ));
    }
    if !engine::takeback_window_open(record.current_ply) {
        return Err(AppError::InvalidState(
            "Not enough moves played to take back".into(),
        ));
    }

    let target_ply = record.current_ply - 2;
    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    if !offers::resolve(&mut *tx, offer.id, offers::STATUS_ACCEPTED).await? {
        return Err(AppError::StaleTransition(
            "Offer was already resolved".into(),
        ));
    }
    let board_before = move_log::board_before_ply(&mut *tx, record.id, target_ply)
        .await?
        .ok_or_else(|| {
            AppError::InvalidState(format!("No move log entry at ply {target_ply}"))
        })?;
    // The snapshot carries the side to move: the takeback requester.
    let restored = snapshot::decode(&board_before)?;
    if !matches::rollback_two_plies(
        &mut *tx,
        record.id,
        record.current_ply,
        &board_before,
        restored.turn,
    )
    .await?
    {
        return Err(AppError::StaleTransition(
            "A move landed before the takeback applied".into(),
        ));
    }
    move_log::delete_from_ply(&mut *tx, record.id, target_ply).await?;
    tx.commit().await.map_err(AppError::Sqlx)?;

    tracing::info!(
        "Takeback accepted on match {}, rolled back to ply {}",
        record.id,
        target_ply
    );
    let record = load_match(pool, offer.match_id).await?;
    Ok(match_to_response(&record))
}

/// Accepting a rematch escrows both stakes again and opens a fresh active
/// match with the colors swapped; a failed escrow aborts the lot.
async fn accept_rematch(
    pool: &PgPool,
    config: &Config,
    offer: &OfferRow,
) -> Result<MatchResponse, AppError> {
    let record = load_match(pool, offer.match_id).await?;
    if record.status != STATUS_COMPLETED {
        return Err(AppError::InvalidState(
            "Rematch needs a completed match".into(),
        ));
    }

    let escrow = engine::escrow_amount(record.stake_per_piece);
    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;
    if !offers::resolve(&mut *tx, offer.id, offers::STATUS_ACCEPTED).await? {
        return Err(AppError::StaleTransition(
            "Offer was already resolved".into(),
        ));
    }
    wallet::escrow(&mut *tx, offer.to_player, escrow).await?;
    wallet::escrow(&mut *tx, offer.from_player, escrow).await?;
    // Acceptor takes player 1; the offeror plays the other color.
    let new_match_id = matches::create_active(
        &mut *tx,
        &record.game_type,
        offer.to_player,
        offer.from_player,
        record.stake_per_piece,
        engine::pot_fee(record.stake_per_piece, config.platform_fee_bps),
        record.time_limit_seconds,
        &snapshot::encode(&Position::starting()),
    )
    .await?;
    tx.commit().await.map_err(AppError::Sqlx)?;

    tracing::info!(
        "Rematch of match {} accepted, new match {}",
        record.id,
        new_match_id
    );
    let new_record = load_match(pool, new_match_id).await?;
    Ok(match_to_response(&new_record))
}
