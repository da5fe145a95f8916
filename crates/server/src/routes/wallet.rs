use axum::{extract::Path, Extension, Json};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::wallet;
use crate::error::AppError;

#[derive(Deserialize)]
pub struct DepositRequest {
    pub amount: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub player_id: i64,
    pub balance: i64,
}

pub async fn get_balance(
    Extension(pool): Extension<PgPool>,
    Path(player_id): Path<i64>,
) -> Result<Json<BalanceResponse>, AppError> {
    let balance = wallet::balance(&pool, player_id).await?.unwrap_or(0);
    Ok(Json(BalanceResponse { player_id, balance }))
}

/// Dev/ops seam for funding accounts; payment-provider integration lives
/// outside this service.
pub async fn deposit(
    Extension(pool): Extension<PgPool>,
    Path(player_id): Path<i64>,
    Json(req): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, AppError> {
    if req.amount <= 0 {
        return Err(AppError::BadRequest("Deposit must be positive".into()));
    }
    wallet::credit(&pool, player_id, req.amount).await?;
    let balance = wallet::balance(&pool, player_id).await?.unwrap_or(0);
    tracing::info!("Player {} deposited {}", player_id, req.amount);
    Ok(Json(BalanceResponse { player_id, balance }))
}
