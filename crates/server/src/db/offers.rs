//! Draw, takeback, and rematch offers: created by one player, resolved by
//! the other, immutable once resolved.

use sqlx::PgExecutor;

use crate::error::AppError;

pub const KIND_DRAW: &str = "draw";
pub const KIND_TAKEBACK: &str = "takeback";
pub const KIND_REMATCH: &str = "rematch";

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_DECLINED: &str = "declined";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OfferRow {
    pub id: i64,
    pub match_id: i64,
    pub kind: String,
    pub from_player: i64,
    pub to_player: i64,
    pub status: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Create a pending offer. A partial unique index allows at most one pending
/// offer per kind per match; hitting it means one is already on the table.
pub async fn create<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    kind: &str,
    from_player: i64,
    to_player: i64,
) -> Result<i64, AppError> {
    let row: Result<(i64,), sqlx::Error> = sqlx::query_as(
        r#"INSERT INTO match_offers (match_id, kind, from_player, to_player)
           VALUES ($1, $2, $3, $4)
           RETURNING id"#,
    )
    .bind(match_id)
    .bind(kind)
    .bind(from_player)
    .bind(to_player)
    .fetch_one(executor)
    .await;

    match row {
        Ok((id,)) => Ok(id),
        Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => Err(
            AppError::InvalidState(format!("A {kind} offer is already pending on this match")),
        ),
        Err(e) => Err(AppError::Sqlx(e)),
    }
}

pub async fn get<'e, E: PgExecutor<'e>>(
    executor: E,
    offer_id: i64,
) -> Result<Option<OfferRow>, AppError> {
    sqlx::query_as::<_, OfferRow>(
        r#"SELECT id, match_id, kind, from_player, to_player, status, created_at, resolved_at
           FROM match_offers WHERE id = $1"#,
    )
    .bind(offer_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::Sqlx)
}

/// Flip a pending offer to accepted/declined. Zero rows affected means the
/// other party's resolution (or a second click) won the race.
pub async fn resolve<'e, E: PgExecutor<'e>>(
    executor: E,
    offer_id: i64,
    status: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"UPDATE match_offers SET
            status = $2,
            resolved_at = NOW()
        WHERE id = $1 AND status = 'pending'"#,
    )
    .bind(offer_id)
    .bind(status)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

pub async fn list_for_match<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
) -> Result<Vec<OfferRow>, AppError> {
    sqlx::query_as::<_, OfferRow>(
        r#"SELECT id, match_id, kind, from_player, to_player, status, created_at, resolved_at
           FROM match_offers WHERE match_id = $1 ORDER BY id"#,
    )
    .bind(match_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::Sqlx)
}
