//! Append-only move log. The stored pre-move snapshots are what make
//! takeback a lookup instead of a recomputation.

use sqlx::PgExecutor;

use crate::error::AppError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MoveRow {
    pub id: i64,
    pub match_id: i64,
    pub ply: i32,
    pub player_id: i64,
    pub from_index: i32,
    pub to_index: i32,
    pub captured: bool,
    pub board_before: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[allow(clippy::too_many_arguments)]
pub async fn append<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    ply: i32,
    player_id: i64,
    from_index: i32,
    to_index: i32,
    captured: bool,
    board_before: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO match_moves (
            match_id, ply, player_id, from_index, to_index, captured, board_before
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
    )
    .bind(match_id)
    .bind(ply)
    .bind(player_id)
    .bind(from_index)
    .bind(to_index)
    .bind(captured)
    .bind(board_before)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(())
}

pub async fn list<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
) -> Result<Vec<MoveRow>, AppError> {
    sqlx::query_as::<_, MoveRow>(
        r#"SELECT id, match_id, ply, player_id, from_index, to_index, captured,
                  board_before, created_at
           FROM match_moves WHERE match_id = $1 ORDER BY ply"#,
    )
    .bind(match_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::Sqlx)
}

/// The board as it stood before the given ply was played.
pub async fn board_before_ply<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    ply: i32,
) -> Result<Option<String>, AppError> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT board_before FROM match_moves WHERE match_id = $1 AND ply = $2",
    )
    .bind(match_id)
    .bind(ply)
    .fetch_optional(executor)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(row.map(|r| r.0))
}

/// Drop the rolled-back entries after a takeback so the ply index stays
/// truthful for the re-played moves.
pub async fn delete_from_ply<'e, E: PgExecutor<'e>>(
    executor: E,
    match_id: i64,
    ply: i32,
) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM match_moves WHERE match_id = $1 AND ply >= $2")
        .bind(match_id)
        .bind(ply)
        .execute(executor)
        .await
        .map_err(AppError::Sqlx)?;
    Ok(result.rows_affected())
}
