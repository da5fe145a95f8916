//! Balance ledger the lifecycle transitions settle against.
//!
//! Every function takes a `PgExecutor` so a transition can run its money
//! movement inside the same transaction as the state change; a failed escrow
//! rolls the whole transition back.

use sqlx::PgExecutor;

use crate::error::AppError;

pub async fn ensure_account<'e, E: PgExecutor<'e>>(
    executor: E,
    player_id: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO wallet_accounts (player_id) VALUES ($1) ON CONFLICT (player_id) DO NOTHING",
    )
    .bind(player_id)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(())
}

pub async fn balance<'e, E: PgExecutor<'e>>(
    executor: E,
    player_id: i64,
) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT balance FROM wallet_accounts WHERE player_id = $1")
            .bind(player_id)
            .fetch_optional(executor)
            .await
            .map_err(AppError::Sqlx)?;
    Ok(row.map(|r| r.0))
}

/// Add funds, creating the account on first use.
pub async fn credit<'e, E: PgExecutor<'e>>(
    executor: E,
    player_id: i64,
    amount: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"INSERT INTO wallet_accounts (player_id, balance) VALUES ($1, $2)
           ON CONFLICT (player_id) DO UPDATE SET
               balance = wallet_accounts.balance + EXCLUDED.balance,
               updated_at = NOW()"#,
    )
    .bind(player_id)
    .bind(amount)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;
    Ok(())
}

/// Reserve `amount` from the player's balance. The decrement is conditional
/// on the balance covering it; zero rows affected means the player cannot
/// fund the stake and the caller's transaction must abort.
pub async fn escrow<'e, E: PgExecutor<'e>>(
    executor: E,
    player_id: i64,
    amount: i64,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"UPDATE wallet_accounts
           SET balance = balance - $2, updated_at = NOW()
           WHERE player_id = $1 AND balance >= $2"#,
    )
    .bind(player_id)
    .bind(amount)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    if result.rows_affected() == 0 {
        return Err(AppError::InsufficientFunds);
    }
    Ok(())
}
