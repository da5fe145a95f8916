use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run the full Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Wallet ledger (one balance row per player)
CREATE TABLE IF NOT EXISTS wallet_accounts (
    player_id   BIGINT PRIMARY KEY,
    balance     BIGINT NOT NULL DEFAULT 0,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Matches (the one shared record every session converges on)
CREATE TABLE IF NOT EXISTS matches (
    id                     BIGSERIAL PRIMARY KEY,
    game_type              TEXT NOT NULL DEFAULT 'checkers',
    player1_id             BIGINT NOT NULL REFERENCES wallet_accounts(player_id),
    player2_id             BIGINT REFERENCES wallet_accounts(player_id),
    status                 TEXT NOT NULL DEFAULT 'waiting',
    stake_per_piece        BIGINT NOT NULL,
    platform_fee           BIGINT NOT NULL DEFAULT 0,
    time_limit_seconds     INTEGER NOT NULL,
    player1_time_remaining INTEGER NOT NULL,
    player2_time_remaining INTEGER NOT NULL,
    current_ply            INTEGER NOT NULL DEFAULT 1,
    turn                   SMALLINT NOT NULL DEFAULT 1,
    board_state            TEXT NOT NULL,
    winner_id              BIGINT,
    last_timer_tick        TIMESTAMPTZ,
    created_at             TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at             TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_matches_waiting
    ON matches (game_type, stake_per_piece, time_limit_seconds)
    WHERE status = 'waiting';
CREATE INDEX IF NOT EXISTS idx_matches_status     ON matches (status);
CREATE INDEX IF NOT EXISTS idx_matches_player1_id ON matches (player1_id);
CREATE INDEX IF NOT EXISTS idx_matches_player2_id ON matches (player2_id);

-- Draw / takeback / rematch offers
CREATE TABLE IF NOT EXISTS match_offers (
    id          BIGSERIAL PRIMARY KEY,
    match_id    BIGINT NOT NULL REFERENCES matches(id),
    kind        TEXT NOT NULL,
    from_player BIGINT NOT NULL,
    to_player   BIGINT NOT NULL,
    status      TEXT NOT NULL DEFAULT 'pending',
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    resolved_at TIMESTAMPTZ
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_match_offers_one_pending
    ON match_offers (match_id, kind)
    WHERE status = 'pending';
CREATE INDEX IF NOT EXISTS idx_match_offers_match_id ON match_offers (match_id);

-- Append-only move log; board_before snapshots make takeback possible
CREATE TABLE IF NOT EXISTS match_moves (
    id           BIGSERIAL PRIMARY KEY,
    match_id     BIGINT NOT NULL REFERENCES matches(id),
    ply          INTEGER NOT NULL,
    player_id    BIGINT NOT NULL,
    from_index   INTEGER NOT NULL,
    to_index     INTEGER NOT NULL,
    captured     BOOLEAN NOT NULL DEFAULT FALSE,
    board_before TEXT NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (match_id, ply)
);

CREATE INDEX IF NOT EXISTS idx_match_moves_match_id ON match_moves (match_id);
"#;
