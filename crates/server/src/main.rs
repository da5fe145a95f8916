use server::config;
use server::db;
use server::presence::PresenceRegistry;
use server::routes;
use server::sweep;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::Config::from_env();

    // Connect to Postgres
    tracing::info!("Connecting to database...");
    let pool = db::pool::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    // Run schema migrations
    tracing::info!("Running migrations...");
    db::pool::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    // Presence registry feeding the clock driver negotiation
    let presence = Arc::new(PresenceRegistry::new(Duration::from_secs(
        config.presence_ttl_seconds,
    )));

    // Background sweep: advances timers and resolves timeouts for matches
    // with no connected clients
    tokio::spawn(sweep::run(
        pool.clone(),
        presence.clone(),
        config.clone(),
    ));

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router — order matters: specific routes before parameterized
    let app = Router::new()
        // Health
        .route("/health", get(routes::health::health_check))
        // Wallet
        .route("/api/wallet/{player_id}", get(routes::wallet::get_balance))
        .route("/api/wallet/{player_id}/deposit", post(routes::wallet::deposit))
        // Matchmaking + lifecycle
        .route(
            "/api/matches",
            post(routes::matches::create_match).get(routes::matches::list_matches),
        )
        .route("/api/matches/matchmake", post(routes::matches::matchmake))
        .route("/api/matches/{match_id}", get(routes::matches::get_match))
        .route("/api/matches/{match_id}/join", post(routes::matches::join_match))
        // Gameplay
        .route(
            "/api/matches/{match_id}/legal-moves",
            get(routes::matches::legal_moves),
        )
        .route(
            "/api/matches/{match_id}/random-move",
            get(routes::matches::random_move),
        )
        .route(
            "/api/matches/{match_id}/moves",
            post(routes::matches::submit_move).get(routes::matches::list_moves),
        )
        .route("/api/matches/{match_id}/resign", post(routes::matches::resign))
        .route("/api/matches/{match_id}/cancel", post(routes::matches::cancel))
        // Offers
        .route(
            "/api/matches/{match_id}/offers",
            post(routes::offers::create_offer).get(routes::offers::list_offers),
        )
        .route("/api/offers/{offer_id}/respond", post(routes::offers::respond))
        // Presence + clock
        .route(
            "/api/matches/{match_id}/presence",
            post(routes::presence::heartbeat),
        )
        .route("/api/matches/{match_id}/tick", post(routes::presence::tick))
        // Shared state
        .layer(Extension(pool))
        .layer(Extension(config.clone()))
        .layer(Extension(presence))
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server error");
}
