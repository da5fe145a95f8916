use reqwest::Client;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

pub const BASE_URL: &str = "http://localhost:8000";

/// Build a reqwest client for tests.
pub fn client() -> Client {
    Client::new()
}

/// Build a URL for an API endpoint.
pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}

/// Generate a unique player id from the timestamp to avoid collisions
/// between test runs.
pub fn unique_player() -> i64 {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    (ts % 1_000_000_000_000) as i64
}

/// Fund a player's wallet and return their balance.
pub async fn deposit(client: &Client, player: i64, amount: i64) -> i64 {
    let resp = client
        .post(url(&format!("/api/wallet/{player}/deposit")))
        .json(&json!({ "amount": amount }))
        .send()
        .await
        .expect("Failed to send deposit request");
    assert_eq!(resp.status(), 200, "Deposit should succeed");
    let body: Value = resp.json().await.unwrap();
    body["balance"].as_i64().unwrap()
}

pub async fn balance(client: &Client, player: i64) -> i64 {
    let resp = client
        .get(url(&format!("/api/wallet/{player}")))
        .send()
        .await
        .expect("Failed to send balance request");
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    body["balance"].as_i64().unwrap()
}

/// Create a waiting match and return its JSON.
pub async fn create_match(client: &Client, player: i64, stake: i64, time_limit: i64) -> Value {
    let resp = client
        .post(url("/api/matches"))
        .json(&json!({
            "player": player,
            "stakePerPiece": stake,
            "timeLimitSeconds": time_limit,
        }))
        .send()
        .await
        .expect("Failed to send create request");
    assert_eq!(resp.status(), 200, "Create match should succeed");
    resp.json().await.unwrap()
}

/// Join a specific match.
pub async fn join_match(client: &Client, match_id: i64, player: i64) -> reqwest::Response {
    client
        .post(url(&format!("/api/matches/{match_id}/join")))
        .json(&json!({ "player": player }))
        .send()
        .await
        .expect("Failed to send join request")
}

/// Fund two players and start an active match between them. Returns
/// (match_id, player1, player2).
pub async fn start_match(client: &Client, stake: i64, time_limit: i64) -> (i64, i64, i64) {
    let player1 = unique_player();
    let player2 = player1 + 1;
    deposit(client, player1, 10_000).await;
    deposit(client, player2, 10_000).await;

    let created = create_match(client, player1, stake, time_limit).await;
    let match_id = created["id"].as_i64().unwrap();

    let resp = join_match(client, match_id, player2).await;
    assert_eq!(resp.status(), 200, "Join should succeed");
    (match_id, player1, player2)
}

/// Submit a move and return the response.
pub async fn submit_move(
    client: &Client,
    match_id: i64,
    player: i64,
    from: i64,
    to: i64,
) -> reqwest::Response {
    client
        .post(url(&format!("/api/matches/{match_id}/moves")))
        .json(&json!({ "player": player, "from": from, "to": to }))
        .send()
        .await
        .expect("Failed to send move request")
}

pub async fn get_match(client: &Client, match_id: i64) -> Value {
    let resp = client
        .get(url(&format!("/api/matches/{match_id}")))
        .send()
        .await
        .expect("Failed to send get request");
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

/// Create an offer on a match and return its JSON.
pub async fn create_offer(client: &Client, match_id: i64, player: i64, kind: &str) -> Value {
    let resp = client
        .post(url(&format!("/api/matches/{match_id}/offers")))
        .json(&json!({ "player": player, "kind": kind }))
        .send()
        .await
        .expect("Failed to send offer request");
    assert_eq!(resp.status(), 200, "Offer creation should succeed");
    resp.json().await.unwrap()
}

/// Respond to an offer.
pub async fn respond_offer(
    client: &Client,
    offer_id: i64,
    player: i64,
    accept: bool,
) -> reqwest::Response {
    client
        .post(url(&format!("/api/offers/{offer_id}/respond")))
        .json(&json!({ "player": player, "accept": accept }))
        .send()
        .await
        .expect("Failed to send respond request")
}
