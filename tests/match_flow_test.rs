//! Integration tests for the match lifecycle: create, join, moves, clocks.
//!
//! Requires the server to be running on localhost:8000.

mod common;

use serde_json::{json, Value};

const STARTING_BOARD: &str =
    "x.x.x.x./.x.x.x.x/x.x.x.x./......../......../o.o.o.o./.o.o.o.o/o.o.o.o. o";

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Full happy path: fund → create → join → legal moves → a move per side.
#[tokio::test]
async fn create_join_and_play() {
    let client = common::client();

    let player1 = common::unique_player();
    let player2 = player1 + 1;
    common::deposit(&client, player1, 1_000).await;
    common::deposit(&client, player2, 1_000).await;

    // ── Create ──────────────────────────────────────────────────────
    let created = common::create_match(&client, player1, 10, 300).await;
    assert_eq!(created["status"], "waiting");
    assert_eq!(created["player1"], player1);
    assert!(created["player2"].is_null());
    assert_eq!(created["currentPly"], 1);
    assert_eq!(created["boardState"], STARTING_BOARD);

    // Creator's stake (12 pieces worth) is escrowed immediately.
    assert_eq!(common::balance(&client, player1).await, 1_000 - 120);

    let match_id = created["id"].as_i64().unwrap();

    // ── Join ────────────────────────────────────────────────────────
    let resp = common::join_match(&client, match_id, player2).await;
    assert_eq!(resp.status(), 200, "Join should succeed");
    let joined: Value = resp.json().await.unwrap();
    assert_eq!(joined["status"], "active");
    assert_eq!(joined["player2"], player2);
    assert_eq!(common::balance(&client, player2).await, 1_000 - 120);

    // ── Legal moves ─────────────────────────────────────────────────
    let resp = client
        .get(common::url(&format!(
            "/api/matches/{match_id}/legal-moves?player={player1}"
        )))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let legal: Value = resp.json().await.unwrap();
    assert_eq!(legal["turn"], 1);
    // The four front-row men can move; a blocked back-row man cannot.
    assert_eq!(legal["moves"]["43"], json!([34, 36]));
    assert!(legal["moves"].get("57").is_none());

    // The opponent sees no movable pieces while it is not their turn.
    let resp = client
        .get(common::url(&format!(
            "/api/matches/{match_id}/legal-moves?player={player2}"
        )))
        .send()
        .await
        .unwrap();
    let legal: Value = resp.json().await.unwrap();
    assert_eq!(legal["moves"], json!({}));

    // ── Moves ───────────────────────────────────────────────────────
    // Moving out of turn is rejected before anything mutates.
    let resp = common::submit_move(&client, match_id, player2, 18, 27).await;
    assert_eq!(resp.status(), 400, "Out-of-turn move should be rejected");

    let resp = common::submit_move(&client, match_id, player1, 43, 34).await;
    assert_eq!(resp.status(), 200, "Legal move should be accepted");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["accepted"], true);
    assert_eq!(body["nextTurn"], 2);
    assert_eq!(body["captured"], json!([]));
    assert_eq!(body["status"], "active");

    let resp = common::submit_move(&client, match_id, player2, 18, 27).await;
    assert_eq!(resp.status(), 200);

    let state = common::get_match(&client, match_id).await;
    assert_eq!(state["currentPly"], 3);
    assert_eq!(state["turn"], 1);

    // ── Move log ────────────────────────────────────────────────────
    let resp = client
        .get(common::url(&format!("/api/matches/{match_id}/moves")))
        .send()
        .await
        .unwrap();
    let log: Value = resp.json().await.unwrap();
    let entries = log.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["ply"], 1);
    assert_eq!(entries[0]["fromIndex"], 43);
    assert_eq!(entries[0]["toIndex"], 34);
    assert_eq!(entries[0]["captured"], false);
    assert_eq!(entries[0]["boardBefore"], STARTING_BOARD);
}

/// A replayed ply loses the conditional update and surfaces as a conflict.
#[tokio::test]
async fn duplicate_move_submission_is_rejected() {
    let client = common::client();
    let (match_id, player1, _player2) = common::start_match(&client, 5, 300).await;

    let resp = common::submit_move(&client, match_id, player1, 43, 34).await;
    assert_eq!(resp.status(), 200);

    // Same player, same ply again: it is no longer their turn.
    let resp = common::submit_move(&client, match_id, player1, 41, 32).await;
    assert_eq!(resp.status(), 400, "Second submission is out of turn");
}

/// Illegal destinations are rejected with no state change.
#[tokio::test]
async fn illegal_moves_are_rejected() {
    let client = common::client();
    let (match_id, player1, _player2) = common::start_match(&client, 5, 300).await;

    // Backwards step for a man.
    let resp = common::submit_move(&client, match_id, player1, 43, 52).await;
    assert_eq!(resp.status(), 400);

    // Light square.
    let resp = common::submit_move(&client, match_id, player1, 43, 35).await;
    assert_eq!(resp.status(), 400);

    // Out of range.
    let resp = common::submit_move(&client, match_id, player1, 43, 99).await;
    assert_eq!(resp.status(), 400);

    let state = common::get_match(&client, match_id).await;
    assert_eq!(state["currentPly"], 1, "Nothing should have been applied");
}

/// Resignation completes the match and pays the opponent the pot minus fee.
#[tokio::test]
async fn resign_pays_the_opponent() {
    let client = common::client();
    let (match_id, player1, player2) = common::start_match(&client, 10, 300).await;

    let before = common::balance(&client, player2).await;
    let state = common::get_match(&client, match_id).await;
    let fee = state["platformFee"].as_i64().unwrap();

    let resp = client
        .post(common::url(&format!("/api/matches/{match_id}/resign")))
        .json(&json!({ "player": player1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "completed");
    assert_eq!(body["winner"], player2);

    // Winner takes both 120 escrows minus the fee.
    assert_eq!(
        common::balance(&client, player2).await,
        before + 240 - fee
    );

    // A second resignation finds the match already resolved.
    let resp = client
        .post(common::url(&format!("/api/matches/{match_id}/resign")))
        .json(&json!({ "player": player2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422, "Resign needs an active match");
}

/// Presence heartbeats negotiate the clock driver; ticks charge from server
/// time.
#[tokio::test]
async fn presence_and_tick() {
    let client = common::client();
    let (match_id, player1, player2) = common::start_match(&client, 5, 300).await;

    // First heartbeat: only player1 is present, so player1 drives.
    let resp = client
        .post(common::url(&format!("/api/matches/{match_id}/presence")))
        .json(&json!({ "player": player1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["driver"], "player1");

    // Both present: the player on turn (player1 at ply 1) drives.
    let resp = client
        .post(common::url(&format!("/api/matches/{match_id}/presence")))
        .json(&json!({ "player": player2 }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["driver"], "player1");

    // The driver may tick; the opening ply pair is untimed so nothing is
    // charged yet.
    let resp = client
        .post(common::url(&format!("/api/matches/{match_id}/tick")))
        .json(&json!({ "player": player1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["player1TimeRemaining"], 300);
    assert_eq!(body["player2TimeRemaining"], 300);
    assert_eq!(body["status"], "active");

    // The non-driver is turned away.
    let resp = client
        .post(common::url(&format!("/api/matches/{match_id}/tick")))
        .json(&json!({ "player": player2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422, "Only the negotiated driver ticks");
}
