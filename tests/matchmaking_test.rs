//! Integration tests for matchmaking: criteria pairing and the join race.
//!
//! Requires the server to be running on localhost:8000.

mod common;

use serde_json::{json, Value};

async fn matchmake(client: &reqwest::Client, player: i64, stake: i64, time_limit: i64) -> Value {
    let resp = client
        .post(common::url("/api/matches/matchmake"))
        .json(&json!({
            "player": player,
            "stakePerPiece": stake,
            "timeLimitSeconds": time_limit,
        }))
        .send()
        .await
        .expect("Failed to send matchmake request");
    assert_eq!(resp.status(), 200, "Matchmake should succeed");
    resp.json().await.unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Identical criteria pair up; different criteria wait separately.
#[tokio::test]
async fn matchmake_pairs_identical_criteria_only() {
    let client = common::client();
    let player1 = common::unique_player();
    let player2 = player1 + 1;
    let player3 = player1 + 2;
    common::deposit(&client, player1, 10_000).await;
    common::deposit(&client, player2, 10_000).await;
    common::deposit(&client, player3, 10_000).await;

    // Unusual stake so concurrent test runs cannot pair with us.
    let stake = 7 + (player1 % 50);

    let first = matchmake(&client, player1, stake, 300).await;
    assert_eq!(first["status"], "waiting");
    let match_id = first["id"].as_i64().unwrap();

    // Different time limit: a new waiting match, not a pairing.
    let other = matchmake(&client, player2, stake, 600).await;
    assert_eq!(other["status"], "waiting");
    assert_ne!(other["id"].as_i64().unwrap(), match_id);

    // Identical criteria: lands in the first match as player 2.
    let paired = matchmake(&client, player3, stake, 300).await;
    assert_eq!(paired["id"].as_i64().unwrap(), match_id);
    assert_eq!(paired["status"], "active");
    assert_eq!(paired["player2"], player3);
}

/// A player is never matched into their own waiting match.
#[tokio::test]
async fn matchmake_never_self_matches() {
    let client = common::client();
    let player = common::unique_player();
    common::deposit(&client, player, 10_000).await;

    let stake = 7 + (player % 50);
    let first = matchmake(&client, player, stake, 300).await;
    let second = matchmake(&client, player, stake, 300).await;

    assert_eq!(second["status"], "waiting");
    assert_ne!(second["id"], first["id"]);
}

/// Two simultaneous joins on one waiting match: exactly one wins the seat,
/// the other sees the conflict.
#[tokio::test]
async fn concurrent_join_race_has_one_winner() {
    let client = common::client();
    let player1 = common::unique_player();
    let player2 = player1 + 1;
    let player3 = player1 + 2;
    common::deposit(&client, player1, 10_000).await;
    common::deposit(&client, player2, 10_000).await;
    common::deposit(&client, player3, 10_000).await;

    let created = common::create_match(&client, player1, 10, 300).await;
    let match_id = created["id"].as_i64().unwrap();

    let (resp_a, resp_b) = tokio::join!(
        common::join_match(&client, match_id, player2),
        common::join_match(&client, match_id, player3),
    );

    let statuses = [resp_a.status().as_u16(), resp_b.status().as_u16()];
    let wins = statuses.iter().filter(|&&s| s == 200).count();
    let conflicts = statuses.iter().filter(|&&s| s == 409 || s == 422).count();
    assert_eq!(wins, 1, "Exactly one joiner should win: got {statuses:?}");
    assert_eq!(conflicts, 1, "The other should lose the race: got {statuses:?}");

    // The losing racer's escrow rolled back with the failed transaction.
    let state = common::get_match(&client, match_id).await;
    assert_eq!(state["status"], "active");
    let seated = state["player2"].as_i64().unwrap();
    let loser = if seated == player2 { player3 } else { player2 };
    assert_eq!(common::balance(&client, loser).await, 10_000);

    // Joining an already-active match is rejected outright.
    let resp = common::join_match(&client, match_id, loser).await;
    assert_eq!(resp.status(), 422);
}

/// Joining your own waiting match is rejected.
#[tokio::test]
async fn cannot_join_own_match() {
    let client = common::client();
    let player = common::unique_player();
    common::deposit(&client, player, 10_000).await;

    let created = common::create_match(&client, player, 10, 300).await;
    let match_id = created["id"].as_i64().unwrap();

    let resp = common::join_match(&client, match_id, player).await;
    assert_eq!(resp.status(), 400);
}
