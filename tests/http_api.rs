use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use clash_back::{
    config::AppConfig,
    dao::{content::ContentLibrary, tournament_store::MemoryTournamentStore},
    routes,
    services::tournament_service,
    state::tournament::{Challenge, Theme},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn content() -> Arc<ContentLibrary> {
    Arc::new(ContentLibrary::from_challenges((0..40).map(|i| Challenge {
        id: format!("c{i}"),
        theme: Theme::ALL[i % Theme::ALL.len()],
        prompt: format!("prompt {i}"),
        answer: format!("answer {i}"),
        metadata: None,
    })))
}

async fn app_with_store(store: MemoryTournamentStore) -> Router {
    let state = tournament_service::bootstrap(
        Arc::new(AppConfig::default()),
        content(),
        Arc::new(store),
    )
    .await
    .unwrap();
    routes::router(state)
}

async fn app() -> Router {
    app_with_store(MemoryTournamentStore::new()).await
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn find_match<'a>(state: &'a Value, id: &str) -> &'a Value {
    state["bracket"]
        .as_array()
        .unwrap()
        .iter()
        .find(|game| game["id"] == id)
        .unwrap()
}

#[tokio::test]
async fn state_lists_the_seeded_bracket() {
    let app = app().await;
    let (status, state) = get(&app, "/state").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(state["bracket"].as_array().unwrap().len(), 8);
    assert_eq!(state["leaderboard"].as_array().unwrap().len(), 8);
    assert_eq!(state["finalMatchId"], "final");
    assert_eq!(state["complete"], false);
    assert_eq!(find_match(&state, "g1")["status"], "pending");
    assert!(find_match(&state, "sf1")["teamA"].is_null());
}

#[tokio::test]
async fn start_match_draws_a_challenge_and_blocks_other_matches() {
    let app = app().await;

    let (status, game) = post(&app, "/start-match", json!({"matchId": "g1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["status"], "in_progress");
    assert!(game["currentChallenge"]["id"].is_string());

    let (status, _) = post(&app, "/start-match", json!({"matchId": "g2"})).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, state) = get(&app, "/state").await;
    assert_eq!(state["currentMatchId"], "g1");
    assert_eq!(find_match(&state, "g2")["status"], "pending");
}

#[tokio::test]
async fn unknown_match_is_not_found() {
    let app = app().await;
    let (status, body) = post(&app, "/start-match", json!({"matchId": "nope"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn malformed_commands_are_rejected() {
    let app = app().await;

    let (status, _) = post(&app, "/start-match", json!({"matchId": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/sfx", json!({"event": "Loud Noise!"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rounds_resolve_the_match_and_feed_the_semi_final() {
    let app = app().await;
    post(&app, "/start-match", json!({"matchId": "g1"})).await;

    let mut resolved = false;
    for _ in 0..3 {
        let (status, body) = post(
            &app,
            "/submit-round",
            json!({"matchId": "g1", "teamA": "correct", "teamB": "wrong"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        resolved = body["resolved"].as_bool().unwrap();
    }
    assert!(resolved);

    let (_, state) = get(&app, "/state").await;
    let g1 = find_match(&state, "g1");
    assert_eq!(g1["status"], "completed");
    assert_eq!(g1["winnerId"], g1["teamA"]["id"]);
    assert!(state["currentMatchId"].is_null());

    let winner = state["leaderboard"]
        .as_array()
        .unwrap()
        .iter()
        .find(|team| team["id"] == g1["winnerId"])
        .unwrap();
    assert_eq!(winner["score"], 2);

    let (status, _) = post(
        &app,
        "/submit-round",
        json!({"matchId": "g1", "teamA": "correct", "teamB": "wrong"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn single_side_submission_scores_one_team() {
    let app = app().await;
    post(&app, "/start-match", json!({"matchId": "g1"})).await;

    let (status, body) = post(
        &app,
        "/submit-challenge",
        json!({"matchId": "g1", "team": "B", "result": "correct"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resolved"], false);
    assert_eq!(body["match"]["score"]["teamA"], 0);
    assert_eq!(body["match"]["score"]["teamB"], 1);
    assert_eq!(body["match"]["score"]["currentChallenge"], 1);

    let (status, _) = post(
        &app,
        "/submit-challenge",
        json!({"matchId": "g1", "team": "C", "result": "correct"}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn manual_advance_requires_a_team_of_the_match() {
    let app = app().await;
    let (_, state) = get(&app, "/state").await;
    let team_b = find_match(&state, "g2")["teamB"]["id"].as_str().unwrap().to_string();

    let (status, _) = post(
        &app,
        "/advance",
        json!({"matchId": "g1", "winnerId": team_b}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, game) = post(
        &app,
        "/advance",
        json!({"matchId": "g2", "winnerId": team_b}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["winnerId"], team_b.as_str());
}

#[tokio::test]
async fn reset_match_rolls_back_a_completed_match() {
    let app = app().await;
    let (_, state) = get(&app, "/state").await;
    let winner = find_match(&state, "g1")["teamA"]["id"].as_str().unwrap().to_string();
    post(&app, "/advance", json!({"matchId": "g1", "winnerId": winner})).await;

    let (status, game) = post(&app, "/reset-match", json!({"matchId": "g1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["status"], "pending");
    assert!(game["winnerId"].is_null());
    assert_eq!(game["score"]["teamA"], 0);
    assert_eq!(game["score"]["currentChallenge"], 0);
}

#[tokio::test]
async fn reset_requires_confirmation() {
    let app = app().await;
    post(&app, "/start-match", json!({"matchId": "g1"})).await;

    let (status, _) = post(&app, "/reset", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, state) = post(&app, "/reset", json!({"confirm": true})).await;
    assert_eq!(status, StatusCode::OK);
    assert!(state["currentMatchId"].is_null());
    assert_eq!(find_match(&state, "g1")["status"], "pending");
}

#[tokio::test]
async fn override_score_rejects_unknown_teams() {
    let app = app().await;
    let (status, _) = post(
        &app,
        "/override-score",
        json!({"matchId": "g1", "leaderboardDelta": {"ghost": 3}}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, game) = post(
        &app,
        "/override-score",
        json!({"matchId": "g1", "teamAScore": 4}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(game["score"]["teamA"], 4);
}

#[tokio::test]
async fn export_returns_the_snapshot_as_text() {
    let app = app().await;
    let (status, body) = post(&app, "/export", Value::Null).await;
    assert_eq!(status, StatusCode::OK);

    let exported: Value = serde_json::from_str(body["state"].as_str().unwrap()).unwrap();
    assert_eq!(exported["bracket"].as_array().unwrap().len(), 8);
    assert!(body["exportedAt"].is_string());
}

#[tokio::test]
async fn health_reports_failed_saves() {
    let store = MemoryTournamentStore::new();
    let app = app_with_store(store.clone()).await;

    let (status, health) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");

    store.set_failing(true);
    let (status, _) = post(&app, "/start-match", json!({"matchId": "g1"})).await;
    assert_eq!(status, StatusCode::OK);

    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["status"], "degraded");

    store.set_failing(false);
    post(&app, "/next-challenge", json!({"matchId": "g1"})).await;
    let (_, health) = get(&app, "/health").await;
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = app().await;
    let (status, doc) = get(&app, "/api-doc/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/submit-round"].is_object());
}
