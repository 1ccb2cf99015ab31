//! HTTP routes exercised in-process.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use forchette::{AppState, MemoryStore, SessionService, router};
use forchette_core::SessionConfig;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app() -> Router {
    let service = SessionService::new(Arc::new(MemoryStore::new()));
    router(AppState::new(service, SessionConfig::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

fn two_by_two() -> Value {
    json!({
        "round_count": 2,
        "participant_count": 2,
        "round_names": ["Pizza Place", "Sushi Bar"],
        "participant_names": ["Alice", "Bob"]
    })
}

fn vote(round: usize, participant: usize, score: i32, bonus: bool) -> Value {
    json!({
        "round": round,
        "participant": participant,
        "scores": {"food": score, "service": score, "location": score, "bill": score},
        "wants_bonus": bonus
    })
}

#[tokio::test]
async fn test_full_session_over_http() {
    let app = app();

    let (status, body) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"session_id": "DINNER", "owner_id": "alice", "config": two_by_two()})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["phase"], "setup");

    let (status, body) = send(&app, "POST", "/sessions/DINNER/start", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "active");

    let (status, body) = send(&app, "GET", "/sessions/DINNER/slot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slot"], json!({"round": 0, "participant": 0}));
    assert_eq!(body["round_name"], "Pizza Place");
    assert_eq!(body["participant_name"], "Alice");

    for (round, participant, score, bonus) in
        [(0, 0, 10, true), (0, 1, 5, false), (1, 0, 5, false), (1, 1, 5, false)]
    {
        let (status, body) = send(
            &app,
            "POST",
            "/sessions/DINNER/votes",
            Some(vote(round, participant, score, bonus)),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "vote {round}:{participant}: {body}");
    }

    let (status, body) = send(&app, "GET", "/sessions/DINNER/ranking", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([{"name": "Pizza Place", "score": 65}, {"name": "Sushi Bar", "score": 40}])
    );

    let (_, body) = send(&app, "GET", "/sessions/DINNER", None).await;
    assert_eq!(body["phase"], "complete");
    assert_eq!(body["winner"], "Pizza Place");

    let (_, body) = send(&app, "POST", "/sessions/DINNER/reveal", None).await;
    assert_eq!(body["reveal_index"], 1);

    let (status, body) = send(
        &app,
        "POST",
        "/sessions/DINNER/reset",
        Some(json!({"keep_config": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "setup");
    assert_eq!(body["config"]["round_names"], json!(["Pizza Place", "Sushi Bar"]));
}

#[tokio::test]
async fn test_vote_response_carries_total() {
    let app = app();
    send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"session_id": "S", "config": two_by_two()})),
    )
    .await;
    send(&app, "POST", "/sessions/S/start", None).await;

    let (status, body) = send(&app, "POST", "/sessions/S/votes", Some(vote(0, 0, 8, true))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vote"]["total"], 37);
    assert_eq!(body["session"]["cursor"]["participant"], 1);
}

#[tokio::test]
async fn test_error_statuses() {
    let app = app();

    let (status, body) = send(&app, "GET", "/sessions/NOPE", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let create = json!({"session_id": "S", "config": two_by_two()});
    send(&app, "POST", "/sessions", Some(create.clone())).await;
    let (status, body) = send(&app, "POST", "/sessions", Some(create)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_exists");

    let (status, body) = send(&app, "GET", "/sessions/S/ranking", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "invalid_phase");

    let mut bad = two_by_two();
    bad["participant_count"] = json!(9);
    let (status, body) =
        send(&app, "PUT", "/sessions/S/config", Some(json!({"config": bad}))).await;
    assert_eq!(status, StatusCode::OK, "drafts are stored unvalidated: {body}");
    let (status, body) = send(&app, "POST", "/sessions/S/start", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "out_of_bounds");

    send(&app, "PUT", "/sessions/S/config", Some(json!({"config": two_by_two()}))).await;
    send(&app, "POST", "/sessions/S/start", None).await;

    let (status, body) = send(&app, "POST", "/sessions/S/votes", Some(vote(1, 0, 5, false))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "slot_mismatch");

    let (status, body) = send(&app, "POST", "/sessions/S/votes", Some(vote(0, 0, 11, false))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "score_out_of_range");
}

#[tokio::test]
async fn test_create_without_config_uses_server_draft() {
    let app = app();
    let (status, body) = send(&app, "POST", "/sessions", Some(json!({"session_id": "D"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["config"]["round_count"], 4);
    assert_eq!(body["owner_id"], Value::Null);
}

#[tokio::test]
async fn test_session_codes_match_loosely() {
    let app = app();
    let (status, _) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"session_id": " ab c1 ", "config": two_by_two()})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/sessions/abc1/start", None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) = send(&app, "GET", "/sessions/ABC1/slot", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["participant_name"], "Alice");

    let (status, body) = send(&app, "POST", "/sessions", Some(json!({"session_id": "  "}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_session_id");
}
