use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use scoreboard_back::{
    config::AppConfig,
    dao::participant_table::memory::MemoryParticipantTable,
    routes,
    services::sync_service::{self, SyncHandle},
    state::{AppState, SharedState},
};

const CODE: &str = "2468";

fn degraded_app() -> (SharedState, Router) {
    let state = AppState::new(AppConfig::default().with_admin_code(CODE));
    let app = routes::router(state.clone());
    (state, app)
}

async fn connected_app() -> (SharedState, Router, SyncHandle) {
    let (state, app) = degraded_app();
    let table = Arc::new(MemoryParticipantTable::new());
    state.install_table(table.clone()).await;
    let sync = sync_service::start(&state, table);
    (state, app, sync)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Admin-Code", CODE);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn wait_for_participants(app: &Router, count: usize) -> Value {
    for _ in 0..100 {
        let (_, body) = send(app, get("/public/scoreboard")).await;
        if body["participants"].as_array().map(Vec::len) == Some(count) {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("scoreboard never reached {count} participants");
}

#[tokio::test]
async fn healthcheck_reports_degraded_without_a_table() {
    let (_state, app) = degraded_app();
    let (status, body) = send(&app, get("/healthcheck")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn healthcheck_reports_ok_once_connected() {
    let (_state, app, _sync) = connected_app().await;
    let (_, body) = send(&app, get("/healthcheck")).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn access_gate_accepts_only_the_shared_code() {
    let (_state, app) = degraded_app();

    let request = |code: &str| {
        Request::post("/admin/access")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "code": code }).to_string()))
            .unwrap()
    };

    let (status, body) = send(&app, request("0000")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["granted"], false);
    assert_eq!(body["message"], "Invalid code");
    assert_eq!(body["clear_after_ms"], 3000);

    let (status, body) = send(&app, request(CODE)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["granted"], true);
}

#[tokio::test]
async fn admin_routes_require_the_code_header() {
    let (_state, app) = degraded_app();

    let (status, _) = send(&app, get("/admin/participants")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::get("/admin/participants")
        .header("X-Admin-Code", "1111")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("Invalid code"));

    let (status, _) = send(&app, admin("GET", "/admin/participants", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn added_participants_appear_ranked_through_the_feed() {
    let (_state, app, _sync) = connected_app().await;

    for (name, round1) in [("A", json!(10)), ("B", json!(30)), ("C", json!(20.5))] {
        let (status, body) = send(
            &app,
            admin(
                "POST",
                "/admin/participants",
                Some(json!({ "name": name, "college": "Central", "round1": round1 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["id"].as_str().is_some());
    }

    let board = wait_for_participants(&app, 3).await;
    let rows: Vec<(String, u64, String)> = board["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| {
            (
                p["name"].as_str().unwrap().to_string(),
                p["rank"].as_u64().unwrap(),
                p["total_score_display"].as_str().unwrap().to_string(),
            )
        })
        .collect();

    assert_eq!(
        rows,
        vec![
            ("B".to_string(), 1, "30".to_string()),
            ("C".to_string(), 2, "20.5".to_string()),
            ("A".to_string(), 3, "10".to_string()),
        ]
    );
}

#[tokio::test]
async fn update_and_delete_flow_through_the_feed() {
    let (_state, app, _sync) = connected_app().await;

    let (_, created) = send(
        &app,
        admin(
            "POST",
            "/admin/participants",
            Some(json!({ "name": "Mira", "college": "East" })),
        ),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    wait_for_participants(&app, 1).await;

    let (status, _) = send(
        &app,
        admin(
            "PATCH",
            &format!("/admin/participants/{id}"),
            Some(json!({ "round4": 7.25 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let mut display = String::new();
    for _ in 0..100 {
        let (_, board) = send(&app, get("/public/scoreboard")).await;
        display = board["participants"][0]["total_score_display"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        if display == "7.3" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(display, "7.3");

    let (status, _) = send(
        &app,
        admin("DELETE", &format!("/admin/participants/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    wait_for_participants(&app, 0).await;
}

#[tokio::test]
async fn invalid_input_is_rejected_and_surfaced_as_the_latest_error() {
    let (_state, app, _sync) = connected_app().await;

    let (status, _) = send(
        &app,
        admin(
            "POST",
            "/admin/participants",
            Some(json!({ "name": "  ", "college": "East" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, board) = send(&app, get("/public/scoreboard")).await;
    assert!(
        board["error"]
            .as_str()
            .unwrap()
            .contains("validation failed")
    );
    assert_eq!(board["participants"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_participants_are_not_found() {
    let (_state, app, _sync) = connected_app().await;

    let (status, _) = send(
        &app,
        admin(
            "PATCH",
            "/admin/participants/nope",
            Some(json!({ "name": "Ghost" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, admin("DELETE", "/admin/participants/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn writes_fail_while_degraded() {
    let (_state, app) = degraded_app();

    let (status, _) = send(
        &app,
        admin(
            "POST",
            "/admin/participants",
            Some(json!({ "name": "X", "college": "Y" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = send(&app, admin("POST", "/admin/participants/reload", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (_, board) = send(&app, get("/public/scoreboard")).await;
    assert_eq!(board["degraded"], true);
    assert!(board["error"].is_string());
}

#[tokio::test]
async fn reveal_without_participants_stays_idle() {
    let (_state, app) = degraded_app();

    let (status, body) = send(&app, admin("POST", "/admin/reveal/start", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["started"], false);
    assert_eq!(body["reveal"]["phase"], "idle");

    let (_, reveal) = send(&app, get("/public/reveal")).await;
    assert_eq!(reveal["phase"], "idle");
}

#[tokio::test]
async fn reveal_starts_with_the_lowest_of_the_top_six_and_resets() {
    let (_state, app, _sync) = connected_app().await;

    for score in 1..=8 {
        send(
            &app,
            admin(
                "POST",
                "/admin/participants",
                Some(json!({ "name": format!("P{score}"), "college": "C", "round1": score })),
            ),
        )
        .await;
    }
    wait_for_participants(&app, 8).await;

    let (_, body) = send(&app, admin("POST", "/admin/reveal/start", None)).await;
    assert_eq!(body["started"], true);
    let reveal = &body["reveal"];
    assert_eq!(reveal["phase"], "playing");
    assert_eq!(reveal["step"], 0);
    assert_eq!(reveal["stage"], "spotlight");

    let entries = reveal["entries"].as_array().unwrap();
    let names: Vec<_> = entries.iter().map(|e| e["name"].as_str().unwrap()).collect();
    assert_eq!(names, ["P3", "P4", "P5", "P6", "P7", "P8"]);
    assert_eq!(entries[0]["visible"], true);
    assert_eq!(entries[1]["visible"], false);

    let (_, reset) = send(&app, admin("POST", "/admin/reveal/reset", None)).await;
    assert_eq!(reset["phase"], "idle");
    assert_eq!(reset["entries"].as_array().unwrap().len(), 0);
}
