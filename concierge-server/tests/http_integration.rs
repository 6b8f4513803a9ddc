//! End-to-end tests for the Concierge HTTP API.
//!
//! Both providers are played by wiremock servers; requests go through the
//! full axum router via `oneshot`.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use concierge_core::ConciergeConfig;
use concierge_server::http::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{any, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    app: Router,
    state: Arc<AppState>,
}

/// Build the app against mock providers. `tavus` of `None` leaves the avatar
/// credential unset.
fn harness(browser_use: &MockServer, tavus: Option<&MockServer>, static_dir: Option<&str>) -> Harness {
    let tavus_key = tavus.map(|_| "tavus-key".to_string());
    let mut config = ConciergeConfig::load_with("does-not-exist.toml", |var| match var {
        "BROWSER_USE_API_KEY" => Some("bu-key".to_string()),
        "TAVUS_API_KEY" => tavus_key.clone(),
        _ => None,
    })
    .expect("config should load");

    config.browser_use.base_url = browser_use.uri();
    if let Some(server) = tavus {
        config.tavus.base_url = server.uri();
    }
    if let Some(dir) = static_dir {
        config.http.static_dir = dir.to_string();
    }

    let state = Arc::new(AppState::from_config(config).expect("state should build"));
    Harness {
        app: build_router(state.clone()),
        state,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn session_body(id: &str) -> Value {
    json!({
        "id": id,
        "liveUrl": format!("https://live.browser-use.com/{}", id),
        "status": "active"
    })
}

async fn mount_task_creation(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "task-1",
            "sessionId": "whatever"
        })))
        .mount(server)
        .await;
}

// ===========================================================================
// /api/run
// ===========================================================================

#[tokio::test]
async fn test_run_creates_then_reuses_active_session() {
    let browser_use = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .and(header("x-browser-use-api-key", "bu-key"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_body("sess-1")))
        .expect(1)
        .mount(&browser_use)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("sess-1")))
        .expect(2)
        .mount(&browser_use)
        .await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .and(body_json(json!({"task": "buy a red dress", "sessionId": "sess-1"})))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "task-42",
            "sessionId": "sess-1"
        })))
        .expect(3)
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);

    for _ in 0..3 {
        let (status, body) = call(&h.app, "POST", "/api/run", Some(json!({"task": "buy a red dress"}))).await;
        assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
        assert_eq!(
            body,
            json!({
                "taskId": "task-42",
                "sessionId": "sess-1",
                "liveUrl": "https://live.browser-use.com/sess-1"
            })
        );
    }
}

#[tokio::test]
async fn test_run_replaces_stopped_session() {
    let browser_use = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_body("sess-1")))
        .up_to_n_times(1)
        .mount(&browser_use)
        .await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_body("sess-2")))
        .mount(&browser_use)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/sess-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sess-1",
            "status": "stopped"
        })))
        .expect(1)
        .mount(&browser_use)
        .await;
    mount_task_creation(&browser_use).await;

    let h = harness(&browser_use, None, None);

    let (_, first) = call(&h.app, "POST", "/api/run", Some(json!({"task": "open amazon"}))).await;
    let (status, second) = call(&h.app, "POST", "/api/run", Some(json!({"task": "open ebay"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["sessionId"], "sess-1");
    assert_eq!(second["sessionId"], "sess-2");
    assert_ne!(first["liveUrl"], second["liveUrl"]);
    assert_eq!(h.state.sessions.active().await.unwrap().session_id, "sess-2");
}

#[tokio::test]
async fn test_run_survives_failed_session_lookup() {
    let browser_use = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_body("sess-1")))
        .up_to_n_times(1)
        .mount(&browser_use)
        .await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_body("sess-2")))
        .mount(&browser_use)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/sess-1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("lookup exploded"))
        .expect(1)
        .mount(&browser_use)
        .await;
    mount_task_creation(&browser_use).await;

    let h = harness(&browser_use, None, None);

    call(&h.app, "POST", "/api/run", Some(json!({"task": "search boots"}))).await;
    let (status, body) = call(&h.app, "POST", "/api/run", Some(json!({"task": "search hats"}))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["taskId"], "task-1");
    assert_eq!(body["sessionId"], "sess-2");
}

#[tokio::test]
async fn test_run_session_creation_failure_is_500_with_provider_body() {
    let browser_use = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(402).set_body_string("{\"detail\":\"Insufficient credits\"}"))
        .mount(&browser_use)
        .await;
    Mock::given(method("POST"))
        .and(path("/tasks"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);
    let (status, body) = call(&h.app, "POST", "/api/run", Some(json!({"task": "buy a red dress"}))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("402"), "detail: {}", detail);
    assert!(detail.contains("Insufficient credits"), "detail: {}", detail);
}

// ===========================================================================
// Passthrough endpoints
// ===========================================================================

#[tokio::test]
async fn test_task_passthrough_keeps_provider_fields() {
    let browser_use = MockServer::start().await;
    let provider_task = json!({
        "id": "task-7",
        "sessionId": "sess-1",
        "status": "finished",
        "output": "Top post: Show HN",
        "steps": [{"number": 1}],
        "doneOutput": "Top post: Show HN"
    });
    Mock::given(method("GET"))
        .and(path("/tasks/task-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(provider_task.clone()))
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);
    let (status, body) = call(&h.app, "GET", "/api/task/task-7", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, provider_task);
}

#[tokio::test]
async fn test_task_passthrough_error_is_500() {
    let browser_use = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tasks/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Task nope not found"))
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);
    let (status, body) = call(&h.app, "GET", "/api/task/nope", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("Task nope not found"));
}

#[tokio::test]
async fn test_session_passthrough() {
    let browser_use = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/sess-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_body("sess-5")))
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);
    let (status, body) = call(&h.app, "GET", "/api/session/sess-5", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, session_body("sess-5"));
}

#[tokio::test]
async fn test_stop_task() {
    let browser_use = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/tasks/task-3"))
        .and(body_json(json!({"action": "stop"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "task-3",
            "status": "stopped"
        })))
        .expect(1)
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);
    let (status, body) = call(&h.app, "POST", "/api/task/task-3/stop", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "stopped");
}

#[tokio::test]
async fn test_passthrough_keeps_explicit_nulls() {
    let browser_use = MockServer::start().await;
    let running_task = json!({
        "id": "task-8",
        "sessionId": "sess-2",
        "status": "running",
        "output": null
    });
    let headless_session = json!({
        "id": "sess-2",
        "status": "active",
        "liveUrl": null
    });
    Mock::given(method("GET"))
        .and(path("/tasks/task-8"))
        .respond_with(ResponseTemplate::new(200).set_body_json(running_task.clone()))
        .mount(&browser_use)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/sess-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(headless_session.clone()))
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);

    let (status, body) = call(&h.app, "GET", "/api/task/task-8", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, running_task);
    assert!(body.as_object().unwrap().contains_key("output"));

    let (status, body) = call(&h.app, "GET", "/api/session/sess-2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, headless_session);
    assert!(body.as_object().unwrap().contains_key("liveUrl"));
}

#[tokio::test]
async fn test_session_passthrough_error_is_500() {
    let browser_use = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/sessions/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Session gone not found"))
        .expect(1)
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);
    let (status, body) = call(&h.app, "GET", "/api/session/gone", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("Session gone not found"));
}

#[tokio::test]
async fn test_stop_task_error_is_500() {
    let browser_use = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/tasks/task-done"))
        .respond_with(ResponseTemplate::new(409).set_body_string("Task already finished"))
        .expect(1)
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);
    let (status, body) = call(&h.app, "POST", "/api/task/task-done/stop", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("Task already finished"));
}

// ===========================================================================
// /api/process_intent
// ===========================================================================

#[tokio::test]
async fn test_process_intent_makes_no_remote_call() {
    let browser_use = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/process_intent",
        Some(json!({"query": "buy a red dress"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "action");
    assert_eq!(body["task"], "buy a red dress");

    let (_, body) = call(
        &h.app,
        "POST",
        "/api/process_intent",
        Some(json!({"query": "I need a birthday outfit for winter"})),
    )
    .await;
    assert_eq!(body["type"], "conversation");
    assert!(body["message"].as_str().unwrap().starts_with("For a winter birthday party"));

    let (_, body) = call(&h.app, "POST", "/api/process_intent", Some(json!({"query": ""}))).await;
    assert_eq!(body, json!({"type": "conversation", "message": "I can help with that."}));
}

// ===========================================================================
// /api/tavus/*
// ===========================================================================

#[tokio::test]
async fn test_tavus_session_without_credential_makes_zero_calls() {
    let browser_use = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&browser_use)
        .await;

    let h = harness(&browser_use, None, None);
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/tavus/session",
        Some(json!({"replica_id": "r1"})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["detail"], "Tavus API Key not configured");

    let (status, _) = call(&h.app, "GET", "/api/tavus/replicas", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_tavus_session_sends_only_present_fields() {
    let browser_use = MockServer::start().await;
    let tavus = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .and(header("x-api-key", "tavus-key"))
        .and(body_json(json!({"replica_id": "r79e1c033f"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "c9",
            "conversation_url": "https://tavus.daily.co/c9",
            "status": "active"
        })))
        .expect(1)
        .mount(&tavus)
        .await;

    let h = harness(&browser_use, Some(&tavus), None);
    let (status, body) = call(&h.app, "POST", "/api/tavus/session", Some(json!({}))).await;

    assert_eq!(status, StatusCode::OK, "unexpected body: {}", body);
    assert_eq!(body["conversation_url"], "https://tavus.daily.co/c9");
}

#[tokio::test]
async fn test_tavus_provider_error_is_500_with_body() {
    let browser_use = MockServer::start().await;
    let tavus = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/conversations"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Invalid persona_id"})),
        )
        .mount(&tavus)
        .await;

    let h = harness(&browser_use, Some(&tavus), None);
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/tavus/session",
        Some(json!({"persona_id": "p-bad", "properties": {"max_call_duration": 60}})),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("Invalid persona_id"));
}

#[tokio::test]
async fn test_get_conversation() {
    let browser_use = MockServer::start().await;
    let tavus = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/conversations/c9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_id": "c9",
            "status": "ended"
        })))
        .mount(&tavus)
        .await;

    let h = harness(&browser_use, Some(&tavus), None);
    let (status, body) = call(&h.app, "GET", "/api/tavus/conversation/c9", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ended");
}

// ===========================================================================
// Static front-end and health
// ===========================================================================

#[tokio::test]
async fn test_root_serves_index_html() {
    let dir = std::env::temp_dir().join("concierge-static-root-test");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("index.html"), "<html><body>concierge</body></html>").unwrap();

    let browser_use = MockServer::start().await;
    let h = harness(&browser_use, None, Some(dir.to_str().unwrap()));

    let req = Request::builder().uri("/").body(Body::empty()).unwrap();
    let resp = h.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("concierge"));
}

#[tokio::test]
async fn test_health_reports_tracked_session() {
    let browser_use = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(session_body("sess-1")))
        .mount(&browser_use)
        .await;
    mount_task_creation(&browser_use).await;

    let h = harness(&browser_use, None, None);
    let (_, before) = call(&h.app, "GET", "/api/health", None).await;
    assert!(before["active_session"].is_null());

    call(&h.app, "POST", "/api/run", Some(json!({"task": "browse"}))).await;

    let (status, after) = call(&h.app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["active_session"]["sessionId"], "sess-1");
    assert_eq!(after["tavus_configured"], false);
}
