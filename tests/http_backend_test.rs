//! HttpBackend 集成测试：本地 axum 服务模拟对话后端

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parley::backend::{ChatBackend, ChatRequest, HttpBackend, TransportError};
use parley::core::{HealthMonitor, HealthStatus, RequestOrchestrator, Role, SendOutcome};
use parley::store::{ConversationStore, FileStore};
use parley::ui::{AlwaysConfirm, WatchPresenter};
use serde_json::{json, Value};

type Received = Arc<Mutex<Vec<Value>>>;

async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn chat(State(received): State<Received>, Json(body): Json<Value>) -> Json<Value> {
    received.lock().unwrap().push(body);
    Json(json!({
        "response": "127.5",
        "conversation_id": "abc123",
        "timestamp": "2024-05-01T10:20:30.123456",
        "metadata": null,
    }))
}

async fn clear(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    if id == "abc123" {
        Ok(Json(json!({"message": "Conversation cleared", "conversation_id": id})))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn history(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    if id == "abc123" {
        Ok(Json(json!({
            "conversation_id": id,
            "messages": [
                {"role": "user", "content": "Calculate 15% of 850"},
                {"role": "assistant", "content": "127.5"},
            ],
        })))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

fn healthy_app(received: Received) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/chat/clear/:id", delete(clear))
        .route("/chat/history/:id", get(history))
        .route(
            "/health",
            get(|| async {
                Json(json!({"status": "healthy", "ollama_connected": true, "model": "phi3:latest"}))
            }),
        )
        .with_state(received)
}

fn broken_app() -> Router {
    Router::new()
        .route(
            "/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/chat/history/:id", get(|| async { "not json" }))
        .route(
            "/health",
            get(|| async { Json(json!({"status": "model_not_found", "ollama_connected": false})) }),
        )
}

#[tokio::test]
async fn test_chat_round_trip_over_http() {
    let received: Received = Arc::default();
    let base = spawn_server(healthy_app(received.clone())).await;
    let backend = HttpBackend::new(&base, 5, 5);

    let reply = backend
        .chat(&ChatRequest::new("Calculate 15% of 850", None))
        .await
        .unwrap();
    assert_eq!(reply.response, "127.5");
    assert_eq!(reply.conversation_id, "abc123");
    assert!(reply.server_time().is_some());

    let bodies = received.lock().unwrap().clone();
    assert_eq!(
        bodies,
        vec![json!({"message": "Calculate 15% of 850", "conversation_id": null, "stream": false})]
    );
}

#[tokio::test]
async fn test_clear_history_and_health_over_http() {
    let base = spawn_server(healthy_app(Arc::default())).await;
    let backend = HttpBackend::new(&base, 5, 5);

    backend.clear("abc123").await.unwrap();
    assert_eq!(
        backend.clear("missing").await.unwrap_err(),
        TransportError::Status(404)
    );

    let history = backend.history("abc123").await.unwrap();
    assert_eq!(history.messages.len(), 2);
    assert!(backend.history("missing").await.unwrap_err().is_not_found());

    let health = backend.health().await.unwrap();
    assert!(health.is_model_ready());
    assert_eq!(health.model.as_deref(), Some("phi3:latest"));
}

#[tokio::test]
async fn test_error_responses_are_classified() {
    let base = spawn_server(broken_app()).await;
    let backend = HttpBackend::new(&base, 5, 5);

    assert_eq!(
        backend.chat(&ChatRequest::new("hi", None)).await.unwrap_err(),
        TransportError::Status(500)
    );
    assert!(matches!(
        backend.history("x").await.unwrap_err(),
        TransportError::Malformed(_)
    ));

    // 缺少 model 字段仍可解析；ollama_connected=false → 降级
    let health = backend.health().await;
    assert!(!health.as_ref().unwrap().is_model_ready());
    assert_eq!(HealthStatus::from_probe(&health), HealthStatus::Degraded);
}

#[tokio::test]
async fn test_slow_backend_times_out() {
    let app = Router::new().route(
        "/chat",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    );
    let base = spawn_server(app).await;
    let backend = HttpBackend::new(&base, 1, 1);

    assert_eq!(
        backend.chat(&ChatRequest::new("hi", None)).await.unwrap_err(),
        TransportError::Timeout
    );
}

#[tokio::test]
async fn test_full_stack_send_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let base = spawn_server(healthy_app(Arc::default())).await;
    let backend = Arc::new(HttpBackend::new(&base, 5, 5));
    let (presenter, state_rx) = WatchPresenter::new();
    let presenter = Arc::new(presenter);

    let orch = RequestOrchestrator::new(
        backend.clone(),
        Arc::new(FileStore::new(&path, "conversation_id")),
        presenter.clone(),
        Arc::new(AlwaysConfirm),
    );
    let monitor = HealthMonitor::new(backend, presenter, Duration::from_secs(30));
    assert_eq!(monitor.probe().await, HealthStatus::Connected);

    let outcome = orch.send_message("Calculate 15% of 850").await;
    assert_eq!(
        outcome,
        SendOutcome::Delivered {
            conversation_id: "abc123".into()
        }
    );
    assert_eq!(
        FileStore::new(&path, "conversation_id").load().as_deref(),
        Some("abc123")
    );

    let state = state_rx.borrow().clone();
    assert_eq!(state.health, HealthStatus::Connected);
    assert_eq!(state.count(Role::User), 1);
    assert_eq!(state.transcript[1].content, "127.5");
}

#[tokio::test]
async fn test_offline_backend_reports_offline() {
    // 绑定后立即释放端口，保证无人监听
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = Arc::new(HttpBackend::new(&format!("http://{}", addr), 2, 2));
    let (presenter, _rx) = WatchPresenter::new();
    let monitor = HealthMonitor::new(backend, Arc::new(presenter), Duration::from_secs(30));
    assert_eq!(monitor.probe().await, HealthStatus::Offline);
}

#[tokio::test]
async fn test_null_model_flag_is_degraded_not_offline() {
    let app = Router::new().route(
        "/health",
        get(|| async {
            Json(json!({"status": "healthy", "ollama_connected": null, "model": "phi3"}))
        }),
    );
    let base = spawn_server(app).await;
    let backend = HttpBackend::new(&base, 5, 5);

    let health = backend.health().await;
    assert_eq!(health.as_ref().unwrap().model.as_deref(), Some("phi3"));
    assert_eq!(HealthStatus::from_probe(&health), HealthStatus::Degraded);
}

#[tokio::test]
async fn test_conversation_id_with_reserved_chars_stays_one_segment() {
    let app = Router::new()
        .route(
            "/chat/history/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({"conversation_id": id, "messages": []}))
            }),
        )
        .route(
            "/chat/clear/:id",
            delete(|Path(id): Path<String>| async move {
                if id == "team/a?b#c" {
                    StatusCode::OK
                } else {
                    StatusCode::NOT_FOUND
                }
            }),
        );
    let base = spawn_server(app).await;
    let backend = HttpBackend::new(&base, 5, 5);

    let history = backend.history("team/a?b#c").await.unwrap();
    assert_eq!(history.conversation_id, "team/a?b#c");
    backend.clear("team/a?b#c").await.unwrap();
}
