//! Fake WebQuery HTTP API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tsviewd::config::WebQueryConfig;

pub const API_KEY: &str = "test-api-key";

#[derive(Default)]
struct Shared {
    bodies: Mutex<HashMap<String, Value>>,
    requests: AtomicUsize,
    failing: Mutex<Option<StatusCode>>,
}

/// A running fake WebQuery API. Dropping it stops the server.
pub struct FakeWebQuery {
    addr: SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl FakeWebQuery {
    pub async fn spawn() -> Self {
        let shared = Arc::new(Shared::default());
        let app = Router::new()
            .route("/:sid/:command", get(handle))
            .with_state(Arc::clone(&shared));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake WebQuery");
        let addr = listener.local_addr().expect("No local address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            shared,
            handle,
        }
    }

    /// Serve `body` as the result of `command`.
    pub fn reply(&self, command: &str, body: Value) {
        self.shared
            .bodies
            .lock()
            .insert(command.to_string(), body);
    }

    /// Answer every request with a bare `status` and no envelope.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        *self.shared.failing.lock() = status;
    }

    pub fn requests(&self) -> usize {
        self.shared.requests.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> WebQueryConfig {
        WebQueryConfig {
            base_url: format!("http://{}", self.addr),
            api_key: API_KEY.to_string(),
            virtual_server: 1,
            timeout_ms: 2_000,
        }
    }
}

impl Drop for FakeWebQuery {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle(
    State(shared): State<Arc<Shared>>,
    Path((sid, command)): Path<(u32, String)>,
    headers: HeaderMap,
) -> Response {
    shared.requests.fetch_add(1, Ordering::SeqCst);

    let failing = *shared.failing.lock();
    if let Some(status) = failing {
        return (status, "upstream unavailable").into_response();
    }
    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        let envelope = json!({"status": {"code": 5122, "message": "invalid apikey"}});
        return (StatusCode::FORBIDDEN, Json(envelope)).into_response();
    }
    if sid != 1 {
        let envelope = json!({"status": {"code": 1024, "message": "invalid serverID"}});
        return (StatusCode::BAD_REQUEST, Json(envelope)).into_response();
    }

    let body = shared.bodies.lock().get(&command).cloned();
    let envelope = match body {
        Some(body) => json!({"body": body, "status": {"code": 0, "message": "ok"}}),
        None => json!({"status": {"code": 1281, "message": "database empty result set"}}),
    };
    Json(envelope).into_response()
}
