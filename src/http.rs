//! HTTP API.
//!
//! Serves the channel tree under `/api` and, when enabled, Prometheus
//! metrics at `/metrics` on the same listener.

use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{Instrument, debug};

use crate::snapshot::{CacheStatus, SnapshotCache};
use crate::telemetry::spans;
use crate::tree::Channel;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub cache: SnapshotCache,
}

#[derive(Debug, Serialize)]
struct Message {
    message: String,
}

impl Message {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

async fn hello() -> Json<Message> {
    Message::new("Hello from the API!")
}

async fn hello_name(Path(name): Path<String>) -> Json<Message> {
    Message::new(format!("Hello, {}!", name))
}

async fn teamspeak() -> Json<Message> {
    Message::new("Hello Teamspeak")
}

/// Handler for GET /api/teamspeak/tree - root channels with nested
/// subchannels and clients.
async fn tree(State(state): State<AppState>) -> Json<Arc<Vec<Channel>>> {
    Json(state.cache.get_tree().await)
}

async fn status(State(state): State<AppState>) -> Json<CacheStatus> {
    Json(state.cache.status())
}

/// Handler for GET /metrics - returns Prometheus metrics in text format.
async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

async fn trace_request(request: Request, next: Next) -> Response {
    let span = spans::request(request.method().as_str(), request.uri().path());
    async move {
        let response = next.run(request).await;
        debug!(status = response.status().as_u16(), "Request completed");
        response
    }
    .instrument(span)
    .await
}

/// Build the application router.
pub fn router(state: AppState, metrics: bool) -> Router {
    let api = Router::new()
        .route("/hello", get(hello))
        .route("/hello/:name", get(hello_name))
        .route("/teamspeak", get(teamspeak))
        .route("/teamspeak/tree", get(tree))
        .route("/teamspeak/status", get(status));

    let mut app = Router::new().nest("/api", api);
    if metrics {
        app = app.route("/metrics", get(metrics_handler));
    }
    app.layer(middleware::from_fn(trace_request))
        .with_state(state)
}

/// Serve `app` on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    app: Router,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("HTTP server listening on {}", addr);
    }
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::source::SourceAdapter;
    use crate::tree::{FieldConvention, RawRecord};
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::time::Duration;

    struct StaticSource;

    #[async_trait]
    impl SourceAdapter for StaticSource {
        fn name(&self) -> &'static str {
            "static"
        }

        fn convention(&self) -> FieldConvention {
            FieldConvention::Query
        }

        async fn fetch_channels(&self) -> Result<Vec<RawRecord>, SourceError> {
            let records = json!([
                {"cid": "1", "pid": "0", "channel_order": "0", "channel_name": "Lobby"},
                {"cid": "2", "pid": "1", "channel_order": "0", "channel_name": "Games"},
            ]);
            Ok(serde_json::from_value(records)?)
        }

        async fn fetch_clients(&self) -> Result<Vec<RawRecord>, SourceError> {
            let records = json!([
                {"clid": "9", "cid": "2", "client_nickname": "bob", "client_type": "0"},
            ]);
            Ok(serde_json::from_value(records)?)
        }
    }

    async fn spawn_app(metrics: bool) -> String {
        let cache = SnapshotCache::new(Arc::new(StaticSource), Duration::from_secs(60));
        let app = router(AppState { cache }, metrics);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, app, std::future::pending()));
        format!("http://{}", addr)
    }

    async fn get_json(url: String) -> Value {
        reqwest::get(url).await.unwrap().json().await.unwrap()
    }

    #[tokio::test]
    async fn hello_routes() {
        let base = spawn_app(false).await;
        assert_eq!(
            get_json(format!("{base}/api/hello")).await,
            json!({"message": "Hello from the API!"})
        );
        assert_eq!(
            get_json(format!("{base}/api/hello/Ada")).await,
            json!({"message": "Hello, Ada!"})
        );
        assert_eq!(
            get_json(format!("{base}/api/teamspeak")).await,
            json!({"message": "Hello Teamspeak"})
        );
    }

    #[tokio::test]
    async fn tree_route_returns_nested_channels() {
        let base = spawn_app(false).await;
        let tree = get_json(format!("{base}/api/teamspeak/tree")).await;
        assert_eq!(
            tree,
            json!([{
                "id": 1,
                "name": "Lobby",
                "order": 0,
                "parentId": 0,
                "clients": [],
                "subchannels": [{
                    "id": 2,
                    "name": "Games",
                    "order": 0,
                    "parentId": 1,
                    "clients": [{"id": 9, "nickname": "bob"}],
                    "subchannels": [],
                }],
            }])
        );
    }

    #[tokio::test]
    async fn status_route_reports_cache() {
        let base = spawn_app(false).await;
        let before = get_json(format!("{base}/api/teamspeak/status")).await;
        assert_eq!(before["hasSnapshot"], false);
        assert_eq!(before["backend"], "static");

        get_json(format!("{base}/api/teamspeak/tree")).await;
        let after = get_json(format!("{base}/api/teamspeak/status")).await;
        assert_eq!(after["hasSnapshot"], true);
        assert_eq!(after["tree"]["channels"], 2);
    }

    #[tokio::test]
    async fn metrics_route_is_optional() {
        let base = spawn_app(false).await;
        let response = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);

        crate::metrics::init();
        let base = spawn_app(true).await;
        let response = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert!(response.status().is_success());
    }
}
