//! Integration test common infrastructure.
//!
//! Provides in-process fake upstreams (ServerQuery over TCP or SSH, WebQuery
//! over HTTP) and a helper that serves the API on an ephemeral port.

pub mod serverquery;
pub mod ssh;
pub mod webquery;

#[allow(unused_imports)]
pub use serverquery::FakeServerQuery;
#[allow(unused_imports)]
pub use ssh::FakeSshQuery;
#[allow(unused_imports)]
pub use webquery::FakeWebQuery;

use tokio::net::TcpListener;
use tsviewd::SnapshotCache;
use tsviewd::http::{self, AppState};

/// Serve the API for `cache` and return its base URL.
#[allow(dead_code)]
pub async fn spawn_app(cache: SnapshotCache) -> String {
    let app = http::router(AppState { cache }, false);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind API listener");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(http::serve(listener, app, std::future::pending()));
    format!("http://{}", addr)
}

/// GET `url` and decode the JSON body.
#[allow(dead_code)]
pub async fn get_json(url: &str) -> serde_json::Value {
    reqwest::get(url)
        .await
        .expect("Request failed")
        .json()
        .await
        .expect("Body was not JSON")
}
