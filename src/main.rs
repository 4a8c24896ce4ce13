//! tsviewd - TeamSpeak channel tree snapshot service.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tsviewd::config::{self, Config, LogFormat};
use tsviewd::http::{self, AppState};
use tsviewd::{SnapshotCache, SourceAdapter, metrics, source};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let mut config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load {}", config_path))?;
    config.apply_env()?;

    init_tracing(config.log.format);

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s), see log for details",
            errors.len()
        ));
    }

    info!(
        backend = config.source.backend(),
        ttl_ms = config.cache.ttl_ms,
        address = %config.http.address,
        "Starting tsviewd"
    );

    if config.http.metrics {
        metrics::init();
    }

    let source = source::from_config(&config.source)?;
    let cache = SnapshotCache::new(Arc::clone(&source), config.cache.ttl());

    // Warm the cache so the first request does not wait on upstream. A
    // failure here is logged by the cache and retried on demand.
    {
        let cache = cache.clone();
        tokio::spawn(async move {
            let tree = cache.get_tree().await;
            if tree.is_empty() {
                warn!("Initial channel tree is empty");
            }
        });
    }

    let app = http::router(AppState { cache }, config.http.metrics);
    let listener = tokio::net::TcpListener::bind(config.http.address)
        .await
        .with_context(|| format!("failed to bind {}", config.http.address))?;

    http::serve(listener, app, shutdown_signal()).await?;
    source.close().await;
    info!("Shut down");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
