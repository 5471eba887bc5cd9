use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::AiClient;
use heirloom_common::{Config, FixedWindowLimiter};
use heirloom_engine::{engine::EngineSettings, Engine};
use heirloom_store::{MemoryLockStore, MemoryStore, PostStore};

mod rest;

pub struct AppState {
    pub store: Arc<dyn PostStore>,
    pub engine: Engine,
    pub limiter: Mutex<FixedWindowLimiter>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("heirloom=info".parse()?))
        .init();

    let config = Config::from_env();

    let store: Arc<dyn PostStore> = Arc::new(MemoryStore::new());
    let lock_store = Arc::new(MemoryLockStore::new());
    let ai = Arc::new(AiClient::new(config.openai_api_key.clone()));
    let engine = Engine::new(
        store.clone(),
        lock_store,
        ai,
        EngineSettings::from_config(&config),
    );

    let limiter = rest::build_limiter(&config);

    let state = Arc::new(AppState {
        store,
        engine,
        limiter: Mutex::new(limiter),
    });

    let app = Router::new()
        .route("/health", get(rest::health))
        .route("/api/posts", get(rest::recent_posts))
        .route("/api/stats", get(rest::stats))
        .route("/api/jobs/classify", post(rest::trigger_classify))
        .route("/api/jobs/rate", post(rest::trigger_rate))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!(addr = %addr, "Starting API server");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
