//! Bounty board API /v1: metadata resolution and document uploads
pub mod handlers;
pub mod metrics;
pub mod middleware;

use std::sync::Arc;

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use bounty_core::BoardConfig;
use bounty_metadata::{CodexBlobStore, MetadataUploader};
use tower_http::trace::TraceLayer;

use crate::metrics::ApiMetrics;

#[derive(Clone)]
pub struct AppState {
    pub uploader: MetadataUploader,
    pub metrics: Arc<ApiMetrics>,
    /// Labels written into uploaded documents
    pub platform: String,
    pub network: String,
}

impl AppState {
    pub fn new(uploader: MetadataUploader, config: &BoardConfig) -> anyhow::Result<Self> {
        Ok(Self {
            uploader,
            metrics: Arc::new(ApiMetrics::new().context("registering metrics")?),
            platform: config.contracts.platform.clone(),
            network: config.contracts.network.clone(),
        })
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/v1/metadata", get(handlers::get_metadata))
        .route("/v1/upload", post(handlers::upload_bounty).get(handlers::get_bounty))
        .route(
            "/v1/submission",
            post(handlers::upload_submission).get(handlers::get_submission),
        )
        .route("/v1/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors())
        .with_state(state)
}

pub async fn run(config: BoardConfig) -> anyhow::Result<()> {
    let store = CodexBlobStore::from_config(&config.storage).context("building storage client")?;
    let uploader = MetadataUploader::from_config(Arc::new(store), &config.storage);
    let app = create_app(AppState::new(uploader, &config)?);

    let listener = tokio::net::TcpListener::bind(&config.api.addr)
        .await
        .with_context(|| format!("binding {}", config.api.addr))?;

    tracing::info!(addr = %config.api.addr, storage = %config.storage.endpoint, "bounty API listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
