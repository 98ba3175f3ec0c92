pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppConfig;
use crate::detector::{Detector, DetectorParams, OnnxDetector};
use crate::store::FeedbackStore;

/// Shared state for the axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub detector: Arc<dyn Detector>,
    pub store: FeedbackStore,
    pub config: Arc<AppConfig>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/predict/:return_type", post(routes::predict))
        .route("/health_check", get(routes::health_check))
        .route("/feedback", post(routes::feedback))
        .route("/metrics", get(routes::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Load the model, open the store, and serve until shutdown.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let params = DetectorParams {
        input_size: config.input_size,
        confidence_threshold: config.confidence_threshold,
        nms_threshold: config.nms_threshold,
        max_detections: config.max_detections,
    };
    let detector = Arc::new(OnnxDetector::load(&config.model_path, params)?);
    let store = FeedbackStore::open(&config.database_path).await?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        detector,
        store,
        config: Arc::new(config),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Detection server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
