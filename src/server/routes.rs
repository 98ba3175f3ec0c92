use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::detector::{draw_detections, encode_png, Detection, Detector};
use crate::store::Verdict;

use super::AppState;

fn internal_error(message: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": message })),
    )
        .into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": message }))).into_response()
}

/// Group confidences by class name, matching the response shape of the
/// original prediction API: `{ "person": [0.91, 0.85], "fire": [0.40] }`.
pub fn group_confidences(
    detections: &[Detection],
    config: &AppConfig,
) -> BTreeMap<String, Vec<f32>> {
    let mut grouped: BTreeMap<String, Vec<f32>> = BTreeMap::new();
    for detection in detections {
        grouped
            .entry(config.class_name(detection.class_id).to_string())
            .or_default()
            .push(detection.confidence);
    }
    grouped
}

async fn run_detector(
    detector: Arc<dyn Detector>,
    image: image::DynamicImage,
) -> anyhow::Result<Vec<Detection>> {
    // ONNX inference is CPU-bound; keep it off the runtime workers.
    tokio::task::spawn_blocking(move || detector.detect(&image)).await?
}

pub async fn predict(
    State(st): State<AppState>,
    Path(return_type): Path<String>,
    mut multipart: Multipart,
) -> Response {
    if return_type != "json" && return_type != "img" {
        return bad_request("unsupported return type");
    }

    let mut image_bytes = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("image") {
            match field.bytes().await {
                Ok(bytes) => {
                    image_bytes = Some(bytes);
                    break;
                }
                Err(e) => {
                    warn!("Failed to read uploaded image field: {}", e);
                    return bad_request("failed to read image upload");
                }
            }
        }
    }
    let Some(image_bytes) = image_bytes else {
        return bad_request("missing image field");
    };

    let image = match image::load_from_memory(&image_bytes) {
        Ok(image) => image,
        Err(e) => {
            warn!("Failed to decode uploaded image: {}", e);
            return bad_request("could not decode image");
        }
    };

    let detections = match run_detector(st.detector.clone(), image.clone()).await {
        Ok(detections) => detections,
        Err(e) => {
            error!("Prediction failed: {}", e);
            return internal_error("prediction failed");
        }
    };

    let model_name = st
        .config
        .model_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "model".to_string());

    let record = match st.store.insert_prediction(&model_name, &detections).await {
        Ok(record) => record,
        Err(e) => {
            error!("Failed to store prediction record: {}", e);
            return internal_error("failed to store prediction");
        }
    };

    info!(
        "Prediction {}: {} detections ({} response)",
        record.id,
        detections.len(),
        return_type
    );

    if return_type == "json" {
        let grouped = group_confidences(&detections, &st.config);
        return Json(json!({
            "prediction_id": record.id,
            "detections": grouped,
        }))
        .into_response();
    }

    let annotated = draw_detections(&image, &detections);
    match encode_png(&annotated) {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(e) => {
            error!("Failed to encode annotated image: {}", e);
            internal_error("failed to encode annotated image")
        }
    }
}

pub async fn health_check(State(st): State<AppState>) -> Response {
    let image = match image::open(&st.config.health_check_image) {
        Ok(image) => image,
        Err(e) => {
            error!("Failed to open health check image: {}", e);
            return internal_error("health check image unavailable");
        }
    };

    let detections = match run_detector(st.detector.clone(), image).await {
        Ok(detections) => detections,
        Err(e) => {
            error!("Health check inference failed: {}", e);
            return internal_error("health check failed");
        }
    };

    // Detections arrive sorted by confidence; the reference image must
    // yield the configured classes in that order.
    let expected = &st.config.health_check_classes;
    let matches = expected.len() <= detections.len()
        && expected
            .iter()
            .zip(&detections)
            .all(|(class_id, detection)| detection.class_id == *class_id);

    if matches {
        Json("API and model working as expected").into_response()
    } else {
        let found: Vec<u32> = detections.iter().map(|d| d.class_id).collect();
        error!(
            "Health check mismatch: expected classes {:?}, found {:?}",
            expected, found
        );
        internal_error("health check failed")
    }
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub prediction_id: Uuid,
    pub verdict: String,
}

pub async fn feedback(State(st): State<AppState>, Json(req): Json<FeedbackRequest>) -> Response {
    let verdict: Verdict = match req.verdict.parse() {
        Ok(verdict) => verdict,
        Err(_) => return bad_request("unknown verdict"),
    };

    match st.store.record_feedback(req.prediction_id, verdict).await {
        Ok(true) => {
            info!("Feedback {} for prediction {}", req.verdict, req.prediction_id);
            Json(json!({ "ok": true })).into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "unknown prediction id" })),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to record feedback: {}", e);
            internal_error("failed to record feedback")
        }
    }
}

pub async fn metrics(State(st): State<AppState>) -> Response {
    match st.store.metrics().await {
        Ok(metrics) => Json(metrics).into_response(),
        Err(e) => {
            error!("Failed to aggregate metrics: {}", e);
            internal_error("failed to aggregate metrics")
        }
    }
}
