use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use ffmfy_core::{EngineStatus, MediaType, SanitizedConfig};

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub engine: EngineStatus,
}

/// Output formats offered per input media type.
#[derive(Serialize)]
pub struct FormatsResponse {
    pub audio: Vec<String>,
    pub video: Vec<String>,
    pub audio_outputs: Vec<String>,
    pub video_outputs: Vec<String>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        engine: state.orchestrator().engine_status().await,
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

pub async fn get_formats(State(state): State<Arc<AppState>>) -> Json<FormatsResponse> {
    let classifier = state.orchestrator().classifier();
    Json(FormatsResponse {
        audio: classifier.audio_formats().to_vec(),
        video: classifier.video_formats().to_vec(),
        audio_outputs: classifier.output_formats_for(MediaType::Audio),
        video_outputs: classifier.output_formats_for(MediaType::Video),
    })
}

/// GET /api/v1/metrics
///
/// Prometheus text exposition.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
