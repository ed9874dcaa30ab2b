//! Conversion session API handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use ffmfy_core::admission::mime_from_extension;
use ffmfy_core::{
    AdmissionError, CandidateFile, EngineStatus, PlaybackPosition, SessionError, SessionSnapshot,
};

use crate::metrics::UPLOAD_BYTES_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SelectFormatRequest {
    pub format: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackParams {
    /// Seconds played so far.
    #[serde(default)]
    pub elapsed: f64,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub job_id: Uuid,
    pub session: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub reason: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps a session error to its HTTP status and body.
fn session_error(err: SessionError) -> ApiError {
    let status = match &err {
        SessionError::Admission(AdmissionError::FileTooLarge { .. }) => {
            StatusCode::PAYLOAD_TOO_LARGE
        }
        SessionError::Admission(_)
        | SessionError::UnsupportedMedia { .. }
        | SessionError::UnsupportedOutputFormat { .. }
        | SessionError::MissingSelection => StatusCode::BAD_REQUEST,
        SessionError::InvalidState { .. } | SessionError::Superseded => StatusCode::CONFLICT,
        SessionError::EngineNotReady | SessionError::EngineLoadFailed { .. } => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        SessionError::OutputClassificationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::EngineExecFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            reason: err.reason().to_string(),
        }),
    )
}

/// Maps a multipart read failure, keeping its status (413 past the body limit).
fn multipart_error(err: MultipartError) -> ApiError {
    let status = err.status();
    let reason = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "file_too_large"
    } else {
        "upload_failed"
    };

    (
        status,
        Json(ErrorResponse {
            error: format!("Failed to read upload: {}", err.body_text()),
            reason: reason.to_string(),
        }),
    )
}

/// Keeps only the last path component of an uploaded file name.
fn sanitize_upload_name(name: &str) -> String {
    name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name).trim().to_string()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/engine/load
///
/// Load the conversion engine. Succeeds immediately when already loaded.
pub async fn load_engine(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EngineStatus>, impl IntoResponse> {
    match state.orchestrator().load_engine().await {
        Ok(()) => Ok(Json(state.orchestrator().engine_status().await)),
        Err(e) => Err(session_error(e)),
    }
}

/// GET /api/v1/session
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.orchestrator().snapshot().await)
}

/// POST /api/v1/session/input
///
/// Upload the input file as the multipart field `file`. A new input replaces
/// the current one, including any finished output.
pub async fn upload_input(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<SessionSnapshot>, impl IntoResponse> {
    let mut candidate: Option<CandidateFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e)),
        };

        let name = field.name().unwrap_or("").to_string();
        if name != "file" {
            continue;
        }

        let file_name = sanitize_upload_name(field.file_name().unwrap_or(""));
        let declared_mime = field.content_type().map(|s| s.to_string());
        match field.bytes().await {
            Ok(bytes) => {
                UPLOAD_BYTES_TOTAL.inc_by(bytes.len() as u64);
                candidate = Some(CandidateFile::with_detected_mime(
                    file_name,
                    declared_mime.as_deref(),
                    bytes.to_vec(),
                ));
            }
            Err(e) => return Err(multipart_error(e)),
        }
    }

    if let Some(file) = &candidate {
        info!("Received upload {} ({} bytes)", file.name, file.size_bytes);
    }

    state
        .orchestrator()
        .load_input(candidate)
        .await
        .map(Json)
        .map_err(session_error)
}

/// PUT /api/v1/session/output-format
pub async fn select_output_format(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectFormatRequest>,
) -> Result<Json<SessionSnapshot>, impl IntoResponse> {
    state
        .orchestrator()
        .select_output_format(&body.format)
        .await
        .map(Json)
        .map_err(session_error)
}

/// POST /api/v1/session/convert
///
/// Start the conversion and return right away. Progress and the final state
/// are delivered over the WebSocket or by polling the session.
pub async fn convert(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<ConvertResponse>), impl IntoResponse> {
    let orchestrator = Arc::clone(state.orchestrator());
    let pending = match orchestrator.begin_conversion().await {
        Ok(pending) => pending,
        Err(e) => return Err(session_error(e)),
    };

    let job_id = pending.job().id;
    let session = orchestrator.snapshot().await;

    tokio::spawn(async move {
        if let Err(e) = orchestrator.finish_conversion(pending).await {
            debug!("Conversion {} ended without output: {}", job_id, e);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ConvertResponse { job_id, session }),
    ))
}

/// POST /api/v1/session/acknowledge
///
/// Dismiss a failure and return to idle.
pub async fn acknowledge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionSnapshot>, impl IntoResponse> {
    state
        .orchestrator()
        .acknowledge()
        .await
        .map(Json)
        .map_err(session_error)
}

/// DELETE /api/v1/session
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.orchestrator().reset().await)
}

/// GET /api/v1/session/output
///
/// Download the converted file.
pub async fn download_output(
    State(state): State<Arc<AppState>>,
) -> Result<Response, impl IntoResponse> {
    let Some(result) = state.orchestrator().output().await else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No converted output available".to_string(),
                reason: "no_output".to_string(),
            }),
        ));
    };

    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        urlencoding::encode(&result.output_name)
    );

    Ok((
        [
            (header::CONTENT_TYPE, mime_from_extension(&result.output_name)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(result.bytes.to_vec()),
    )
        .into_response())
}

/// GET /api/v1/session/output/playback?elapsed=SECONDS
///
/// Elapsed/duration labels for a player showing the converted output.
pub async fn playback_position(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlaybackParams>,
) -> Result<Json<PlaybackPosition>, impl IntoResponse> {
    state
        .orchestrator()
        .playback_position(params.elapsed)
        .await
        .map(Json)
        .map_err(session_error)
}
