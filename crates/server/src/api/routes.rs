use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::metrics_middleware, session, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let max_upload = state.config().server.max_upload_bytes;
    let static_dir = state.config().server.static_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/formats", get(handlers::get_formats))
        .route("/metrics", get(handlers::get_metrics))
        // Engine
        .route("/engine/load", post(session::load_engine))
        // Session
        .route("/session", get(session::get_session))
        .route("/session", delete(session::reset))
        .route(
            "/session/input",
            post(session::upload_input).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/session/output-format", put(session::select_output_format))
        .route("/session/convert", post(session::convert))
        .route("/session/acknowledge", post(session::acknowledge))
        .route("/session/output", get(session::download_output))
        .route("/session/output/playback", get(session::playback_position))
        // Live updates
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    let router = Router::new().nest("/api/v1", api_routes);

    // Serve the browser UI with SPA fallback, when configured
    let router = match static_dir {
        Some(dir) => {
            let index_path = dir.join("index.html");
            router.fallback_service(ServeDir::new(&dir).fallback(ServeFile::new(index_path)))
        }
        None => router,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
