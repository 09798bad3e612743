//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws` (one quiz session per connection)
/// - stateless pipeline endpoints and session endpoints under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // Stateless pipeline
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/transcript", post(http::http_post_transcript))
        .route("/api/v1/generate-quiz", post(http::http_post_generate_quiz))
        .route("/api/v1/score", post(http::http_post_score))
        // Sessions
        .route("/api/v1/sessions", post(http::http_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(http::http_get_session).delete(http::http_delete_session),
        )
        .route("/api/v1/sessions/:id/quiz", post(http::http_start_quiz))
        .route("/api/v1/sessions/:id/answers", post(http::http_post_answer))
        .route("/api/v1/sessions/:id/submit", post(http::http_submit))
        .route("/api/v1/sessions/:id/reset", post(http::http_reset))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
