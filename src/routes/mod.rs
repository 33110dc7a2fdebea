mod health;
mod lessons;
mod narration;
mod page;
mod quiz;
mod sessions;
mod story;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use uuid::Uuid;

use crate::response::{json_error, AppError};
use crate::session::Session;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/api/lessons", get(lessons::list).fallback(fallback_handler))
        .route("/api/quiz", get(quiz::question).fallback(fallback_handler))
        .route("/api/sessions", post(sessions::create).fallback(fallback_handler))
        .route(
            "/api/sessions/:id",
            get(sessions::show)
                .delete(sessions::close)
                .fallback(fallback_handler),
        )
        .route(
            "/api/sessions/:id/story",
            post(story::generate)
                .delete(story::reset)
                .fallback(fallback_handler),
        )
        .route(
            "/api/sessions/:id/answer",
            post(quiz::answer).fallback(fallback_handler),
        )
        .route(
            "/api/sessions/:id/narration",
            post(narration::play).fallback(fallback_handler),
        )
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

pub(crate) fn session_or_404(state: &AppState, id: &Uuid) -> Result<Arc<Session>, AppError> {
    state
        .sessions()
        .get(id)
        .ok_or_else(|| AppError::not_found("Session not found"))
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Endpoint not found").into_response()
}

