use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::response::AppError;
use crate::services::narration::NarrationError;
use crate::state::AppState;

use super::session_or_404;

#[derive(Debug, Default, Deserialize)]
pub(super) struct NarrationRequest {
    language: Option<String>,
}

/// Synthesizes the session's current story once and returns the audio bytes.
pub(super) async fn play(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<NarrationRequest>>,
) -> Result<Response, AppError> {
    let session = session_or_404(&state, &id)?;
    let active = session.active_story().ok_or_else(|| {
        AppError::conflict("NO_ACTIVE_STORY", "Generate a story before playing narration")
    })?;
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let clip = state
        .narration()
        .narrate(&active.story.text, request.language.as_deref())
        .await
        .map_err(narration_failed)?;

    Ok(([(header::CONTENT_TYPE, clip.mime)], clip.bytes).into_response())
}

fn narration_failed(err: NarrationError) -> AppError {
    match err {
        NarrationError::TooShort { words, min } => AppError::unprocessable(
            "NARRATION_TOO_SHORT",
            format!("The story is too short to narrate ({words} words, at least {min} needed)"),
        ),
        other => {
            tracing::warn!(error = %other, "narration failed");
            AppError::bad_gateway(
                "NARRATION_FAILED",
                format!("Narration failed: {other}. Check your internet connection and try again."),
            )
        }
    }
}
