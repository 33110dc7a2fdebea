use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quiz::QuizQuestion;
use crate::response::{ok, AppError};
use crate::session::Session;
use crate::state::AppState;
use crate::story::StoryResult;

use super::session_or_404;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateSessionRequest {
    user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SessionView {
    session_id: Uuid,
    user_id: String,
    created_at: DateTime<Utc>,
    model_loaded: bool,
    story: Option<StoryResult>,
    quiz: Option<QuizQuestion>,
}

impl SessionView {
    fn of(session: &Session) -> Self {
        let active = session.active_story();
        Self {
            session_id: session.id(),
            user_id: session.user_id().to_string(),
            created_at: session.created_at(),
            model_loaded: session.model().is_loaded(),
            quiz: active.as_ref().map(|a| a.quiz.question()),
            story: active.map(|a| a.story),
        }
    }
}

pub(super) async fn create(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let request = body.map(|Json(b)| b).unwrap_or_default();
    let user_id = match request.user_id.as_deref().map(str::trim) {
        Some("") => return Err(AppError::validation("userId must not be empty")),
        Some(user_id) => user_id.to_string(),
        None => state.default_user_id().to_string(),
    };

    let session = state.sessions().create(user_id);
    Ok((StatusCode::CREATED, ok(SessionView::of(&session))))
}

pub(super) async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = session_or_404(&state, &id)?;
    Ok(ok(SessionView::of(&session)))
}

pub(super) async fn close(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions().remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Session not found"))
    }
}
