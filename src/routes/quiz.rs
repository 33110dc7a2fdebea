use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::ScoreRecord;
use crate::quiz::QuizQuestion;
use crate::response::{ok, AppError, SuccessResponse};
use crate::state::AppState;

use super::session_or_404;

#[derive(Debug, Deserialize)]
pub(super) struct QuizQuery {
    title: String,
}

pub(super) async fn question(
    State(state): State<AppState>,
    Query(query): Query<QuizQuery>,
) -> Json<SuccessResponse<QuizQuestion>> {
    ok(state.quiz_bank().lookup(&query.title).question())
}

#[derive(Debug, Deserialize)]
pub(super) struct AnswerRequest {
    choice: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnswerResponse {
    correct: bool,
    correct_choice: String,
    score: i64,
    lesson_id: i64,
}

pub(super) async fn answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnswerRequest>,
) -> Result<Json<SuccessResponse<AnswerResponse>>, AppError> {
    let session = session_or_404(&state, &id)?;
    let active = session.active_story().ok_or_else(|| {
        AppError::conflict("NO_ACTIVE_STORY", "Generate a story before answering the quiz")
    })?;

    if !active.quiz.choices().contains(&body.choice) {
        return Err(AppError::validation("Choice is not one of the quiz options"));
    }

    let score = active.quiz.score(&body.choice);
    let record = ScoreRecord {
        user_id: session.user_id().to_string(),
        lesson_id: active.lesson.id,
        score,
    };
    state.store().record(&record).await.map_err(|err| {
        AppError::internal(format!("failed to record quiz result: {err}"))
    })?;

    Ok(ok(AnswerResponse {
        correct: score == 1,
        correct_choice: active.quiz.correct_choice().to_string(),
        score,
        lesson_id: record.lesson_id,
    }))
}
