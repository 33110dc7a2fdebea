use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::quiz::QuizQuestion;
use crate::response::{ok, AppError, SuccessResponse};
use crate::session::ActiveStory;
use crate::state::AppState;
use crate::story::model::GenerationError;
use crate::story::{StoryResult, StoryWriter};

use super::session_or_404;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateRequest {
    lesson_title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GenerateResponse {
    lesson_id: i64,
    story: StoryResult,
    quiz: QuizQuestion,
}

pub(super) async fn generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<SuccessResponse<GenerateResponse>>, AppError> {
    let session = session_or_404(&state, &id)?;
    let lesson = state
        .catalog()
        .by_title(&body.lesson_title)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("Unknown lesson: {}", body.lesson_title)))?;

    let loader = state.model_loader();
    let model = session
        .model()
        .get_or_load(|| async move { loader.load().await })
        .await
        .map_err(generation_failed)?;

    let story = StoryWriter::new(model.as_ref(), state.story_config())
        .write(&lesson)
        .await
        .map_err(generation_failed)?;

    let quiz = state.quiz_bank().lookup(&lesson.title);
    let response = GenerateResponse {
        lesson_id: lesson.id,
        story: story.clone(),
        quiz: quiz.question(),
    };
    session.set_active_story(ActiveStory {
        lesson,
        story,
        quiz,
    });

    Ok(ok(response))
}

pub(super) async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let session = session_or_404(&state, &id)?;
    session.clear_story();
    Ok(StatusCode::NO_CONTENT)
}

fn generation_failed(err: GenerationError) -> AppError {
    tracing::warn!(error = %err, "story generation failed");
    AppError::bad_gateway(
        "GENERATION_FAILED",
        format!("Story generation failed: {err}. Please try again."),
    )
}
