use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::catalog::Lesson;
use crate::response::{ok, SuccessResponse};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct LessonListResponse {
    lessons: Vec<Lesson>,
    total: usize,
}

pub(super) async fn list(State(state): State<AppState>) -> Json<SuccessResponse<LessonListResponse>> {
    let lessons = state.catalog().lessons().to_vec();
    ok(LessonListResponse {
        total: lessons.len(),
        lessons,
    })
}
