use std::time::{Duration, SystemTime};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::state::AppState;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
        .route("/info", get(info))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    database_latency_ms: Option<u64>,
    lessons: usize,
    sessions: usize,
    timestamp: String,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoResponse {
    service: &'static str,
    version: &'static str,
    start_time: String,
    uptime: u64,
    recorded_results: Option<i64>,
}

async fn root(State(state): State<AppState>) -> Response {
    let (database, latency) = match tokio::time::timeout(DB_CHECK_TIMEOUT, state.store().ping()).await {
        Ok(Ok(elapsed)) => ("connected", Some(elapsed.as_millis() as u64)),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "database health check failed");
            ("disconnected", None)
        }
        Err(_) => ("timeout", None),
    };
    let healthy = database == "connected";

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        database,
        database_latency_ms: latency,
        lessons: state.catalog().len(),
        sessions: state.sessions().len(),
        timestamp: now_iso(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
}

async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        service: "story-tutor-backend",
        version: env!("CARGO_PKG_VERSION"),
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
        recorded_results: state.store().count().await.ok(),
    })
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn system_time_iso(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
