#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use story_tutor_backend::config::{Config, StoryBackendKind, StoryConfig};
use story_tutor_backend::db::ResultStore;
use story_tutor_backend::services::llm_provider::InferenceConfig;
use story_tutor_backend::services::narration::NarrationConfig;
use story_tutor_backend::state::AppState;

pub struct TestApp {
    pub router: Router,
    pub store: ResultStore,
    _dir: TempDir,
}

pub fn test_config(dir: &TempDir, offline_words: usize) -> Config {
    Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        log_level: "warn".to_string(),
        lessons_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/lessons.json"),
        database_path: dir.path().join("results.db"),
        default_user_id: "user1".to_string(),
        session_idle_ttl: Duration::from_secs(600),
        story: StoryConfig {
            backend: StoryBackendKind::Offline,
            offline_words,
            ..StoryConfig::default()
        },
        inference: InferenceConfig::default(),
        narration: NarrationConfig::default(),
    }
}

pub async fn create_test_app(offline_words: usize) -> TestApp {
    create_test_app_with(offline_words, |_| {}).await
}

pub async fn create_test_app_with(offline_words: usize, customize: impl FnOnce(&mut Config)) -> TestApp {
    let dir = TempDir::new().expect("failed to create temp dir");
    let mut config = test_config(&dir, offline_words);
    customize(&mut config);
    let state = AppState::from_config(&config)
        .await
        .expect("test app state");
    let store = state.store().clone();

    TestApp {
        router: story_tutor_backend::create_app(state),
        store,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn new_session(&self) -> String {
        let (status, body) = self.post_json("/api/sessions", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["sessionId"].as_str().unwrap().to_string()
    }
}
