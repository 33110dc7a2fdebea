//! HTTP behaviour of the speech API narration backend.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use story_tutor_backend::services::narration::{
    NarrationError, SpeechApiClient, SpeechApiConfig, SpeechSynthesizer,
};

const TEXT: &str = "Every morning Lena walks to the small library near her house.";

fn client(server: &MockServer) -> SpeechApiClient {
    SpeechApiClient::new(SpeechApiConfig {
        api_key: Some("tts-key".into()),
        endpoint: format!("{}/v1/", server.uri()),
        timeout: Duration::from_secs(5),
        ..SpeechApiConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_speech_success_returns_mpeg() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .and(header("authorization", "Bearer tts-key"))
        .and(body_partial_json(json!({
            "model": "tts-1",
            "voice": "alloy",
            "input": TEXT,
            "response_format": "mp3"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "audio/mpeg")
                .set_body_bytes(vec![0xFF, 0xFB, 0x90, 0x00]),
        )
        .expect(1)
        .mount(&server)
        .await;

    let clip = client(&server).synthesize(TEXT, "en").await.unwrap();

    assert_eq!(clip.mime, "audio/mpeg");
    assert_eq!(clip.bytes.as_ref(), &[0xFF, 0xFB, 0x90, 0x00]);
}

#[tokio::test]
async fn test_speech_error_status_maps_to_backend_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).synthesize(TEXT, "en").await.unwrap_err();

    match err {
        NarrationError::Backend { status, message } => {
            assert!(status.starts_with("401"));
            assert_eq!(message, "invalid api key");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_speech_empty_body_is_empty_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/speech"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = client(&server).synthesize(TEXT, "en").await.unwrap_err();

    assert!(matches!(err, NarrationError::EmptyAudio));
}
