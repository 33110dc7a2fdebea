use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::{env_parse, env_string};
use crate::story::normalizer::word_count;

/// Narration is refused below this many words, before any backend call.
pub const MIN_NARRATION_WORDS: usize = 10;

const DEFAULT_SPEECH_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_SPEECH_MODEL: &str = "tts-1";
const DEFAULT_SPEECH_VOICE: &str = "alloy";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Bytes,
    pub mime: &'static str,
}

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("text too short to narrate: {words} words (need at least {min})")]
    TooShort { words: usize, min: usize },
    #[error("narration backend unavailable: {0}")]
    Unavailable(String),
    #[error("speech request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("speech backend returned {status}: {message}")]
    Backend { status: String, message: String },
    #[error("speech backend returned no audio")]
    EmptyAudio,
}

pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(
        &self,
        text: &str,
        language: &str,
    ) -> impl Future<Output = Result<AudioClip, NarrationError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NarrationBackendKind {
    SpeechApi,
    Espeak,
    Disabled,
}

impl NarrationBackendKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "speech-api" | "speech_api" | "openai" | "network" => Some(Self::SpeechApi),
            "espeak" | "espeak-ng" | "local" => Some(Self::Espeak),
            "disabled" | "off" | "none" => Some(Self::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechApiConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub timeout: Duration,
}

impl Default for SpeechApiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_SPEECH_ENDPOINT.to_string(),
            model: DEFAULT_SPEECH_MODEL.to_string(),
            voice: DEFAULT_SPEECH_VOICE.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NarrationConfig {
    pub backend: NarrationBackendKind,
    pub language: String,
    pub output_path: Option<PathBuf>,
    pub speech_api: SpeechApiConfig,
    pub espeak_binary: String,
}

impl NarrationConfig {
    pub fn from_env() -> Self {
        let defaults = SpeechApiConfig::default();
        Self {
            backend: env_string("NARRATION_BACKEND")
                .and_then(|v| NarrationBackendKind::parse(&v))
                .unwrap_or(NarrationBackendKind::SpeechApi),
            language: env_string("NARRATION_LANGUAGE").unwrap_or_else(|| "en".to_string()),
            output_path: env_string("NARRATION_OUTPUT_PATH").map(PathBuf::from),
            speech_api: SpeechApiConfig {
                api_key: env_string("TTS_API_KEY"),
                endpoint: env_string("TTS_API_ENDPOINT").unwrap_or(defaults.endpoint),
                model: env_string("TTS_MODEL").unwrap_or(defaults.model),
                voice: env_string("TTS_VOICE").unwrap_or(defaults.voice),
                timeout: env_parse("TTS_TIMEOUT")
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.timeout),
            },
            espeak_binary: env_string("ESPEAK_BINARY").unwrap_or_else(|| "espeak-ng".to_string()),
        }
    }
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            backend: NarrationBackendKind::Disabled,
            language: "en".to_string(),
            output_path: None,
            speech_api: SpeechApiConfig::default(),
            espeak_binary: "espeak-ng".to_string(),
        }
    }
}

/// OpenAI-compatible `POST {endpoint}/audio/speech`, returning MP3.
#[derive(Clone)]
pub struct SpeechApiClient {
    config: SpeechApiConfig,
    client: reqwest::Client,
}

impl SpeechApiClient {
    pub fn new(config: SpeechApiConfig) -> Result<Self, NarrationError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }
}

impl SpeechSynthesizer for SpeechApiClient {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip, NarrationError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| NarrationError::Unavailable("TTS_API_KEY is not set".into()))?;

        let url = format!("{}/audio/speech", self.config.endpoint.trim_end_matches('/'));
        let payload = serde_json::json!({
            "model": self.config.model,
            "input": text,
            "voice": self.config.voice,
            "response_format": "mp3"
        });
        tracing::debug!(%language, voice = %self.config.voice, chars = text.len(), "requesting speech");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(NarrationError::Backend {
                status: status.to_string(),
                message,
            });
        }

        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(NarrationError::EmptyAudio);
        }
        Ok(AudioClip {
            bytes,
            mime: "audio/mpeg",
        })
    }
}

/// Local engine: `espeak-ng --stdout -v <language> --stdin` producing WAV.
/// Text goes through stdin so a leading `-` is never parsed as a flag.
#[derive(Debug, Clone)]
pub struct EspeakEngine {
    binary: String,
}

impl EspeakEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl SpeechSynthesizer for EspeakEngine {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip, NarrationError> {
        let unavailable =
            |e: std::io::Error| NarrationError::Unavailable(format!("{}: {e}", self.binary));

        let mut child = tokio::process::Command::new(&self.binary)
            .arg("--stdout")
            .arg("-v")
            .arg(language)
            .arg("--stdin")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(unavailable)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes()).await.map_err(unavailable)?;
            stdin.shutdown().await.map_err(unavailable)?;
        }
        let output = child.wait_with_output().await.map_err(unavailable)?;

        if !output.status.success() {
            return Err(NarrationError::Backend {
                status: output.status.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(NarrationError::EmptyAudio);
        }
        Ok(AudioClip {
            bytes: Bytes::from(output.stdout),
            mime: "audio/wav",
        })
    }
}

pub enum NarrationBackend {
    SpeechApi(SpeechApiClient),
    Espeak(EspeakEngine),
    Disabled,
}

impl NarrationBackend {
    pub fn from_config(config: &NarrationConfig) -> Result<Self, NarrationError> {
        Ok(match config.backend {
            NarrationBackendKind::SpeechApi => {
                Self::SpeechApi(SpeechApiClient::new(config.speech_api.clone())?)
            }
            NarrationBackendKind::Espeak => Self::Espeak(EspeakEngine::new(&config.espeak_binary)),
            NarrationBackendKind::Disabled => Self::Disabled,
        })
    }
}

impl SpeechSynthesizer for NarrationBackend {
    async fn synthesize(&self, text: &str, language: &str) -> Result<AudioClip, NarrationError> {
        match self {
            Self::SpeechApi(client) => client.synthesize(text, language).await,
            Self::Espeak(engine) => engine.synthesize(text, language).await,
            Self::Disabled => Err(NarrationError::Unavailable(
                "narration is disabled on this server".into(),
            )),
        }
    }
}

pub struct NarrationService<S> {
    backend: S,
    default_language: String,
    output_path: Option<PathBuf>,
}

impl<S: SpeechSynthesizer> NarrationService<S> {
    pub fn new(backend: S, default_language: impl Into<String>, output_path: Option<PathBuf>) -> Self {
        Self {
            backend,
            default_language: default_language.into(),
            output_path,
        }
    }

    /// One synthesis attempt. Short texts are rejected without touching the backend.
    pub async fn narrate(&self, text: &str, language: Option<&str>) -> Result<AudioClip, NarrationError> {
        let words = word_count(text);
        if words < MIN_NARRATION_WORDS {
            return Err(NarrationError::TooShort {
                words,
                min: MIN_NARRATION_WORDS,
            });
        }

        let language = language
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.default_language.as_str());
        let clip = self.backend.synthesize(text, language).await?;
        tracing::info!(words, bytes = clip.bytes.len(), mime = clip.mime, "narration synthesized");

        if let Some(path) = &self.output_path {
            if let Err(err) = tokio::fs::write(path, &clip.bytes).await {
                tracing::warn!(path = %path.display(), error = %err, "failed to write narration file");
            }
        }

        Ok(clip)
    }
}
