use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

use crate::config::{env_parse, env_string};
use crate::story::model::SamplingParams;

const DEFAULT_MODEL: &str = "distilgpt2";
const DEFAULT_API_ENDPOINT: &str = "https://api-inference.huggingface.co";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const BASE_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_endpoint: String,
    pub timeout: Duration,
    /// Transport-level retries for 429/503/5xx. Zero keeps one attempt per call.
    pub max_retries: usize,
}

impl InferenceConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_string("LLM_API_KEY"),
            model: env_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_endpoint: env_string("LLM_API_ENDPOINT")
                .or_else(|| env_string("LLM_BASE_URL"))
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
            timeout: Duration::from_millis(env_parse("LLM_TIMEOUT").unwrap_or(DEFAULT_TIMEOUT_MS)),
            max_retries: env_parse("LLM_MAX_RETRIES").unwrap_or(0),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_endpoint: DEFAULT_API_ENDPOINT.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedText {
    pub generated_text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
}

impl InferenceResponse {
    fn into_first(self) -> Option<String> {
        match self {
            Self::Batch(items) => items.into_iter().next().map(|g| g.generated_text),
            Self::Single(item) => Some(item.generated_text),
        }
    }
}

#[derive(Debug, Error)]
pub enum LLMError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("empty response")]
    EmptyChoices,
}

/// Client for a text-generation inference endpoint
/// (`POST {endpoint}/models/{model}` with `{inputs, parameters}`).
#[derive(Clone)]
pub struct InferenceClient {
    config: InferenceConfig,
    client: reqwest::Client,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self, LLMError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn is_available(&self) -> bool {
        !self.config.model.trim().is_empty() && !self.config.api_endpoint.trim().is_empty()
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}",
            self.config.api_endpoint.trim().trim_end_matches('/'),
            self.config.model.trim()
        )
    }

    pub async fn generate_text(
        &self,
        inputs: &str,
        params: &SamplingParams,
    ) -> Result<String, LLMError> {
        let payload = build_payload(inputs, params);
        let response = self.post_with_retry(&self.url(), &payload).await?;
        response.into_first().ok_or(LLMError::EmptyChoices)
    }

    async fn post_with_retry(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<InferenceResponse, LLMError> {
        let max_retries = self.config.max_retries;
        let mut retry = 0;

        loop {
            let mut request = self.client.post(url).json(payload);
            if let Some(key) = self.config.api_key.as_deref() {
                request = request.bearer_auth(key);
            }

            let err = match request.send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        return serde_json::from_slice(&bytes).map_err(|e| {
                            tracing::error!(
                                error = %e,
                                body = %String::from_utf8_lossy(&bytes),
                                "failed to parse inference response"
                            );
                            LLMError::Json(e)
                        });
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let err = LLMError::HttpStatus { status, body };
                    if !is_retryable(status) {
                        return Err(err);
                    }
                    err
                }
                Err(e) => LLMError::Request(e),
            };

            if retry >= max_retries {
                return Err(err);
            }
            let backoff = Duration::from_millis(BASE_BACKOFF_MS << retry.min(6));
            warn!(retry, error = %err, "inference request failed, retrying");
            sleep(backoff).await;
            retry += 1;
        }
    }
}

fn build_payload(inputs: &str, params: &SamplingParams) -> serde_json::Value {
    serde_json::json!({
        "inputs": inputs,
        "parameters": {
            "max_new_tokens": params.max_new_tokens,
            "temperature": params.temperature,
            "top_p": params.top_p,
            "repetition_penalty": params.repetition_penalty,
            "no_repeat_ngram_size": params.no_repeat_ngram_size,
            "do_sample": params.do_sample,
            "num_return_sequences": 1,
            "return_full_text": true
        },
        "options": { "wait_for_model": true }
    })
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_sampling_parameters() {
        let payload = build_payload("Once", &SamplingParams::default().with_max_tokens(100));

        assert_eq!(payload["inputs"], "Once");
        let params = &payload["parameters"];
        assert_eq!(params["max_new_tokens"], 100);
        assert_eq!(params["no_repeat_ngram_size"], 3);
        assert_eq!(params["do_sample"], true);
        assert_eq!(params["return_full_text"], true);
    }

    #[test]
    fn parses_batch_and_single_responses() {
        let batch: InferenceResponse =
            serde_json::from_str(r#"[{"generated_text": "a"}, {"generated_text": "b"}]"#).unwrap();
        assert_eq!(batch.into_first().as_deref(), Some("a"));

        let single: InferenceResponse =
            serde_json::from_str(r#"{"generated_text": "c"}"#).unwrap();
        assert_eq!(single.into_first().as_deref(), Some("c"));

        let empty: InferenceResponse = serde_json::from_str("[]").unwrap();
        assert_eq!(empty.into_first(), None);
    }

    #[test]
    fn url_joins_endpoint_and_model() {
        let client = InferenceClient::new(InferenceConfig {
            api_endpoint: "http://localhost:8080/".into(),
            model: "distilgpt2".into(),
            ..InferenceConfig::default()
        })
        .unwrap();
        assert_eq!(client.url(), "http://localhost:8080/models/distilgpt2");
        assert!(client.is_available());
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_retryable(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_retryable(reqwest::StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(reqwest::StatusCode::BAD_REQUEST));
    }
}
