pub mod model;
pub mod normalizer;
pub mod prompt;

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::Lesson;
use crate::config::StoryConfig;
use crate::story::model::{GenerationError, SamplingParams, TextGenerator};
use crate::story::normalizer::{normalize, WordBand};
use crate::story::prompt::{build_prompt, TargetLength};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryResult {
    pub text: String,
    pub lesson_title: String,
    pub word_count: usize,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub regenerated: bool,
    pub truncated: bool,
}

/// Generator + normalizer pair over a loaded model.
pub struct StoryWriter<'a, G> {
    model: &'a G,
    band: WordBand,
    target: TargetLength,
    primary: SamplingParams,
    relaxed: SamplingParams,
}

impl<'a, G: TextGenerator> StoryWriter<'a, G> {
    pub fn new(model: &'a G, config: &StoryConfig) -> Self {
        Self {
            model,
            band: config.band,
            target: config.target,
            primary: SamplingParams::default(),
            relaxed: SamplingParams::relaxed(),
        }
    }

    pub fn prompt_for(&self, lesson_title: &str, lesson_summary: &str) -> String {
        build_prompt(lesson_title, lesson_summary, self.target)
    }

    /// Raw model output for a lesson, prompt echo included.
    pub async fn generate(
        &self,
        lesson_title: &str,
        lesson_summary: &str,
        max_tokens: u32,
    ) -> Result<String, GenerationError> {
        let prompt = self.prompt_for(lesson_title, lesson_summary);
        self.sample(&prompt, &self.primary.with_max_tokens(max_tokens))
            .await
    }

    async fn sample(&self, prompt: &str, params: &SamplingParams) -> Result<String, GenerationError> {
        self.model.generate(prompt, params).await
    }

    pub async fn write(&self, lesson: &Lesson) -> Result<StoryResult, GenerationError> {
        let started = Instant::now();
        let prompt = self.prompt_for(&lesson.title, &lesson.summary);

        let raw = self
            .generate(&lesson.title, &lesson.summary, self.primary.max_new_tokens)
            .await?;
        let normalized = normalize(&raw, &prompt, self.band, || {
            self.sample(&prompt, &self.relaxed)
        })
        .await?;

        if normalized.is_empty() {
            tracing::warn!(lesson = %lesson.title, "model produced an empty story");
            return Err(GenerationError::EmptyOutput);
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            lesson = %lesson.title,
            words = normalized.word_count,
            regenerated = normalized.regenerated,
            truncated = normalized.truncated,
            elapsed_ms,
            "story generated"
        );

        Ok(StoryResult {
            text: normalized.text,
            lesson_title: lesson.title.clone(),
            word_count: normalized.word_count,
            generated_at: Utc::now(),
            elapsed_ms,
            regenerated: normalized.regenerated,
            truncated: normalized.truncated,
        })
    }
}
