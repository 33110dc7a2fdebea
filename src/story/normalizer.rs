//! Cleanup and length enforcement for raw model output.
//!
//! The policy is: strip the echoed prompt, collapse whitespace, regenerate at
//! most once when the text is too short, truncate when it is too long, and
//! capitalize the first character. A regenerated text that is still short is
//! accepted as-is.

use std::future::Future;
use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordBand {
    pub min_words: usize,
    pub max_words: usize,
    /// Word count kept when the text exceeds `max_words`; never above `max_words`.
    pub truncate_to: usize,
}

impl WordBand {
    pub fn new(min_words: usize, max_words: usize, truncate_to: usize) -> Self {
        let max_words = max_words.max(min_words);
        Self {
            min_words,
            max_words,
            truncate_to: truncate_to.min(max_words),
        }
    }

    pub fn contains(&self, word_count: usize) -> bool {
        (self.min_words..=self.max_words).contains(&word_count)
    }
}

impl Default for WordBand {
    fn default() -> Self {
        Self::new(80, 170, 155)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    pub word_count: usize,
    pub regenerated: bool,
    pub truncated: bool,
}

impl Normalized {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn horizontal_ws() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\S\n]+").expect("valid regex"))
}

fn blank_lines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("valid regex"))
}

/// Steps 1 and 2: drop the echoed prompt prefix and collapse whitespace.
pub fn clean(raw: &str, prompt: &str) -> String {
    let body = if prompt.is_empty() {
        raw
    } else {
        raw.strip_prefix(prompt).unwrap_or(raw)
    };

    let unified = body.replace("\r\n", "\n").replace('\r', "\n");
    let spaced = horizontal_ws().replace_all(&unified, " ");
    let trimmed_lines = spaced
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");

    blank_lines()
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Normalizes `raw`, calling `regenerate` at most once if the cleaned text is
/// shorter than `band.min_words`. An empty cleaned text is returned as-is
/// without regeneration; callers must treat it as a failed generation.
pub async fn normalize<F, Fut, E>(
    raw: &str,
    prompt: &str,
    band: WordBand,
    regenerate: F,
) -> Result<Normalized, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, E>>,
{
    let mut text = clean(raw, prompt);
    if text.is_empty() {
        return Ok(Normalized {
            text,
            word_count: 0,
            regenerated: false,
            truncated: false,
        });
    }

    let mut regenerated = false;
    let initial_count = word_count(&text);
    if initial_count < band.min_words {
        tracing::debug!(
            words = initial_count,
            min_words = band.min_words,
            "story too short, regenerating once"
        );
        let retry_raw = regenerate().await?;
        text = clean(&retry_raw, prompt);
        regenerated = true;
    }

    Ok(finish(text, band, regenerated))
}

/// Steps 3, 5 and 6 on an already cleaned text.
fn finish(text: String, band: WordBand, regenerated: bool) -> Normalized {
    let count = word_count(&text);
    let (text, word_count, truncated) = if count > band.max_words {
        let kept = text
            .split_whitespace()
            .take(band.truncate_to)
            .collect::<Vec<_>>()
            .join(" ");
        (kept, band.truncate_to.min(count), true)
    } else {
        (text, count, false)
    };

    Normalized {
        text: capitalize_first(text),
        word_count,
        regenerated,
        truncated,
    }
}

fn capitalize_first(text: String) -> String {
    let Some(first) = text.chars().next() else {
        return text;
    };
    if !first.is_lowercase() {
        return text;
    }
    let mut out: String = first.to_uppercase().collect();
    out.push_str(&text[first.len_utf8()..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::convert::Infallible;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    async fn no_regen() -> Result<String, Infallible> {
        panic!("regeneration must not be requested")
    }

    #[test]
    fn clean_strips_prompt_prefix_only() {
        let prompt = "Tell a story.";
        assert_eq!(clean("Tell a story. Once upon a time", prompt), "Once upon a time");
        assert_eq!(
            clean("Intro. Tell a story. Once", prompt),
            "Intro. Tell a story. Once"
        );
    }

    #[test]
    fn clean_collapses_whitespace() {
        let raw = "  The   Fox\t\t\n\n \n\n\nran  away.\r\n\r\n\r\nThe end.  ";
        assert_eq!(clean(raw, ""), "The Fox\n\nran away.\n\nThe end.");
    }

    #[test]
    fn band_clamps_truncation_to_max() {
        let band = WordBand::new(10, 20, 50);
        assert_eq!(band.truncate_to, 20);
        assert!(band.contains(10) && band.contains(20) && !band.contains(21));
    }

    #[tokio::test]
    async fn in_band_text_is_capitalized_and_kept() {
        let raw = format!("PROMPT the {}", words(99));
        let out = normalize(&raw, "PROMPT", WordBand::default(), no_regen)
            .await
            .unwrap();

        assert!(out.text.starts_with("The w0"));
        assert_eq!(out.word_count, 100);
        assert!(!out.regenerated && !out.truncated);
    }

    #[tokio::test]
    async fn short_text_regenerates_exactly_once() {
        let calls = Cell::new(0);
        let band = WordBand::new(80, 170, 155);
        let raw = words(50);

        let out = normalize(&raw, "", band, || {
            calls.set(calls.get() + 1);
            async { Ok::<_, Infallible>(words(60)) }
        })
        .await
        .unwrap();

        assert_eq!(calls.get(), 1);
        assert!(out.regenerated);
        assert_eq!(out.word_count, 60);
        assert!(out.text.starts_with("W0 w1"));
    }

    #[tokio::test]
    async fn regenerated_text_is_cleaned_and_truncated() {
        let prompt = "Write it:";
        let out = normalize(&words(5), prompt, WordBand::default(), || async move {
            Ok::<_, Infallible>(format!("{prompt}  {}", words(300)))
        })
        .await
        .unwrap();

        assert!(!out.text.contains(prompt));
        assert!(out.regenerated && out.truncated);
        assert_eq!(out.word_count, 155);
    }

    #[tokio::test]
    async fn regeneration_error_propagates() {
        let err = normalize(&words(3), "", WordBand::default(), || async {
            Err::<String, _>("model down")
        })
        .await
        .unwrap_err();
        assert_eq!(err, "model down");
    }

    #[tokio::test]
    async fn long_text_is_truncated_to_cap() {
        let band = WordBand::new(80, 170, 155);
        let raw = format!("line one\n\n{}", words(198));

        let out = normalize(&raw, "", band, no_regen).await.unwrap();

        assert_eq!(out.word_count, 155);
        assert_eq!(word_count(&out.text), 155);
        assert!(!out.text.contains('\n'));
        assert!(out.text.starts_with("Line one w0"));
    }

    #[tokio::test]
    async fn empty_output_passes_through_without_regeneration() {
        let out = normalize("PROMPT \n\n  ", "PROMPT", WordBand::default(), no_regen)
            .await
            .unwrap();
        assert!(out.is_empty());
        assert_eq!(out.word_count, 0);
        assert!(!out.regenerated);
    }

    #[test]
    fn capitalize_handles_multibyte_and_non_letters() {
        assert_eq!(capitalize_first("élan".into()), "Élan");
        assert_eq!(capitalize_first("\"quoted\"".into()), "\"quoted\"");
        assert_eq!(capitalize_first(String::new()), "");
    }
}
