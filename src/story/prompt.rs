/// Word range requested from the model in the instruction text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetLength {
    pub min: usize,
    pub max: usize,
}

impl Default for TargetLength {
    fn default() -> Self {
        Self { min: 130, max: 160 }
    }
}

pub fn build_prompt(lesson_title: &str, lesson_summary: &str, target: TargetLength) -> String {
    let summary = lesson_summary.trim();
    format!(
        "Write an educational short story for English learners about the lesson \"{title}\". \
         Lesson summary: {summary}{stop} \
         Use the grammar or vocabulary point of this lesson naturally in the story. \
         Start with a title line, then write a story of about {min} to {max} words.\n\nTitle:",
        title = lesson_title.trim(),
        summary = summary,
        stop = if summary.ends_with(['.', '!', '?']) { "" } else { "." },
        min = target.min,
        max = target.max,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_lesson_and_length_band() {
        let prompt = build_prompt(
            "Past Simple",
            "Finished actions in the past",
            TargetLength::default(),
        );

        assert!(prompt.contains("\"Past Simple\""));
        assert!(prompt.contains("Lesson summary: Finished actions in the past."));
        assert!(prompt.contains("about 130 to 160 words"));
        assert!(prompt.ends_with("Title:"));
    }

    #[test]
    fn summary_punctuation_is_not_doubled() {
        let prompt = build_prompt("Articles", "Use a, an, the.", TargetLength { min: 10, max: 20 });
        assert!(prompt.contains("Use a, an, the. Use"));
        assert!(prompt.contains("about 10 to 20 words"));
    }
}
