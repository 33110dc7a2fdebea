use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

pub const CHOICE_COUNT: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("correct choice {0:?} is not one of the choices")]
    CorrectChoiceMissing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizItem {
    prompt: String,
    choices: [String; CHOICE_COUNT],
    correct_choice: String,
}

impl QuizItem {
    pub fn new(
        prompt: impl Into<String>,
        choices: [&str; CHOICE_COUNT],
        correct_choice: &str,
    ) -> Result<Self, QuizError> {
        if !choices.contains(&correct_choice) {
            return Err(QuizError::CorrectChoiceMissing(correct_choice.to_string()));
        }
        Ok(Self {
            prompt: prompt.into(),
            choices: choices.map(str::to_string),
            correct_choice: correct_choice.to_string(),
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn choices(&self) -> &[String; CHOICE_COUNT] {
        &self.choices
    }

    pub fn correct_choice(&self) -> &str {
        &self.correct_choice
    }

    /// 1 when `answer` is the correct choice, 0 otherwise.
    pub fn score(&self, answer: &str) -> i64 {
        i64::from(answer == self.correct_choice)
    }

    /// The part of the item that may be shown before an answer is submitted.
    pub fn question(&self) -> QuizQuestion {
        QuizQuestion {
            prompt: self.prompt.clone(),
            choices: self.choices.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
}

const BUILTIN_QUIZZES: &[(&str, &str, [&str; CHOICE_COUNT], &str)] = &[
    (
        "Present Simple",
        "What is the correct form? She ___ (go) to school every day.",
        ["go", "goes", "going", "went"],
        "goes",
    ),
    (
        "Past Simple",
        "What is the past form of 'eat'?",
        ["eated", "ate", "eaten", "eating"],
        "ate",
    ),
    (
        "English Idioms",
        "What does 'break the ice' mean?",
        ["To start a conversation", "To argue", "To leave", "To cook"],
        "To start a conversation",
    ),
    (
        "Modal Verbs",
        "Which modal verb shows obligation?",
        ["Can", "Might", "Must", "Could"],
        "Must",
    ),
    (
        "Vocabulary",
        "What does 'journey' mean?",
        ["A short walk", "A trip or travel", "A job", "A book"],
        "A trip or travel",
    ),
    (
        "Conditional Sentences",
        "Complete: If I ___ (study), I will pass.",
        ["study", "studied", "studies", "studying"],
        "study",
    ),
    (
        "Articles",
        "Which article fits? ___ apple is red.",
        ["A", "An", "The", "No article"],
        "An",
    ),
    (
        "Adjectives and Adverbs",
        "Choose the adverb: She sings ___.",
        ["beautiful", "beauty", "beautifully", "beautify"],
        "beautifully",
    ),
    (
        "Passive Voice",
        "Active to passive: They build houses → Houses ___ .",
        ["are built", "build", "were building", "built"],
        "are built",
    ),
    (
        "Questions",
        "Which is a correct question?",
        ["Where you live?", "Where do you live?", "You live where?", "Live you where?"],
        "Where do you live?",
    ),
];

const FALLBACK_CHOICES: [&str; CHOICE_COUNT] = ["Answer A", "Answer B", "Answer C", "Answer D"];

/// Static lesson title → quiz item table.
#[derive(Debug, Clone)]
pub struct QuizBank {
    items: HashMap<String, QuizItem>,
}

impl QuizBank {
    pub fn builtin() -> Self {
        let items = BUILTIN_QUIZZES
            .iter()
            .filter_map(|(title, prompt, choices, correct)| {
                match QuizItem::new(*prompt, *choices, correct) {
                    Ok(item) => Some((title.to_string(), item)),
                    Err(err) => {
                        tracing::error!(title, error = %err, "skipping malformed quiz item");
                        None
                    }
                }
            })
            .collect();
        Self { items }
    }

    /// Total over all titles: unknown lessons get the generic item.
    pub fn lookup(&self, lesson_title: &str) -> QuizItem {
        match self.items.get(lesson_title) {
            Some(item) => item.clone(),
            None => fallback_item(lesson_title),
        }
    }

    pub fn contains(&self, lesson_title: &str) -> bool {
        self.items.contains_key(lesson_title)
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }
}

impl Default for QuizBank {
    fn default() -> Self {
        Self::builtin()
    }
}

fn fallback_item(lesson_title: &str) -> QuizItem {
    QuizItem {
        prompt: format!("Define a term from {lesson_title}."),
        choices: FALLBACK_CHOICES.map(str::to_string),
        correct_choice: FALLBACK_CHOICES[0].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_item_is_registered() {
        let bank = QuizBank::builtin();
        assert_eq!(bank.titles().count(), BUILTIN_QUIZZES.len());
    }

    #[test]
    fn known_titles_have_correct_choice_among_choices() {
        let bank = QuizBank::builtin();
        for title in bank.titles() {
            let item = bank.lookup(title);
            assert!(
                item.choices().iter().any(|c| c == item.correct_choice()),
                "{title}"
            );
        }
    }

    #[test]
    fn unknown_title_gets_generic_item() {
        let bank = QuizBank::builtin();
        let item = bank.lookup("Phrasal Verbs");

        assert_eq!(item.prompt(), "Define a term from Phrasal Verbs.");
        assert_eq!(item.choices(), &FALLBACK_CHOICES.map(str::to_string));
        assert_eq!(item.correct_choice(), "Answer A");
        assert!(!bank.contains("Phrasal Verbs"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let bank = QuizBank::builtin();
        assert_eq!(bank.lookup("Articles").correct_choice(), "An");
        assert_eq!(bank.lookup("articles").correct_choice(), "Answer A");
    }

    #[test]
    fn constructor_rejects_missing_correct_choice() {
        let err = QuizItem::new("?", ["a", "b", "c", "d"], "e").unwrap_err();
        assert_eq!(err, QuizError::CorrectChoiceMissing("e".into()));
    }

    #[test]
    fn score_is_one_only_for_exact_match() {
        let item = QuizBank::builtin().lookup("Modal Verbs");
        assert_eq!(item.score("Must"), 1);
        assert_eq!(item.score("must"), 0);
        assert_eq!(item.score("Can"), 0);
    }

    #[test]
    fn question_hides_the_answer() {
        let question = QuizBank::builtin().lookup("Past Simple").question();
        let json = serde_json::to_value(&question).unwrap();
        assert!(json.get("correctChoice").is_none());
        assert_eq!(json["choices"].as_array().map(Vec::len), Some(4));
    }
}
