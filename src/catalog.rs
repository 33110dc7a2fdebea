use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("lesson catalog not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read lesson catalog {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid lesson catalog JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate lesson title: {0}")]
    DuplicateTitle(String),
}

/// Immutable lesson table, loaded once at startup and shared by reference.
#[derive(Debug, Clone)]
pub struct LessonCatalog {
    lessons: Vec<Lesson>,
    by_title: HashMap<String, usize>,
}

impl LessonCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                CatalogError::NotFound(path.to_path_buf())
            } else {
                CatalogError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!(path = %path.display(), lessons = catalog.len(), "lesson catalog loaded");
        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let lessons: Vec<Lesson> = serde_json::from_str(raw)?;
        Self::from_lessons(lessons)
    }

    pub fn from_lessons(lessons: Vec<Lesson>) -> Result<Self, CatalogError> {
        let mut by_title = HashMap::with_capacity(lessons.len());
        for (idx, lesson) in lessons.iter().enumerate() {
            if by_title.insert(lesson.title.clone(), idx).is_some() {
                return Err(CatalogError::DuplicateTitle(lesson.title.clone()));
            }
        }
        Ok(Self { lessons, by_title })
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn by_title(&self, title: &str) -> Option<&Lesson> {
        self.by_title.get(title).map(|&idx| &self.lessons[idx])
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lessons_and_ignores_extra_fields() {
        let catalog = LessonCatalog::from_json(
            r#"[{"id": 1, "title": "Articles", "summary": "a / an / the", "level": "A1"}]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 1);
        let lesson = catalog.by_title("Articles").unwrap();
        assert_eq!(lesson.id, 1);
        assert_eq!(lesson.summary, "a / an / the");
        assert!(catalog.by_title("articles").is_none());
    }

    #[test]
    fn rejects_duplicate_titles() {
        let err = LessonCatalog::from_json(
            r#"[{"id": 1, "title": "X", "summary": ""}, {"id": 2, "title": "X", "summary": ""}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateTitle(t) if t == "X"));
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let err = LessonCatalog::load(Path::new("/nonexistent/lessons.json")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn bundled_catalog_is_valid() {
        let raw = include_str!("../data/lessons.json");
        let catalog = LessonCatalog::from_json(raw).unwrap();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.by_title("Past Simple").map(|l| l.id), Some(2));
    }
}
