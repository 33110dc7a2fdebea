use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use thiserror::Error;

use crate::catalog::{CatalogError, LessonCatalog};
use crate::config::{Config, StoryConfig};
use crate::db::{ResultStore, StoreError};
use crate::quiz::QuizBank;
use crate::services::narration::{NarrationBackend, NarrationError, NarrationService};
use crate::session::SessionRegistry;
use crate::story::model::ModelLoader;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("result store: {0}")]
    Store(#[from] StoreError),
    #[error("narration backend: {0}")]
    Narration(#[from] NarrationError),
}

/// Shared, read-mostly application state. Catalog and quiz bank are loaded
/// once and handed out by reference; mutable state lives in sessions.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    catalog: Arc<LessonCatalog>,
    quiz_bank: Arc<QuizBank>,
    store: ResultStore,
    sessions: Arc<SessionRegistry>,
    model_loader: Arc<ModelLoader>,
    story_config: Arc<StoryConfig>,
    narration: Arc<NarrationService<NarrationBackend>>,
    default_user_id: Arc<str>,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self, StartupError> {
        let catalog = LessonCatalog::load(&config.lessons_path)?;
        let store = ResultStore::open(&config.database_path).await?;
        let narration = NarrationService::new(
            NarrationBackend::from_config(&config.narration)?,
            config.narration.language.clone(),
            config.narration.output_path.clone(),
        );
        let model_loader = ModelLoader::new(
            config.story.backend,
            config.inference.clone(),
            config.story.offline_words,
        );

        Ok(Self::new(
            catalog,
            QuizBank::builtin(),
            store,
            model_loader,
            config.story.clone(),
            narration,
            &config.default_user_id,
            config.session_idle_ttl,
        ))
    }

    pub fn new(
        catalog: LessonCatalog,
        quiz_bank: QuizBank,
        store: ResultStore,
        model_loader: ModelLoader,
        story_config: StoryConfig,
        narration: NarrationService<NarrationBackend>,
        default_user_id: &str,
        session_idle_ttl: Duration,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            catalog: Arc::new(catalog),
            quiz_bank: Arc::new(quiz_bank),
            store,
            sessions: Arc::new(SessionRegistry::new(session_idle_ttl)),
            model_loader: Arc::new(model_loader),
            story_config: Arc::new(story_config),
            narration: Arc::new(narration),
            default_user_id: Arc::from(default_user_id),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn catalog(&self) -> &LessonCatalog {
        &self.catalog
    }

    pub fn quiz_bank(&self) -> &QuizBank {
        &self.quiz_bank
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn model_loader(&self) -> Arc<ModelLoader> {
        Arc::clone(&self.model_loader)
    }

    pub fn story_config(&self) -> &StoryConfig {
        &self.story_config
    }

    pub fn narration(&self) -> &NarrationService<NarrationBackend> {
        &self.narration
    }

    pub fn default_user_id(&self) -> &str {
        &self.default_user_id
    }
}
