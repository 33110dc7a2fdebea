use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::catalog::Lesson;
use crate::quiz::QuizItem;
use crate::story::model::{ModelHandle, TextBackend};
use crate::story::StoryResult;

/// The story currently on screen for a session, with the lesson and quiz it belongs to.
#[derive(Debug, Clone)]
pub struct ActiveStory {
    pub lesson: Lesson,
    pub story: StoryResult,
    pub quiz: QuizItem,
}

/// One user's interaction context. Owns its model handle so sessions never
/// share a loaded model through ambient state.
pub struct Session {
    id: Uuid,
    user_id: String,
    created_at: DateTime<Utc>,
    last_seen: Mutex<Instant>,
    model: ModelHandle<TextBackend>,
    active: Mutex<Option<ActiveStory>>,
}

impl Session {
    fn new(user_id: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            created_at: Utc::now(),
            last_seen: Mutex::new(Instant::now()),
            model: ModelHandle::new(),
            active: Mutex::new(None),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    pub fn model(&self) -> &ModelHandle<TextBackend> {
        &self.model
    }

    pub fn active_story(&self) -> Option<ActiveStory> {
        self.active.lock().clone()
    }

    pub fn set_active_story(&self, story: ActiveStory) {
        *self.active.lock() = Some(story);
    }

    /// "New story": drops the current story. Returns whether one was active.
    pub fn clear_story(&self) -> bool {
        self.active.lock().take().is_some()
    }
}

/// Sessions idle longer than `idle_ttl` are dropped, along with their loaded
/// model, on the next `create` or `get`.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_ttl,
        }
    }

    pub fn create(&self, user_id: impl Into<String>) -> Arc<Session> {
        self.evict_idle();
        let session = Arc::new(Session::new(user_id.into()));
        self.sessions.write().insert(session.id, Arc::clone(&session));
        tracing::debug!(session_id = %session.id, user_id = %session.user_id, "session created");
        session
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Session>> {
        self.evict_idle();
        let session = self.sessions.read().get(id).cloned()?;
        session.touch();
        Some(session)
    }

    /// Returns how many sessions were removed.
    pub fn evict_idle(&self) -> usize {
        let ttl = self.idle_ttl;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.idle_for() < ttl);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!(evicted, remaining = sessions.len(), "evicted idle sessions");
        }
        evicted
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}
