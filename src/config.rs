use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::services::llm_provider::InferenceConfig;
use crate::services::narration::NarrationConfig;
use crate::story::normalizer::WordBand;
use crate::story::prompt::TargetLength;

const DEFAULT_LESSONS_PATH: &str = "data/lessons.json";
const DEFAULT_DATABASE_PATH: &str = "results.db";
const DEFAULT_USER_ID: &str = "user1";
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub lessons_path: PathBuf,
    pub database_path: PathBuf,
    pub default_user_id: String,
    pub session_idle_ttl: Duration,
    pub story: StoryConfig,
    pub inference: InferenceConfig,
    pub narration: NarrationConfig,
}

/// Which text-generation backend a session loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryBackendKind {
    Inference,
    Offline,
}

impl StoryBackendKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inference" | "hf" | "remote" => Some(Self::Inference),
            "offline" | "local" | "mock" => Some(Self::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoryConfig {
    pub backend: StoryBackendKind,
    pub band: WordBand,
    pub target: TargetLength,
    pub offline_words: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse::<u16>("PORT").unwrap_or(3000);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let lessons_path = env_string("LESSONS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LESSONS_PATH));
        let database_path = env_string("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));
        let default_user_id =
            env_string("DEFAULT_USER_ID").unwrap_or_else(|| DEFAULT_USER_ID.to_string());

        Self {
            host,
            port,
            log_level,
            lessons_path,
            database_path,
            default_user_id,
            session_idle_ttl: Duration::from_secs(
                env_parse("SESSION_IDLE_SECS").unwrap_or(DEFAULT_SESSION_IDLE_SECS),
            ),
            story: StoryConfig::from_env(),
            inference: InferenceConfig::from_env(),
            narration: NarrationConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StoryConfig {
    pub fn from_env() -> Self {
        let backend = env_string("STORY_BACKEND")
            .and_then(|v| StoryBackendKind::parse(&v))
            .unwrap_or(StoryBackendKind::Inference);

        let defaults = WordBand::default();
        let band = WordBand::new(
            env_parse("STORY_MIN_WORDS").unwrap_or(defaults.min_words),
            env_parse("STORY_MAX_WORDS").unwrap_or(defaults.max_words),
            env_parse("STORY_TRUNCATE_TO").unwrap_or(defaults.truncate_to),
        );

        let target_defaults = TargetLength::default();
        let target = TargetLength {
            min: env_parse("STORY_TARGET_MIN").unwrap_or(target_defaults.min),
            max: env_parse("STORY_TARGET_MAX").unwrap_or(target_defaults.max),
        };

        Self {
            backend,
            band,
            target,
            offline_words: env_parse("OFFLINE_STORY_WORDS").unwrap_or(140),
        }
    }
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self {
            backend: StoryBackendKind::Offline,
            band: WordBand::default(),
            target: TargetLength::default(),
            offline_words: 140,
        }
    }
}

pub(crate) fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_accepts_aliases() {
        assert_eq!(StoryBackendKind::parse("Offline"), Some(StoryBackendKind::Offline));
        assert_eq!(StoryBackendKind::parse(" hf "), Some(StoryBackendKind::Inference));
        assert_eq!(StoryBackendKind::parse("gpt"), None);
    }
}
