//! Application state: per-session form stores, planner config and the
//! optional text generator.
//!
//! Sessions live in memory. Each create first drops sessions idle past the
//! configured TTL, then the least recently touched ones until the cap leaves
//! room for the new session.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{load_planner_config_from_env, PlannerConfig, SessionsConfig};
use crate::generator::{OpenAiGenerator, TextGenerator};
use crate::session::FormState;

/// A session's form plus when it was last written.
#[derive(Clone, Debug)]
pub struct SessionSlot {
    pub form: FormState,
    pub touched: Instant,
}

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<String, SessionSlot>>>,
    pub generator: Option<Arc<dyn TextGenerator>>,
    pub config: PlannerConfig,
}

impl AppState {
    /// Build state from env: load config, init the OpenAI-compatible generator.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let config = load_planner_config_from_env();

        let generator: Option<Arc<dyn TextGenerator>> = match OpenAiGenerator::from_env(&config.generation) {
            Some(g) => {
                info!(target: "lesson_planner", base_url = %g.base_url, model = %config.generation.model, "Text generation enabled.");
                Some(Arc::new(g))
            }
            None => {
                info!(target: "lesson_planner", "Text generation disabled (no API key, or client setup failed). Plans cannot be generated.");
                None
            }
        };

        Self::with_generator(config, generator)
    }

    pub fn with_generator(config: PlannerConfig, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            generator,
            config,
        }
    }

    /// Start a fresh session and return its id.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> (String, FormState) {
        let id = Uuid::new_v4().to_string();
        let state = FormState::default();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let evicted = evict(&mut sessions, &self.config.sessions, now);
        sessions.insert(id.clone(), SessionSlot { form: state.clone(), touched: now });
        info!(target: "planner", session = %id, evicted, live = sessions.len(), "Session created");
        (id, state)
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn get_session(&self, id: &str) -> Option<FormState> {
        self.sessions.read().await.get(id).map(|slot| slot.form.clone())
    }

    /// Replace a session's state. Returns false if the session vanished.
    #[instrument(level = "debug", skip(self, state), fields(%id))]
    pub async fn store_session(&self, id: &str, state: FormState) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(slot) => {
                slot.form = state;
                slot.touched = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Drop a session. Returns false if it was not there.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            info!(target: "planner", session = %id, "Session removed");
        }
        removed
    }
}

/// Remove expired sessions, then the oldest ones until one more fits under
/// the cap. Returns how many were removed.
fn evict(sessions: &mut HashMap<String, SessionSlot>, limits: &SessionsConfig, now: Instant) -> usize {
    let before = sessions.len();
    let ttl = Duration::from_secs(limits.ttl_secs);
    sessions.retain(|_, slot| now.duration_since(slot.touched) < ttl);

    while sessions.len() >= limits.max_sessions.max(1) {
        let oldest = sessions.iter().min_by_key(|(_, slot)| slot.touched).map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                sessions.remove(&id);
            }
            None => break,
        }
    }
    before - sessions.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(ttl_secs: u64, max_sessions: usize) -> AppState {
        let mut config = PlannerConfig::default();
        config.sessions = SessionsConfig { ttl_secs, max_sessions };
        AppState::with_generator(config, None)
    }

    #[tokio::test]
    async fn idle_sessions_expire_on_next_create() {
        let app = app(0, 100);
        let (old, _) = app.create_session().await;
        let (new, _) = app.create_session().await;
        assert!(app.get_session(&old).await.is_none());
        assert!(app.get_session(&new).await.is_some());
        assert_eq!(app.sessions.read().await.len(), 1);
    }

    #[tokio::test]
    async fn cap_evicts_least_recently_touched() {
        let app = app(3600, 2);
        let (a, _) = app.create_session().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (b, _) = app.create_session().await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(app.store_session(&a, FormState::default()).await);

        let (c, _) = app.create_session().await;
        assert!(app.get_session(&a).await.is_some());
        assert!(app.get_session(&b).await.is_none());
        assert!(app.get_session(&c).await.is_some());
        assert_eq!(app.sessions.read().await.len(), 2);
    }

    #[tokio::test]
    async fn removed_sessions_are_gone() {
        let app = app(3600, 10);
        let (id, _) = app.create_session().await;
        assert!(app.remove_session(&id).await);
        assert!(!app.remove_session(&id).await);
        assert!(!app.store_session(&id, FormState::default()).await);
    }
}
