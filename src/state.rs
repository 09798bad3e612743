//! Application state: session store, transcript provider, question generator and limits.
//!
//! This module owns:
//!   - quiz sessions keyed by UUID, each behind its own mutex
//!   - the transcript provider (external process by default)
//!   - the optional question generator (absent when no API key is configured)
//!
//! One session's requests are serialized by its mutex; separate sessions share nothing mutable.
//! Sessions untouched for longer than the idle TTL are dropped by a background sweep.

use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::config::{load_quiz_config_from_env, GenerationSettings, SessionSettings};
use crate::error::QuizError;
use crate::generator::QuestionGenerator;
use crate::openai::OpenAI;
use crate::session::QuizSession;
use crate::transcript::{CommandTranscriptProvider, TranscriptProvider};

pub type SessionHandle = Arc<Mutex<QuizSession>>;

struct SessionEntry {
    handle: SessionHandle,
    touched: Instant,
}

type SessionMap = HashMap<Uuid, SessionEntry>;

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<RwLock<SessionMap>>,
    pub transcripts: Arc<dyn TranscriptProvider>,
    pub generator: Option<QuestionGenerator>,
    pub limits: GenerationSettings,
}

impl AppState {
    /// Build state from env: load config, pick the transcript process, init OpenAI,
    /// and start the idle-session sweep.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let cfg = load_quiz_config_from_env();

        let transcripts = CommandTranscriptProvider::from_settings(&cfg.transcript);
        info!(target: "quizify_backend", program = %transcripts.program, args = ?transcripts.args, timeout = ?transcripts.timeout, "Transcript provider configured");

        // Build optional OpenAI client (if API key present).
        let generator = match OpenAI::from_env() {
            Ok(Some(oa)) => {
                let generator = QuestionGenerator::new(Arc::new(oa), cfg.prompts.clone());
                info!(target: "quizify_backend", model = %generator.describe(), "Quiz generation enabled.");
                Some(generator)
            }
            Ok(None) => {
                warn!(target: "quizify_backend", "OPENAI_API_KEY not set; quiz generation is disabled.");
                None
            }
            Err(e) => {
                error!(target: "quizify_backend", error = %e, "OpenAI client unavailable; quiz generation is disabled.");
                None
            }
        };

        let state = Self::from_parts(Arc::new(transcripts), generator, cfg.generation);
        state.spawn_session_sweeper(&cfg.sessions);
        state
    }

    pub fn from_parts(
        transcripts: Arc<dyn TranscriptProvider>,
        generator: Option<QuestionGenerator>,
        limits: GenerationSettings,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            transcripts,
            generator,
            limits,
        }
    }

    /// Fails fast with a configuration error when no generator is available.
    pub fn generator(&self) -> Result<&QuestionGenerator, QuizError> {
        self.generator.as_ref().ok_or_else(|| {
            QuizError::Configuration(
                "OPENAI_API_KEY is not set. Please set it in your environment before generating quizzes.".into(),
            )
        })
    }

    /// Create an empty session in the Input step.
    #[instrument(level = "debug", skip(self))]
    pub async fn create_session(&self) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(QuizSession::new(id)));
        let entry = SessionEntry { handle: handle.clone(), touched: Instant::now() };
        self.sessions.write().await.insert(id, entry);
        info!(target: "quiz", session = %id, "Session created");
        (id, handle)
    }

    /// Look up a session and mark it as recently used.
    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn session(&self, id: Uuid) -> Result<SessionHandle, QuizError> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id).ok_or(QuizError::SessionNotFound(id))?;
        entry.touched = Instant::now();
        Ok(entry.handle.clone())
    }

    #[instrument(level = "debug", skip(self), fields(%id))]
    pub async fn remove_session(&self, id: Uuid) -> Result<(), QuizError> {
        match self.sessions.write().await.remove(&id) {
            Some(_) => {
                info!(target: "quiz", session = %id, "Session removed");
                Ok(())
            }
            None => Err(QuizError::SessionNotFound(id)),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Periodically evict idle sessions. The task ends once the state is dropped.
    pub fn spawn_session_sweeper(&self, settings: &SessionSettings) {
        let sessions = Arc::downgrade(&self.sessions);
        let ttl = Duration::from_secs(settings.idle_ttl_secs);
        let every = Duration::from_secs(settings.sweep_interval_secs.max(1));
        info!(target: "quizify_backend", ?ttl, ?every, "Idle-session sweep scheduled");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let Some(map) = sessions.upgrade() else { break };
                evict_idle(&map, ttl).await;
            }
        });
    }
}

/// Drop sessions idle for longer than `ttl`. A session whose lock is held
/// (a request is in flight) is never dropped. Returns how many were removed.
async fn evict_idle(sessions: &RwLock<SessionMap>, ttl: Duration) -> usize {
    let mut sessions = sessions.write().await;
    let before = sessions.len();
    sessions.retain(|id, entry| {
        let keep = entry.touched.elapsed() <= ttl || entry.handle.try_lock().is_err();
        if !keep {
            debug!(target: "quiz", session = %id, "Evicting idle session");
        }
        keep
    });
    let evicted = before - sessions.len();
    if evicted > 0 {
        info!(target: "quiz", evicted, remaining = sessions.len(), "Idle sessions evicted");
    }
    evicted
}
