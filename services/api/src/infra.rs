use chrono::{DateTime, Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use subsidy_navigator::wizard::{
    Answer, RepositoryError, SessionId, SessionRepository, WizardSession,
};
use tracing::debug;

const SESSION_TTL_HOURS: i64 = 24;
const MAX_SESSIONS: usize = 10_000;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

type SessionMap = HashMap<SessionId, WizardSession>;

/// Sessions idle longer than `ttl` expire; at `max_sessions` the least recently
/// updated session makes room for a new one.
#[derive(Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<SessionMap>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self::with_limits(Duration::hours(SESSION_TTL_HOURS), MAX_SESSIONS)
    }
}

impl InMemorySessionRepository {
    pub(crate) fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionMap>, RepositoryError> {
        self.sessions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store lock poisoned".to_string()))
    }

    fn is_expired(&self, session: &WizardSession, now: DateTime<Utc>) -> bool {
        session.updated_at + self.ttl <= now
    }

    fn evict(&self, sessions: &mut SessionMap, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|session| session.updated_at)
                .map(|session| session.id.clone())
            else {
                break;
            };
            sessions.remove(&oldest);
        }

        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "evicted wizard sessions");
        }
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, session: WizardSession) -> Result<WizardSession, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&session.id) {
            return Err(RepositoryError::Conflict);
        }
        self.evict(&mut guard, Utc::now());
        guard.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: WizardSession) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&session.id) {
            guard.insert(session.id.clone(), session);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<WizardSession>, RepositoryError> {
        let mut guard = self.lock()?;
        match guard.get(id) {
            Some(session) if self.is_expired(session, Utc::now()) => {
                guard.remove(id);
                Ok(None)
            }
            found => Ok(found.cloned()),
        }
    }
}

pub(crate) fn parse_answer(raw: &str) -> Result<Answer, String> {
    let (question, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected QUESTION=OPTION, got '{raw}'"))?;
    let (question, value) = (question.trim(), value.trim());
    if question.is_empty() || value.is_empty() {
        return Err(format!("expected QUESTION=OPTION, got '{raw}'"));
    }
    Ok(Answer::new(question, value))
}
