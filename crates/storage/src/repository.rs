use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drill_core::aggregate::{AttemptOutcome, AttemptTotals, SquareTotals};
use drill_core::model::{
    Attempt, AttemptId, AttemptRow, DrillSession, DrillSessionId, DrillSessionRow,
    DrillSessionSummary, DrillType, UserId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for drill sessions.
#[async_trait]
pub trait DrillSessionRepository: Send + Sync {
    /// Persist a new session and return its identity.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the session cannot be stored.
    async fn create_session(&self, session: &DrillSession) -> Result<DrillSessionId, StorageError>;

    /// Fetch a session by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_session(&self, id: DrillSessionId) -> Result<DrillSessionRow, StorageError>;

    /// Set the end timestamp and frozen summary on an active session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no active session has this ID.
    async fn end_session(
        &self,
        id: DrillSessionId,
        ended_at: DateTime<Utc>,
        summary: &DrillSessionSummary,
    ) -> Result<(), StorageError>;

    /// Number of sessions ever started by the user. Zero for unknown users.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_sessions(&self, user_id: UserId) -> Result<u64, StorageError>;

    /// Most recently started sessions first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_sessions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<DrillSessionRow>, StorageError>;
}

/// Repository contract for attempts and their reductions.
///
/// Every reduction tolerates zero matching rows and returns zero-valued totals.
/// "Answered order" is insertion order.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append an attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the owning session does not exist.
    async fn append_attempt(&self, attempt: &Attempt) -> Result<AttemptId, StorageError>;

    /// All attempts of a session in answered order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn attempts_for_session(
        &self,
        session_id: DrillSessionId,
    ) -> Result<Vec<AttemptRow>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn session_totals(&self, session_id: DrillSessionId)
    -> Result<AttemptTotals, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn drill_totals(
        &self,
        user_id: UserId,
        drill_type: DrillType,
    ) -> Result<AttemptTotals, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn overall_totals(&self, user_id: UserId) -> Result<AttemptTotals, StorageError>;

    /// Totals grouped by expected answer.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn square_totals(&self, user_id: UserId) -> Result<Vec<SquareTotals>, StorageError>;

    /// Each of the user's attempts of one drill type, in answered order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn drill_outcomes(
        &self,
        user_id: UserId,
        drill_type: DrillType,
    ) -> Result<Vec<AttemptOutcome>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    sessions: Arc<Mutex<BTreeMap<DrillSessionId, DrillSession>>>,
    attempts: Arc<Mutex<Vec<AttemptRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_attempts<T>(
        &self,
        f: impl FnOnce(&[AttemptRow]) -> T,
    ) -> Result<T, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(f(&guard))
    }

    fn totals_where(
        &self,
        pred: impl Fn(&Attempt) -> bool,
    ) -> Result<AttemptTotals, StorageError> {
        self.with_attempts(|rows| {
            AttemptTotals::from_attempts(rows.iter().map(|r| &r.attempt).filter(|a| pred(*a)))
        })
    }
}

#[async_trait]
impl DrillSessionRepository for InMemoryRepository {
    async fn create_session(&self, session: &DrillSession) -> Result<DrillSessionId, StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let next = guard.keys().next_back().map_or(1, |id| id.value() + 1);
        let id = DrillSessionId::new(next);
        guard.insert(id, session.clone());
        Ok(id)
    }

    async fn get_session(&self, id: DrillSessionId) -> Result<DrillSessionRow, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(&id)
            .cloned()
            .map(|session| DrillSessionRow::new(id, session))
            .ok_or(StorageError::NotFound)
    }

    async fn end_session(
        &self,
        id: DrillSessionId,
        ended_at: DateTime<Utc>,
        summary: &DrillSessionSummary,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let session = guard
            .get_mut(&id)
            .filter(|s| s.is_active())
            .ok_or(StorageError::NotFound)?;
        session
            .end(ended_at, *summary)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn count_sessions(&self, user_id: UserId) -> Result<u64, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().filter(|s| s.user_id() == user_id).count() as u64)
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<DrillSessionRow>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<DrillSessionRow> = guard
            .iter()
            .filter(|(_, s)| s.user_id() == user_id)
            .map(|(id, s)| DrillSessionRow::new(*id, s.clone()))
            .collect();
        rows.sort_by(|a, b| {
            b.session
                .started_at()
                .cmp(&a.session.started_at())
                .then(b.id.cmp(&a.id))
        });
        rows.truncate(limit as usize);
        Ok(rows)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &Attempt) -> Result<AttemptId, StorageError> {
        {
            let sessions = self
                .sessions
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            if !sessions.contains_key(&attempt.session_id()) {
                return Err(StorageError::NotFound);
            }
        }

        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = AttemptId::new(guard.len() as u64 + 1);
        guard.push(AttemptRow::new(id, attempt.clone()));
        Ok(id)
    }

    async fn attempts_for_session(
        &self,
        session_id: DrillSessionId,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        self.with_attempts(|rows| {
            rows.iter()
                .filter(|r| r.attempt.session_id() == session_id)
                .cloned()
                .collect()
        })
    }

    async fn session_totals(
        &self,
        session_id: DrillSessionId,
    ) -> Result<AttemptTotals, StorageError> {
        self.totals_where(|a| a.session_id() == session_id)
    }

    async fn drill_totals(
        &self,
        user_id: UserId,
        drill_type: DrillType,
    ) -> Result<AttemptTotals, StorageError> {
        self.totals_where(|a| a.user_id() == user_id && a.drill_type() == drill_type)
    }

    async fn overall_totals(&self, user_id: UserId) -> Result<AttemptTotals, StorageError> {
        self.totals_where(|a| a.user_id() == user_id)
    }

    async fn square_totals(&self, user_id: UserId) -> Result<Vec<SquareTotals>, StorageError> {
        self.with_attempts(|rows| {
            let mut grouped: HashMap<&str, (u32, u32)> = HashMap::new();
            for attempt in rows.iter().map(|r| &r.attempt) {
                if attempt.user_id() != user_id {
                    continue;
                }
                let entry = grouped.entry(attempt.expected()).or_default();
                entry.0 += 1;
                if attempt.is_correct() {
                    entry.1 += 1;
                }
            }
            grouped
                .into_iter()
                .map(|(key, (total, correct))| SquareTotals {
                    key: key.to_owned(),
                    total,
                    correct,
                })
                .collect()
        })
    }

    async fn drill_outcomes(
        &self,
        user_id: UserId,
        drill_type: DrillType,
    ) -> Result<Vec<AttemptOutcome>, StorageError> {
        self.with_attempts(|rows| {
            rows.iter()
                .map(|r| &r.attempt)
                .filter(|a| a.user_id() == user_id && a.drill_type() == drill_type)
                .map(|a| AttemptOutcome {
                    session_id: a.session_id(),
                    correct: a.is_correct(),
                    response_ms: a.response_ms(),
                })
                .collect()
        })
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn DrillSessionRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let sessions: Arc<dyn DrillSessionRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { sessions, attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{InputMethod, Perspective};
    use drill_core::time::fixed_now;

    fn build_session(user: u64) -> DrillSession {
        DrillSession::start(
            UserId::new(user),
            DrillType::NameSquare,
            InputMethod::Type,
            Perspective::White,
            fixed_now(),
        )
    }

    fn build_attempt(session: DrillSessionId, expected: &str, submitted: &str) -> Attempt {
        Attempt::evaluate(
            session,
            UserId::new(1),
            DrillType::NameSquare,
            "",
            expected,
            submitted,
            250,
            fixed_now(),
        )
    }

    #[tokio::test]
    async fn end_session_matches_only_active_rows() {
        let repo = InMemoryRepository::new();
        let id = repo.create_session(&build_session(1)).await.unwrap();

        let summary = DrillSessionSummary {
            total_attempts: 2,
            correct: 1,
            avg_response_ms: 300,
            streak_best: 1,
        };
        repo.end_session(id, fixed_now(), &summary).await.unwrap();

        let err = repo
            .end_session(id, fixed_now(), &DrillSessionSummary::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let row = repo.get_session(id).await.unwrap();
        assert_eq!(row.session.summary(), &summary);
    }

    #[tokio::test]
    async fn attempts_for_unknown_session_are_rejected() {
        let repo = InMemoryRepository::new();
        let err = repo
            .append_attempt(&build_attempt(DrillSessionId::new(9), "a1", "a1"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn reductions_tolerate_zero_rows() {
        let repo = InMemoryRepository::new();
        let user = UserId::new(5);
        assert_eq!(
            repo.session_totals(DrillSessionId::new(1)).await.unwrap(),
            AttemptTotals::default()
        );
        assert_eq!(repo.overall_totals(user).await.unwrap(), AttemptTotals::default());
        assert!(repo.square_totals(user).await.unwrap().is_empty());
        assert!(repo
            .drill_outcomes(user, DrillType::FindSquare)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(repo.count_sessions(user).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn attempts_keep_answered_order() {
        let repo = InMemoryRepository::new();
        let id = repo.create_session(&build_session(1)).await.unwrap();
        for (expected, submitted) in [("a1", "a1"), ("b2", "c2"), ("d4", "d4")] {
            repo.append_attempt(&build_attempt(id, expected, submitted))
                .await
                .unwrap();
        }

        let rows = repo.attempts_for_session(id).await.unwrap();
        let expected: Vec<&str> = rows.iter().map(|r| r.attempt.expected()).collect();
        assert_eq!(expected, vec!["a1", "b2", "d4"]);

        let totals = repo.session_totals(id).await.unwrap();
        assert_eq!(totals.total, 3);
        assert_eq!(totals.correct, 2);
        assert_eq!(totals.avg_response_ms(), 250);
    }
}
