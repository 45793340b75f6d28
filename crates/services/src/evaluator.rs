use std::sync::Arc;

use drill_core::Clock;
use drill_core::model::{
    Attempt, AttemptMetadata, AttemptRow, DrillSessionId, DrillType, UserId,
};
use storage::repository::AttemptRepository;
use tracing::debug;

use crate::error::SessionError;

/// One answer as received from the caller.
///
/// There is no correctness field: correctness is always derived here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub session_id: DrillSessionId,
    pub user_id: UserId,
    pub drill_type: DrillType,
    /// Prompt text shown to the user, kept for history.
    pub question: String,
    pub expected: String,
    pub submitted: String,
    pub response_ms: u32,
    pub metadata: AttemptMetadata,
}

/// Compares answers and records every attempt.
#[derive(Clone)]
pub struct AnswerEvaluator {
    clock: Clock,
    attempts: Arc<dyn AttemptRepository>,
}

impl AnswerEvaluator {
    #[must_use]
    pub fn new(clock: Clock, attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { clock, attempts }
    }

    /// Normalize, compare and persist exactly one attempt.
    ///
    /// Wrong answers are recorded like right ones.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the session does not exist, or
    /// `SessionError::Storage` if the attempt cannot be written.
    pub async fn evaluate(
        &self,
        submission: AnswerSubmission,
    ) -> Result<(AttemptRow, bool), SessionError> {
        let attempt = Attempt::evaluate(
            submission.session_id,
            submission.user_id,
            submission.drill_type,
            submission.question,
            &submission.expected,
            &submission.submitted,
            submission.response_ms,
            self.clock.now(),
        )
        .with_metadata(submission.metadata);

        let id = self.attempts.append_attempt(&attempt).await?;
        let correct = attempt.is_correct();
        debug!(
            session_id = %attempt.session_id(),
            attempt_id = %id,
            drill_type = %attempt.drill_type(),
            correct,
            response_ms = attempt.response_ms(),
            "attempt recorded"
        );
        Ok((AttemptRow::new(id, attempt), correct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::model::{DrillSession, InputMethod, Perspective};
    use drill_core::time::{fixed_clock, fixed_now};
    use storage::repository::{DrillSessionRepository, InMemoryRepository};

    fn submission(session_id: DrillSessionId, expected: &str, submitted: &str) -> AnswerSubmission {
        AnswerSubmission {
            session_id,
            user_id: UserId::new(1),
            drill_type: DrillType::NameSquare,
            question: String::new(),
            expected: expected.to_owned(),
            submitted: submitted.to_owned(),
            response_ms: 820,
            metadata: AttemptMetadata::default(),
        }
    }

    async fn setup() -> (InMemoryRepository, DrillSessionId) {
        let repo = InMemoryRepository::new();
        let session = DrillSession::start(
            UserId::new(1),
            DrillType::NameSquare,
            InputMethod::Type,
            Perspective::White,
            fixed_now(),
        );
        let id = repo.create_session(&session).await.unwrap();
        (repo, id)
    }

    #[tokio::test]
    async fn comparison_ignores_case_and_whitespace() {
        let (repo, session_id) = setup().await;
        let evaluator = AnswerEvaluator::new(fixed_clock(), Arc::new(repo.clone()));

        let (row, correct) = evaluator
            .evaluate(submission(session_id, "E4", " e4 "))
            .await
            .unwrap();
        assert!(correct);
        assert!(row.attempt.is_correct());
        assert_eq!(row.attempt.answered_at(), fixed_now());
    }

    #[tokio::test]
    async fn wrong_answers_are_persisted_too() {
        let (repo, session_id) = setup().await;
        let evaluator = AnswerEvaluator::new(fixed_clock(), Arc::new(repo.clone()));

        let (_, correct) = evaluator
            .evaluate(submission(session_id, "a1", "h8"))
            .await
            .unwrap();
        assert!(!correct);

        let stored = repo.attempts_for_session(session_id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].attempt.submitted(), "h8");
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let repo = InMemoryRepository::new();
        let evaluator = AnswerEvaluator::new(fixed_clock(), Arc::new(repo));
        let err = evaluator
            .evaluate(submission(DrillSessionId::new(77), "a1", "a1"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
