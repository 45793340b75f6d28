use std::sync::{Arc, Mutex, PoisonError};

use drill_core::model::{
    AttemptId, AttemptRow, DrillSession, DrillSessionError, DrillSessionId, DrillSessionRow,
    DrillSessionSummary, DrillType, InputMethod, Perspective, PieceKind, Question, UserId,
};
use drill_core::{Clock, QuestionGenerator};
use rand::rngs::StdRng;
use storage::repository::{AttemptRepository, DrillSessionRepository, Storage};
use tracing::{info, warn};

use crate::error::SessionError;
use crate::evaluator::{AnswerEvaluator, AnswerSubmission};
use crate::stats_service::StatsService;

/// Everything needed to open a drill session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrillSetup {
    pub user_id: UserId,
    pub drill_type: DrillType,
    pub input_method: InputMethod,
    pub perspective: Perspective,
    /// Piece to place on `PieceMovement` boards; random when `None`.
    pub piece_hint: Option<PieceKind>,
}

impl DrillSetup {
    #[must_use]
    pub fn new(user_id: UserId, drill_type: DrillType) -> Self {
        Self {
            user_id,
            drill_type,
            input_method: InputMethod::default(),
            perspective: Perspective::default(),
            piece_hint: None,
        }
    }

    #[must_use]
    pub fn with_input_method(mut self, input_method: InputMethod) -> Self {
        self.input_method = input_method;
        self
    }

    #[must_use]
    pub fn with_perspective(mut self, perspective: Perspective) -> Self {
        self.perspective = perspective;
        self
    }

    #[must_use]
    pub fn with_piece(mut self, piece: PieceKind) -> Self {
        self.piece_hint = Some(piece);
        self
    }
}

/// A freshly persisted session and its first question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartedDrill {
    pub session_id: DrillSessionId,
    pub question: Question,
}

/// Result of answering a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub attempt_id: AttemptId,
    pub correct: bool,
    pub next_question: Question,
}

/// Orchestrates the session lifecycle: start, answer, end.
#[derive(Clone)]
pub struct DrillService {
    clock: Clock,
    sessions: Arc<dyn DrillSessionRepository>,
    attempts: Arc<dyn AttemptRepository>,
    evaluator: AnswerEvaluator,
    stats: StatsService,
    seeded: Option<Arc<Mutex<QuestionGenerator<StdRng>>>>,
}

impl DrillService {
    #[must_use]
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn DrillSessionRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            evaluator: AnswerEvaluator::new(clock, Arc::clone(&attempts)),
            stats: StatsService::new(Arc::clone(&sessions), Arc::clone(&attempts)),
            sessions,
            attempts,
            seeded: None,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.attempts),
        )
    }

    /// Draw questions from a reproducible generator instead of the thread RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seeded = Some(Arc::new(Mutex::new(QuestionGenerator::seeded(seed))));
        self
    }

    #[must_use]
    pub fn stats(&self) -> &StatsService {
        &self.stats
    }

    fn next_question(&self, drill_type: DrillType, piece_hint: Option<PieceKind>) -> Question {
        match &self.seeded {
            Some(generator) => generator
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .generate(drill_type, piece_hint),
            None => QuestionGenerator::thread_local().generate(drill_type, piece_hint),
        }
    }

    /// Persist a new active session and return its first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the session cannot be written.
    pub async fn start_session(&self, setup: DrillSetup) -> Result<StartedDrill, SessionError> {
        let session = DrillSession::start(
            setup.user_id,
            setup.drill_type,
            setup.input_method,
            setup.perspective,
            self.clock.now(),
        );
        let session_id = self.sessions.create_session(&session).await?;
        info!(
            session_id = %session_id,
            user_id = %setup.user_id,
            drill_type = %setup.drill_type,
            input_method = setup.input_method.as_str(),
            perspective = setup.perspective.as_str(),
            "drill session started"
        );

        Ok(StartedDrill {
            session_id,
            question: self.next_question(setup.drill_type, setup.piece_hint),
        })
    }

    /// Evaluate an answer and hand out the next question.
    ///
    /// The session's state is not checked; an unknown session is reported by storage.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` for unknown sessions, or
    /// `SessionError::Storage` on persistence failures.
    pub async fn submit_answer(
        &self,
        submission: AnswerSubmission,
        next_piece: Option<PieceKind>,
    ) -> Result<AnswerOutcome, SessionError> {
        let drill_type = submission.drill_type;
        let (row, correct) = self.evaluator.evaluate(submission).await?;
        Ok(AnswerOutcome {
            attempt_id: row.id,
            correct,
            next_question: self.next_question(drill_type, next_piece),
        })
    }

    /// Freeze the session's summary and mark it ended.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the session does not exist or was
    /// ended concurrently, and `SessionError::AlreadyEnded` if it had already ended.
    pub async fn end_session(
        &self,
        session_id: DrillSessionId,
    ) -> Result<DrillSessionSummary, SessionError> {
        let row = self.sessions.get_session(session_id).await?;
        if !row.session.is_active() {
            warn!(session_id = %session_id, "end requested for an ended drill session");
            return Err(SessionError::AlreadyEnded);
        }

        let summary = self.stats.session_summary(session_id).await?;
        let ended_at = self.clock.now();
        if ended_at < row.session.started_at() {
            return Err(DrillSessionError::InvalidTimeRange.into());
        }
        self.sessions
            .end_session(session_id, ended_at, &summary)
            .await?;

        info!(
            session_id = %session_id,
            user_id = %row.session.user_id(),
            drill_type = %row.session.drill_type(),
            total = summary.total_attempts,
            correct = summary.correct,
            streak_best = summary.streak_best,
            "drill session ended"
        );
        Ok(summary)
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the session does not exist.
    pub async fn get_session(
        &self,
        session_id: DrillSessionId,
    ) -> Result<DrillSessionRow, SessionError> {
        Ok(self.sessions.get_session(session_id).await?)
    }

    /// The session's attempts in answered order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on persistence failures.
    pub async fn session_attempts(
        &self,
        session_id: DrillSessionId,
    ) -> Result<Vec<AttemptRow>, SessionError> {
        Ok(self.attempts.attempts_for_session(session_id).await?)
    }

    /// Most recently started sessions first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on persistence failures.
    pub async fn recent_sessions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<DrillSessionRow>, SessionError> {
        Ok(self.sessions.list_sessions(user_id, limit).await?)
    }
}
