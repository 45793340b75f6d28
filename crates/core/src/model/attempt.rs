use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AttemptId, DrillSessionId, DrillType, PieceKind, Square, UserId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("stored correctness ({stored}) disagrees with answers {expected:?} / {submitted:?}")]
    CorrectnessMismatch {
        expected: String,
        submitted: String,
        stored: bool,
    },
}

/// Trim surrounding whitespace and lowercase.
#[must_use]
pub fn normalize_answer(raw: &str) -> String {
    raw.trim().to_lowercase()
}

//
// ─── METADATA ─────────────────────────────────────────────────────────────────
//

/// Optional context captured with piece questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece_type: Option<PieceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_square: Option<Square>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
}

impl AttemptMetadata {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.piece_type.is_none() && self.from_square.is_none() && self.fen.is_none()
    }
}

//
// ─── ATTEMPT ──────────────────────────────────────────────────────────────────
//

/// One answered question.
///
/// Answers are stored normalized, and `correct` is always the equality of the
/// two normalized strings. There is no constructor that accepts a correctness
/// flag without checking it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    session_id: DrillSessionId,
    user_id: UserId,
    drill_type: DrillType,
    question: String,
    expected: String,
    submitted: String,
    correct: bool,
    response_ms: u32,
    answered_at: DateTime<Utc>,
    metadata: AttemptMetadata,
}

impl Attempt {
    /// Grade a submitted answer against the expected one.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn evaluate(
        session_id: DrillSessionId,
        user_id: UserId,
        drill_type: DrillType,
        question: impl Into<String>,
        expected: &str,
        submitted: &str,
        response_ms: u32,
        answered_at: DateTime<Utc>,
    ) -> Self {
        let expected = normalize_answer(expected);
        let submitted = normalize_answer(submitted);
        let correct = expected == submitted;
        Self {
            session_id,
            user_id,
            drill_type,
            question: question.into(),
            expected,
            submitted,
            correct,
            response_ms,
            answered_at,
            metadata: AttemptMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: AttemptMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Rehydrate an attempt from storage.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::CorrectnessMismatch` if the stored flag does not
    /// match the stored answers.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        session_id: DrillSessionId,
        user_id: UserId,
        drill_type: DrillType,
        question: String,
        expected: String,
        submitted: String,
        correct: bool,
        response_ms: u32,
        answered_at: DateTime<Utc>,
        metadata: AttemptMetadata,
    ) -> Result<Self, AttemptError> {
        let attempt = Self::evaluate(
            session_id,
            user_id,
            drill_type,
            question,
            &expected,
            &submitted,
            response_ms,
            answered_at,
        )
        .with_metadata(metadata);

        if attempt.correct != correct {
            return Err(AttemptError::CorrectnessMismatch {
                expected,
                submitted,
                stored: correct,
            });
        }
        Ok(attempt)
    }

    #[must_use]
    pub fn session_id(&self) -> DrillSessionId {
        self.session_id
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn drill_type(&self) -> DrillType {
        self.drill_type
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn expected(&self) -> &str {
        &self.expected
    }

    #[must_use]
    pub fn submitted(&self) -> &str {
        &self.submitted
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.correct
    }

    #[must_use]
    pub fn response_ms(&self) -> u32 {
        self.response_ms
    }

    #[must_use]
    pub fn answered_at(&self) -> DateTime<Utc> {
        self.answered_at
    }

    #[must_use]
    pub fn metadata(&self) -> &AttemptMetadata {
        &self.metadata
    }
}

/// A persisted attempt together with its storage identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRow {
    pub id: AttemptId,
    pub attempt: Attempt,
}

impl AttemptRow {
    #[must_use]
    pub fn new(id: AttemptId, attempt: Attempt) -> Self {
        Self { id, attempt }
    }
}
