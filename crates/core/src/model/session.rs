use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{AttemptTotals, StreakTracker};
use crate::model::{Attempt, DrillSessionId, DrillType, InputMethod, Perspective, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DrillSessionError {
    #[error("ended_at is before started_at")]
    InvalidTimeRange,

    #[error("session already ended")]
    AlreadyEnded,

    #[error("active session carries a non-empty summary")]
    SummaryWhileActive,
}

/// Totals frozen onto a session when it ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillSessionSummary {
    pub total_attempts: u32,
    pub correct: u32,
    pub avg_response_ms: u32,
    pub streak_best: u32,
}

impl DrillSessionSummary {
    #[must_use]
    pub fn from_totals(totals: &AttemptTotals, streak_best: u32) -> Self {
        Self {
            total_attempts: totals.total,
            correct: totals.correct,
            avg_response_ms: totals.avg_response_ms(),
            streak_best,
        }
    }

    /// Reduce a session's attempts, in answered order, in a single pass.
    #[must_use]
    pub fn from_attempts<'a>(attempts: impl IntoIterator<Item = &'a Attempt>) -> Self {
        let mut totals = AttemptTotals::default();
        let mut streak = StreakTracker::default();
        for attempt in attempts {
            totals.record(attempt.is_correct(), attempt.response_ms());
            streak.push(attempt.is_correct());
        }
        Self::from_totals(&totals, streak.best())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A timed practice session: active while `ended_at` is unset, terminal once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrillSession {
    user_id: UserId,
    drill_type: DrillType,
    input_method: InputMethod,
    perspective: Perspective,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    summary: DrillSessionSummary,
}

impl DrillSession {
    /// A new active session with an empty summary.
    #[must_use]
    pub fn start(
        user_id: UserId,
        drill_type: DrillType,
        input_method: InputMethod,
        perspective: Perspective,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            drill_type,
            input_method,
            perspective,
            started_at,
            ended_at: None,
            summary: DrillSessionSummary::default(),
        }
    }

    /// Rehydrate a session from storage.
    ///
    /// # Errors
    ///
    /// Returns `DrillSessionError::InvalidTimeRange` if it ended before it started,
    /// or `DrillSessionError::SummaryWhileActive` if an active row carries totals.
    pub fn from_persisted(
        user_id: UserId,
        drill_type: DrillType,
        input_method: InputMethod,
        perspective: Perspective,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        summary: DrillSessionSummary,
    ) -> Result<Self, DrillSessionError> {
        match ended_at {
            Some(ended) if ended < started_at => return Err(DrillSessionError::InvalidTimeRange),
            None if !summary.is_empty() => return Err(DrillSessionError::SummaryWhileActive),
            _ => {}
        }
        Ok(Self {
            user_id,
            drill_type,
            input_method,
            perspective,
            started_at,
            ended_at,
            summary,
        })
    }

    /// Move to the terminal state, freezing `summary`.
    ///
    /// # Errors
    ///
    /// Returns `DrillSessionError::AlreadyEnded` for a terminal session and
    /// `DrillSessionError::InvalidTimeRange` if `ended_at` precedes the start.
    pub fn end(
        &mut self,
        ended_at: DateTime<Utc>,
        summary: DrillSessionSummary,
    ) -> Result<(), DrillSessionError> {
        if self.ended_at.is_some() {
            return Err(DrillSessionError::AlreadyEnded);
        }
        if ended_at < self.started_at {
            return Err(DrillSessionError::InvalidTimeRange);
        }
        self.ended_at = Some(ended_at);
        self.summary = summary;
        Ok(())
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
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
    pub fn input_method(&self) -> InputMethod {
        self.input_method
    }

    #[must_use]
    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    #[must_use]
    pub fn summary(&self) -> &DrillSessionSummary {
        &self.summary
    }
}

/// A persisted session together with its storage identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrillSessionRow {
    pub id: DrillSessionId,
    pub session: DrillSession,
}

impl DrillSessionRow {
    #[must_use]
    pub fn new(id: DrillSessionId, session: DrillSession) -> Self {
        Self { id, session }
    }
}
