//! Pure reductions over attempt history.
//!
//! Storage adapters produce the raw inputs (totals, ordered outcomes, per-key
//! counts); everything here is deterministic and allocation-light so it can be
//! shared by the in-memory and SQL backends.

use std::collections::{BTreeMap, HashMap};

use crate::model::{Attempt, DrillSessionId, HeatmapData, Square, SquareAccuracy};

/// `correct / total * 100`, or `0.0` when there is nothing to divide.
#[must_use]
pub fn accuracy(correct: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    f64::from(correct) / f64::from(total) * 100.0
}

//
// ─── TOTALS ────────────────────────────────────────────────────────────────────
//

/// Count, correct count and latency sum over a set of attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptTotals {
    pub total: u32,
    pub correct: u32,
    pub response_ms_sum: u64,
}

impl AttemptTotals {
    pub fn record(&mut self, correct: bool, response_ms: u32) {
        self.total = self.total.saturating_add(1);
        if correct {
            self.correct = self.correct.saturating_add(1);
        }
        self.response_ms_sum = self.response_ms_sum.saturating_add(u64::from(response_ms));
    }

    #[must_use]
    pub fn from_attempts<'a>(attempts: impl IntoIterator<Item = &'a Attempt>) -> Self {
        let mut totals = Self::default();
        for attempt in attempts {
            totals.record(attempt.is_correct(), attempt.response_ms());
        }
        totals
    }

    #[must_use]
    pub fn from_outcomes(outcomes: &[AttemptOutcome]) -> Self {
        let mut totals = Self::default();
        for outcome in outcomes {
            totals.record(outcome.correct, outcome.response_ms);
        }
        totals
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        accuracy(self.correct, self.total)
    }

    /// Mean latency, truncated toward zero.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn avg_response_ms(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        let mean = self.response_ms_sum as f64 / f64::from(self.total);
        mean.trunc() as u32
    }
}

//
// ─── STREAKS ───────────────────────────────────────────────────────────────────
//

/// Running streak over outcomes fed in answered order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakTracker {
    current: u32,
    best: u32,
}

impl StreakTracker {
    pub fn push(&mut self, correct: bool) {
        if correct {
            self.current = self.current.saturating_add(1);
            self.best = self.best.max(self.current);
        } else {
            self.current = 0;
        }
    }

    #[must_use]
    pub fn from_outcomes(outcomes: impl IntoIterator<Item = bool>) -> Self {
        let mut tracker = Self::default();
        for correct in outcomes {
            tracker.push(correct);
        }
        tracker
    }

    /// Length of the trailing run of correct answers.
    #[must_use]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[must_use]
    pub fn best(&self) -> u32 {
        self.best
    }
}

/// One attempt reduced to what per-drill statistics need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub session_id: DrillSessionId,
    pub correct: bool,
    pub response_ms: u32,
}

/// Best and current streak over outcomes in answered order.
///
/// Streaks never span sessions: `best` is the longest run inside any single
/// session, `current` is the trailing run of the session that holds the last
/// outcome.
#[must_use]
pub fn session_streaks(outcomes: &[AttemptOutcome]) -> (u32, u32) {
    let mut per_session: HashMap<DrillSessionId, StreakTracker> = HashMap::new();
    for outcome in outcomes {
        per_session
            .entry(outcome.session_id)
            .or_default()
            .push(outcome.correct);
    }

    let best = per_session.values().map(StreakTracker::best).max().unwrap_or(0);
    let current = outcomes
        .last()
        .and_then(|last| per_session.get(&last.session_id))
        .map_or(0, StreakTracker::current);
    (best, current)
}

//
// ─── HEATMAP ───────────────────────────────────────────────────────────────────
//

/// Attempts grouped by expected answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquareTotals {
    pub key: String,
    pub total: u32,
    pub correct: u32,
}

/// Build the 64-entry heatmap from grouped totals.
///
/// Keys that are not board squares are ignored; squares with no observations
/// report zero. Entries come out file-major, rank-minor.
#[must_use]
pub fn build_heatmap(grouped: impl IntoIterator<Item = SquareTotals>) -> HeatmapData {
    let mut observed: BTreeMap<Square, (u32, u32)> = BTreeMap::new();
    for row in grouped {
        let Ok(square) = row.key.parse::<Square>() else {
            continue;
        };
        let entry = observed.entry(square).or_default();
        entry.0 = entry.0.saturating_add(row.total);
        entry.1 = entry.1.saturating_add(row.correct);
    }

    let squares = Square::all()
        .map(|square| {
            let (total, correct) = observed.get(&square).copied().unwrap_or_default();
            SquareAccuracy {
                square,
                total,
                correct,
                accuracy: accuracy(correct, total),
            }
        })
        .collect();

    HeatmapData { squares }
}
