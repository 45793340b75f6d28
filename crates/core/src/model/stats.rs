use serde::{Deserialize, Serialize};

use crate::aggregate::AttemptTotals;
use crate::model::{DrillType, Square};

/// Per-drill-type performance for one user, derived on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillStats {
    pub drill_type: DrillType,
    pub total_attempts: u32,
    pub correct_attempts: u32,
    pub accuracy: f64,
    pub avg_response_ms: u32,
    pub best_streak: u32,
    pub current_streak: u32,
}

impl DrillStats {
    /// Zero-valued stats carrying only the drill type.
    #[must_use]
    pub fn empty(drill_type: DrillType) -> Self {
        Self {
            drill_type,
            total_attempts: 0,
            correct_attempts: 0,
            accuracy: 0.0,
            avg_response_ms: 0,
            best_streak: 0,
            current_streak: 0,
        }
    }

    #[must_use]
    pub fn from_totals(
        drill_type: DrillType,
        totals: &AttemptTotals,
        best_streak: u32,
        current_streak: u32,
    ) -> Self {
        if totals.total == 0 {
            return Self::empty(drill_type);
        }
        Self {
            drill_type,
            total_attempts: totals.total,
            correct_attempts: totals.correct,
            accuracy: totals.accuracy(),
            avg_response_ms: totals.avg_response_ms(),
            best_streak,
            current_streak,
        }
    }
}

/// Whole-history performance for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallStats {
    pub total_sessions: u64,
    pub total_attempts: u32,
    pub overall_accuracy: f64,
    pub avg_response_ms: u32,
    pub best_streak: u32,
    /// Only drill types with at least one attempt, in `DrillType::ALL` order.
    pub drill_stats: Vec<DrillStats>,
}

impl OverallStats {
    /// Assemble overall stats; drill entries with no attempts are dropped.
    #[must_use]
    pub fn new(total_sessions: u64, totals: &AttemptTotals, drill_stats: Vec<DrillStats>) -> Self {
        let mut drill_stats: Vec<DrillStats> = drill_stats
            .into_iter()
            .filter(|s| s.total_attempts > 0)
            .collect();
        drill_stats.sort_by_key(|s| s.drill_type);
        let best_streak = drill_stats.iter().map(|s| s.best_streak).max().unwrap_or(0);

        Self {
            total_sessions,
            total_attempts: totals.total,
            overall_accuracy: totals.accuracy(),
            avg_response_ms: totals.avg_response_ms(),
            best_streak,
            drill_stats,
        }
    }
}

/// Accuracy observed on one square.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquareAccuracy {
    pub square: Square,
    pub total: u32,
    pub correct: u32,
    pub accuracy: f64,
}

/// Per-square accuracy over the full board. Always 64 entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapData {
    pub squares: Vec<SquareAccuracy>,
}

impl HeatmapData {
    #[must_use]
    pub fn get(&self, square: Square) -> Option<&SquareAccuracy> {
        self.squares.iter().find(|s| s.square == square)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(total: u32, correct: u32, response_ms_sum: u64) -> AttemptTotals {
        AttemptTotals {
            total,
            correct,
            response_ms_sum,
        }
    }

    #[test]
    fn drill_stats_with_no_attempts_are_zero_not_nan() {
        let stats = DrillStats::from_totals(DrillType::FindSquare, &AttemptTotals::default(), 3, 1);
        assert_eq!(stats, DrillStats::empty(DrillType::FindSquare));
        assert_eq!(stats.accuracy, 0.0);
    }

    #[test]
    fn overall_stats_drop_empty_drills_and_keep_enum_order() {
        let drills = vec![
            DrillStats::from_totals(DrillType::MoveNotation, &totals(2, 1, 200), 1, 0),
            DrillStats::empty(DrillType::FindSquare),
            DrillStats::from_totals(DrillType::NameSquare, &totals(4, 4, 400), 4, 4),
        ];
        let overall = OverallStats::new(3, &totals(6, 5, 600), drills);

        let kinds: Vec<_> = overall.drill_stats.iter().map(|s| s.drill_type).collect();
        assert_eq!(kinds, vec![DrillType::NameSquare, DrillType::MoveNotation]);
        assert_eq!(overall.best_streak, 4);
        assert_eq!(overall.avg_response_ms, 100);
        assert!((overall.overall_accuracy - 500.0 / 6.0).abs() < 1e-9);
    }
}
