use std::sync::Arc;

use drill_core::aggregate::{AttemptTotals, build_heatmap, session_streaks};
use drill_core::model::{
    DrillSessionId, DrillSessionSummary, DrillStats, DrillType, HeatmapData, OverallStats, UserId,
};
use storage::repository::{AttemptRepository, DrillSessionRepository};

use crate::error::StatsError;

/// Derives summaries, per-drill statistics and the heatmap from attempt history.
///
/// Nothing is cached; every call recomputes from storage.
#[derive(Clone)]
pub struct StatsService {
    sessions: Arc<dyn DrillSessionRepository>,
    attempts: Arc<dyn AttemptRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(
        sessions: Arc<dyn DrillSessionRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self { sessions, attempts }
    }

    /// Reduce a session's attempts. All zeros when it has none.
    ///
    /// Totals and streak come from one ordered read, so an answer landing
    /// mid-call is either fully counted or not at all.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` on storage failures.
    pub async fn session_summary(
        &self,
        session_id: DrillSessionId,
    ) -> Result<DrillSessionSummary, StatsError> {
        let rows = self.attempts.attempts_for_session(session_id).await?;
        Ok(DrillSessionSummary::from_attempts(rows.iter().map(|r| &r.attempt)))
    }

    /// Performance for one drill type across all of the user's sessions.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` on storage failures.
    pub async fn drill_stats(
        &self,
        user_id: UserId,
        drill_type: DrillType,
    ) -> Result<DrillStats, StatsError> {
        let outcomes = self.attempts.drill_outcomes(user_id, drill_type).await?;
        if outcomes.is_empty() {
            return Ok(DrillStats::empty(drill_type));
        }
        let totals = AttemptTotals::from_outcomes(&outcomes);
        let (best, current) = session_streaks(&outcomes);
        Ok(DrillStats::from_totals(drill_type, &totals, best, current))
    }

    /// Whole-history statistics plus one entry per practised drill type.
    ///
    /// The first failing per-drill fetch aborts the call.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` on storage failures.
    pub async fn overall_stats(&self, user_id: UserId) -> Result<OverallStats, StatsError> {
        let total_sessions = self.sessions.count_sessions(user_id).await?;
        let totals = self.attempts.overall_totals(user_id).await?;

        let mut drill_stats = Vec::with_capacity(DrillType::ALL.len());
        for drill_type in DrillType::ALL {
            drill_stats.push(self.drill_stats(user_id, drill_type).await?);
        }

        Ok(OverallStats::new(total_sessions, &totals, drill_stats))
    }

    /// Per-square accuracy over all 64 squares.
    ///
    /// # Errors
    ///
    /// Returns `StatsError` on storage failures.
    pub async fn heatmap(&self, user_id: UserId) -> Result<HeatmapData, StatsError> {
        let grouped = self.attempts.square_totals(user_id).await?;
        Ok(build_heatmap(grouped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drill_core::aggregate::{AttemptOutcome, SquareTotals};
    use drill_core::model::{
        Attempt, AttemptId, AttemptRow, DrillSession, InputMethod, Perspective,
    };
    use drill_core::time::fixed_now;
    use storage::repository::{InMemoryRepository, StorageError};

    async fn seed(
        repo: &InMemoryRepository,
        drill_type: DrillType,
        answers: &[(&str, &str)],
    ) -> DrillSessionId {
        let session = DrillSession::start(
            UserId::new(1),
            drill_type,
            InputMethod::Type,
            Perspective::White,
            fixed_now(),
        );
        let id = repo.create_session(&session).await.unwrap();
        for (i, (expected, submitted)) in answers.iter().enumerate() {
            let attempt = Attempt::evaluate(
                id,
                UserId::new(1),
                drill_type,
                "",
                expected,
                submitted,
                100 * (u32::try_from(i).unwrap() + 1),
                fixed_now(),
            );
            repo.append_attempt(&attempt).await.unwrap();
        }
        id
    }

    fn service(repo: &InMemoryRepository) -> StatsService {
        StatsService::new(Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn session_summary_reports_best_streak() {
        let repo = InMemoryRepository::new();
        let id = seed(
            &repo,
            DrillType::NameSquare,
            &[("a1", "a1"), ("b2", "b2"), ("c3", "x"), ("d4", "d4")],
        )
        .await;

        let summary = service(&repo).session_summary(id).await.unwrap();
        assert_eq!(summary.total_attempts, 4);
        assert_eq!(summary.correct, 3);
        assert_eq!(summary.avg_response_ms, 250);
        assert_eq!(summary.streak_best, 2);
    }

    #[tokio::test]
    async fn empty_history_yields_zero_values() {
        let repo = InMemoryRepository::new();
        let stats = service(&repo);
        let user = UserId::new(1);

        assert!(stats
            .session_summary(DrillSessionId::new(3))
            .await
            .unwrap()
            .is_empty());

        let drill = stats.drill_stats(user, DrillType::FindSquare).await.unwrap();
        assert_eq!(drill, DrillStats::empty(DrillType::FindSquare));
        assert_eq!(drill.accuracy, 0.0);

        let overall = stats.overall_stats(user).await.unwrap();
        assert_eq!(overall.total_sessions, 0);
        assert_eq!(overall.overall_accuracy, 0.0);
        assert!(overall.drill_stats.is_empty());

        let heatmap = stats.heatmap(user).await.unwrap();
        assert_eq!(heatmap.squares.len(), 64);
    }

    #[tokio::test]
    async fn overall_stats_lists_practised_drills_in_fixed_order() {
        let repo = InMemoryRepository::new();
        seed(&repo, DrillType::PieceMovement, &[("e4", "e4")]).await;
        seed(&repo, DrillType::NameSquare, &[("a1", "a1"), ("a2", "a3")]).await;

        let stats = service(&repo);
        let user = UserId::new(1);
        let first = stats.overall_stats(user).await.unwrap();
        assert_eq!(first.total_sessions, 2);
        assert_eq!(first.total_attempts, 3);
        let order: Vec<DrillType> = first.drill_stats.iter().map(|d| d.drill_type).collect();
        assert_eq!(order, vec![DrillType::NameSquare, DrillType::PieceMovement]);
        assert_eq!(first.best_streak, 1);

        let second = stats.overall_stats(user).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn drill_streaks_stay_within_sessions() {
        let repo = InMemoryRepository::new();
        seed(&repo, DrillType::FindSquare, &[("a1", "a1"), ("a2", "a2")]).await;
        seed(&repo, DrillType::FindSquare, &[("b1", "b1"), ("b2", "x"), ("b3", "b3")]).await;

        let drill = service(&repo)
            .drill_stats(UserId::new(1), DrillType::FindSquare)
            .await
            .unwrap();
        assert_eq!(drill.total_attempts, 5);
        assert_eq!(drill.correct_attempts, 4);
        assert_eq!(drill.accuracy, 80.0);
        assert_eq!(drill.best_streak, 2);
        assert_eq!(drill.current_streak, 1);
    }

    #[tokio::test]
    async fn heatmap_keys_on_expected_answer() {
        let repo = InMemoryRepository::new();
        seed(
            &repo,
            DrillType::NameSquare,
            &[("e4", "e4"), ("E4 ", "d4"), ("h8", "h8")],
        )
        .await;

        let heatmap = service(&repo).heatmap(UserId::new(1)).await.unwrap();
        assert_eq!(heatmap.squares.len(), 64);
        let e4 = heatmap.get("e4".parse().unwrap()).unwrap();
        assert_eq!((e4.total, e4.correct), (2, 1));
        assert_eq!(e4.accuracy, 50.0);
        let a1 = heatmap.get("a1".parse().unwrap()).unwrap();
        assert_eq!(a1.total, 0);
    }

    /// Attempt store whose per-drill reads fail for piece drills.
    struct BrokenDrillOutcomes;

    #[async_trait]
    impl AttemptRepository for BrokenDrillOutcomes {
        async fn append_attempt(&self, _attempt: &Attempt) -> Result<AttemptId, StorageError> {
            Err(StorageError::Conflict)
        }

        async fn attempts_for_session(
            &self,
            _session_id: DrillSessionId,
        ) -> Result<Vec<AttemptRow>, StorageError> {
            Ok(Vec::new())
        }

        async fn session_totals(
            &self,
            _session_id: DrillSessionId,
        ) -> Result<AttemptTotals, StorageError> {
            Ok(AttemptTotals::default())
        }

        async fn drill_totals(
            &self,
            _user_id: UserId,
            _drill_type: DrillType,
        ) -> Result<AttemptTotals, StorageError> {
            Ok(AttemptTotals::default())
        }

        async fn overall_totals(&self, _user_id: UserId) -> Result<AttemptTotals, StorageError> {
            Ok(AttemptTotals::default())
        }

        async fn square_totals(
            &self,
            _user_id: UserId,
        ) -> Result<Vec<SquareTotals>, StorageError> {
            Ok(Vec::new())
        }

        async fn drill_outcomes(
            &self,
            _user_id: UserId,
            drill_type: DrillType,
        ) -> Result<Vec<AttemptOutcome>, StorageError> {
            if drill_type == DrillType::PieceMovement {
                return Err(StorageError::Connection("drill outcomes unavailable".into()));
            }
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn overall_stats_aborts_on_failing_drill() {
        let stats = StatsService::new(
            Arc::new(InMemoryRepository::new()),
            Arc::new(BrokenDrillOutcomes),
        );
        let err = stats.overall_stats(UserId::new(1)).await.unwrap_err();
        assert!(matches!(err, StatsError::Storage(StorageError::Connection(_))));
    }

    /// In-memory store that records one more answer right after the first
    /// read of a session, like a submission racing an `end`.
    #[derive(Clone)]
    struct LateAnswer {
        inner: InMemoryRepository,
        late: Arc<std::sync::Mutex<Option<Attempt>>>,
    }

    impl LateAnswer {
        async fn land(&self) {
            let pending = self
                .late
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .take();
            if let Some(attempt) = pending {
                self.inner.append_attempt(&attempt).await.unwrap();
            }
        }
    }

    #[async_trait]
    impl AttemptRepository for LateAnswer {
        async fn append_attempt(&self, attempt: &Attempt) -> Result<AttemptId, StorageError> {
            self.inner.append_attempt(attempt).await
        }

        async fn attempts_for_session(
            &self,
            session_id: DrillSessionId,
        ) -> Result<Vec<AttemptRow>, StorageError> {
            let rows = self.inner.attempts_for_session(session_id).await;
            self.land().await;
            rows
        }

        async fn session_totals(
            &self,
            session_id: DrillSessionId,
        ) -> Result<AttemptTotals, StorageError> {
            let totals = self.inner.session_totals(session_id).await;
            self.land().await;
            totals
        }

        async fn drill_totals(
            &self,
            user_id: UserId,
            drill_type: DrillType,
        ) -> Result<AttemptTotals, StorageError> {
            let totals = self.inner.drill_totals(user_id, drill_type).await;
            self.land().await;
            totals
        }

        async fn overall_totals(&self, user_id: UserId) -> Result<AttemptTotals, StorageError> {
            self.inner.overall_totals(user_id).await
        }

        async fn square_totals(
            &self,
            user_id: UserId,
        ) -> Result<Vec<SquareTotals>, StorageError> {
            self.inner.square_totals(user_id).await
        }

        async fn drill_outcomes(
            &self,
            user_id: UserId,
            drill_type: DrillType,
        ) -> Result<Vec<AttemptOutcome>, StorageError> {
            let outcomes = self.inner.drill_outcomes(user_id, drill_type).await;
            self.land().await;
            outcomes
        }
    }

    #[tokio::test]
    async fn answers_landing_mid_call_never_skew_reductions() {
        let repo = InMemoryRepository::new();
        let id = seed(&repo, DrillType::NameSquare, &[("a1", "a1")]).await;
        let late = Attempt::evaluate(
            id,
            UserId::new(1),
            DrillType::NameSquare,
            "",
            "b2",
            "b2",
            100,
            fixed_now(),
        );
        let racing = LateAnswer {
            inner: repo.clone(),
            late: Arc::new(std::sync::Mutex::new(Some(late.clone()))),
        };
        let stats = StatsService::new(Arc::new(repo.clone()), Arc::new(racing.clone()));

        let summary = stats.session_summary(id).await.unwrap();
        assert_eq!(summary.total_attempts, 1);
        assert_eq!(summary.correct, 1);
        assert_eq!(summary.streak_best, 1);
        assert_eq!(summary.avg_response_ms, 100);

        *racing.late.lock().unwrap() = Some(late);
        let drill = stats
            .drill_stats(UserId::new(1), DrillType::NameSquare)
            .await
            .unwrap();
        assert_eq!(drill.total_attempts, 2);
        assert_eq!(drill.correct_attempts, 2);
        assert_eq!(drill.best_streak, 2);
        assert!(drill.best_streak <= drill.correct_attempts);
    }
}
