use chrono::{DateTime, Utc};
use drill_core::model::{DrillSession, DrillSessionId, DrillSessionRow, DrillSessionSummary, UserId};

use super::{
    SqliteRepository,
    mapping::{conn, id_i64, map_session_row, session_id_from_i64},
};
use crate::repository::{DrillSessionRepository, StorageError};

const SESSION_COLUMNS: &str = r"
    id, user_id, drill_type, input_method, perspective, started_at, ended_at,
    total_attempts, correct, avg_response_ms, streak_best
";

#[async_trait::async_trait]
impl DrillSessionRepository for SqliteRepository {
    async fn create_session(&self, session: &DrillSession) -> Result<DrillSessionId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO drill_sessions (
                    user_id, drill_type, input_method, perspective, started_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_i64("user_id", session.user_id().value())?)
        .bind(session.drill_type().as_str())
        .bind(session.input_method().as_str())
        .bind(session.perspective().as_str())
        .bind(session.started_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        session_id_from_i64(res.last_insert_rowid())
    }

    async fn get_session(&self, id: DrillSessionId) -> Result<DrillSessionRow, StorageError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM drill_sessions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("session_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        map_session_row(&row)
    }

    async fn end_session(
        &self,
        id: DrillSessionId,
        ended_at: DateTime<Utc>,
        summary: &DrillSessionSummary,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
                UPDATE drill_sessions
                SET ended_at = ?2,
                    total_attempts = ?3,
                    correct = ?4,
                    avg_response_ms = ?5,
                    streak_best = ?6
                WHERE id = ?1 AND ended_at IS NULL
            ",
        )
        .bind(id_i64("session_id", id.value())?)
        .bind(ended_at)
        .bind(i64::from(summary.total_attempts))
        .bind(i64::from(summary.correct))
        .bind(i64::from(summary.avg_response_ms))
        .bind(i64::from(summary.streak_best))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn count_sessions(&self, user_id: UserId) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM drill_sessions WHERE user_id = ?1")
            .bind(id_i64("user_id", user_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        u64::try_from(count).map_err(|_| StorageError::Serialization("negative count".into()))
    }

    async fn list_sessions(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<DrillSessionRow>, StorageError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM drill_sessions
             WHERE user_id = ?1
             ORDER BY started_at DESC, id DESC
             LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_session_row(&row)?);
        }
        Ok(out)
    }
}
