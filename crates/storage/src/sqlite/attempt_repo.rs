use drill_core::aggregate::{AttemptOutcome, AttemptTotals, SquareTotals};
use drill_core::model::{Attempt, AttemptId, AttemptRow, DrillSessionId, DrillType, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::{
    SqliteRepository,
    mapping::{
        attempt_id_from_i64, conn, id_i64, map_attempt_row, ser, session_id_from_i64,
        u32_from_i64,
    },
};
use crate::repository::{AttemptRepository, StorageError};

const TOTALS_COLUMNS: &str = r"
    COUNT(*) AS total,
    COALESCE(SUM(correct), 0) AS correct,
    COALESCE(SUM(response_ms), 0) AS response_ms_sum
";

fn map_totals_row(row: &SqliteRow) -> Result<AttemptTotals, StorageError> {
    let sum: i64 = row.try_get("response_ms_sum").map_err(ser)?;
    Ok(AttemptTotals {
        total: u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
        correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        response_ms_sum: u64::try_from(sum)
            .map_err(|_| StorageError::Serialization(format!("invalid response_ms_sum: {sum}")))?,
    })
}

fn insert_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => conn(e),
    }
}

#[async_trait::async_trait]
impl AttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &Attempt) -> Result<AttemptId, StorageError> {
        let metadata = attempt.metadata();
        let res = sqlx::query(
            r"
                INSERT INTO attempts (
                    session_id, user_id, drill_type, question, correct_answer,
                    user_answer, correct, response_ms, answered_at,
                    piece_type, from_square, board
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            ",
        )
        .bind(id_i64("session_id", attempt.session_id().value())?)
        .bind(id_i64("user_id", attempt.user_id().value())?)
        .bind(attempt.drill_type().as_str())
        .bind(attempt.question())
        .bind(attempt.expected())
        .bind(attempt.submitted())
        .bind(attempt.is_correct())
        .bind(i64::from(attempt.response_ms()))
        .bind(attempt.answered_at())
        .bind(metadata.piece_type.map(|p| p.as_str()))
        .bind(metadata.from_square.map(|s| s.to_string()))
        .bind(metadata.fen.as_deref())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        attempt_id_from_i64(res.last_insert_rowid())
    }

    async fn attempts_for_session(
        &self,
        session_id: DrillSessionId,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    id, session_id, user_id, drill_type, question, correct_answer,
                    user_answer, correct, response_ms, answered_at,
                    piece_type, from_square, board
                FROM attempts
                WHERE session_id = ?1
                ORDER BY id ASC
            ",
        )
        .bind(id_i64("session_id", session_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }
        Ok(out)
    }

    async fn session_totals(
        &self,
        session_id: DrillSessionId,
    ) -> Result<AttemptTotals, StorageError> {
        let sql = format!("SELECT {TOTALS_COLUMNS} FROM attempts WHERE session_id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("session_id", session_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        map_totals_row(&row)
    }

    async fn drill_totals(
        &self,
        user_id: UserId,
        drill_type: DrillType,
    ) -> Result<AttemptTotals, StorageError> {
        let sql = format!(
            "SELECT {TOTALS_COLUMNS} FROM attempts WHERE user_id = ?1 AND drill_type = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .bind(drill_type.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        map_totals_row(&row)
    }

    async fn overall_totals(&self, user_id: UserId) -> Result<AttemptTotals, StorageError> {
        let sql = format!("SELECT {TOTALS_COLUMNS} FROM attempts WHERE user_id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("user_id", user_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        map_totals_row(&row)
    }

    async fn square_totals(&self, user_id: UserId) -> Result<Vec<SquareTotals>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT
                    correct_answer,
                    COUNT(*) AS total,
                    COALESCE(SUM(correct), 0) AS correct
                FROM attempts
                WHERE user_id = ?1
                GROUP BY correct_answer
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(SquareTotals {
                key: row.try_get("correct_answer").map_err(ser)?,
                total: u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?,
                correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
            });
        }
        Ok(out)
    }

    async fn drill_outcomes(
        &self,
        user_id: UserId,
        drill_type: DrillType,
    ) -> Result<Vec<AttemptOutcome>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT session_id, correct, response_ms
                FROM attempts
                WHERE user_id = ?1 AND drill_type = ?2
                ORDER BY id ASC
            ",
        )
        .bind(id_i64("user_id", user_id.value())?)
        .bind(drill_type.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(AttemptOutcome {
                session_id: session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
                correct: row.try_get("correct").map_err(ser)?,
                response_ms: u32_from_i64(
                    "response_ms",
                    row.try_get::<i64, _>("response_ms").map_err(ser)?,
                )?,
            });
        }
        Ok(out)
    }
}
