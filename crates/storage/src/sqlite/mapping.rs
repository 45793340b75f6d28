use chrono::{DateTime, Utc};
use drill_core::model::{
    Attempt, AttemptId, AttemptMetadata, AttemptRow, DrillSession, DrillSessionId,
    DrillSessionRow, DrillSessionSummary, DrillType, InputMethod, Perspective, PieceKind, Square,
    UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn session_id_from_i64(v: i64) -> Result<DrillSessionId, StorageError> {
    Ok(DrillSessionId::new(i64_to_u64("session_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn attempt_id_from_i64(v: i64) -> Result<AttemptId, StorageError> {
    Ok(AttemptId::new(i64_to_u64("attempt_id", v)?))
}

fn drill_type_column(row: &SqliteRow) -> Result<DrillType, StorageError> {
    row.try_get::<String, _>("drill_type")
        .map_err(ser)?
        .parse()
        .map_err(ser)
}

pub(crate) fn map_session_row(row: &SqliteRow) -> Result<DrillSessionRow, StorageError> {
    let input_method: InputMethod = row
        .try_get::<String, _>("input_method")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let perspective: Perspective = row
        .try_get::<String, _>("perspective")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let started_at: DateTime<Utc> = row.try_get("started_at").map_err(ser)?;
    let ended_at: Option<DateTime<Utc>> = row.try_get("ended_at").map_err(ser)?;

    let summary = DrillSessionSummary {
        total_attempts: u32_from_i64(
            "total_attempts",
            row.try_get::<i64, _>("total_attempts").map_err(ser)?,
        )?,
        correct: u32_from_i64("correct", row.try_get::<i64, _>("correct").map_err(ser)?)?,
        avg_response_ms: u32_from_i64(
            "avg_response_ms",
            row.try_get::<i64, _>("avg_response_ms").map_err(ser)?,
        )?,
        streak_best: u32_from_i64(
            "streak_best",
            row.try_get::<i64, _>("streak_best").map_err(ser)?,
        )?,
    };

    let session = DrillSession::from_persisted(
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        drill_type_column(row)?,
        input_method,
        perspective,
        started_at,
        ended_at,
        summary,
    )
    .map_err(ser)?;

    Ok(DrillSessionRow::new(
        session_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        session,
    ))
}

pub(crate) fn map_attempt_row(row: &SqliteRow) -> Result<AttemptRow, StorageError> {
    let piece_type = row
        .try_get::<Option<String>, _>("piece_type")
        .map_err(ser)?
        .map(|raw| raw.parse::<PieceKind>().map_err(ser))
        .transpose()?;
    let from_square = row
        .try_get::<Option<String>, _>("from_square")
        .map_err(ser)?
        .map(|raw| raw.parse::<Square>().map_err(ser))
        .transpose()?;
    let metadata = AttemptMetadata {
        piece_type,
        from_square,
        fen: row.try_get("board").map_err(ser)?,
    };

    let attempt = Attempt::from_persisted(
        session_id_from_i64(row.try_get::<i64, _>("session_id").map_err(ser)?)?,
        user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        drill_type_column(row)?,
        row.try_get("question").map_err(ser)?,
        row.try_get("correct_answer").map_err(ser)?,
        row.try_get("user_answer").map_err(ser)?,
        row.try_get::<bool, _>("correct").map_err(ser)?,
        u32_from_i64(
            "response_ms",
            row.try_get::<i64, _>("response_ms").map_err(ser)?,
        )?,
        row.try_get("answered_at").map_err(ser)?,
        metadata,
    )
    .map_err(ser)?;

    Ok(AttemptRow::new(
        attempt_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        attempt,
    ))
}
