//! Shared error types for the services crate.

use thiserror::Error;

use drill_core::model::{DrillSessionError, ParseDrillError, ParseIdError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsError {
    #[error("drill session not found")]
    NotFound,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for StatsError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => StatsError::NotFound,
            other => StatsError::Storage(other),
        }
    }
}

/// Errors emitted by `DrillService` and `AnswerEvaluator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error(transparent)]
    InvalidId(#[from] ParseIdError),
    #[error(transparent)]
    InvalidRequest(#[from] ParseDrillError),
    #[error("drill session not found")]
    NotFound,
    #[error("drill session already ended")]
    AlreadyEnded,
    #[error(transparent)]
    Session(#[from] DrillSessionError),
    #[error(transparent)]
    Stats(StatsError),
    #[error(transparent)]
    Storage(StorageError),
}

impl SessionError {
    /// The request named a session that does not exist or is no longer active.
    ///
    /// A second `end` of the same session lands here too.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            SessionError::NotFound
                | SessionError::AlreadyEnded
                | SessionError::Stats(StatsError::NotFound)
        )
    }

    /// The request itself was malformed.
    #[must_use]
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            SessionError::InvalidId(_) | SessionError::InvalidRequest(_)
        )
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => SessionError::NotFound,
            other => SessionError::Storage(other),
        }
    }
}

impl From<StatsError> for SessionError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::NotFound => SessionError::NotFound,
            other => SessionError::Stats(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_not_found_maps_to_not_found() {
        let err = SessionError::from(StorageError::NotFound);
        assert!(err.is_not_found());
        assert!(!err.is_bad_request());

        let err = SessionError::from(StatsError::from(StorageError::NotFound));
        assert!(matches!(err, SessionError::NotFound));
    }

    #[test]
    fn already_ended_is_not_found() {
        let err = SessionError::AlreadyEnded;
        assert!(err.is_not_found());
        assert!(!err.is_bad_request());
    }

    #[test]
    fn connection_failures_are_neither_404_nor_400() {
        let err = SessionError::from(StorageError::Connection("gone".into()));
        assert!(!err.is_not_found());
        assert!(!err.is_bad_request());
    }

    #[test]
    fn malformed_ids_are_bad_requests() {
        let parse = "abc".parse::<drill_core::model::DrillSessionId>().unwrap_err();
        assert!(SessionError::from(parse).is_bad_request());
        assert!(SessionError::from(ParseDrillError::Perspective("red".into())).is_bad_request());
    }
}
