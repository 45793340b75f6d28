//! Request and response shapes for a presentation layer.
//!
//! Wire strings are resolved here: empty fields take their defaults, unknown
//! drill types fall back to `name_square`, unknown input methods and
//! perspectives are rejected.

use drill_core::model::{
    AttemptMetadata, DrillSessionId, DrillSessionSummary, DrillType, InputMethod, Perspective,
    PieceKind, Question, UserId,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::drill_service::{DrillService, DrillSetup};
use crate::error::SessionError;
use crate::evaluator::AnswerSubmission;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StartDrillRequest {
    pub drill_type: String,
    pub input_method: String,
    pub perspective: String,
    pub piece_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartDrillResponse {
    pub session_id: DrillSessionId,
    pub question: Question,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckAnswerRequest {
    pub session_id: String,
    pub target: String,
    pub answer: String,
    pub response_ms: u32,
    pub drill_type: String,
    /// Piece for the next question.
    pub piece_type: Option<String>,
    /// Board encoding of the answered question, for piece drills.
    pub fen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckAnswerResponse {
    pub correct: bool,
    pub next_question: Question,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EndDrillRequest {
    pub session_id: String,
}

/// Resolve a drill type name. Empty and unknown names mean `name_square`.
#[must_use]
pub fn drill_type_from_wire(raw: &str) -> DrillType {
    let raw = raw.trim();
    if raw.is_empty() {
        return DrillType::NameSquare;
    }
    raw.parse().unwrap_or_else(|_| {
        debug!(drill_type = raw, "unknown drill type, using name_square");
        DrillType::from_wire(raw)
    })
}

/// # Errors
///
/// Returns `SessionError::InvalidRequest` for unknown names.
pub fn input_method_from_wire(raw: &str) -> Result<InputMethod, SessionError> {
    match raw.trim() {
        "" => Ok(InputMethod::default()),
        other => Ok(other.parse()?),
    }
}

/// # Errors
///
/// Returns `SessionError::InvalidRequest` for unknown names.
pub fn perspective_from_wire(raw: &str) -> Result<Perspective, SessionError> {
    match raw.trim() {
        "" => Ok(Perspective::default()),
        other => Ok(other.parse()?),
    }
}

/// Metadata recorded with a piece-drill attempt: the piece, the square it
/// stands on and the board encoding. Other drill types record nothing.
///
/// The piece comes from the board encoding when one is supplied, since the
/// request's piece name describes the next question.
#[must_use]
pub fn attempt_metadata(
    drill_type: DrillType,
    target: &str,
    piece_hint: Option<PieceKind>,
    fen: Option<&str>,
) -> AttemptMetadata {
    if !drill_type.uses_piece() {
        return AttemptMetadata::default();
    }
    let fen = fen.map(str::trim).filter(|s| !s.is_empty());
    let placed = fen
        .and_then(|f| f.split_whitespace().next())
        .and_then(|placement| placement.chars().find_map(PieceKind::from_letter));
    let piece_type = match drill_type {
        DrillType::MoveNotation => Some(PieceKind::Knight),
        _ => placed.or(piece_hint),
    };
    AttemptMetadata {
        piece_type,
        from_square: target.trim().to_ascii_lowercase().parse().ok(),
        fen: fen.map(str::to_owned),
    }
}

/// Unknown or empty piece names are dropped and a random piece is used.
#[must_use]
pub fn piece_hint_from_wire(raw: Option<&str>) -> Option<PieceKind> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match raw.parse() {
        Ok(piece) => Some(piece),
        Err(_) => {
            debug!(piece_type = raw, "unknown piece hint ignored");
            None
        }
    }
}

impl StartDrillRequest {
    /// # Errors
    ///
    /// Returns `SessionError::InvalidRequest` for unknown input methods or perspectives.
    pub fn into_setup(self, user_id: UserId) -> Result<DrillSetup, SessionError> {
        Ok(DrillSetup {
            user_id,
            drill_type: drill_type_from_wire(&self.drill_type),
            input_method: input_method_from_wire(&self.input_method)?,
            perspective: perspective_from_wire(&self.perspective)?,
            piece_hint: piece_hint_from_wire(self.piece_type.as_deref()),
        })
    }
}

impl DrillService {
    /// # Errors
    ///
    /// Returns `SessionError` for invalid requests or storage failures.
    pub async fn start_drill(
        &self,
        user_id: UserId,
        request: StartDrillRequest,
    ) -> Result<StartDrillResponse, SessionError> {
        let started = self.start_session(request.into_setup(user_id)?).await?;
        Ok(StartDrillResponse {
            session_id: started.session_id,
            question: started.question,
        })
    }

    /// The expected answer is the question's target, echoed back by the client.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidId` for a malformed session id, or
    /// `SessionError::NotFound` for an unknown one.
    pub async fn check_answer(
        &self,
        user_id: UserId,
        request: CheckAnswerRequest,
    ) -> Result<CheckAnswerResponse, SessionError> {
        let session_id: DrillSessionId = request.session_id.parse()?;
        let drill_type = drill_type_from_wire(&request.drill_type);
        let next_piece = piece_hint_from_wire(request.piece_type.as_deref());
        let metadata = attempt_metadata(
            drill_type,
            &request.target,
            next_piece,
            request.fen.as_deref(),
        );
        let submission = AnswerSubmission {
            session_id,
            user_id,
            drill_type,
            question: request.target.clone(),
            expected: request.target,
            submitted: request.answer,
            response_ms: request.response_ms,
            metadata,
        };
        let outcome = self.submit_answer(submission, next_piece).await?;
        Ok(CheckAnswerResponse {
            correct: outcome.correct,
            next_question: outcome.next_question,
        })
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidId`, `SessionError::NotFound` or
    /// `SessionError::AlreadyEnded`.
    pub async fn end_drill(
        &self,
        request: EndDrillRequest,
    ) -> Result<DrillSessionSummary, SessionError> {
        let session_id: DrillSessionId = request.session_id.parse()?;
        self.end_session(session_id).await
    }
}
