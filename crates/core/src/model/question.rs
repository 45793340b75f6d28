use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{DrillType, Square};

/// Metadata key carrying the piece name on piece questions.
pub const PIECE_TYPE_KEY: &str = "piece_type";

/// A single drill question sent to the client.
///
/// Questions are transient: they are regenerated every turn and never stored.
/// The client echoes `target` back as the expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub drill_type: DrillType,
    pub target: Square,
    pub prompt: String,
    pub fen: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Question {
    /// Piece name carried in the metadata, if any.
    #[must_use]
    pub fn piece_type(&self) -> Option<&str> {
        self.metadata.get(PIECE_TYPE_KEY).map(String::as_str)
    }
}
