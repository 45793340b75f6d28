mod attempt;
mod drill;
mod ids;
mod question;
mod session;
mod square;
mod stats;

pub use ids::{AttemptId, DrillSessionId, ParseIdError, UserId};

pub use attempt::{normalize_answer, Attempt, AttemptError, AttemptMetadata, AttemptRow};
pub use drill::{DrillType, InputMethod, ParseDrillError, Perspective, PieceKind};
pub use question::{Question, PIECE_TYPE_KEY};
pub use session::{DrillSession, DrillSessionError, DrillSessionRow, DrillSessionSummary};
pub use square::{Square, SquareError, FILE_LABELS, RANK_LABELS};
pub use stats::{DrillStats, HeatmapData, OverallStats, SquareAccuracy};
