use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseDrillError {
    #[error("unknown drill type: {0}")]
    DrillType(String),

    #[error("unknown input method: {0}")]
    InputMethod(String),

    #[error("unknown perspective: {0}")]
    Perspective(String),

    #[error("unknown piece type: {0}")]
    PieceKind(String),
}

//
// ─── DRILL TYPE ────────────────────────────────────────────────────────────────
//

/// The four practice modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillType {
    /// A square is highlighted; the user names it.
    NameSquare,
    /// A square name is shown; the user locates it.
    FindSquare,
    /// A single piece is placed; the user enumerates its reachable squares.
    PieceMovement,
    /// Knight-only variant of piece movement.
    MoveNotation,
}

impl DrillType {
    /// Fixed enumeration order used when reporting per-drill statistics.
    pub const ALL: [DrillType; 4] = [
        DrillType::NameSquare,
        DrillType::FindSquare,
        DrillType::PieceMovement,
        DrillType::MoveNotation,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DrillType::NameSquare => "name_square",
            DrillType::FindSquare => "find_square",
            DrillType::PieceMovement => "piece_movement",
            DrillType::MoveNotation => "move_notation",
        }
    }

    /// Resolve a wire name, falling back to `NameSquare` for anything unrecognized.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim() {
            "find_square" => DrillType::FindSquare,
            "piece_movement" => DrillType::PieceMovement,
            "move_notation" => DrillType::MoveNotation,
            _ => DrillType::NameSquare,
        }
    }

    /// Whether questions of this type place a piece on the board.
    #[must_use]
    pub fn uses_piece(self) -> bool {
        matches!(self, DrillType::PieceMovement | DrillType::MoveNotation)
    }
}

impl fmt::Display for DrillType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DrillType {
    type Err = ParseDrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DrillType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseDrillError::DrillType(s.to_owned()))
    }
}

//
// ─── INPUT METHOD ──────────────────────────────────────────────────────────────
//

/// How the user enters answers. Recorded on the session, not interpreted by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMethod {
    #[default]
    Type,
    Click,
    Grid,
    BoardClick,
}

impl InputMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InputMethod::Type => "type",
            InputMethod::Click => "click",
            InputMethod::Grid => "grid",
            InputMethod::BoardClick => "board_click",
        }
    }
}

impl FromStr for InputMethod {
    type Err = ParseDrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "type" => Ok(InputMethod::Type),
            "click" => Ok(InputMethod::Click),
            "grid" => Ok(InputMethod::Grid),
            "board_click" => Ok(InputMethod::BoardClick),
            _ => Err(ParseDrillError::InputMethod(s.to_owned())),
        }
    }
}

//
// ─── PERSPECTIVE ───────────────────────────────────────────────────────────────
//

/// Side of the board shown at the bottom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Perspective {
    #[default]
    White,
    Black,
}

impl Perspective {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Perspective::White => "white",
            Perspective::Black => "black",
        }
    }
}

impl FromStr for Perspective {
    type Err = ParseDrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" => Ok(Perspective::White),
            "black" => Ok(Perspective::Black),
            _ => Err(ParseDrillError::Perspective(s.to_owned())),
        }
    }
}

//
// ─── PIECE KIND ────────────────────────────────────────────────────────────────
//

/// Piece placed on synthetic single-piece boards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
    Pawn,
}

impl PieceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PieceKind::Knight => "knight",
            PieceKind::Bishop => "bishop",
            PieceKind::Rook => "rook",
            PieceKind::Queen => "queen",
            PieceKind::King => "king",
            PieceKind::Pawn => "pawn",
        }
    }

    /// Upper-case (white) letter used in board encodings.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            PieceKind::Knight => 'N',
            PieceKind::Bishop => 'B',
            PieceKind::Rook => 'R',
            PieceKind::Queen => 'Q',
            PieceKind::King => 'K',
            PieceKind::Pawn => 'P',
        }
    }

    /// Inverse of [`PieceKind::letter`]; either colour's letter is accepted.
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'N' => Some(PieceKind::Knight),
            'B' => Some(PieceKind::Bishop),
            'R' => Some(PieceKind::Rook),
            'Q' => Some(PieceKind::Queen),
            'K' => Some(PieceKind::King),
            'P' => Some(PieceKind::Pawn),
            _ => None,
        }
    }
}

impl fmt::Display for PieceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PieceKind {
    type Err = ParseDrillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "knight" => Ok(PieceKind::Knight),
            "bishop" => Ok(PieceKind::Bishop),
            "rook" => Ok(PieceKind::Rook),
            "queen" => Ok(PieceKind::Queen),
            "king" => Ok(PieceKind::King),
            "pawn" => Ok(PieceKind::Pawn),
            _ => Err(ParseDrillError::PieceKind(s.to_owned())),
        }
    }
}
