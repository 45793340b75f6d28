use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// File labels, left to right from White's side.
pub const FILE_LABELS: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];

/// Rank labels, bottom to top from White's side.
pub const RANK_LABELS: [char; 8] = ['1', '2', '3', '4', '5', '6', '7', '8'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SquareError {
    #[error("square index out of range: file {file}, rank {rank}")]
    OutOfRange { file: u8, rank: u8 },

    #[error("not an algebraic square: {0:?}")]
    Invalid(String),
}

/// A square on the 8x8 board, stored as zero-based file and rank indices.
///
/// The derived ordering is file-major, rank-minor (`a1 < a2 < … < a8 < b1`),
/// which is also the iteration order of [`Square::all`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Build a square from zero-based indices.
    ///
    /// # Errors
    ///
    /// Returns `SquareError::OutOfRange` if either index is 8 or more.
    pub fn new(file: u8, rank: u8) -> Result<Self, SquareError> {
        if file >= 8 || rank >= 8 {
            return Err(SquareError::OutOfRange { file, rank });
        }
        Ok(Self { file, rank })
    }

    /// Indices are reduced modulo 8; callers pass values already in `0..8`.
    pub(crate) fn from_board_indices(file: u8, rank: u8) -> Self {
        Self {
            file: file % 8,
            rank: rank % 8,
        }
    }

    /// Zero-based file index (`a` = 0).
    #[must_use]
    pub fn file(&self) -> u8 {
        self.file
    }

    /// Zero-based rank index (`1` = 0).
    #[must_use]
    pub fn rank(&self) -> u8 {
        self.rank
    }

    #[must_use]
    pub fn file_label(&self) -> char {
        FILE_LABELS[usize::from(self.file)]
    }

    #[must_use]
    pub fn rank_label(&self) -> char {
        RANK_LABELS[usize::from(self.rank)]
    }

    /// All 64 squares, file-major then rank-minor.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..8_u8).flat_map(|file| (0..8_u8).map(move |rank| Square { file, rank }))
    }
}

impl fmt::Debug for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Square({self})")
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file_label(), self.rank_label())
    }
}

impl FromStr for Square {
    type Err = SquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(file_ch), Some(rank_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(SquareError::Invalid(s.to_owned()));
        };

        let file = FILE_LABELS.iter().position(|c| *c == file_ch);
        let rank = RANK_LABELS.iter().position(|c| *c == rank_ch);
        match (file, rank) {
            (Some(file), Some(rank)) => Ok(Self {
                file: u8::try_from(file).map_err(|_| SquareError::Invalid(s.to_owned()))?,
                rank: u8::try_from(rank).map_err(|_| SquareError::Invalid(s.to_owned()))?,
            }),
            _ => Err(SquareError::Invalid(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Square {
    type Error = SquareError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> Self {
        square.to_string()
    }
}
