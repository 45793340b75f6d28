//! Random question generation.
//!
//! Boards are synthetic: either empty or a single white piece, always with
//! White to move, no castling rights, no en-passant target, halfmove clock 0
//! and fullmove number 1.

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use crate::model::{DrillType, PieceKind, Question, Square, PIECE_TYPE_KEY};

/// Side to move, castling, en passant, halfmove clock, fullmove number.
const POSITION_TRAILER: &str = "w - - 0 1";

/// Encoding of a board with no pieces.
pub const EMPTY_BOARD: &str = "8/8/8/8/8/8/8/8 w - - 0 1";

/// Pieces drawn when no hint is given. Pawns are only placed on request.
pub const RANDOM_PIECES: [PieceKind; 5] = [
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Rook,
    PieceKind::Queen,
    PieceKind::King,
];

/// Encode a board holding exactly `piece` on `square`.
#[must_use]
pub fn single_piece_fen(piece: PieceKind, square: Square) -> String {
    let file = square.file();
    let rows: Vec<String> = (0..8_u8)
        .rev()
        .map(|rank| {
            if rank != square.rank() {
                return "8".to_owned();
            }
            let mut row = String::with_capacity(3);
            if file > 0 {
                row.push(char::from(b'0' + file));
            }
            row.push(piece.letter());
            if file < 7 {
                row.push(char::from(b'0' + (7 - file)));
            }
            row
        })
        .collect();
    format!("{} {POSITION_TRAILER}", rows.join("/"))
}

/// Produces questions from a random source.
///
/// Draws are independent and uniform: file and rank are sampled separately
/// from `0..8`, pieces from [`RANDOM_PIECES`].
#[derive(Debug, Clone)]
pub struct QuestionGenerator<R = ThreadRng> {
    rng: R,
}

impl QuestionGenerator<ThreadRng> {
    /// Generator backed by the thread-local RNG.
    #[must_use]
    pub fn thread_local() -> Self {
        Self { rng: rand::rng() }
    }
}

impl QuestionGenerator<StdRng> {
    /// Reproducible generator for tests and replays.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> QuestionGenerator<R> {
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Build the next question for `drill_type`.
    ///
    /// `piece_hint` only matters for `PieceMovement`; `MoveNotation` always
    /// uses the knight.
    pub fn generate(&mut self, drill_type: DrillType, piece_hint: Option<PieceKind>) -> Question {
        match drill_type {
            DrillType::NameSquare => self.square_question(DrillType::NameSquare, false),
            DrillType::FindSquare => self.square_question(DrillType::FindSquare, true),
            DrillType::PieceMovement => self.piece_question(DrillType::PieceMovement, piece_hint),
            DrillType::MoveNotation => {
                self.piece_question(DrillType::MoveNotation, Some(PieceKind::Knight))
            }
        }
    }

    pub fn random_square(&mut self) -> Square {
        let file = self.rng.random_range(0..8_u8);
        let rank = self.rng.random_range(0..8_u8);
        Square::from_board_indices(file, rank)
    }

    pub fn random_piece(&mut self) -> PieceKind {
        RANDOM_PIECES[self.rng.random_range(0..RANDOM_PIECES.len())]
    }

    fn square_question(&mut self, drill_type: DrillType, show_target: bool) -> Question {
        let target = self.random_square();
        Question {
            drill_type,
            target,
            prompt: if show_target {
                target.to_string()
            } else {
                String::new()
            },
            fen: EMPTY_BOARD.to_owned(),
            metadata: BTreeMap::new(),
        }
    }

    fn piece_question(&mut self, drill_type: DrillType, piece_hint: Option<PieceKind>) -> Question {
        let piece = match piece_hint {
            Some(piece) => piece,
            None => self.random_piece(),
        };
        let target = self.random_square();

        let mut metadata = BTreeMap::new();
        metadata.insert(PIECE_TYPE_KEY.to_owned(), piece.as_str().to_owned());

        Question {
            drill_type,
            target,
            prompt: format!("Where can the {piece} move?"),
            fen: single_piece_fen(piece, target),
            metadata,
        }
    }
}
