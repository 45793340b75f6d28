use drill_core::model::{
    DrillType, FILE_LABELS, PieceKind, Perspective, Question, RANK_LABELS, Square,
};

/// Square marking for a question, `None` when the board must stay blank.
fn target_marker(question: &Question) -> Option<char> {
    match question.drill_type {
        // The prompt names the square; marking it would give the answer away.
        DrillType::FindSquare => None,
        drill if drill.uses_piece() => Some(
            question
                .piece_type()
                .and_then(|raw| raw.parse::<PieceKind>().ok())
                .map_or('*', PieceKind::letter),
        ),
        _ => Some('*'),
    }
}

/// Text diagram of the board with the question's square marked.
///
/// The target shows the piece letter on piece drills, `*` when naming a
/// square, and nothing when finding one. Ranks and files are flipped for the
/// black perspective.
pub fn render(question: &Question, perspective: Perspective) -> String {
    let marker = target_marker(question);

    let (ranks, files): (Vec<u8>, Vec<u8>) = match perspective {
        Perspective::White => ((0..8).rev().collect(), (0..8).collect()),
        Perspective::Black => ((0..8).collect(), (0..8).rev().collect()),
    };

    let mut out = String::new();
    for rank in &ranks {
        out.push(RANK_LABELS[usize::from(*rank)]);
        out.push(' ');
        for file in &files {
            let here = question.target.file() == *file && question.target.rank() == *rank;
            out.push(' ');
            out.push(marker.filter(|_| here).unwrap_or('.'));
        }
        out.push('\n');
    }
    out.push_str("  ");
    for file in &files {
        out.push(' ');
        out.push(FILE_LABELS[usize::from(*file)]);
    }
    out.push('\n');
    out
}

/// One line per square row of the heatmap, white's view, accuracy in percent.
pub fn render_heatmap(heatmap: &drill_core::model::HeatmapData) -> String {
    let mut out = String::new();
    for rank in (0..8_u8).rev() {
        out.push(RANK_LABELS[usize::from(rank)]);
        out.push(' ');
        for file in 0..8_u8 {
            let cell = Square::new(file, rank)
                .ok()
                .and_then(|square| heatmap.get(square))
                .filter(|entry| entry.total > 0)
                .map_or_else(|| "   -".to_owned(), |entry| format!("{:>4.0}", entry.accuracy));
            out.push_str(&cell);
        }
        out.push('\n');
    }
    out.push_str("  ");
    for label in FILE_LABELS {
        out.push_str(&format!("   {label}"));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_core::QuestionGenerator;
    use drill_core::aggregate::{SquareTotals, build_heatmap};

    #[test]
    fn white_view_puts_rank_eight_on_top() {
        let mut question = QuestionGenerator::seeded(1).generate(DrillType::NameSquare, None);
        question.target = "a8".parse().unwrap();

        let text = render(&question, Perspective::White);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "8  * . . . . . . .");
        assert_eq!(lines[8], "   a b c d e f g h");
    }

    #[test]
    fn black_view_flips_the_board() {
        let mut question = QuestionGenerator::seeded(1).generate(DrillType::NameSquare, None);
        question.target = "a8".parse().unwrap();

        let text = render(&question, Perspective::Black);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[7], "8  . . . . . . . *");
        assert_eq!(lines[8], "   h g f e d c b a");
    }

    #[test]
    fn piece_drills_show_the_piece_letter() {
        let question =
            QuestionGenerator::seeded(2).generate(DrillType::PieceMovement, Some(PieceKind::Queen));
        let text = render(&question, Perspective::White);
        assert_eq!(text.matches('Q').count(), 1);
        assert!(!text.contains('*'));
    }

    #[test]
    fn find_square_board_is_blank_from_both_sides() {
        let mut question = QuestionGenerator::seeded(3).generate(DrillType::FindSquare, None);
        question.target = "c6".parse().unwrap();

        let white = render(&question, Perspective::White);
        let black = render(&question, Perspective::Black);
        for text in [&white, &black] {
            assert!(!text.contains('*'));
            assert_eq!(text.matches('.').count(), 64);
        }
        assert_eq!(white.lines().next(), Some("8  . . . . . . . ."));
        assert_eq!(black.lines().next(), Some("1  . . . . . . . ."));
        assert_eq!(black.lines().nth(8), Some("   h g f e d c b a"));
    }

    #[test]
    fn heatmap_marks_unseen_squares() {
        let heatmap = build_heatmap(vec![SquareTotals {
            key: "e4".into(),
            total: 4,
            correct: 3,
        }]);
        let text = render_heatmap(&heatmap);
        let rank_four = text.lines().nth(4).unwrap();
        assert!(rank_four.starts_with("4 "));
        assert!(rank_four.contains("  75"));
        assert_eq!(text.matches("  75").count(), 1);
    }
}
