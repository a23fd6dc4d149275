//! Keyword-driven move selection for the AI opponent.
//!
//! This is deliberately not an engine: the stated intent narrows the
//! legal-move set through one structural filter and a uniformly random
//! member of the result is played. No search, no evaluation.

use crate::rules::{Board, LegalMove, Piece};
use rand::Rng;
use tracing::{debug, instrument};

/// Strategic category recognized in intent text.
///
/// Categories are checked in declaration order and the first keyword
/// match wins, so "check" outranks "capture" outranks "castle" and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    /// Put the opponent in check.
    GiveCheck,
    /// Win material.
    Capture,
    /// Castle.
    Castle,
    /// Bring out knights and bishops.
    Develop,
    /// Keep the king and queen safe. A crude stand-in for real threat
    /// analysis, retained as-is.
    Defend,
    /// Put rooks and queens on useful lines.
    Control,
    /// Push pawns.
    PawnPush,
}

const KEYWORDS: [(Strategy, &[&str]); 7] = [
    (Strategy::GiveCheck, &["check"]),
    (Strategy::Capture, &["attack", "capture", "take"]),
    (Strategy::Castle, &["castle"]),
    (Strategy::Develop, &["develop"]),
    (Strategy::Defend, &["defend", "protect"]),
    (Strategy::Control, &["control", "position"]),
    (Strategy::PawnPush, &["pawn", "advance"]),
];

impl Strategy {
    /// Detects the highest-priority category mentioned in the intent.
    pub fn detect(intent: &str) -> Option<Self> {
        let text = intent.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| text.contains(w)))
            .map(|(strategy, _)| *strategy)
    }

    /// Whether a move structurally satisfies this category. Keyword
    /// membership alone is never enough.
    fn admits(self, board: &Board, m: &LegalMove) -> bool {
        match self {
            Strategy::GiveCheck => board.gives_check(m),
            Strategy::Capture => m.captured().is_some(),
            Strategy::Castle => m.is_castle(),
            Strategy::Develop => matches!(m.piece(), Piece::Knight | Piece::Bishop),
            Strategy::Defend => matches!(m.piece(), Piece::King | Piece::Queen),
            Strategy::Control => matches!(m.piece(), Piece::Rook | Piece::Queen),
            Strategy::PawnPush => m.piece() == Piece::Pawn,
        }
    }
}

/// Selects one legal move matching the stated intent.
///
/// When no category matches, or the matched category admits no legal
/// move, the whole legal set is the candidate pool. The caller must
/// never pass an empty legal set; the session checks game status first.
#[instrument(skip_all, fields(legal = legal.len()))]
pub fn select_move<R: Rng>(
    intent: &str,
    board: &Board,
    legal: &[LegalMove],
    rng: &mut R,
) -> LegalMove {
    debug_assert!(!legal.is_empty(), "selection from an empty legal set");

    let strategy = Strategy::detect(intent);
    let filtered: Vec<&LegalMove> = match strategy {
        Some(s) => legal.iter().filter(|m| s.admits(board, m)).collect(),
        None => Vec::new(),
    };

    let chosen = if filtered.is_empty() {
        &legal[rng.gen_range(0..legal.len())]
    } else {
        filtered[rng.gen_range(0..filtered.len())]
    };
    debug!(
        strategy = ?strategy,
        matched = filtered.len(),
        san = %chosen.san(),
        "selected move"
    );
    chosen.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::parse_square;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn advance(board: &mut Board, from: &str, to: &str) {
        let m = board
            .find_move(parse_square(from).unwrap(), parse_square(to).unwrap())
            .unwrap();
        board.apply(&m).unwrap();
    }

    #[test]
    fn detect_respects_priority_order() {
        assert_eq!(
            Strategy::detect("I'll check your king and capture the rook"),
            Some(Strategy::GiveCheck)
        );
        assert_eq!(
            Strategy::detect("time to capture a pawn"),
            Some(Strategy::Capture)
        );
        assert_eq!(Strategy::detect("just improving"), None);
    }

    #[test]
    fn capture_intent_picks_a_capturing_move() {
        let mut board = Board::new();
        advance(&mut board, "e2", "e4");
        advance(&mut board, "d7", "d5");
        let legal = board.legal_moves();
        assert!(legal.iter().any(|m| m.captured().is_some()));

        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen = select_move("I will capture in the center", &board, &legal, &mut rng);
            assert!(chosen.captured().is_some());
        }
    }

    #[test]
    fn check_intent_requires_a_real_checking_move() {
        let board = Board::from_fen("4k3/8/8/8/8/8/3Q4/4K3 w - - 0 1").unwrap();
        let legal = board.legal_moves();
        let mut rng = StdRng::seed_from_u64(7);
        let chosen = select_move("I want to check the enemy king", &board, &legal, &mut rng);
        assert!(board.gives_check(&chosen));
    }

    #[test]
    fn develop_intent_limits_to_knights_and_bishops() {
        let board = Board::new();
        let legal = board.legal_moves();
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen = select_move("I will develop my knight", &board, &legal, &mut rng);
            assert!(matches!(chosen.piece(), Piece::Knight | Piece::Bishop));
        }
    }

    #[test]
    fn castle_intent_castles_when_possible() {
        let board = Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let legal = board.legal_moves();
        let mut rng = StdRng::seed_from_u64(3);
        let chosen = select_move("I should castle for safety", &board, &legal, &mut rng);
        assert!(chosen.is_castle());
    }

    #[test]
    fn impossible_castle_falls_back_to_the_full_set() {
        // No castling is legal from the initial position.
        let board = Board::new();
        let legal = board.legal_moves();
        let mut rng = StdRng::seed_from_u64(11);
        let chosen = select_move("I should castle for safety", &board, &legal, &mut rng);
        assert!(legal.iter().any(|m| m.san() == chosen.san()));
    }

    #[test]
    fn selection_is_always_a_member_of_the_legal_set() {
        let board = Board::new();
        let legal = board.legal_moves();
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen = select_move("no recognizable plan here", &board, &legal, &mut rng);
            assert!(legal.iter().any(|m| m.san() == chosen.san()));
        }
    }
}
