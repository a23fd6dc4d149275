//! Thin wrapper over the `shakmaty` rules engine.
//!
//! All chess legality lives behind [`Board`]: legal-move enumeration,
//! move application, status computation and FEN export. Nothing in this
//! crate implements chess rules itself, and nothing outside this module
//! touches `shakmaty` types directly (the [`Square`] re-export aside).

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{
    CastlingMode, Chess, Color as SColor, EnPassantMode, File, Move, Position, Rank, Role,
};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, instrument};

pub use shakmaty::Square;

/// Side in a chess game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// The side that moves first.
    White,
    /// The side that moves second.
    Black,
}

impl Color {
    /// Returns the opposing side.
    pub fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Lowercase form for mid-sentence use ("my white pawn").
    pub fn lower(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }

    fn from_shakmaty(color: SColor) -> Self {
        match color {
            SColor::White => Color::White,
            SColor::Black => Color::Black,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "White"),
            Color::Black => write!(f, "Black"),
        }
    }
}

/// Kind of piece being moved or captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Piece {
    /// Pawn.
    Pawn,
    /// Knight.
    Knight,
    /// Bishop.
    Bishop,
    /// Rook.
    Rook,
    /// Queen.
    Queen,
    /// King.
    King,
}

impl Piece {
    /// Human-readable name ("pawn", "knight", ...).
    pub fn name(self) -> &'static str {
        match self {
            Piece::Pawn => "pawn",
            Piece::Knight => "knight",
            Piece::Bishop => "bishop",
            Piece::Rook => "rook",
            Piece::Queen => "queen",
            Piece::King => "king",
        }
    }

    fn from_role(role: Role) -> Self {
        match role {
            Role::Pawn => Piece::Pawn,
            Role::Knight => Piece::Knight,
            Role::Bishop => Piece::Bishop,
            Role::Rook => Piece::Rook,
            Role::Queen => Piece::Queen,
            Role::King => Piece::King,
        }
    }
}

/// Why a finished game counts as a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    /// The same position occurred three times.
    ThreefoldRepetition,
    /// Neither side can deliver mate.
    InsufficientMaterial,
    /// Any other draw (e.g. the fifty-move rule).
    Other,
}

/// Status of the game after the most recent move.
///
/// `Check` is a sub-state of active play; every other non-`InProgress`
/// variant is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Game is ongoing.
    InProgress,
    /// The given side is in check and must respond.
    Check(Color),
    /// The given side delivered mate.
    Checkmate {
        /// Side that won.
        winner: Color,
    },
    /// The side to move has no legal moves and is not in check.
    Stalemate,
    /// Drawn for the given reason.
    Draw(DrawReason),
    /// The given side resigned.
    Resigned(Color),
}

impl GameStatus {
    /// Whether the game is over.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, GameStatus::InProgress | GameStatus::Check(_))
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::InProgress => write!(f, "in progress"),
            GameStatus::Check(color) => write!(f, "{color} is in check!"),
            GameStatus::Checkmate { winner } => write!(f, "Checkmate! {winner} wins!"),
            GameStatus::Stalemate => write!(f, "Stalemate!"),
            GameStatus::Draw(DrawReason::ThreefoldRepetition) => {
                write!(f, "Draw by threefold repetition!")
            }
            GameStatus::Draw(DrawReason::InsufficientMaterial) => {
                write!(f, "Draw by insufficient material!")
            }
            GameStatus::Draw(DrawReason::Other) => write!(f, "Game ended in a draw!"),
            GameStatus::Resigned(loser) => {
                write!(f, "{loser} resigned. {} wins!", loser.opponent())
            }
        }
    }
}

/// Errors reported by the rules wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RulesError {
    /// The move is not legal in the current position.
    #[display("move is not legal in the current position")]
    IllegalMove,
    /// The FEN string could not be parsed into a playable position.
    #[display("invalid FEN: {_0}")]
    InvalidFen(#[error(not(source))] String),
}

/// A move that is legal in some position, with display metadata attached.
///
/// For castling, `from`/`to` are the king's origin and destination (the
/// squares a player would actually point at), not the engine-internal
/// king-takes-rook encoding.
#[derive(Debug, Clone)]
pub struct LegalMove {
    inner: Move,
    san: String,
    from: Square,
    to: Square,
    piece: Piece,
    captured: Option<Piece>,
}

impl LegalMove {
    /// Standard algebraic notation, e.g. `Nf3` or `O-O`.
    pub fn san(&self) -> &str {
        &self.san
    }

    /// Origin square.
    pub fn from(&self) -> Square {
        self.from
    }

    /// Destination square.
    pub fn to(&self) -> Square {
        self.to
    }

    /// Piece being moved.
    pub fn piece(&self) -> Piece {
        self.piece
    }

    /// Piece captured by this move, if any.
    pub fn captured(&self) -> Option<Piece> {
        self.captured
    }

    /// Whether this move castles.
    pub fn is_castle(&self) -> bool {
        self.inner.is_castle()
    }
}

/// A move that has been applied to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    color: Color,
    san: String,
    from: Square,
    to: Square,
    piece: Piece,
    captured: Option<Piece>,
}

impl MoveRecord {
    /// Side that made the move.
    pub fn color(&self) -> Color {
        self.color
    }

    /// Standard algebraic notation.
    pub fn san(&self) -> &str {
        &self.san
    }

    /// Origin square.
    pub fn from(&self) -> Square {
        self.from
    }

    /// Destination square.
    pub fn to(&self) -> Square {
        self.to
    }

    /// Piece that moved.
    pub fn piece(&self) -> Piece {
        self.piece
    }

    /// Piece captured, if any.
    pub fn captured(&self) -> Option<Piece> {
        self.captured
    }
}

impl fmt::Display for MoveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.color, self.san)
    }
}

/// Parses a coordinate square like `e4`. Case-insensitive.
pub fn parse_square(text: &str) -> Option<Square> {
    text.trim().to_ascii_lowercase().parse().ok()
}

/// User-facing endpoints of an engine move (king origin/destination for
/// castling).
fn endpoints(m: &Move) -> Option<(Square, Square)> {
    match m {
        Move::Normal { from, to, .. } | Move::EnPassant { from, to } => Some((*from, *to)),
        Move::Castle { king, rook } => {
            let file = if rook.file() == File::H { File::G } else { File::C };
            Some((*king, Square::from_coords(file, king.rank())))
        }
        Move::Put { .. } => None,
    }
}

/// Piece placement, turn, castling rights and en-passant target; the
/// repetition-relevant prefix of a FEN line.
fn repetition_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}

/// Chess position plus the bookkeeping needed for draw detection.
#[derive(Debug, Clone)]
pub struct Board {
    position: Chess,
    seen: HashMap<String, u32>,
}

impl Board {
    /// Creates a board at the standard starting position.
    pub fn new() -> Self {
        let position = Chess::default();
        let mut board = Self {
            position,
            seen: HashMap::new(),
        };
        board.seen.insert(repetition_key(&board.fen()), 1);
        board
    }

    /// Creates a board from a FEN line.
    #[instrument]
    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let parsed: Fen = fen
            .parse()
            .map_err(|e| RulesError::InvalidFen(format!("{e}")))?;
        let position = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidFen(format!("{e}")))?;
        let mut board = Self {
            position,
            seen: HashMap::new(),
        };
        board.seen.insert(repetition_key(&board.fen()), 1);
        Ok(board)
    }

    /// Side to move.
    pub fn turn(&self) -> Color {
        Color::from_shakmaty(self.position.turn())
    }

    /// FEN encoding of the current position.
    pub fn fen(&self) -> String {
        Fen::from_position(self.position.clone(), EnPassantMode::Legal).to_string()
    }

    /// All legal moves in the current position.
    pub fn legal_moves(&self) -> Vec<LegalMove> {
        self.position
            .legal_moves()
            .iter()
            .filter_map(|m| {
                let (from, to) = endpoints(m)?;
                Some(LegalMove {
                    san: San::from_move(&self.position, m).to_string(),
                    from,
                    to,
                    piece: Piece::from_role(m.role()),
                    captured: m.capture().map(Piece::from_role),
                    inner: m.clone(),
                })
            })
            .collect()
    }

    /// Finds the legal move between two squares, resolving promotions to
    /// a queen. Returns `None` when no such move is legal.
    pub fn find_move(&self, from: Square, to: Square) -> Option<LegalMove> {
        let matches: Vec<LegalMove> = self
            .legal_moves()
            .into_iter()
            .filter(|m| m.from == from && m.to == to)
            .collect();
        matches
            .iter()
            .find(|m| m.inner.promotion() == Some(Role::Queen))
            .cloned()
            .or_else(|| matches.into_iter().find(|m| m.inner.promotion().is_none()))
    }

    /// Applies a legal move and returns its record.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::IllegalMove`] when the move does not belong
    /// to the current position's legal set.
    #[instrument(skip(self, m), fields(san = %m.san))]
    pub fn apply(&mut self, m: &LegalMove) -> Result<MoveRecord, RulesError> {
        let color = self.turn();
        self.position = self
            .position
            .clone()
            .play(&m.inner)
            .map_err(|_| RulesError::IllegalMove)?;
        *self.seen.entry(repetition_key(&self.fen())).or_insert(0) += 1;
        debug!(san = %m.san, "applied move");
        Ok(MoveRecord {
            color,
            san: m.san.clone(),
            from: m.from,
            to: m.to,
            piece: m.piece,
            captured: m.captured,
        })
    }

    /// Whether the move would leave the opponent in check.
    ///
    /// Trial-applies the move on a snapshot that is discarded afterwards;
    /// the live position is never touched.
    pub fn gives_check(&self, m: &LegalMove) -> bool {
        self.position
            .clone()
            .play(&m.inner)
            .map(|next| next.is_check())
            .unwrap_or(false)
    }

    /// Status of the current position.
    pub fn status(&self) -> GameStatus {
        let turn = self.turn();
        if self.position.is_checkmate() {
            return GameStatus::Checkmate {
                winner: turn.opponent(),
            };
        }
        if self.position.is_stalemate() {
            return GameStatus::Stalemate;
        }
        if self.repetitions() >= 3 {
            return GameStatus::Draw(DrawReason::ThreefoldRepetition);
        }
        if self.position.is_insufficient_material() {
            return GameStatus::Draw(DrawReason::InsufficientMaterial);
        }
        if self.position.halfmoves() >= 100 {
            return GameStatus::Draw(DrawReason::Other);
        }
        if self.position.is_check() {
            return GameStatus::Check(turn);
        }
        GameStatus::InProgress
    }

    /// How often the current position has occurred.
    fn repetitions(&self) -> u32 {
        self.seen
            .get(&repetition_key(&self.fen()))
            .copied()
            .unwrap_or(1)
    }

    /// Formats the board as an ASCII diagram, white at the bottom.
    pub fn ascii(&self) -> String {
        let mut out = String::new();
        for rank in (0..8u32).rev() {
            out.push_str(&format!("{} ", rank + 1));
            for file in 0..8u32 {
                let square = Square::from_coords(File::new(file), Rank::new(rank));
                let symbol = match self.position.board().piece_at(square) {
                    Some(piece) => match piece.color {
                        SColor::White => piece.role.upper_char(),
                        SColor::Black => piece.role.char(),
                    },
                    None => '.',
                };
                out.push(symbol);
                out.push(' ');
            }
            out.push('\n');
        }
        out.push_str("  a b c d e f g h");
        out
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
