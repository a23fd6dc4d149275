//! Game-session state machine driving the human/AI turn protocol.
//!
//! All session state lives behind [`GameSession`] and is mutated only by
//! its own transition methods. The turn protocol is encoded in a single
//! [`Phase`] value instead of a set of independent flags, so states like
//! "thinking but no pending move" are unrepresentable.

use crate::chat::{ChatLog, Sender};
use crate::commentary::{self, GamePhase, TextSource};
use crate::rules::{self, Board, Color, DrawReason, GameStatus, MoveRecord, Square};
use crate::selector;
use derive_more::{Display, Error};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::{info, instrument, warn};

const GREETING: &str = "Hello! I'm your chess opponent. Choose your color and let's play!";
const RESET_GREETING: &str = "Let's play again! Choose your color.";

/// Where the session is in the turn-taking protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No color chosen yet.
    NotStarted,
    /// The human may submit a move.
    AwaitingHumanMove,
    /// The AI owes the session an intent; the driver should call
    /// [`GameSession::play_ai_turn`].
    AwaitingAiIntent,
    /// Intent received, move not yet committed. Held only across the
    /// pacing delay inside an AI turn.
    AwaitingAiMove,
    /// The game is over.
    Terminal,
}

/// Errors surfaced by session operations. None of them end the session.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum SessionError {
    /// The requested move is not in the current legal set. The session
    /// is left untouched.
    #[display("that move is not legal right now")]
    IllegalMove,
    /// The operation needs the human to be on turn.
    #[display("it is not your turn")]
    NotYourTurn,
    /// Fewer than two moves have been played.
    #[display("nothing to undo yet")]
    UndoUnavailable,
    /// `start` was called on a running session.
    #[display("the game has already started")]
    AlreadyStarted,
    /// The session has not been started.
    #[display("the game has not started yet")]
    NotStarted,
    /// The game already reached a terminal state.
    #[display("the game is already over")]
    GameOver,
    /// A square name could not be parsed.
    #[display("unrecognized square {_0:?}")]
    BadSquare(#[error(not(source))] String),
}

/// One chess game between the human and the narrated AI opponent.
pub struct GameSession {
    board: Board,
    initial: Board,
    phase: Phase,
    player_color: Option<Color>,
    history: Vec<MoveRecord>,
    status: GameStatus,
    last_move: Option<(Square, Square)>,
    chat: ChatLog,
    narrator: Box<dyn TextSource>,
    rng: StdRng,
    think_delay: Duration,
}

impl GameSession {
    /// Creates a session at the standard starting position.
    pub fn new(narrator: Box<dyn TextSource>) -> Self {
        let board = Board::new();
        Self {
            initial: board.clone(),
            board,
            phase: Phase::NotStarted,
            player_color: None,
            history: Vec::new(),
            status: GameStatus::InProgress,
            last_move: None,
            chat: ChatLog::new(GREETING),
            narrator,
            rng: StdRng::from_entropy(),
            think_delay: Duration::from_millis(1500),
        }
    }

    /// Replaces the starting position. Only meaningful before `start`.
    pub fn with_board(mut self, board: Board) -> Self {
        self.initial = board.clone();
        self.board = board;
        self
    }

    /// Sets the pacing delay before the AI commits to its move.
    pub fn with_think_delay(mut self, delay: Duration) -> Self {
        self.think_delay = delay;
        self
    }

    /// Seeds the move-selection RNG for reproducible games.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Current protocol phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Status computed after the most recent move.
    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Moves played so far, in order.
    pub fn history(&self) -> &[MoveRecord] {
        &self.history
    }

    /// The narration log.
    pub fn chat(&self) -> &ChatLog {
        &self.chat
    }

    /// The live board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// The human's color, once chosen.
    pub fn player_color(&self) -> Option<Color> {
        self.player_color
    }

    /// The AI's color, once chosen.
    pub fn ai_color(&self) -> Option<Color> {
        self.player_color.map(Color::opponent)
    }

    /// Endpoints of the most recent move, for highlighting.
    pub fn last_move(&self) -> Option<(Square, Square)> {
        self.last_move
    }

    /// Assigns the human a color and opens play.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyStarted`] unless the session is in
    /// `NotStarted`.
    #[instrument(skip(self))]
    pub fn start(&mut self, color: Color) -> Result<(), SessionError> {
        if self.phase != Phase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        self.player_color = Some(color);
        self.status = self.board.status();
        self.phase = if self.status.is_terminal() {
            Phase::Terminal
        } else if self.board.turn() == color {
            Phase::AwaitingHumanMove
        } else {
            Phase::AwaitingAiIntent
        };
        info!(player = %color, phase = ?self.phase, "game started");
        Ok(())
    }

    /// Submits the human's move between two squares; promotion always
    /// resolves to a queen.
    ///
    /// A rejected move leaves the session untouched: no board change, no
    /// history entry, no chat entry.
    #[instrument(skip(self))]
    pub fn submit_human_move(&mut self, from: &str, to: &str) -> Result<MoveRecord, SessionError> {
        match self.phase {
            Phase::AwaitingHumanMove => {}
            Phase::NotStarted => return Err(SessionError::NotStarted),
            Phase::Terminal => return Err(SessionError::GameOver),
            Phase::AwaitingAiIntent | Phase::AwaitingAiMove => {
                return Err(SessionError::NotYourTurn);
            }
        }
        let from_sq =
            rules::parse_square(from).ok_or_else(|| SessionError::BadSquare(from.to_string()))?;
        let to_sq =
            rules::parse_square(to).ok_or_else(|| SessionError::BadSquare(to.to_string()))?;

        let m = self
            .board
            .find_move(from_sq, to_sq)
            .ok_or(SessionError::IllegalMove)?;
        let record = self.board.apply(&m).map_err(|_| SessionError::IllegalMove)?;

        let color = self.player_color.expect("started session has a color");
        self.last_move = Some((record.from(), record.to()));
        self.chat.append(
            Sender::Human,
            format!(
                "I moved my {} {} from {} to {}.",
                color.lower(),
                record.piece().name(),
                record.from(),
                record.to()
            ),
        );
        self.history.push(record.clone());
        self.refresh_status();
        Ok(record)
    }

    /// Runs one full AI turn: request intent, narrate it, pause for
    /// pacing, select and apply a move, then narrate an explanation.
    ///
    /// Commentary failures degrade to fixed fallback text; the AI always
    /// moves. The whole turn runs inside this call, so no human move can
    /// interleave with it.
    #[instrument(skip(self))]
    pub async fn play_ai_turn(&mut self) -> Result<MoveRecord, SessionError> {
        match self.phase {
            Phase::AwaitingAiIntent => {}
            Phase::NotStarted => return Err(SessionError::NotStarted),
            Phase::Terminal => return Err(SessionError::GameOver),
            Phase::AwaitingHumanMove | Phase::AwaitingAiMove => {
                return Err(SessionError::NotYourTurn);
            }
        }
        let ai = self
            .player_color
            .expect("started session has a color")
            .opponent();

        let prompt = commentary::intent_prompt(
            ai,
            &self.board.fen(),
            GamePhase::from_ply(self.history.len()),
            self.history.last().map(ToString::to_string).as_deref(),
        );
        let intent = match self
            .narrator
            .request_text(commentary::SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "intent request failed, using fallback");
                commentary::fallback_intent(ai)
            }
        };
        self.chat.append(Sender::Ai, format!("Thinking: {intent}"));
        self.phase = Phase::AwaitingAiMove;

        if !self.think_delay.is_zero() {
            tokio::time::sleep(self.think_delay).await;
        }

        let legal = self.board.legal_moves();
        let chosen = selector::select_move(&intent, &self.board, &legal, &mut self.rng);
        let record = self
            .board
            .apply(&chosen)
            .expect("selected move comes from the current legal set");
        self.last_move = Some((record.from(), record.to()));
        self.chat.append(
            Sender::Ai,
            format!(
                "I moved my {} {} from {} to {}.",
                ai.lower(),
                record.piece().name(),
                record.from(),
                record.to()
            ),
        );
        self.history.push(record.clone());

        let explanation = match self
            .narrator
            .request_text(
                commentary::SYSTEM_PROMPT,
                &commentary::explanation_prompt(record.san()),
            )
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "explanation request failed, using fallback");
                commentary::FALLBACK_EXPLANATION.to_string()
            }
        };
        self.chat.append(Sender::Ai, explanation);

        self.refresh_status();
        Ok(record)
    }

    /// Takes back the last AI and human moves.
    ///
    /// The board is rebuilt by replaying the remaining history from the
    /// initial position, so consistency never depends on the rules
    /// engine having a native multi-step undo.
    #[instrument(skip(self))]
    pub fn undo(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::AwaitingHumanMove | Phase::Terminal => {}
            Phase::NotStarted => return Err(SessionError::NotStarted),
            Phase::AwaitingAiIntent | Phase::AwaitingAiMove => {
                return Err(SessionError::NotYourTurn);
            }
        }
        if self.history.len() < 2 {
            return Err(SessionError::UndoUnavailable);
        }
        self.history.truncate(self.history.len() - 2);

        let mut board = self.initial.clone();
        for record in &self.history {
            let m = board
                .find_move(record.from(), record.to())
                .expect("recorded history replays cleanly");
            board.apply(&m).expect("recorded history replays cleanly");
        }
        self.board = board;
        self.last_move = None;
        self.chat
            .append(Sender::Ai, "I've undone our last moves. Let's try again.");
        self.refresh_status();
        Ok(())
    }

    /// Ends the game with a loss for the human.
    #[instrument(skip(self))]
    pub fn resign(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::NotStarted => return Err(SessionError::NotStarted),
            Phase::Terminal => return Err(SessionError::GameOver),
            _ => {}
        }
        let player = self.player_color.expect("started session has a color");
        self.status = GameStatus::Resigned(player);
        self.phase = Phase::Terminal;
        self.chat
            .append(Sender::Ai, "You've resigned. Thanks for the game!");
        info!(loser = %player, "player resigned");
        Ok(())
    }

    /// Clears everything and returns to `NotStarted`.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.board = self.initial.clone();
        self.phase = Phase::NotStarted;
        self.player_color = None;
        self.history.clear();
        self.status = GameStatus::InProgress;
        self.last_move = None;
        self.chat.reset(RESET_GREETING);
        info!("session reset");
    }

    /// Suggests a uniformly random legal move in the chat. Board, turn
    /// and history are left untouched.
    #[instrument(skip(self))]
    pub fn hint(&mut self) -> Result<(), SessionError> {
        match self.phase {
            Phase::AwaitingHumanMove => {}
            Phase::NotStarted => return Err(SessionError::NotStarted),
            Phase::Terminal => return Err(SessionError::GameOver),
            Phase::AwaitingAiIntent | Phase::AwaitingAiMove => {
                return Err(SessionError::NotYourTurn);
            }
        }
        let legal = self.board.legal_moves();
        let m = &legal[self.rng.gen_range(0..legal.len())];
        self.chat.append(
            Sender::Ai,
            format!(
                "Hint: You might want to consider moving your {} from {} to {}.",
                m.piece().name(),
                m.from(),
                m.to()
            ),
        );
        Ok(())
    }

    /// Recomputes the game status from the board, appends any
    /// status-driven narration, and advances the phase.
    fn refresh_status(&mut self) {
        self.status = self.board.status();
        let player = self.player_color.expect("started session has a color");
        match self.status {
            GameStatus::Checkmate { winner } => {
                let text = if winner == player {
                    "You've checkmated me! Well played!"
                } else {
                    "I've checkmated you! Good game!"
                };
                self.chat.append(Sender::Ai, text);
            }
            GameStatus::Stalemate => {
                self.chat
                    .append(Sender::Ai, "Stalemate! Neither of us can win now.");
            }
            GameStatus::Draw(DrawReason::ThreefoldRepetition) => {
                self.chat
                    .append(Sender::Ai, "That's a draw by threefold repetition.");
            }
            GameStatus::Draw(DrawReason::InsufficientMaterial) => {
                self.chat.append(
                    Sender::Ai,
                    "Neither of us has enough pieces to checkmate. It's a draw.",
                );
            }
            GameStatus::Draw(DrawReason::Other) => {
                self.chat
                    .append(Sender::Ai, "The game is a draw. Good match!");
            }
            GameStatus::Check(color) if color == player => {
                self.chat
                    .append(Sender::Ai, "Check! Your king is under attack.");
            }
            GameStatus::Check(_) | GameStatus::InProgress | GameStatus::Resigned(_) => {}
        }
        self.phase = if self.status.is_terminal() {
            Phase::Terminal
        } else if self.board.turn() == player {
            Phase::AwaitingHumanMove
        } else {
            Phase::AwaitingAiIntent
        };
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("phase", &self.phase)
            .field("player_color", &self.player_color)
            .field("status", &self.status)
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}
