//! Parley Chess - play chess against a talkative heuristic opponent.
//!
//! The opponent's moves come from a keyword heuristic over the legal-move
//! set; its table talk comes from a remote text-generation endpoint,
//! consumed as a stream and folded into an append-only chat log. Chess
//! legality itself is delegated to the `shakmaty` crate behind a thin
//! wrapper.
//!
//! # Architecture
//!
//! - **Session**: state machine owning board, history, status and chat
//! - **Selector**: maps free-text intent onto one legal move
//! - **Commentary**: streaming client for intent/explanation text, with
//!   an offline stand-in
//! - **Rules**: the `shakmaty` boundary (legal moves, status, FEN)
//!
//! # Example
//!
//! ```no_run
//! use parley_chess::{Color, GameSession, OfflineNarrator};
//!
//! # async fn example() -> Result<(), parley_chess::SessionError> {
//! let mut session = GameSession::new(Box::new(OfflineNarrator::new()));
//! session.start(Color::White)?;
//! session.submit_human_move("e2", "e4")?;
//! session.play_ai_turn().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod chat;
mod commentary;
mod config;
mod rules;
mod selector;
mod session;

// Crate-level exports - chat log
pub use chat::{ChatLog, ChatMessage, Sender};

// Crate-level exports - commentary pipeline
pub use commentary::{
    CommentaryClient, CommentaryError, GamePhase, OfflineNarrator, SYSTEM_PROMPT, TextSource,
};

// Crate-level exports - configuration
pub use config::{API_KEY_VAR, CommentaryConfig, ConfigError};

// Crate-level exports - rules boundary
pub use rules::{
    Board, Color, DrawReason, GameStatus, LegalMove, MoveRecord, Piece, RulesError, Square,
    parse_square,
};

// Crate-level exports - move selection
pub use selector::{Strategy, select_move};

// Crate-level exports - session state machine
pub use session::{GameSession, Phase, SessionError};
