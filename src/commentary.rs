//! Streaming commentary pipeline for the AI opponent.
//!
//! One request per narration need: the session asks for "intent" text
//! before the AI commits to a move and for "explanation" text after.
//! The remote endpoint is consumed as an incremental byte stream; a
//! failure never blocks play, because the session substitutes fixed
//! fallback text and moves on.

use crate::config::CommentaryConfig;
use crate::rules::Color;
use async_trait::async_trait;
use derive_more::{Display, Error};
use futures::StreamExt;
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

/// System prompt sent with every request.
pub const SYSTEM_PROMPT: &str = "\
You are a helpful chess assistant that provides commentary and strategic thinking for a chess game.
You should respond in a conversational, natural way as if you're a chess player explaining your thoughts.
Keep responses brief (1-3 sentences) and focused on the chess position.

When analyzing a position or suggesting a move:
- Consider piece development, center control, king safety, and material balance
- Explain your reasoning clearly but concisely
- Use standard chess notation when referring to moves
- Maintain the persona of a thoughtful chess player

Avoid technical jargon unless necessary and focus on making your commentary engaging and educational.";

/// Marker the endpoint has been observed to inject into otherwise-valid
/// output.
const ERROR_MARKER: &str = "3:\"An error occurred.\"";

/// Neutral placeholder used when an explanation request fails.
pub const FALLBACK_EXPLANATION: &str = "I'm thinking about my next move...";

/// Fallback intent used when an intent request fails. Worded so the
/// selection heuristic still has something to chew on.
pub fn fallback_intent(ai_color: Color) -> String {
    format!(
        "I'm considering my {} pieces' development and position.",
        ai_color.lower()
    )
}

/// Rough stage of the game, derived from how many plies were played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum GamePhase {
    /// Fewer than 10 plies.
    Opening,
    /// Fewer than 20 plies.
    Middlegame,
    /// Everything after.
    Endgame,
}

impl GamePhase {
    /// Classifies a ply count.
    pub fn from_ply(plies: usize) -> Self {
        if plies < 10 {
            GamePhase::Opening
        } else if plies < 20 {
            GamePhase::Middlegame
        } else {
            GamePhase::Endgame
        }
    }
}

/// Builds the user prompt asking for the AI's strategic thinking.
pub fn intent_prompt(
    ai_color: Color,
    fen: &str,
    phase: GamePhase,
    last_human_move: Option<&str>,
) -> String {
    let last = match last_human_move {
        Some(notation) => format!("My opponent's last move was: {notation}"),
        None => "I am making the first move.".to_string(),
    };
    format!(
        "You are playing a chess game as {} pieces. The current position in FEN notation is: {fen}\n\
         We are in the {phase} phase of the game.\n\
         {last}\n\n\
         What is your strategic thinking for your next move? What are you considering?\n\
         Keep your response to 1-2 sentences focused on your strategic thinking, not the specific move yet.",
        ai_color.lower()
    )
}

/// Builds the user prompt asking for an explanation of a move just made.
pub fn explanation_prompt(san: &str) -> String {
    format!(
        "I moved {san}. Please provide a brief, natural explanation of this move based on my earlier strategic thinking."
    )
}

/// Commentary pipeline error.
#[derive(Debug, Clone, Display, Error)]
#[display("commentary error: {} at {}:{}", message, file, line)]
pub struct CommentaryError {
    /// Error message.
    pub message: String,
    /// Line number where the error was created.
    pub line: u32,
    /// Source file where the error was created.
    pub file: &'static str,
}

impl CommentaryError {
    /// Creates a new commentary error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        error!(error_message = %message, "commentary error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Where narration text comes from. The session only sees this trait, so
/// tests and offline play can swap the remote endpoint out.
#[async_trait]
pub trait TextSource: Send {
    /// Requests one piece of text for the given prompts.
    async fn request_text(
        &mut self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CommentaryError>;
}

/// HTTP client for an OpenAI-compatible chat-completion endpoint.
///
/// The response body is read as a byte stream and concatenated in
/// arrival order; the concatenated text is interpreted structurally
/// first (a single `text` field) and used verbatim otherwise.
#[derive(Debug, Clone)]
pub struct CommentaryClient {
    http: reqwest::Client,
    config: CommentaryConfig,
}

impl CommentaryClient {
    /// Creates a client for the configured endpoint.
    #[instrument(skip(config), fields(endpoint = %config.endpoint(), model = %config.model()))]
    pub fn new(config: CommentaryConfig) -> Self {
        info!("Creating commentary client");
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    #[instrument(skip(self, system_prompt, user_prompt), fields(model = %self.config.model()))]
    async fn fetch(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CommentaryError> {
        debug!("Building commentary request");
        let request_body = json!({
            "model": self.config.model(),
            "max_tokens": self.config.max_tokens(),
            "stream": true,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ]
        });

        let mut request = self
            .http
            .post(self.config.endpoint().as_str())
            .json(&request_body);
        if !self.config.api_key().is_empty() {
            request = request.bearer_auth(self.config.api_key());
        }

        debug!("Sending commentary request");
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "commentary request failed");
            CommentaryError::new(format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "commentary endpoint returned an error status");
            return Err(CommentaryError::new(format!(
                "endpoint returned status {status}"
            )));
        }

        let mut stream = response.bytes_stream();
        let mut raw = String::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| {
                warn!(error = %e, "commentary stream interrupted");
                CommentaryError::new(format!("stream interrupted: {e}"))
            })?;
            raw.push_str(&String::from_utf8_lossy(&bytes));
        }

        if raw.trim().is_empty() {
            return Err(CommentaryError::new("empty response stream".to_string()));
        }

        let text = interpret_response(&raw);
        info!(text_length = text.len(), "commentary received");
        Ok(text)
    }
}

#[async_trait]
impl TextSource for CommentaryClient {
    async fn request_text(
        &mut self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, CommentaryError> {
        self.fetch(system_prompt, user_prompt).await
    }
}

/// Strips the known error marker, then interprets the text as structured
/// data first (a single `text` field), falling back to the raw text.
fn interpret_response(raw: &str) -> String {
    let cleaned = raw.replace(ERROR_MARKER, "");
    let cleaned = cleaned.trim();
    match serde_json::from_str::<serde_json::Value>(cleaned) {
        Ok(value) => value
            .get("text")
            .and_then(|t| t.as_str())
            .map(str::to_owned)
            .unwrap_or_else(|| cleaned.to_owned()),
        Err(_) => cleaned.to_owned(),
    }
}

const OFFLINE_LINES: [&str; 6] = [
    "I'm developing my pieces toward the center.",
    "I'll look for a chance to capture something.",
    "Time to castle and tuck my king away.",
    "I want to control the open files.",
    "A steady pawn advance seems right here.",
    "I should defend my king before anything else.",
];

/// Canned narration for play without the remote endpoint.
///
/// Rotates through a fixed set of strategic lines so consecutive turns
/// vary, deterministically.
#[derive(Debug, Clone, Default)]
pub struct OfflineNarrator {
    next: usize,
}

impl OfflineNarrator {
    /// Creates a narrator starting at the first canned line.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TextSource for OfflineNarrator {
    async fn request_text(
        &mut self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, CommentaryError> {
        let line = OFFLINE_LINES[self.next % OFFLINE_LINES.len()];
        self.next += 1;
        Ok(line.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_response_uses_the_text_field() {
        assert_eq!(interpret_response(r#"{"text":"a fine move"}"#), "a fine move");
    }

    #[test]
    fn unstructured_response_is_used_verbatim() {
        assert_eq!(
            interpret_response("  I like my knight on f3.  "),
            "I like my knight on f3."
        );
    }

    #[test]
    fn structured_response_without_text_field_falls_back_to_raw() {
        assert_eq!(interpret_response(r#"{"other":1}"#), r#"{"other":1}"#);
    }

    #[test]
    fn error_marker_is_stripped() {
        assert_eq!(
            interpret_response("Good move.3:\"An error occurred.\""),
            "Good move."
        );
    }

    #[test]
    fn phase_label_follows_ply_thresholds() {
        assert_eq!(GamePhase::from_ply(0), GamePhase::Opening);
        assert_eq!(GamePhase::from_ply(9), GamePhase::Opening);
        assert_eq!(GamePhase::from_ply(10), GamePhase::Middlegame);
        assert_eq!(GamePhase::from_ply(19), GamePhase::Middlegame);
        assert_eq!(GamePhase::from_ply(20), GamePhase::Endgame);
        assert_eq!(GamePhase::Middlegame.to_string(), "middlegame");
    }

    #[test]
    fn intent_prompt_mentions_position_and_last_move() {
        let prompt = intent_prompt(
            Color::Black,
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            GamePhase::Opening,
            Some("White: e4"),
        );
        assert!(prompt.contains("black pieces"));
        assert!(prompt.contains("opening phase"));
        assert!(prompt.contains("White: e4"));
    }

    #[tokio::test]
    async fn offline_narrator_rotates_through_its_lines() {
        let mut narrator = OfflineNarrator::new();
        let first = narrator.request_text("s", "u").await.unwrap();
        let second = narrator.request_text("s", "u").await.unwrap();
        assert_eq!(first, OFFLINE_LINES[0]);
        assert_eq!(second, OFFLINE_LINES[1]);
        for _ in 0..OFFLINE_LINES.len() - 2 {
            narrator.request_text("s", "u").await.unwrap();
        }
        let wrapped = narrator.request_text("s", "u").await.unwrap();
        assert_eq!(wrapped, OFFLINE_LINES[0]);
    }
}
