//! Integration tests for the session state machine via the public API.

use parley_chess::{
    Color, CommentaryClient, CommentaryConfig, GameSession, GameStatus, OfflineNarrator, Phase,
    Piece, SessionError, TextSource,
};
use std::time::Duration;

fn offline_session(seed: u64) -> GameSession {
    GameSession::new(Box::new(OfflineNarrator::new()))
        .with_think_delay(Duration::ZERO)
        .with_seed(seed)
}

#[tokio::test]
async fn opening_exchange_follows_the_stated_intent() {
    let mut session = offline_session(7);
    session.start(Color::White).unwrap();

    session.submit_human_move("e2", "e4").unwrap();
    assert_eq!(session.history()[0].to_string(), "White: e4");
    assert_eq!(session.status(), GameStatus::InProgress);
    assert_eq!(session.phase(), Phase::AwaitingAiIntent);

    // The offline narrator opens with a development intent, so the reply
    // must be a knight or bishop move.
    let record = session.play_ai_turn().await.unwrap();
    assert_eq!(record.color(), Color::Black);
    assert!(matches!(record.piece(), Piece::Knight | Piece::Bishop));
    assert_eq!(session.phase(), Phase::AwaitingHumanMove);

    let texts: Vec<&str> = session.chat().all().iter().map(|m| m.text()).collect();
    assert!(
        texts
            .iter()
            .any(|t| t.starts_with("Thinking: I'm developing"))
    );
    assert!(texts.contains(&"I moved my white pawn from e2 to e4."));
}

#[tokio::test]
async fn submissions_are_rejected_while_the_ai_is_on_turn() {
    let mut session = offline_session(3);
    session.start(Color::White).unwrap();
    session.submit_human_move("e2", "e4").unwrap();

    let history_len = session.history().len();
    let chat_len = session.chat().len();
    let fen = session.board().fen();

    assert_eq!(
        session.submit_human_move("d2", "d4"),
        Err(SessionError::NotYourTurn)
    );
    assert_eq!(session.history().len(), history_len);
    assert_eq!(session.chat().len(), chat_len);
    assert_eq!(session.board().fen(), fen);
}

#[tokio::test]
async fn undo_twice_restores_the_position_four_plies_back() {
    let mut session = offline_session(11);
    let initial_fen = session.board().fen();
    session.start(Color::White).unwrap();

    session.submit_human_move("e2", "e4").unwrap();
    session.play_ai_turn().await.unwrap();
    let fen_after_one_round = session.board().fen();

    session.submit_human_move("d2", "d4").unwrap();
    session.play_ai_turn().await.unwrap();
    assert_eq!(session.history().len(), 4);

    session.undo().unwrap();
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.board().fen(), fen_after_one_round);
    assert_eq!(session.phase(), Phase::AwaitingHumanMove);

    session.undo().unwrap();
    assert!(session.history().is_empty());
    assert_eq!(session.board().fen(), initial_fen);
    assert_eq!(session.phase(), Phase::AwaitingHumanMove);
}

#[tokio::test]
async fn unreachable_endpoint_degrades_to_fallback_narration() {
    let config: CommentaryConfig =
        toml::from_str("endpoint = \"http://127.0.0.1:9/unreachable\"").unwrap();
    let narrator: Box<dyn TextSource> = Box::new(CommentaryClient::new(config));
    let mut session = GameSession::new(narrator)
        .with_think_delay(Duration::ZERO)
        .with_seed(5);

    session.start(Color::Black).unwrap();
    assert_eq!(session.phase(), Phase::AwaitingAiIntent);

    // The AI must still move, narrated by the fixed fallback strings.
    let record = session.play_ai_turn().await.unwrap();
    assert_eq!(record.color(), Color::White);
    assert_eq!(session.history().len(), 1);
    assert_eq!(session.phase(), Phase::AwaitingHumanMove);

    let texts: Vec<&str> = session.chat().all().iter().map(|m| m.text()).collect();
    assert!(
        texts
            .iter()
            .any(|t| t.contains("considering my white pieces' development"))
    );
    assert!(texts.contains(&"I'm thinking about my next move..."));
}

#[tokio::test]
async fn ai_opens_the_game_when_the_player_is_black() {
    let mut session = offline_session(1);
    session.start(Color::Black).unwrap();
    assert_eq!(session.phase(), Phase::AwaitingAiIntent);

    let record = session.play_ai_turn().await.unwrap();
    assert_eq!(record.color(), Color::White);
    assert_eq!(session.phase(), Phase::AwaitingHumanMove);
}

#[tokio::test]
async fn a_full_scripted_game_stays_consistent() {
    let mut session = offline_session(23);
    session.start(Color::White).unwrap();

    // A handful of quiet opening moves; the AI replies in between.
    for (from, to) in [("e2", "e4"), ("d2", "d3"), ("h2", "h3"), ("a2", "a3")] {
        if session.phase() != Phase::AwaitingHumanMove {
            break;
        }
        if session.submit_human_move(from, to).is_err() {
            continue;
        }
        if session.phase() == Phase::AwaitingAiIntent {
            session.play_ai_turn().await.unwrap();
        }
    }

    // Turn alternation is reflected in the record colors.
    for pair in session.history().windows(2) {
        assert_ne!(pair[0].color(), pair[1].color());
    }
    // The chat log is strictly ordered.
    for (index, message) in session.chat().all().iter().enumerate() {
        assert_eq!(message.seq(), index);
    }
}

#[tokio::test]
async fn resign_then_reset_allows_a_new_game() {
    let mut session = offline_session(9);
    session.start(Color::White).unwrap();
    session.submit_human_move("e2", "e4").unwrap();
    session.play_ai_turn().await.unwrap();

    session.resign().unwrap();
    assert_eq!(session.status(), GameStatus::Resigned(Color::White));
    assert_eq!(session.phase(), Phase::Terminal);

    session.reset();
    assert_eq!(session.phase(), Phase::NotStarted);
    session.start(Color::White).unwrap();
    session.submit_human_move("e2", "e4").unwrap();
    assert_eq!(session.history().len(), 1);
}
