//! Parley Chess - terminal client.
//!
//! A thin driver over the library's session operations: it prints the
//! board and the chat log, reads moves and commands from stdin, and runs
//! the AI turn whenever the session asks for one.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use parley_chess::{
    Board, Color, CommentaryClient, CommentaryConfig, GameSession, OfflineNarrator, Phase,
    TextSource,
};
use std::io::Write as _;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Command::Play {
            color,
            config,
            offline,
            fen,
            seed,
        } => run_play(color.into(), config, offline, fen, seed).await,
    }
}

/// Runs the interactive play loop.
async fn run_play(
    color: Color,
    config_path: std::path::PathBuf,
    offline: bool,
    fen: Option<String>,
    seed: Option<u64>,
) -> Result<()> {
    init_tracing();

    let config = CommentaryConfig::load(&config_path)?;
    let narrator: Box<dyn TextSource> = if offline {
        Box::new(OfflineNarrator::new())
    } else {
        Box::new(CommentaryClient::new(config.clone()))
    };

    let mut session = GameSession::new(narrator)
        .with_think_delay(Duration::from_millis(*config.think_delay_ms()));
    if let Some(fen) = fen {
        session = session.with_board(Board::from_fen(&fen)?);
    }
    if let Some(seed) = seed {
        session = session.with_seed(seed);
    }

    let mut printed = 0;
    drain_chat(&session, &mut printed);
    session.start(color)?;
    info!(player = %color, offline, "interactive game started");

    let stdin = std::io::stdin();
    loop {
        match session.phase() {
            Phase::AwaitingAiIntent => {
                session.play_ai_turn().await?;
                drain_chat(&session, &mut printed);
                continue;
            }
            Phase::Terminal => {
                println!("{}", session.board().ascii());
                println!("* {}", session.status());
                println!("Type 'new' for another game or 'quit' to leave.");
            }
            _ => println!("{}", session.board().ascii()),
        }

        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim().to_lowercase();

        let outcome = match input.as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            "moves" => {
                for record in session.history() {
                    println!("  {record}");
                }
                continue;
            }
            "new" => {
                session.reset();
                printed = 0;
                drain_chat(&session, &mut printed);
                session.start(color)
            }
            "undo" => session.undo(),
            "hint" => session.hint(),
            "resign" => session.resign(),
            _ => match parse_move(&input) {
                Some((from, to)) => session.submit_human_move(&from, &to).map(|_| ()),
                None => {
                    println!("Enter moves as 'e2e4' or 'e2 e4'; 'help' lists commands.");
                    continue;
                }
            },
        };
        if let Err(e) = outcome {
            println!("* {e}");
        }
        drain_chat(&session, &mut printed);
    }
    Ok(())
}

/// Prints chat messages appended since the last call.
fn drain_chat(session: &GameSession, printed: &mut usize) {
    for message in &session.chat().all()[*printed..] {
        println!("[{}] {}", message.sender(), message.text());
    }
    *printed = session.chat().len();
}

/// Parses "e2e4" or "e2 e4" into a square pair.
fn parse_move(input: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    match parts.as_slice() {
        [one] if one.len() == 4 && one.is_ascii() => {
            Some((one[..2].to_string(), one[2..].to_string()))
        }
        [from, to] => Some((from.to_string(), to.to_string())),
        _ => None,
    }
}

fn print_help() {
    println!("Commands:");
    println!("  e2e4 / e2 e4   move a piece (promotions become queens)");
    println!("  hint           suggest a random legal move");
    println!("  moves          list the moves played so far");
    println!("  undo           take back the last two moves");
    println!("  resign         concede the game");
    println!("  new            start over with the same color");
    println!("  quit           leave");
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}
