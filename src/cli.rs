//! Command-line interface for parley_chess.

use clap::{Parser, Subcommand, ValueEnum};
use parley_chess::Color;

/// Parley Chess - chess against a talkative heuristic opponent
#[derive(Parser, Debug)]
#[command(name = "parley_chess")]
#[command(about = "Play chess against an LLM-narrated opponent", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play an interactive game in the terminal
    Play {
        /// Side you play
        #[arg(short, long, value_enum, default_value = "white")]
        color: Side,

        /// Path to a commentary config file
        #[arg(long, default_value = "parley.toml")]
        config: std::path::PathBuf,

        /// Use canned narration instead of the remote endpoint
        #[arg(long)]
        offline: bool,

        /// Start from a FEN position instead of the initial one
        #[arg(long)]
        fen: Option<String>,

        /// Seed for the move-selection RNG (reproducible games)
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Side selection on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Play the white pieces.
    White,
    /// Play the black pieces.
    Black,
}

impl From<Side> for Color {
    fn from(side: Side) -> Self {
        match side {
            Side::White => Color::White,
            Side::Black => Color::Black,
        }
    }
}
