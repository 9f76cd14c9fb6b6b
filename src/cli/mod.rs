//! CLI module for Reelcut.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Reelcut - Vertical shorts from long videos
///
/// Picks the strongest stretch of a video, reframes it to 9:16 and, on
/// request, narrates it with a generated script and synced subtitles.
#[derive(Parser, Debug)]
#[command(name = "reelcut")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Keep per-run working files
    #[arg(long, global = true)]
    pub keep_temp: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut one vertical clip with the source captions burned in
    Clip {
        /// YouTube URL/ID, or local video file path
        input: String,

        /// Selection strategy (auto, golden-zone, scenes, chapters, transcript, engagement)
        #[arg(short, long)]
        strategy: Option<String>,

        /// Random seed for reproducible picks
        #[arg(long)]
        seed: Option<u64>,

        /// Do not burn source captions into the clip
        #[arg(long)]
        no_captions: bool,

        /// Only use this text provider (e.g. groq, gemini)
        #[arg(long)]
        ai: Option<String>,
    },

    /// Join several short clips into one video
    Montage {
        /// YouTube URL/ID, or local video file path
        input: String,

        /// Number of clips
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Total length in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Selection strategy
        #[arg(short, long)]
        strategy: Option<String>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Split the whole video at scene changes into vertical clips
    Scenes {
        /// YouTube URL/ID, or local video file path
        input: String,
    },

    /// Produce a narrated short with generated script and subtitles
    Narrate {
        /// YouTube URL/ID, or local video file path
        input: String,

        /// Script persona (ruthless, educational, comedic, mystery)
        #[arg(long)]
        style: Option<String>,

        /// Override the primary voice
        #[arg(long)]
        voice: Option<String>,

        /// Requested narration length in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Number of independent variations to render
        #[arg(long, default_value = "1")]
        variations: usize,

        /// Background music file
        #[arg(long)]
        music: Option<PathBuf>,

        /// Selection strategy
        #[arg(short, long)]
        strategy: Option<String>,

        #[arg(long)]
        seed: Option<u64>,

        /// Only use this text provider
        #[arg(long)]
        ai: Option<String>,
    },

    /// Show which segments would be picked, without rendering
    Select {
        /// YouTube URL/ID, or local video file path
        input: String,

        /// Selection strategy
        #[arg(short, long)]
        strategy: Option<String>,

        /// Number of segments
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        #[arg(long)]
        seed: Option<u64>,

        /// Print segments as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one mode over every input listed in a file
    Batch {
        /// Text file with one URL, ID or path per line; `#` starts a comment
        file: PathBuf,

        /// What to produce for each input
        #[arg(short, long, value_enum, default_value = "clip")]
        mode: commands::BatchMode,

        /// Selection strategy
        #[arg(short, long)]
        strategy: Option<String>,

        #[arg(long)]
        seed: Option<u64>,

        /// Only use this text provider
        #[arg(long)]
        ai: Option<String>,

        /// Seconds to wait between items
        #[arg(short, long, default_value = "2")]
        delay: f64,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
