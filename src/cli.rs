use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mp4read")]
#[command(author, version, about = "Read H.264 samples from MP4 files")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every track in a file
    Tracks {
        /// MP4 file to inspect
        #[arg(required = true)]
        file: PathBuf,
    },

    /// Show the selected video track
    Info {
        /// MP4 file to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Video track ID (defaults to the first video track)
        #[arg(short, long)]
        track: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List samples in decode order
    Samples {
        /// MP4 file to read
        #[arg(required = true)]
        file: PathBuf,

        /// Video track ID (defaults to the first video track)
        #[arg(short, long)]
        track: Option<u32>,

        /// Stop after this many samples
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output one JSON object per line
        #[arg(long)]
        json: bool,
    },

    /// Seek to a presentation time and list the samples that follow
    Seek {
        /// MP4 file to read
        #[arg(required = true)]
        file: PathBuf,

        /// Target presentation time in track timescale ticks
        timestamp: i64,

        /// Video track ID (defaults to the first video track)
        #[arg(short, long)]
        track: Option<u32>,

        /// Move even if the target lies in the current group of pictures
        #[arg(long)]
        force: bool,

        /// Number of samples to list after seeking
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Write the video track as an Annex B elementary stream
    Dump {
        /// MP4 file to read
        #[arg(required = true)]
        file: PathBuf,

        /// Output .h264 file
        #[arg(short, long, required = true)]
        output: PathBuf,

        /// Video track ID (defaults to the first video track)
        #[arg(short, long)]
        track: Option<u32>,
    },

    /// Display version information
    Version,
}
