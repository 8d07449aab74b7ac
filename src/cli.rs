use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "beatscope", about = "Per-frame audio features for music visualization")]
pub struct Cli {
    /// Config file (defaults to beatscope.toml or the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Analysis frame length in samples (power of two)
    #[arg(long, global = true)]
    pub frame_length: Option<usize>,

    /// Hop between frame starts in samples
    #[arg(long, global = true)]
    pub hop_length: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze audio files and write feature JSON
    Analyze {
        /// Input audio files (WAV, MP3, FLAC, OGG, AAC)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file for a single input (stdout if omitted)
        #[arg(short, long, conflicts_with = "out_dir")]
        output: Option<PathBuf>,

        /// Directory for `<stem>.features.json` files when analysing several inputs
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Pretty-print JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Serve analysis over HTTP
    Serve {
        /// Listen address, e.g. 0.0.0.0:8000
        #[arg(long)]
        bind: Option<String>,
    },
}
