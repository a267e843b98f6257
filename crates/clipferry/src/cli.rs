//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Clipboard and file relay agent
#[derive(Parser)]
#[command(name = "clipferry", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to config.json next to the binary)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the sync agent (default)
    Run,
    /// Push the current clipboard text once and exit
    Push,
    /// Regenerate room credentials, cutting off current peers
    Regen,
    /// Print the effective configuration
    ShowConfig,
}
