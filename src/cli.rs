//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Chinese-to-English voice translator for real-time rooms.
#[derive(Debug, Parser)]
#[command(name = "voice-translator")]
#[command(about = "Translate spoken Chinese into spoken English, one turn at a time")]
#[command(version)]
pub struct Cli {
    /// Settings file to use instead of the platform default
    #[arg(long = "config", global = true, env = "VOICE_TRANSLATOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one room from newline-delimited JSON events on stdin, with debug logging
    Dev,

    /// Listen for rooms over TCP; each connection is one room
    Start {
        /// Address to listen on (overrides `transport.listen_addr`)
        #[arg(long)]
        listen: Option<String>,
    },
}

impl Command {
    /// Default log filter when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        match self {
            Command::Dev => "debug",
            Command::Start { .. } => "info",
        }
    }
}
