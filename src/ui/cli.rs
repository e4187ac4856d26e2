//! Command-line interface definition.

use crate::core::config::DEFAULT_CONFIG_FILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// localguard: local file inspection and quarantine service
#[derive(Parser, Debug)]
#[command(name = "localguard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to the KEY=VALUE configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the command-dispatch server
    Serve,

    /// Send one command to a running server and print the reply
    Send {
        /// Command name (e.g. CheckLocalFile, QuarantineLocalFile)
        command: String,

        /// Parameters as key=value (e.g. file_path=/tmp/x signature=4D5A)
        params: Vec<String>,
    },

    /// Show the effective configuration
    Config,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
